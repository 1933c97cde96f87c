//! Point screening pipeline: per-site enrichment from DEM, soil and
//! land-cover rasters.

use aquascreen_core::raster::Raster;
use aquascreen_core::site::SiteCollection;
use aquascreen_core::{Error, Result};
use aquascreen_terrain::sample::{Resampling, SlopeSource, Wgs84Sampler};
use serde::Serialize;

use crate::landcover;
use crate::recharge::{self, AwcCategory, Confidence, RechargeClass, Thresholds};

/// Input rasters for a screening run.
///
/// The precomputed slope raster is optional; when present it takes
/// precedence over DEM-derived slope and must carry percent units.
#[derive(Debug, Clone)]
pub struct ScreeningInputs<'a> {
    /// Digital elevation model
    pub dem: &'a Raster<f64>,
    /// Available water capacity, mm
    pub awc: &'a Raster<f64>,
    /// CLC2018 land-cover codes
    pub clc: &'a Raster<f64>,
    /// Precomputed slope in percent
    pub slope: Option<&'a Raster<f64>>,
}

/// One screened site, ready for export
#[derive(Debug, Clone, Serialize)]
pub struct SiteRecord {
    pub asset_id: String,
    pub longitude: f64,
    pub latitude: f64,
    pub elevation_m: Option<f64>,
    pub slope_percent: Option<f64>,
    pub awc_mm: Option<f64>,
    pub land_cover_code: Option<i32>,
    pub land_cover_name: &'static str,
    pub near_water: bool,
    pub near_wetland: bool,
    pub recharge_class: RechargeClass,
    pub awc_category: AwcCategory,
    pub recharge_confidence: Confidence,
    pub slope_quality: String,
    pub water_stress_flag: bool,
    pub dem_nodata_flag: bool,
    pub awc_nodata_flag: bool,
}

/// Result of the coverage preflight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CoverageReport {
    /// Sites in the portfolio
    pub n_total: usize,
    /// Sites whose transformed coordinates fall inside the raster bounds
    pub n_inside_bounds: usize,
}

fn stage<T>(name: &str, result: Result<T>) -> Result<T> {
    result.map_err(|e| Error::Algorithm(format!("[stage:{name}] {e}")))
}

/// Screen a portfolio of sites against the input rasters.
///
/// Per site: elevation bilinear from the DEM, slope via the slope source
/// selector, AWC and land cover nearest-sampled, then recharge
/// classification and the derived flags. Failures are tagged with the
/// stage that produced them.
pub fn run_screening(
    sites: &SiteCollection,
    inputs: &ScreeningInputs<'_>,
    thresholds: &Thresholds,
) -> Result<Vec<SiteRecord>> {
    let dem_sampler = stage("dem_slope_elev", Wgs84Sampler::new(inputs.dem))?;
    let slope_source = stage(
        "dem_slope_elev",
        SlopeSource::from_inputs(inputs.slope, inputs.dem),
    )?;
    let awc_sampler = stage("awc_sample", Wgs84Sampler::new(inputs.awc))?;
    let clc_sampler = stage("clc", Wgs84Sampler::new(inputs.clc))?;

    let slope_quality = slope_source.quality().to_string();

    let mut records = Vec::with_capacity(sites.len());
    for site in sites.iter() {
        let (lon, lat) = (site.lon(), site.lat());

        let elevation_m = dem_sampler.elevation_at(lon, lat);
        let slope_percent = slope_source.slope_percent_at(lon, lat);
        let awc_mm = awc_sampler.value_at(lon, lat, Resampling::Nearest);
        let clc_value = clc_sampler.value_at(lon, lat, Resampling::Nearest);

        let cover = landcover::decode(clc_value);
        let recharge_class = recharge::classify(awc_mm, slope_percent, thresholds);

        // Screening-grade stress flag: a Low-recharge site that actually
        // consumes water. Absent usage data never flags.
        let water_use = site.attribute_f64("water_use_m3y").unwrap_or(0.0);
        let water_stress_flag = recharge_class == RechargeClass::Low && water_use > 0.0;

        records.push(SiteRecord {
            asset_id: site.asset_id.clone(),
            longitude: lon,
            latitude: lat,
            elevation_m,
            slope_percent,
            awc_mm,
            land_cover_code: cover.code,
            land_cover_name: cover.name,
            near_water: cover.near_water,
            near_wetland: cover.near_wetland,
            recharge_class,
            awc_category: recharge::awc_category(awc_mm, thresholds),
            recharge_confidence: recharge::confidence(awc_mm, slope_percent, thresholds),
            slope_quality: slope_quality.clone(),
            water_stress_flag,
            dem_nodata_flag: elevation_m.is_none(),
            awc_nodata_flag: awc_mm.is_none(),
        });
    }

    Ok(records)
}

/// Bounds-only preflight: how many sites fall inside the raster's extent.
///
/// Each site is transformed into the raster's own CRS and tested against
/// the bounding box, without sampling. Untransformable points count as
/// outside.
pub fn coverage_report(sites: &SiteCollection, raster: &Raster<f64>) -> Result<CoverageReport> {
    let sampler = Wgs84Sampler::new(raster)?;
    let crs = *sampler.crs();

    let n_inside_bounds = sites
        .iter()
        .filter(|site| {
            aquascreen_core::crs::transform_point(
                site.lon(),
                site.lat(),
                &aquascreen_core::crs::Crs::wgs84(),
                &crs,
            )
            .map(|(x, y)| raster.contains_geo(x, y))
            .unwrap_or(false)
        })
        .count();

    Ok(CoverageReport {
        n_total: sites.len(),
        n_inside_bounds,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use aquascreen_core::crs::Crs;
    use aquascreen_core::site::{AttributeValue, Site};
    use aquascreen_core::GeoTransform;
    use approx::assert_relative_eq;

    /// 10x10 WGS84 raster, 0.001° cells, origin near Madrid
    fn raster_with(value: f64) -> Raster<f64> {
        let mut r = Raster::new(10, 10);
        r.set_transform(GeoTransform::new(-3.710, 40.420, 0.001, -0.001));
        r.set_crs(Some(Crs::wgs84()));
        for row in 0..10 {
            for col in 0..10 {
                r.set(row, col, value).unwrap();
            }
        }
        r
    }

    fn one_site(lon: f64, lat: f64) -> SiteCollection {
        let mut sites = SiteCollection::new();
        sites.push(Site::new(lon, lat, "A1"));
        sites
    }

    #[test]
    fn screening_enriches_a_site() {
        let dem = raster_with(420.0);
        let awc = raster_with(200.0);
        let clc = raster_with(211.0);
        let inputs = ScreeningInputs {
            dem: &dem,
            awc: &awc,
            clc: &clc,
            slope: None,
        };

        let sites = one_site(-3.7045, 40.4145);
        let records = run_screening(&sites, &inputs, &Thresholds::default()).unwrap();
        assert_eq!(records.len(), 1);

        let r = &records[0];
        assert_eq!(r.asset_id, "A1");
        assert_relative_eq!(r.elevation_m.unwrap(), 420.0, epsilon = 1e-9);
        assert_relative_eq!(r.slope_percent.unwrap(), 0.0, epsilon = 1e-9);
        assert_eq!(r.awc_mm, Some(200.0));
        assert_eq!(r.land_cover_code, Some(211));
        assert_eq!(r.land_cover_name, "Non-irrigated arable land");
        assert!(!r.near_water);
        assert_eq!(r.recharge_class, RechargeClass::High);
        assert_eq!(r.awc_category, AwcCategory::High);
        assert_eq!(r.slope_quality, "approx");
        assert!(!r.dem_nodata_flag);
        assert!(!r.awc_nodata_flag);
    }

    #[test]
    fn precomputed_slope_sets_quality_and_value() {
        // Steep DEM, flat supplied slope raster: the record must carry
        // the raster value and the precomputed flag
        let mut dem = raster_with(0.0);
        for row in 0..10 {
            for col in 0..10 {
                dem.set(row, col, col as f64 * 1000.0).unwrap();
            }
        }
        let awc = raster_with(200.0);
        let clc = raster_with(311.0);
        let slope = raster_with(3.0);
        let inputs = ScreeningInputs {
            dem: &dem,
            awc: &awc,
            clc: &clc,
            slope: Some(&slope),
        };

        let sites = one_site(-3.7045, 40.4145);
        let records = run_screening(&sites, &inputs, &Thresholds::default()).unwrap();
        let r = &records[0];
        assert_eq!(r.slope_quality, "precomputed");
        assert_relative_eq!(r.slope_percent.unwrap(), 3.0, epsilon = 1e-9);
        assert_eq!(r.recharge_class, RechargeClass::High);
    }

    #[test]
    fn outside_coverage_is_conservative_low_with_flags() {
        let dem = raster_with(420.0);
        let awc = raster_with(200.0);
        let clc = raster_with(211.0);
        let inputs = ScreeningInputs {
            dem: &dem,
            awc: &awc,
            clc: &clc,
            slope: None,
        };

        let sites = one_site(10.0, 50.0);
        let records = run_screening(&sites, &inputs, &Thresholds::default()).unwrap();
        let r = &records[0];
        assert_eq!(r.elevation_m, None);
        assert_eq!(r.recharge_class, RechargeClass::Low);
        assert_eq!(r.recharge_confidence, Confidence::Low);
        assert_eq!(r.land_cover_name, "Unknown");
        assert!(r.dem_nodata_flag);
        assert!(r.awc_nodata_flag);
    }

    #[test]
    fn water_stress_needs_low_recharge_and_positive_use() {
        let dem = raster_with(420.0);
        let awc = raster_with(10.0); // thin soil
        let clc = raster_with(211.0);
        let slope = raster_with(40.0); // steep, thin soil: Low
        let inputs = ScreeningInputs {
            dem: &dem,
            awc: &awc,
            clc: &clc,
            slope: Some(&slope),
        };

        let mut sites = SiteCollection::new();
        let mut consumer = Site::new(-3.7045, 40.4145, "uses-water");
        consumer.set_attribute("water_use_m3y", AttributeValue::Float(1200.0));
        sites.push(consumer);
        sites.push(Site::new(-3.7045, 40.4145, "no-usage-data"));

        let records = run_screening(&sites, &inputs, &Thresholds::default()).unwrap();
        assert_eq!(records[0].recharge_class, RechargeClass::Low);
        assert!(records[0].water_stress_flag);
        assert!(!records[1].water_stress_flag);
    }

    #[test]
    fn stage_tag_on_bad_input_raster() {
        let dem = raster_with(420.0);
        let mut awc = raster_with(200.0);
        awc.set_crs(Some(Crs::from_epsg(3857)));
        let clc = raster_with(211.0);
        let inputs = ScreeningInputs {
            dem: &dem,
            awc: &awc,
            clc: &clc,
            slope: None,
        };

        let err = run_screening(&one_site(-3.7045, 40.4145), &inputs, &Thresholds::default())
            .unwrap_err();
        assert!(err.to_string().contains("[stage:awc_sample]"));
    }

    #[test]
    fn coverage_preflight_counts_inside_sites() {
        let dem = raster_with(420.0);
        let mut sites = SiteCollection::new();
        sites.push(Site::new(-3.7045, 40.4145, "in"));
        sites.push(Site::new(-3.7055, 40.4125, "in2"));
        sites.push(Site::new(0.0, 0.0, "out"));

        let report = coverage_report(&sites, &dem).unwrap();
        assert_eq!(report.n_total, 3);
        assert_eq!(report.n_inside_bounds, 2);
    }
}
