//! Raster reprojection
//!
//! Native replacement for `gdalwarp -t_srs <crs> -r bilinear`: builds the
//! target grid from the corner-wise transformed source envelope, then
//! inverse-maps every output pixel centre back to the source CRS and
//! samples there. Supported CRS pairs are WGS84 ↔ UTM and identity.

use crate::sample::Resampling;
use aquascreen_core::crs::{self, Crs};
use aquascreen_core::raster::Raster;
use aquascreen_core::{Algorithm, Error, GeoTransform, Result};
use ndarray::Array2;
use rayon::prelude::*;

/// Parameters for raster reprojection
#[derive(Debug, Clone)]
pub struct WarpParams {
    /// Target CRS
    pub target_crs: Crs,
    /// Resampling method (bilinear for continuous rasters, nearest for
    /// categorical)
    pub resampling: Resampling,
    /// Target cell size in target CRS units; derived from the source cell
    /// size at the raster centre when unset
    pub target_cell_size: Option<f64>,
}

impl Default for WarpParams {
    fn default() -> Self {
        Self {
            target_crs: Crs::wgs84(),
            resampling: Resampling::Bilinear,
            target_cell_size: None,
        }
    }
}

/// Warp algorithm
#[derive(Debug, Clone, Default)]
pub struct Warp;

impl Algorithm for Warp {
    type Input = Raster<f64>;
    type Output = Raster<f64>;
    type Params = WarpParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Warp"
    }

    fn description(&self) -> &'static str {
        "Reproject a raster to a target CRS with bilinear or nearest resampling"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        warp(&input, params)
    }
}

/// Reproject a raster to the target CRS.
///
/// The output grid is the envelope of the source bounds transformed
/// corner-wise to the target CRS. Nodata propagates; bilinear sampling
/// with any invalid neighbour produces nodata.
pub fn warp(raster: &Raster<f64>, params: WarpParams) -> Result<Raster<f64>> {
    let source_crs = raster
        .crs()
        .copied()
        .ok_or_else(|| Error::UnsupportedCrs("raster has no CRS".into()))?;
    if !source_crs.is_supported() {
        return Err(Error::UnsupportedCrs(source_crs.to_string()));
    }
    if !params.target_crs.is_supported() {
        return Err(Error::UnsupportedCrs(params.target_crs.to_string()));
    }

    if source_crs.is_equivalent(&params.target_crs) {
        return Ok(raster.clone());
    }

    let target = params.target_crs;
    let (min_x, min_y, max_x, max_y) =
        crs::transform_bounds(raster.bounds(), &source_crs, &target)?;

    let (px, py) = match params.target_cell_size {
        Some(cs) if cs > 0.0 => (cs, cs),
        Some(cs) => {
            return Err(Error::InvalidParameter {
                name: "target_cell_size",
                value: cs.to_string(),
                reason: "must be positive".into(),
            })
        }
        None => derived_cell_size(raster, &source_crs, &target)?,
    };

    let out_cols = (((max_x - min_x) / px).ceil() as usize).max(1);
    let out_rows = (((max_y - min_y) / py).ceil() as usize).max(1);
    let out_transform = GeoTransform::new(min_x, max_y, px, -py);

    let data: Vec<f64> = (0..out_rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; out_cols];
            for (col, cell) in row_data.iter_mut().enumerate() {
                let (tx, ty) = out_transform.pixel_to_geo(col, row);
                // CRS pair validated above, per-pixel transform cannot fail
                let Ok((sx, sy)) = crs::transform_point(tx, ty, &target, &source_crs) else {
                    continue;
                };
                let sampled = match params.resampling {
                    Resampling::Bilinear => raster.sample_bilinear(sx, sy),
                    Resampling::Nearest => raster.sample_nearest(sx, sy),
                };
                if let Some(v) = sampled {
                    *cell = v;
                }
            }
            row_data
        })
        .collect();

    let mut output: Raster<f64> = Raster::from_vec(data, out_rows, out_cols)?;
    output.set_transform(out_transform);
    output.set_crs(Some(target));
    output.set_nodata(Some(f64::NAN));

    Ok(output)
}

/// Derive the target cell size from the source cell size, converting
/// metres ↔ degrees at the raster centre latitude.
fn derived_cell_size(
    raster: &Raster<f64>,
    source: &Crs,
    target: &Crs,
) -> Result<(f64, f64)> {
    let px = raster.transform().pixel_width.abs();
    let py = raster.transform().pixel_height.abs();

    match (source.is_geographic(), target.is_geographic()) {
        // degrees → degrees or metres → metres: keep as-is
        (true, true) | (false, false) => Ok((px, py)),
        (true, false) => {
            let lat = centre_latitude(raster, source)?;
            let (m_lat, m_lon) = crs::metres_per_degree(lat);
            Ok((px * m_lon, py * m_lat))
        }
        (false, true) => {
            let lat = centre_latitude(raster, source)?;
            let (m_lat, m_lon) = crs::metres_per_degree(lat);
            Ok((px / m_lon, py / m_lat))
        }
    }
}

/// WGS84 latitude of the raster centre
fn centre_latitude(raster: &Raster<f64>, source: &Crs) -> Result<f64> {
    let (min_x, min_y, max_x, max_y) = raster.bounds();
    let cx = (min_x + max_x) / 2.0;
    let cy = (min_y + max_y) / 2.0;
    let (_, lat) = crs::transform_point(cx, cy, source, &Crs::wgs84())?;
    Ok(lat)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// A 100x100 UTM 30N raster covering ~3x3 km near Madrid, z = row index
    fn utm_raster() -> Raster<f64> {
        let mut r = Raster::new(100, 100);
        r.set_transform(GeoTransform::new(440_000.0, 4_475_000.0, 30.0, -30.0));
        r.set_crs(Some(Crs::from_epsg(32630)));
        for row in 0..100 {
            for col in 0..100 {
                r.set(row, col, row as f64 * 10.0).unwrap();
            }
        }
        r
    }

    #[test]
    fn warp_identity_is_noop() {
        let src = utm_raster();
        let out = warp(
            &src,
            WarpParams {
                target_crs: Crs::from_epsg(32630),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(out.shape(), src.shape());
        assert_eq!(out.get(10, 10).unwrap(), src.get(10, 10).unwrap());
    }

    #[test]
    fn warp_utm_to_wgs84_geometry() {
        let src = utm_raster();
        let out = warp(&src, WarpParams::default()).unwrap();

        assert_eq!(out.crs().map(|c| c.epsg()), Some(4326));

        // Output bounds must be in degrees around Madrid
        let (min_x, min_y, max_x, max_y) = out.bounds();
        assert!(min_x > -4.0 && max_x < -3.0, "lon range, got {min_x}..{max_x}");
        assert!(min_y > 40.0 && max_y < 41.0, "lat range, got {min_y}..{max_y}");

        // Derived cell size: 30 m / m_per_deg_lon(40.4°) ≈ 0.00035°
        let cs = out.transform().pixel_width;
        assert!(cs > 0.0002 && cs < 0.0005, "cell size {cs}");
    }

    #[test]
    fn warp_preserves_values_at_corresponding_coords() {
        let src = utm_raster();
        let out = warp(&src, WarpParams::default()).unwrap();

        // Pick an interior source cell, look its value up through WGS84
        let (sx, sy) = src.pixel_to_geo(50, 50);
        let (lon, lat) =
            crs::transform_point(sx, sy, &Crs::from_epsg(32630), &Crs::wgs84()).unwrap();
        let warped = out.sample_bilinear(lon, lat).unwrap();
        let original = src.get(50, 50).unwrap();

        // z varies 10 per 30m row; allow one cell of resampling tolerance
        assert_relative_eq!(warped, original, epsilon = 12.0);
    }

    #[test]
    fn warp_nearest_keeps_categorical_values() {
        let mut src = utm_raster();
        // Categorical-looking content
        for row in 0..100 {
            for col in 0..100 {
                src.set(row, col, if col < 50 { 211.0 } else { 512.0 }).unwrap();
            }
        }
        let out = warp(
            &src,
            WarpParams {
                resampling: Resampling::Nearest,
                ..Default::default()
            },
        )
        .unwrap();

        // Every valid output value must be one of the two input codes
        for row in (0..out.rows()).step_by(7) {
            for col in (0..out.cols()).step_by(7) {
                let v = out.get(row, col).unwrap();
                if !v.is_nan() {
                    assert!(v == 211.0 || v == 512.0, "unexpected value {v}");
                }
            }
        }
    }

    #[test]
    fn warp_requires_crs() {
        let mut src = utm_raster();
        src.set_crs(None);
        assert!(matches!(
            warp(&src, WarpParams::default()),
            Err(Error::UnsupportedCrs(_))
        ));
    }

    #[test]
    fn warp_rejects_unsupported_target() {
        let src = utm_raster();
        let err = warp(
            &src,
            WarpParams {
                target_crs: Crs::from_epsg(3857),
                ..Default::default()
            },
        );
        assert!(matches!(err, Err(Error::UnsupportedCrs(_))));
    }

    #[test]
    fn warp_explicit_cell_size() {
        let src = utm_raster();
        let out = warp(
            &src,
            WarpParams {
                target_cell_size: Some(0.001),
                ..Default::default()
            },
        )
        .unwrap();
        assert_relative_eq!(out.transform().pixel_width, 0.001, epsilon = 1e-12);
    }
}
