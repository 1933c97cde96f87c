//! WGS84 point sampling and the slope source selector.
//!
//! Sites arrive in WGS84; rasters may be in WGS84 or a UTM zone. Instead
//! of warping whole rasters before sampling, each query point is
//! transformed into the raster's own CRS and sampled there, which matches
//! the warped-read semantics of the original workflow for point queries.

use aquascreen_core::crs::{self, Crs};
use aquascreen_core::raster::{Raster, RasterElement};
use aquascreen_core::{Error, Result};
use std::fmt;

/// Resampling method for point sampling and warping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Resampling {
    /// Bilinear interpolation, for continuous rasters (DEM, slope)
    #[default]
    Bilinear,
    /// Nearest neighbour, for categorical rasters (land cover) and
    /// per-pixel soil properties (AWC)
    Nearest,
}

/// Samples a raster at WGS84 (lon, lat) coordinates.
///
/// Wraps a raster together with its CRS; every query transforms the
/// point into the raster's CRS before sampling. A raster without a CRS
/// is taken to already be in WGS84.
#[derive(Debug, Clone)]
pub struct Wgs84Sampler<'a> {
    raster: &'a Raster<f64>,
    crs: Crs,
}

impl<'a> Wgs84Sampler<'a> {
    /// Wrap a raster for WGS84 point queries.
    ///
    /// Fails when the raster's CRS is neither WGS84 nor a UTM zone.
    pub fn new(raster: &'a Raster<f64>) -> Result<Self> {
        let crs = raster.crs().copied().unwrap_or_else(Crs::wgs84);
        if !crs.is_supported() {
            return Err(Error::UnsupportedCrs(crs.to_string()));
        }
        Ok(Self { raster, crs })
    }

    /// The wrapped raster
    pub fn raster(&self) -> &Raster<f64> {
        self.raster
    }

    /// The raster's CRS
    pub fn crs(&self) -> &Crs {
        &self.crs
    }

    /// Transform a WGS84 point into the raster's own CRS.
    ///
    /// The CRS pair is validated at construction, so failure here only
    /// means the point itself is untransformable.
    fn to_raster_coords(&self, lon: f64, lat: f64) -> Option<(f64, f64)> {
        crs::transform_point(lon, lat, &Crs::wgs84(), &self.crs).ok()
    }

    /// Sample a value at (lon, lat) with the given resampling.
    ///
    /// Returns `None` outside coverage or where the raster is nodata.
    pub fn value_at(&self, lon: f64, lat: f64, resampling: Resampling) -> Option<f64> {
        let (x, y) = self.to_raster_coords(lon, lat)?;
        match resampling {
            Resampling::Bilinear => self.raster.sample_bilinear(x, y),
            Resampling::Nearest => self.raster.sample_nearest(x, y),
        }
    }

    /// Elevation at (lon, lat): bilinear, nodata-masked
    pub fn elevation_at(&self, lon: f64, lat: f64) -> Option<f64> {
        self.value_at(lon, lat, Resampling::Bilinear)
    }

    /// Approximate slope (percent) at (lon, lat) from the 3x3 DEM window
    /// around the containing cell, Horn gradients with per-axis cell sizes.
    ///
    /// Geographic rasters convert degree cell sizes to metres at the
    /// query latitude. Returns `None` at raster edges, outside coverage,
    /// or when any window cell is nodata.
    pub fn slope_percent_3x3(&self, lon: f64, lat: f64) -> Option<f64> {
        let (x, y) = self.to_raster_coords(lon, lat)?;
        let (col_f, row_f) = self.raster.geo_to_pixel(x, y);
        if !col_f.is_finite() || !row_f.is_finite() || col_f < 0.0 || row_f < 0.0 {
            return None;
        }
        let (row, col) = (row_f.floor() as usize, col_f.floor() as usize);

        let z = self.raster.window3x3(row, col)?;
        let nodata = self.raster.nodata();
        if z.iter().flatten().any(|v| v.is_nodata(nodata)) {
            return None;
        }

        let dx_deg = self.raster.transform().pixel_width.abs();
        let dy_deg = self.raster.transform().pixel_height.abs();
        let (dx_m, dy_m) = if self.crs.is_geographic() {
            let (m_lat, m_lon) = crs::metres_per_degree(lat);
            (dx_deg * m_lon, dy_deg * m_lat)
        } else {
            (dx_deg, dy_deg)
        };
        if dx_m == 0.0 || dy_m == 0.0 {
            return None;
        }

        let dzdx =
            ((z[0][2] + 2.0 * z[1][2] + z[2][2]) - (z[0][0] + 2.0 * z[1][0] + z[2][0]))
                / (8.0 * dx_m);
        let dzdy =
            ((z[2][0] + 2.0 * z[2][1] + z[2][2]) - (z[0][0] + 2.0 * z[0][1] + z[0][2]))
                / (8.0 * dy_m);

        Some((dzdx * dzdx + dzdy * dzdy).sqrt() * 100.0)
    }
}

/// How a slope value was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlopeQuality {
    /// Sampled from a user-supplied precomputed slope raster
    Precomputed,
    /// Approximated from a 3x3 DEM window
    Approximate,
}

impl fmt::Display for SlopeQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlopeQuality::Precomputed => write!(f, "precomputed"),
            SlopeQuality::Approximate => write!(f, "approx"),
        }
    }
}

/// Slope source selector.
///
/// A supplied precomputed slope raster (percent units by contract) takes
/// precedence and is sampled directly with bilinear resampling; without
/// one, slope falls back to the approximate 3x3 DEM computation.
#[derive(Debug, Clone)]
pub enum SlopeSource<'a> {
    /// Sample the precomputed slope raster; the DEM path is not invoked
    Precomputed(Wgs84Sampler<'a>),
    /// Derive slope from the DEM's 3x3 window
    Derived(Wgs84Sampler<'a>),
}

impl<'a> SlopeSource<'a> {
    /// Select the slope source: the precomputed raster when supplied,
    /// otherwise the DEM fallback.
    pub fn from_inputs(
        slope_raster: Option<&'a Raster<f64>>,
        dem: &'a Raster<f64>,
    ) -> Result<Self> {
        match slope_raster {
            Some(raster) => Ok(SlopeSource::Precomputed(Wgs84Sampler::new(raster)?)),
            None => Ok(SlopeSource::Derived(Wgs84Sampler::new(dem)?)),
        }
    }

    /// Slope in percent at (lon, lat), `None` where the source has no data
    pub fn slope_percent_at(&self, lon: f64, lat: f64) -> Option<f64> {
        match self {
            SlopeSource::Precomputed(sampler) => {
                sampler.value_at(lon, lat, Resampling::Bilinear)
            }
            SlopeSource::Derived(sampler) => sampler.slope_percent_3x3(lon, lat),
        }
    }

    /// Whether values come from the precomputed raster or the DEM window
    pub fn quality(&self) -> SlopeQuality {
        match self {
            SlopeSource::Precomputed(_) => SlopeQuality::Precomputed,
            SlopeSource::Derived(_) => SlopeQuality::Approximate,
        }
    }
}
