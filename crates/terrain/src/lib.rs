//! # Aquascreen Terrain
//!
//! Raster terrain operations for the water-screening workflow:
//!
//! - [`slope`]: full-raster slope from a DEM (Horn 3×3), the native
//!   equivalent of `gdaldem slope`
//! - [`convert_slope_units`]: cell-wise degree/percent/radian conversion,
//!   the native equivalent of the `gdal_calc.py` percent step
//! - [`warp`]: raster reprojection with bilinear/nearest resampling, the
//!   native equivalent of `gdalwarp -t_srs … -r bilinear`
//! - [`Wgs84Sampler`] and [`SlopeSource`]: WGS84 point sampling and the
//!   precomputed-slope-first source selector

pub mod convert;
pub mod sample;
pub mod slope;
pub mod warp;

pub use convert::{convert_slope_units, ConvertParams};
pub use sample::{Resampling, SlopeQuality, SlopeSource, Wgs84Sampler};
pub use slope::{slope, Slope, SlopeParams, SlopeUnits};
pub use warp::{warp, Warp, WarpParams};
