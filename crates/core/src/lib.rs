//! # Aquascreen Core
//!
//! Core types, traits and I/O for the aquascreen water-screening toolkit.
//!
//! This crate provides:
//! - `Raster<T>`: Generic raster grid type with geographic sampling
//! - `GeoTransform`: Affine transformation for georeferencing
//! - `Crs`: EPSG-backed coordinate reference system with WGS84/UTM math
//! - `Site` / `SiteCollection`: portfolio point model
//! - I/O for GeoTIFF rasters and CSV/GeoJSON site tables

pub mod crs;
pub mod error;
pub mod io;
pub mod raster;
pub mod site;

pub use crs::Crs;
pub use error::{Error, Result};
pub use raster::{GeoTransform, Raster, RasterElement};
pub use site::{AttributeValue, Site, SiteCollection};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::crs::Crs;
    pub use crate::error::{Error, Result};
    pub use crate::raster::{GeoTransform, Raster, RasterElement};
    pub use crate::site::{Site, SiteCollection};
    pub use crate::Algorithm;
}

/// Core trait for raster algorithms.
///
/// Algorithms are pure functions that transform input data according to parameters.
pub trait Algorithm {
    /// Input type for the algorithm
    type Input;
    /// Output type for the algorithm
    type Output;
    /// Parameters controlling algorithm behavior
    type Params: Default;
    /// Error type for algorithm execution
    type Error: std::error::Error;

    /// Returns the algorithm name
    fn name(&self) -> &'static str;

    /// Returns a description of what the algorithm does
    fn description(&self) -> &'static str;

    /// Execute the algorithm
    fn execute(
        &self,
        input: Self::Input,
        params: Self::Params,
    ) -> std::result::Result<Self::Output, Self::Error>;

    /// Execute with default parameters
    fn execute_default(
        &self,
        input: Self::Input,
    ) -> std::result::Result<Self::Output, Self::Error> {
        self.execute(input, Self::Params::default())
    }
}
