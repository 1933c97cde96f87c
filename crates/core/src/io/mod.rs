//! I/O operations for reading and writing geospatial data

mod geotiff;
mod sites;

pub use geotiff::{
    read_geotiff, read_geotiff_from_buffer, write_geotiff, write_geotiff_to_buffer, GeoTiffOptions,
};
pub use sites::{read_sites, read_sites_csv, read_sites_geojson};
