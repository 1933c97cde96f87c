//! Affine georeferencing
//!
//! Six affine coefficients tie pixel indices (col, row) to map
//! coordinates (x, y):
//!
//! ```text
//! x = origin_x + col * pixel_width + row * row_rotation
//! y = origin_y + col * col_rotation + row * pixel_height
//! ```
//!
//! DEM and slope rasters in this workflow are north-up: both rotation
//! terms zero and `pixel_height` negative, with x/y in degrees (WGS84)
//! or metres (UTM).

use serde::{Deserialize, Serialize};

/// Affine transform between pixel and map coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    /// Map x of the raster's upper-left corner
    pub origin_x: f64,
    /// Map y of the raster's upper-left corner
    pub origin_y: f64,
    /// Cell size along x
    pub pixel_width: f64,
    /// Cell size along y, negative for north-up
    pub pixel_height: f64,
    /// Row rotation term, zero for north-up
    pub row_rotation: f64,
    /// Column rotation term, zero for north-up
    pub col_rotation: f64,
}

impl GeoTransform {
    /// North-up transform from origin and cell sizes
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
            row_rotation: 0.0,
            col_rotation: 0.0,
        }
    }

    /// Build from the GDAL coefficient order
    /// `[origin_x, pixel_width, row_rotation, origin_y, col_rotation, pixel_height]`
    pub fn from_gdal(c: [f64; 6]) -> Self {
        Self {
            origin_x: c[0],
            pixel_width: c[1],
            row_rotation: c[2],
            origin_y: c[3],
            col_rotation: c[4],
            pixel_height: c[5],
        }
    }

    /// The six coefficients in GDAL order
    pub fn to_gdal(&self) -> [f64; 6] {
        [
            self.origin_x,
            self.pixel_width,
            self.row_rotation,
            self.origin_y,
            self.col_rotation,
            self.pixel_height,
        ]
    }

    /// Map coordinates of the centre of pixel (col, row)
    pub fn pixel_to_geo(&self, col: usize, row: usize) -> (f64, f64) {
        self.apply(col as f64 + 0.5, row as f64 + 0.5)
    }

    /// Map coordinates of the upper-left corner of pixel (col, row)
    pub fn pixel_to_geo_corner(&self, col: usize, row: usize) -> (f64, f64) {
        self.apply(col as f64, row as f64)
    }

    fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        let x = self.origin_x + col * self.pixel_width + row * self.row_rotation;
        let y = self.origin_y + col * self.col_rotation + row * self.pixel_height;
        (x, y)
    }

    /// Fractional pixel coordinates of a map coordinate; `.floor()` the
    /// result for cell indices. A degenerate transform yields NaN.
    pub fn geo_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        let det = self.pixel_width * self.pixel_height - self.row_rotation * self.col_rotation;
        if det.abs() < 1e-10 {
            return (f64::NAN, f64::NAN);
        }

        let dx = x - self.origin_x;
        let dy = y - self.origin_y;

        let col = (self.pixel_height * dx - self.row_rotation * dy) / det;
        let row = (-self.col_rotation * dx + self.pixel_width * dy) / det;

        (col, row)
    }

    /// Cell size along x (square cells assumed)
    pub fn cell_size(&self) -> f64 {
        self.pixel_width.abs()
    }

    /// Whether the transform is north-up: no rotation terms and y
    /// decreasing with row. ModelPixelScale-based GeoTIFF output can
    /// only represent these.
    pub fn is_north_up(&self) -> bool {
        self.row_rotation.abs() < 1e-10
            && self.col_rotation.abs() < 1e-10
            && self.pixel_height < 0.0
    }

    /// Bounding box (min_x, min_y, max_x, max_y) of a `width` x `height`
    /// raster under this transform
    pub fn bounds(&self, width: usize, height: usize) -> (f64, f64, f64, f64) {
        let corners = [
            self.pixel_to_geo_corner(0, 0),
            self.pixel_to_geo_corner(width, 0),
            self.pixel_to_geo_corner(0, height),
            self.pixel_to_geo_corner(width, height),
        ];

        let mut min_x = f64::INFINITY;
        let mut min_y = f64::INFINITY;
        let mut max_x = f64::NEG_INFINITY;
        let mut max_y = f64::NEG_INFINITY;
        for (x, y) in corners {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }

        (min_x, min_y, max_x, max_y)
    }
}

impl Default for GeoTransform {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0, -1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// ~1.1 km cells in degrees, upper-left near Madrid
    fn wgs84_grid() -> GeoTransform {
        GeoTransform::new(-3.75, 40.45, 0.01, -0.01)
    }

    /// 30 m cells, UTM 30N
    fn utm_grid() -> GeoTransform {
        GeoTransform::new(440_000.0, 4_475_000.0, 30.0, -30.0)
    }

    #[test]
    fn centre_and_corner_differ_by_half_a_cell() {
        let gt = wgs84_grid();
        let (cx, cy) = gt.pixel_to_geo(3, 2);
        let (kx, ky) = gt.pixel_to_geo_corner(3, 2);
        assert_relative_eq!(cx - kx, 0.005, epsilon = 1e-12);
        assert_relative_eq!(ky - cy, 0.005, epsilon = 1e-12);
    }

    #[test]
    fn utm_pixel_roundtrip() {
        let gt = utm_grid();
        let (x, y) = gt.pixel_to_geo(17, 42);
        assert_relative_eq!(x, 440_000.0 + 17.5 * 30.0, epsilon = 1e-9);
        assert_relative_eq!(y, 4_475_000.0 - 42.5 * 30.0, epsilon = 1e-9);

        let (col, row) = gt.geo_to_pixel(x, y);
        assert_relative_eq!(col, 17.5, epsilon = 1e-10);
        assert_relative_eq!(row, 42.5, epsilon = 1e-10);
    }

    #[test]
    fn gdal_coefficient_order_roundtrip() {
        let gt = utm_grid();
        let coeffs = gt.to_gdal();
        assert_eq!(coeffs, [440_000.0, 30.0, 0.0, 4_475_000.0, 0.0, -30.0]);
        assert_eq!(GeoTransform::from_gdal(coeffs), gt);
    }

    #[test]
    fn north_up_detection() {
        assert!(wgs84_grid().is_north_up());
        assert!(utm_grid().is_north_up());

        let rotated = GeoTransform::from_gdal([0.0, 1.0, 0.2, 0.0, 0.0, -1.0]);
        assert!(!rotated.is_north_up());
        let south_up = GeoTransform::new(0.0, 0.0, 1.0, 1.0);
        assert!(!south_up.is_north_up());
    }

    #[test]
    fn degenerate_transform_yields_nan() {
        let gt = GeoTransform::new(0.0, 0.0, 0.0, 0.0);
        let (col, row) = gt.geo_to_pixel(10.0, 10.0);
        assert!(col.is_nan() && row.is_nan());
    }

    #[test]
    fn bounds_of_wgs84_grid() {
        let gt = wgs84_grid();
        let (min_x, min_y, max_x, max_y) = gt.bounds(10, 10);
        assert_relative_eq!(min_x, -3.75, epsilon = 1e-12);
        assert_relative_eq!(max_x, -3.65, epsilon = 1e-12);
        assert_relative_eq!(min_y, 40.35, epsilon = 1e-12);
        assert_relative_eq!(max_y, 40.45, epsilon = 1e-12);
    }
}
