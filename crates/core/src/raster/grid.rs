//! Main Raster type

use crate::crs::Crs;
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, RasterElement};
use ndarray::{Array2, ArrayView2};

/// A georeferenced 2D raster grid.
///
/// `Raster<T>` stores values of type `T` in a 2D grid with associated
/// geographic metadata (transform and CRS). Values are stored in
/// row-major order (row, col).
#[derive(Debug, Clone)]
pub struct Raster<T: RasterElement> {
    /// Raster data stored in row-major order (row, col)
    data: Array2<T>,
    /// Affine transformation
    transform: GeoTransform,
    /// Coordinate reference system
    crs: Option<Crs>,
    /// No-data value
    nodata: Option<T>,
}

impl<T: RasterElement> Raster<T> {
    /// Create a new raster filled with zeros
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            data: Array2::zeros((rows, cols)),
            transform: GeoTransform::default(),
            crs: None,
            nodata: None,
        }
    }

    /// Create a new raster filled with a specific value
    pub fn filled(rows: usize, cols: usize, value: T) -> Self {
        Self {
            data: Array2::from_elem((rows, cols), value),
            transform: GeoTransform::default(),
            crs: None,
            nodata: None,
        }
    }

    /// Create a raster from existing data
    pub fn from_vec(data: Vec<T>, rows: usize, cols: usize) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(Error::InvalidDimensions {
                width: cols,
                height: rows,
            });
        }

        let array = Array2::from_shape_vec((rows, cols), data)
            .map_err(|e| Error::Other(e.to_string()))?;

        Ok(Self {
            data: array,
            transform: GeoTransform::default(),
            crs: None,
            nodata: None,
        })
    }

    /// Create a raster from an ndarray
    pub fn from_array(data: Array2<T>) -> Self {
        Self {
            data,
            transform: GeoTransform::default(),
            crs: None,
            nodata: None,
        }
    }

    /// Create a raster with the same metadata but different data type
    pub fn with_same_meta<U: RasterElement>(&self, rows: usize, cols: usize) -> Raster<U> {
        Raster {
            data: Array2::zeros((rows, cols)),
            transform: self.transform,
            crs: self.crs.clone(),
            nodata: None,
        }
    }

    /// Create a raster with the same dimensions and metadata, filled with a value
    pub fn like(&self, fill_value: T) -> Self {
        Self {
            data: Array2::from_elem(self.data.dim(), fill_value),
            transform: self.transform,
            crs: self.crs.clone(),
            nodata: self.nodata,
        }
    }

    // Dimensions

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    /// Number of columns
    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// Dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    /// Total number of cells
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the raster is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    // Data access

    /// Get value at (row, col)
    pub fn get(&self, row: usize, col: usize) -> Result<T> {
        self.data
            .get((row, col))
            .copied()
            .ok_or(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            })
    }

    /// Get value at (row, col) without bounds checking
    ///
    /// # Safety
    /// Caller must ensure row < self.rows() and col < self.cols()
    pub unsafe fn get_unchecked(&self, row: usize, col: usize) -> T {
        unsafe { *self.data.uget((row, col)) }
    }

    /// Set value at (row, col)
    pub fn set(&mut self, row: usize, col: usize, value: T) -> Result<()> {
        if row >= self.rows() || col >= self.cols() {
            return Err(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            });
        }
        self.data[(row, col)] = value;
        Ok(())
    }

    /// Get a view of the underlying data
    pub fn view(&self) -> ArrayView2<'_, T> {
        self.data.view()
    }

    /// Get a reference to the underlying array
    pub fn data(&self) -> &Array2<T> {
        &self.data
    }

    /// Get a mutable reference to the underlying array
    pub fn data_mut(&mut self) -> &mut Array2<T> {
        &mut self.data
    }

    /// Consume the raster and return the underlying array
    pub fn into_array(self) -> Array2<T> {
        self.data
    }

    // Metadata

    /// Get the geotransform
    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    /// Set the geotransform
    pub fn set_transform(&mut self, transform: GeoTransform) {
        self.transform = transform;
    }

    /// Get the CRS
    pub fn crs(&self) -> Option<&Crs> {
        self.crs.as_ref()
    }

    /// Set the CRS
    pub fn set_crs(&mut self, crs: Option<Crs>) {
        self.crs = crs;
    }

    /// Get the no-data value
    pub fn nodata(&self) -> Option<T> {
        self.nodata
    }

    /// Set the no-data value
    pub fn set_nodata(&mut self, nodata: Option<T>) {
        self.nodata = nodata;
    }

    /// Cell size (assumes square cells)
    pub fn cell_size(&self) -> f64 {
        self.transform.cell_size()
    }

    /// Geographic bounds (min_x, min_y, max_x, max_y)
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        self.transform.bounds(self.cols(), self.rows())
    }

    // Coordinate conversion

    /// Convert pixel coordinates to geographic coordinates
    pub fn pixel_to_geo(&self, col: usize, row: usize) -> (f64, f64) {
        self.transform.pixel_to_geo(col, row)
    }

    /// Convert geographic coordinates to pixel coordinates
    pub fn geo_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        self.transform.geo_to_pixel(x, y)
    }

    /// Check whether a geographic coordinate (in the raster's own CRS)
    /// falls inside the raster bounds
    pub fn contains_geo(&self, x: f64, y: f64) -> bool {
        let (min_x, min_y, max_x, max_y) = self.bounds();
        x >= min_x && x <= max_x && y >= min_y && y <= max_y
    }

    // Value checks

    /// Check if a value is no-data
    pub fn is_nodata(&self, value: T) -> bool {
        value.is_nodata(self.nodata)
    }

    /// Check if cell at (row, col) contains no-data
    pub fn is_nodata_at(&self, row: usize, col: usize) -> Result<bool> {
        let value = self.get(row, col)?;
        Ok(self.is_nodata(value))
    }

    // Geographic sampling

    /// Sample the nearest cell value at a geographic coordinate (raster's own CRS).
    ///
    /// Returns `None` outside the raster coverage or where the cell is nodata.
    pub fn sample_nearest(&self, x: f64, y: f64) -> Option<f64> {
        let (col_f, row_f) = self.geo_to_pixel(x, y);
        if !col_f.is_finite() || !row_f.is_finite() || col_f < 0.0 || row_f < 0.0 {
            return None;
        }
        let (col, row) = (col_f.floor() as usize, row_f.floor() as usize);
        if row >= self.rows() || col >= self.cols() {
            return None;
        }
        let value = unsafe { self.get_unchecked(row, col) };
        if self.is_nodata(value) {
            return None;
        }
        value.to_f64()
    }

    /// Sample a bilinearly interpolated value at a geographic coordinate
    /// (raster's own CRS).
    ///
    /// All four neighbouring cells must be valid; any nodata neighbour or a
    /// position outside the interpolatable interior returns `None`.
    pub fn sample_bilinear(&self, x: f64, y: f64) -> Option<f64> {
        let (col_f, row_f) = self.geo_to_pixel(x, y);
        if !col_f.is_finite() || !row_f.is_finite() {
            return None;
        }

        // Interpolate between pixel centers: shift to center-based coordinates
        let fx = col_f - 0.5;
        let fy = row_f - 0.5;

        // Clamp to the interior so points within the outer half-cell still resolve
        let max_col = (self.cols() - 1) as f64;
        let max_row = (self.rows() - 1) as f64;
        if fx < -0.5 || fy < -0.5 || fx > max_col + 0.5 || fy > max_row + 0.5 {
            return None;
        }
        let fx = fx.clamp(0.0, max_col);
        let fy = fy.clamp(0.0, max_row);

        let c0 = fx.floor() as usize;
        let r0 = fy.floor() as usize;
        let c1 = (c0 + 1).min(self.cols() - 1);
        let r1 = (r0 + 1).min(self.rows() - 1);

        let wx = fx - c0 as f64;
        let wy = fy - r0 as f64;

        let mut corners = [0.0f64; 4];
        for (i, &(r, c)) in [(r0, c0), (r0, c1), (r1, c0), (r1, c1)].iter().enumerate() {
            let v = unsafe { self.get_unchecked(r, c) };
            if self.is_nodata(v) {
                return None;
            }
            corners[i] = v.to_f64()?;
        }

        let top = corners[0] * (1.0 - wx) + corners[1] * wx;
        let bottom = corners[2] * (1.0 - wx) + corners[3] * wx;
        Some(top * (1.0 - wy) + bottom * wy)
    }

    /// The full 3x3 neighbourhood centered on (row, col) as `[[f64; 3]; 3]`.
    ///
    /// Returns `None` when the window would extend past the raster edge;
    /// nodata cells are passed through unmasked for the caller to inspect.
    pub fn window3x3(&self, row: usize, col: usize) -> Option<[[f64; 3]; 3]> {
        if row == 0 || col == 0 || row + 1 >= self.rows() || col + 1 >= self.cols() {
            return None;
        }
        let mut win = [[0.0f64; 3]; 3];
        for (i, win_row) in win.iter_mut().enumerate() {
            for (j, cell) in win_row.iter_mut().enumerate() {
                let v = unsafe { self.get_unchecked(row + i - 1, col + j - 1) };
                *cell = v.to_f64()?;
            }
        }
        Some(win)
    }

    // Statistics

    /// Calculate basic statistics (min, max, mean, count of valid cells)
    pub fn statistics(&self) -> RasterStatistics<T> {
        let mut min = None;
        let mut max = None;
        let mut sum: f64 = 0.0;
        let mut count: usize = 0;

        for &value in self.data.iter() {
            if self.is_nodata(value) {
                continue;
            }

            if min.is_none() || value < min.unwrap() {
                min = Some(value);
            }
            if max.is_none() || value > max.unwrap() {
                max = Some(value);
            }

            if let Some(v) = value.to_f64() {
                sum += v;
                count += 1;
            }
        }

        let mean = if count > 0 {
            Some(sum / count as f64)
        } else {
            None
        };

        RasterStatistics {
            min,
            max,
            mean,
            valid_count: count,
            nodata_count: self.len() - count,
        }
    }
}

/// Basic statistics for a raster
#[derive(Debug, Clone)]
pub struct RasterStatistics<T> {
    pub min: Option<T>,
    pub max: Option<T>,
    pub mean: Option<f64>,
    pub valid_count: usize,
    pub nodata_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn georeferenced(rows: usize, cols: usize) -> Raster<f64> {
        // Origin (0, rows), 1x1 cells, north-up
        let mut r = Raster::new(rows, cols);
        r.set_transform(GeoTransform::new(0.0, rows as f64, 1.0, -1.0));
        r
    }

    #[test]
    fn test_raster_creation() {
        let raster: Raster<f32> = Raster::new(100, 200);
        assert_eq!(raster.rows(), 100);
        assert_eq!(raster.cols(), 200);
        assert_eq!(raster.shape(), (100, 200));
    }

    #[test]
    fn test_raster_access() {
        let mut raster: Raster<f32> = Raster::new(10, 10);
        raster.set(5, 5, 42.0).unwrap();
        assert_eq!(raster.get(5, 5).unwrap(), 42.0);
    }

    #[test]
    fn test_sample_nearest() {
        let mut raster = georeferenced(10, 10);
        raster.set(2, 3, 7.5).unwrap();

        // Cell (row 2, col 3) center is at x=3.5, y=7.5
        assert_eq!(raster.sample_nearest(3.5, 7.5), Some(7.5));
        // Anywhere in the same cell hits the same value
        assert_eq!(raster.sample_nearest(3.1, 7.9), Some(7.5));
        // Outside the raster
        assert_eq!(raster.sample_nearest(-1.0, 5.0), None);
        assert_eq!(raster.sample_nearest(5.0, 100.0), None);
    }

    #[test]
    fn test_sample_nearest_masks_nodata() {
        let mut raster = georeferenced(10, 10);
        raster.set_nodata(Some(-9999.0));
        raster.set(2, 3, -9999.0).unwrap();
        assert_eq!(raster.sample_nearest(3.5, 7.5), None);
    }

    #[test]
    fn test_sample_bilinear_plane() {
        // z = x: interpolation on a plane must reproduce the plane
        let mut raster = georeferenced(10, 10);
        for row in 0..10 {
            for col in 0..10 {
                let (x, _) = raster.pixel_to_geo(col, row);
                raster.set(row, col, x).unwrap();
            }
        }
        let v = raster.sample_bilinear(4.25, 5.0).unwrap();
        assert_relative_eq!(v, 4.25, epsilon = 1e-10);
    }

    #[test]
    fn test_sample_bilinear_nodata_neighbour() {
        let mut raster = georeferenced(10, 10);
        for row in 0..10 {
            for col in 0..10 {
                raster.set(row, col, 1.0).unwrap();
            }
        }
        raster.set(5, 5, f64::NAN).unwrap();
        // Point between (5,5) and its neighbours → None
        assert_eq!(raster.sample_bilinear(5.8, 4.2), None);
        // Far from the hole → fine
        assert_eq!(raster.sample_bilinear(1.5, 8.5), Some(1.0));
    }

    #[test]
    fn test_window3x3() {
        let mut raster = georeferenced(5, 5);
        for row in 0..5 {
            for col in 0..5 {
                raster.set(row, col, (row * 5 + col) as f64).unwrap();
            }
        }
        let win = raster.window3x3(2, 2).unwrap();
        assert_eq!(win[0][0], 6.0);
        assert_eq!(win[1][1], 12.0);
        assert_eq!(win[2][2], 18.0);

        // Edges: full window or nothing
        assert!(raster.window3x3(0, 2).is_none());
        assert!(raster.window3x3(2, 4).is_none());
    }

    #[test]
    fn test_raster_statistics() {
        let mut raster: Raster<f32> = Raster::new(10, 10);
        for i in 0..10 {
            for j in 0..10 {
                raster.set(i, j, (i * 10 + j) as f32).unwrap();
            }
        }

        let stats = raster.statistics();
        assert_eq!(stats.min, Some(0.0));
        assert_eq!(stats.max, Some(99.0));
        assert_eq!(stats.valid_count, 100);
    }
}
