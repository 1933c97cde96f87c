//! Slope calculation from DEMs
//!
//! Calculates the rate of change of elevation using the Horn (1981) method,
//! which uses a 3x3 neighborhood to compute partial derivatives. This is the
//! native replacement for the `gdaldem slope` preprocessing step.

use aquascreen_core::raster::{Raster, RasterElement};
use aquascreen_core::{Algorithm, Error, Result};
use ndarray::Array2;
use rayon::prelude::*;

/// Units for slope output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SlopeUnits {
    /// Degrees (0-90)
    #[default]
    Degrees,
    /// Percent (0-infinity, typically 0-100+)
    Percent,
    /// Radians (0-π/2)
    Radians,
}

/// Parameters for slope calculation
#[derive(Debug, Clone)]
pub struct SlopeParams {
    /// Output units
    pub units: SlopeUnits,
    /// Z-factor for unit conversion (default 1.0)
    /// Use ~111320 for lat/lon DEMs with meters elevation
    pub z_factor: f64,
    /// Clamp the 3x3 window at raster borders so edge cells get values
    /// instead of nodata (gdaldem `-compute_edges`)
    pub compute_edges: bool,
}

impl Default for SlopeParams {
    fn default() -> Self {
        Self {
            units: SlopeUnits::Degrees,
            z_factor: 1.0,
            compute_edges: false,
        }
    }
}

/// Slope algorithm
#[derive(Debug, Clone, Default)]
pub struct Slope;

impl Algorithm for Slope {
    type Input = Raster<f64>;
    type Output = Raster<f64>;
    type Params = SlopeParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Slope"
    }

    fn description(&self) -> &'static str {
        "Calculate slope (rate of change of elevation) from a DEM using Horn's method"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        slope(&input, params)
    }
}

/// Calculate slope from a DEM
///
/// Uses Horn's (1981) method with a 3x3 neighborhood:
/// ```text
/// a b c
/// d e f
/// g h i
/// ```
///
/// dz/dx = ((c + 2f + i) - (a + 2d + g)) / (8 * cellsize)
/// dz/dy = ((g + 2h + i) - (a + 2b + c)) / (8 * cellsize)
/// slope = atan(sqrt(dz/dx² + dz/dy²))
///
/// Nodata anywhere in the window produces NaN output. With
/// `compute_edges` the window is clamped at the raster borders, matching
/// the behaviour of `gdaldem slope -compute_edges`.
pub fn slope(dem: &Raster<f64>, params: SlopeParams) -> Result<Raster<f64>> {
    let (rows, cols) = dem.shape();
    if rows < 2 || cols < 2 {
        return Err(Error::InvalidDimensions {
            width: cols,
            height: rows,
        });
    }

    let cell_size = dem.cell_size() * params.z_factor;
    if cell_size <= 0.0 {
        return Err(Error::InvalidParameter {
            name: "cell_size",
            value: cell_size.to_string(),
            reason: "cell size times z-factor must be positive".into(),
        });
    }

    let nodata = dem.nodata();
    let eight_cell_size = 8.0 * cell_size;

    // Process rows in parallel
    let output_data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];

            for col in 0..cols {
                let e = unsafe { dem.get_unchecked(row, col) };
                if e.is_nodata(nodata) {
                    continue;
                }

                let on_edge = row == 0 || row == rows - 1 || col == 0 || col == cols - 1;
                if on_edge && !params.compute_edges {
                    continue;
                }

                // 3x3 neighborhood, clamped at borders when computing edges
                let rm = row.saturating_sub(1);
                let rp = (row + 1).min(rows - 1);
                let cm = col.saturating_sub(1);
                let cp = (col + 1).min(cols - 1);

                let a = unsafe { dem.get_unchecked(rm, cm) };
                let b = unsafe { dem.get_unchecked(rm, col) };
                let c = unsafe { dem.get_unchecked(rm, cp) };
                let d = unsafe { dem.get_unchecked(row, cm) };
                let f = unsafe { dem.get_unchecked(row, cp) };
                let g = unsafe { dem.get_unchecked(rp, cm) };
                let h = unsafe { dem.get_unchecked(rp, col) };
                let i = unsafe { dem.get_unchecked(rp, cp) };

                if [a, b, c, d, f, g, h, i].iter().any(|v| v.is_nodata(nodata)) {
                    continue;
                }

                // Horn's method
                let dz_dx = ((c + 2.0 * f + i) - (a + 2.0 * d + g)) / eight_cell_size;
                let dz_dy = ((g + 2.0 * h + i) - (a + 2.0 * b + c)) / eight_cell_size;

                let slope_rad = (dz_dx * dz_dx + dz_dy * dz_dy).sqrt().atan();

                row_data[col] = match params.units {
                    SlopeUnits::Degrees => slope_rad.to_degrees(),
                    SlopeUnits::Percent => slope_rad.tan() * 100.0,
                    SlopeUnits::Radians => slope_rad,
                };
            }

            row_data
        })
        .collect();

    let mut output = dem.with_same_meta::<f64>(rows, cols);
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() = Array2::from_shape_vec((rows, cols), output_data)
        .map_err(|e| Error::Other(e.to_string()))?;

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use aquascreen_core::GeoTransform;

    fn create_test_dem() -> Raster<f64> {
        // Create a simple tilted plane: z = x + y
        let mut dem = Raster::new(10, 10);
        dem.set_transform(GeoTransform::new(0.0, 10.0, 1.0, -1.0));

        for row in 0..10 {
            for col in 0..10 {
                dem.set(row, col, (row + col) as f64).unwrap();
            }
        }
        dem
    }

    #[test]
    fn test_slope_flat() {
        let mut dem: Raster<f64> = Raster::filled(10, 10, 100.0);
        dem.set_transform(GeoTransform::new(0.0, 10.0, 1.0, -1.0));

        let result = slope(&dem, SlopeParams::default()).unwrap();

        let val = result.get(5, 5).unwrap();
        assert!(
            val.abs() < 0.001,
            "Expected ~0 slope for flat surface, got {}",
            val
        );
    }

    #[test]
    fn test_slope_tilted_uniform() {
        let dem = create_test_dem();
        let result = slope(&dem, SlopeParams::default()).unwrap();

        // All interior cells should have the same slope (constant gradient)
        let val1 = result.get(3, 3).unwrap();
        let val2 = result.get(5, 5).unwrap();

        assert!(
            (val1 - val2).abs() < 0.001,
            "Expected uniform slope, got {} vs {}",
            val1,
            val2
        );
    }

    #[test]
    fn test_slope_percent_45_degrees() {
        // z = x with 1m cells → dz/dx = 1 → 45° → 100%
        let mut dem: Raster<f64> = Raster::new(10, 10);
        dem.set_transform(GeoTransform::new(0.0, 10.0, 1.0, -1.0));
        for row in 0..10 {
            for col in 0..10 {
                dem.set(row, col, col as f64).unwrap();
            }
        }

        let pct = slope(
            &dem,
            SlopeParams {
                units: SlopeUnits::Percent,
                ..Default::default()
            },
        )
        .unwrap();
        let deg = slope(&dem, SlopeParams::default()).unwrap();

        assert!((pct.get(5, 5).unwrap() - 100.0).abs() < 1e-9);
        assert!((deg.get(5, 5).unwrap() - 45.0).abs() < 1e-9);
    }

    #[test]
    fn test_slope_edges_nodata_by_default() {
        let dem = create_test_dem();
        let result = slope(&dem, SlopeParams::default()).unwrap();
        assert!(result.get(0, 5).unwrap().is_nan());
        assert!(result.get(9, 0).unwrap().is_nan());
    }

    #[test]
    fn test_slope_compute_edges() {
        let dem = create_test_dem();
        let result = slope(
            &dem,
            SlopeParams {
                compute_edges: true,
                ..Default::default()
            },
        )
        .unwrap();
        // Edge cells now carry values
        assert!(!result.get(0, 5).unwrap().is_nan());
        assert!(!result.get(9, 0).unwrap().is_nan());
        assert!(!result.get(0, 0).unwrap().is_nan());
    }

    #[test]
    fn test_slope_nodata_in_window() {
        let mut dem = create_test_dem();
        dem.set(4, 4, f64::NAN).unwrap();

        let result = slope(&dem, SlopeParams::default()).unwrap();
        // All 8 neighbours of the hole (and the hole itself) are NaN
        for row in 3..=5 {
            for col in 3..=5 {
                assert!(result.get(row, col).unwrap().is_nan());
            }
        }
        // But cells two away are fine
        assert!(!result.get(7, 7).unwrap().is_nan());
    }

    #[test]
    fn test_slope_explicit_nodata_value() {
        let mut dem = create_test_dem();
        dem.set_nodata(Some(-9999.0));
        dem.set(4, 4, -9999.0).unwrap();

        let result = slope(&dem, SlopeParams::default()).unwrap();
        assert!(result.get(4, 4).unwrap().is_nan());
        assert!(result.get(5, 5).unwrap().is_nan());
    }

    #[test]
    fn test_slope_via_algorithm_trait() {
        let dem = create_test_dem();
        let result = Slope.execute_default(dem).unwrap();
        assert!(!result.get(5, 5).unwrap().is_nan());
        assert_eq!(Slope.name(), "Slope");
    }

    #[test]
    fn test_slope_rejects_degenerate_raster() {
        let dem: Raster<f64> = Raster::new(1, 10);
        assert!(slope(&dem, SlopeParams::default()).is_err());
    }
}
