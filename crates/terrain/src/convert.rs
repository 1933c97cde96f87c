//! Slope unit conversion
//!
//! Cell-wise conversion between slope units, the native replacement for
//! the documented `gdal_calc.py --calc="tan(A*pi/180)*100"` step. An
//! explicit output nodata value can be requested (the original workflow
//! passes `--NoDataValue=0`).

use crate::slope::SlopeUnits;
use aquascreen_core::raster::{Raster, RasterElement};
use aquascreen_core::{Error, Result};
use ndarray::Array2;
use rayon::prelude::*;

/// Parameters for slope unit conversion
#[derive(Debug, Clone)]
pub struct ConvertParams {
    /// Units of the input raster
    pub from: SlopeUnits,
    /// Units of the output raster
    pub to: SlopeUnits,
    /// Explicit output nodata value; `None` keeps NaN nodata
    pub output_nodata: Option<f64>,
}

impl Default for ConvertParams {
    fn default() -> Self {
        Self {
            from: SlopeUnits::Degrees,
            to: SlopeUnits::Percent,
            output_nodata: None,
        }
    }
}

/// Convert a slope raster between degrees, percent and radians.
///
/// The documented conversion is `tan(deg·π/180)·100` for degrees→percent;
/// the other directions are its inverses. Nodata cells map to
/// `output_nodata` (NaN when unset).
pub fn convert_slope_units(raster: &Raster<f64>, params: ConvertParams) -> Result<Raster<f64>> {
    let (rows, cols) = raster.shape();
    let nodata = raster.nodata();
    let out_nodata = params.output_nodata.unwrap_or(f64::NAN);

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![out_nodata; cols];
            for col in 0..cols {
                let val = unsafe { raster.get_unchecked(row, col) };
                if val.is_nodata(nodata) {
                    continue;
                }
                row_data[col] = convert_value(val, params.from, params.to);
            }
            row_data
        })
        .collect();

    let mut output = raster.with_same_meta::<f64>(rows, cols);
    output.set_nodata(Some(out_nodata));
    *output.data_mut() =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;

    Ok(output)
}

/// Convert a single slope value between units
pub fn convert_value(value: f64, from: SlopeUnits, to: SlopeUnits) -> f64 {
    if from == to {
        return value;
    }
    let radians = match from {
        SlopeUnits::Degrees => value.to_radians(),
        SlopeUnits::Percent => (value / 100.0).atan(),
        SlopeUnits::Radians => value,
    };
    match to {
        SlopeUnits::Degrees => radians.to_degrees(),
        SlopeUnits::Percent => radians.tan() * 100.0,
        SlopeUnits::Radians => radians,
    }
}
