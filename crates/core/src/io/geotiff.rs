//! Native GeoTIFF reading/writing (without GDAL dependency)
//!
//! Uses the `tiff` crate for TIFF I/O. Reads and writes the GeoTIFF
//! georeferencing tags (ModelPixelScale, ModelTiepoint), the
//! GeoKeyDirectory EPSG geokeys, and the GDAL_NODATA ASCII tag so that
//! CRS and nodata survive a round trip.

use crate::crs::Crs;
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster, RasterElement};
use std::fs::File;
use std::io::Cursor;
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::colortype::Gray32Float;
use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;

// GeoKey ids
const GT_MODEL_TYPE: u16 = 1024;
const GT_RASTER_TYPE: u16 = 1025;
const GEOGRAPHIC_TYPE: u16 = 2048;
const PROJECTED_CS_TYPE: u16 = 3072;

const MODEL_TYPE_PROJECTED: u16 = 1;
const MODEL_TYPE_GEOGRAPHIC: u16 = 2;

/// Options for writing GeoTIFF files
#[derive(Debug, Clone)]
pub struct GeoTiffOptions {
    /// Compression (not fully supported in native mode)
    pub compression: String,
}

impl Default for GeoTiffOptions {
    fn default() -> Self {
        Self {
            compression: "NONE".to_string(),
        }
    }
}

/// Read a GeoTIFF file into a Raster
pub fn read_geotiff<T, P>(path: P, band: Option<usize>) -> Result<Raster<T>>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = File::open(path.as_ref())?;
    decode_geotiff(file, band)
}

/// Read a GeoTIFF from an in-memory buffer into a Raster
///
/// Same as `read_geotiff` but operates on a byte slice instead of a file path.
pub fn read_geotiff_from_buffer<T>(data: &[u8], band: Option<usize>) -> Result<Raster<T>>
where
    T: RasterElement,
{
    let cursor = Cursor::new(data);
    decode_geotiff(cursor, band)
}

/// Internal: decode a GeoTIFF from any `Read + Seek` source
fn decode_geotiff<T, R>(reader: R, _band: Option<usize>) -> Result<Raster<T>>
where
    T: RasterElement,
    R: std::io::Read + std::io::Seek,
{
    let mut decoder =
        Decoder::new(reader).map_err(|e| Error::TiffDecode(e.to_string()))?;

    let (width, height) = decoder
        .dimensions()
        .map_err(|e| Error::TiffDecode(format!("cannot read dimensions: {}", e)))?;

    let rows = height as usize;
    let cols = width as usize;

    let result = decoder
        .read_image()
        .map_err(|e| Error::TiffDecode(format!("cannot read image data: {}", e)))?;

    let data: Vec<T> = match result {
        DecodingResult::F32(buf) => cast_buffer(&buf),
        DecodingResult::F64(buf) => cast_buffer(&buf),
        DecodingResult::U8(buf) => cast_buffer(&buf),
        DecodingResult::U16(buf) => cast_buffer(&buf),
        DecodingResult::U32(buf) => cast_buffer(&buf),
        DecodingResult::I8(buf) => cast_buffer(&buf),
        DecodingResult::I16(buf) => cast_buffer(&buf),
        DecodingResult::I32(buf) => cast_buffer(&buf),
        _ => {
            return Err(Error::UnsupportedDataType(
                "unsupported TIFF pixel format".to_string(),
            ))
        }
    };

    if data.len() != rows * cols {
        return Err(Error::InvalidDimensions {
            width: cols,
            height: rows,
        });
    }

    let mut raster = Raster::from_vec(data, rows, cols)?;

    if let Ok(transform) = read_geotransform(&mut decoder) {
        raster.set_transform(transform);
    }
    raster.set_crs(read_crs(&mut decoder));
    if let Some(nodata) = read_nodata(&mut decoder) {
        raster.set_nodata(num_traits::cast(nodata));
    }

    Ok(raster)
}

fn cast_buffer<S, T>(buf: &[S]) -> Vec<T>
where
    S: Copy + num_traits::NumCast,
    T: RasterElement,
{
    buf.iter()
        .map(|&v| num_traits::cast(v).unwrap_or(T::default_nodata()))
        .collect()
}

/// Attempt to read GeoTransform from ModelPixelScale + ModelTiepoint
fn read_geotransform<R: std::io::Read + std::io::Seek>(
    decoder: &mut Decoder<R>,
) -> Result<GeoTransform> {
    let scale = decoder
        .get_tag_f64_vec(Tag::ModelPixelScaleTag)
        .map_err(|_| Error::TiffDecode("no pixel scale tag".into()))?;

    let tiepoint = decoder
        .get_tag_f64_vec(Tag::ModelTiepointTag)
        .map_err(|_| Error::TiffDecode("no tiepoint tag".into()))?;

    if scale.len() >= 2 && tiepoint.len() >= 6 {
        // tiepoint: [I, J, K, X, Y, Z]
        // scale: [ScaleX, ScaleY, ScaleZ]
        let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
        let origin_y = tiepoint[4] + tiepoint[1] * scale[1];

        // ModelPixelScale carries no rotation terms, the result is
        // north-up by construction
        return Ok(GeoTransform::from_gdal([
            origin_x, scale[0], 0.0, origin_y, 0.0, -scale[1],
        ]));
    }

    Err(Error::TiffDecode("cannot determine geotransform".into()))
}

/// Read the CRS from the GeoKeyDirectory, if present.
///
/// Looks for ProjectedCSTypeGeoKey (3072) or GeographicTypeGeoKey (2048)
/// with an inline EPSG code.
fn read_crs<R: std::io::Read + std::io::Seek>(decoder: &mut Decoder<R>) -> Option<Crs> {
    let keys = decoder
        .get_tag_u16_vec(Tag::GeoKeyDirectoryTag)
        .ok()?;
    if keys.len() < 4 {
        return None;
    }

    let n_keys = keys[3] as usize;
    let mut epsg: Option<u32> = None;

    for i in 0..n_keys {
        let base = 4 + i * 4;
        if base + 3 >= keys.len() {
            break;
        }
        let key_id = keys[base];
        let location = keys[base + 1];
        let value = keys[base + 3];

        // Only inline (location 0) values carry the code directly
        if location != 0 {
            continue;
        }
        match key_id {
            PROJECTED_CS_TYPE if value > 0 && value < u16::MAX => {
                epsg = Some(value as u32);
            }
            GEOGRAPHIC_TYPE if epsg.is_none() && value > 0 && value < u16::MAX => {
                epsg = Some(value as u32);
            }
            _ => {}
        }
    }

    epsg.map(Crs::from_epsg)
}

/// Read the GDAL_NODATA ASCII tag (42113), if present
fn read_nodata<R: std::io::Read + std::io::Seek>(decoder: &mut Decoder<R>) -> Option<f64> {
    let raw = decoder
        .get_tag_ascii_string(Tag::GdalNodata)
        .ok()?;
    raw.trim_end_matches('\0').trim().parse::<f64>().ok()
}

/// Write a Raster to a GeoTIFF file
///
/// Writes a single grayscale 32-bit float band with georeferencing,
/// EPSG geokey and nodata tags.
pub fn write_geotiff<T, P>(
    raster: &Raster<T>,
    path: P,
    _options: Option<GeoTiffOptions>,
) -> Result<()>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = File::create(path.as_ref())?;
    encode_geotiff(raster, file)
}

/// Write a Raster to an in-memory GeoTIFF buffer
pub fn write_geotiff_to_buffer<T>(
    raster: &Raster<T>,
    _options: Option<GeoTiffOptions>,
) -> Result<Vec<u8>>
where
    T: RasterElement,
{
    let mut buf = Vec::new();
    encode_geotiff(raster, Cursor::new(&mut buf))?;
    Ok(buf)
}

/// Internal: encode a Raster as GeoTIFF into any `Write + Seek` sink
fn encode_geotiff<T, W>(raster: &Raster<T>, writer: W) -> Result<()>
where
    T: RasterElement,
    W: std::io::Write + std::io::Seek,
{
    let mut encoder =
        TiffEncoder::new(writer).map_err(|e| Error::TiffEncode(e.to_string()))?;

    let (rows, cols) = raster.shape();

    // Convert data to f32
    let data: Vec<f32> = raster
        .data()
        .iter()
        .map(|&v| num_traits::cast(v).unwrap_or(f32::NAN))
        .collect();

    let gt = raster.transform();
    // ModelPixelScale + ModelTiepoint cannot encode rotation
    if !gt.is_north_up() {
        return Err(Error::TiffEncode(
            "only north-up transforms can be written".into(),
        ));
    }

    let mut image = encoder
        .new_image::<Gray32Float>(cols as u32, rows as u32)
        .map_err(|e| Error::TiffEncode(format!("cannot create TIFF image: {}", e)))?;

    // ModelPixelScaleTag
    let scale = vec![gt.pixel_width, gt.pixel_height.abs(), 0.0];
    image
        .encoder()
        .write_tag(Tag::ModelPixelScaleTag, scale.as_slice())
        .map_err(|e| Error::TiffEncode(format!("cannot write scale tag: {}", e)))?;

    // ModelTiepointTag
    let tiepoint = vec![0.0, 0.0, 0.0, gt.origin_x, gt.origin_y, 0.0];
    image
        .encoder()
        .write_tag(Tag::ModelTiepointTag, tiepoint.as_slice())
        .map_err(|e| Error::TiffEncode(format!("cannot write tiepoint tag: {}", e)))?;

    // GeoKeyDirectoryTag: model type + raster type + EPSG code geokey.
    // Keys must be sorted by key id.
    let geokeys: Vec<u16> = match raster.crs() {
        Some(crs) if crs.is_geographic() && crs.epsg() <= u16::MAX as u32 => vec![
            1, 1, 0, 3, // Version 1.1.0, 3 keys
            GT_MODEL_TYPE, 0, 1, MODEL_TYPE_GEOGRAPHIC,
            GT_RASTER_TYPE, 0, 1, 1, // RasterPixelIsArea
            GEOGRAPHIC_TYPE, 0, 1, crs.epsg() as u16,
        ],
        Some(crs) if crs.epsg() <= u16::MAX as u32 => vec![
            1, 1, 0, 3,
            GT_MODEL_TYPE, 0, 1, MODEL_TYPE_PROJECTED,
            GT_RASTER_TYPE, 0, 1, 1,
            PROJECTED_CS_TYPE, 0, 1, crs.epsg() as u16,
        ],
        _ => vec![
            1, 1, 0, 2,
            GT_MODEL_TYPE, 0, 1, MODEL_TYPE_PROJECTED,
            GT_RASTER_TYPE, 0, 1, 1,
        ],
    };
    image
        .encoder()
        .write_tag(Tag::GeoKeyDirectoryTag, geokeys.as_slice())
        .map_err(|e| Error::TiffEncode(format!("cannot write geokey tag: {}", e)))?;

    // GDAL_NODATA ASCII tag
    if let Some(nodata) = raster.nodata().and_then(RasterElement::to_f64) {
        let nodata_str = if nodata.is_nan() {
            "nan".to_string()
        } else {
            format!("{}", nodata)
        };
        image
            .encoder()
            .write_tag(Tag::GdalNodata, nodata_str.as_str())
            .map_err(|e| Error::TiffEncode(format!("cannot write nodata tag: {}", e)))?;
    }

    image
        .write_data(&data)
        .map_err(|e| Error::TiffEncode(format!("cannot write image data: {}", e)))?;

    Ok(())
}
