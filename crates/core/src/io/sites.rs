//! Portfolio site reading: CSV and GeoJSON point tables.
//!
//! CSV input needs a latitude column (`lat`/`latitude`, case-insensitive)
//! and a longitude column (`lon`/`lng`/`longitude`). A missing `asset_id`
//! column is autogenerated as `site_1..n`. All other columns are kept as
//! typed attributes. GeoJSON input must be a FeatureCollection of Point
//! features; coordinates are taken as WGS84.

use crate::error::{Error, Result};
use crate::site::{AttributeValue, Site, SiteCollection};
use serde::Deserialize;
use std::fs::File;
use std::path::Path;

const LAT_COLUMNS: &[&str] = &["lat", "latitude"];
const LON_COLUMNS: &[&str] = &["lon", "lng", "longitude"];

/// Read sites from a CSV or GeoJSON file, dispatching on the extension
pub fn read_sites<P: AsRef<Path>>(path: P) -> Result<SiteCollection> {
    let ext = path
        .as_ref()
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "csv" => read_sites_csv(path),
        "geojson" | "json" => read_sites_geojson(path),
        other => Err(Error::UnsupportedDataType(format!(
            "unsupported sites format: .{other} (use .csv or .geojson)"
        ))),
    }
}

/// Read sites from a CSV file
pub fn read_sites_csv<P: AsRef<Path>>(path: P) -> Result<SiteCollection> {
    let mut reader = csv::Reader::from_path(path.as_ref())?;
    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let lat_idx = find_column(&headers, LAT_COLUMNS)
        .ok_or_else(|| Error::MissingColumn("latitude (lat/latitude)".into()))?;
    let lon_idx = find_column(&headers, LON_COLUMNS)
        .ok_or_else(|| Error::MissingColumn("longitude (lon/lng/longitude)".into()))?;
    let id_idx = headers.iter().position(|h| h == "asset_id");

    let mut sites = SiteCollection::new();
    for (i, record) in reader.records().enumerate() {
        let record = record?;

        let lat: f64 = parse_coord(record.get(lat_idx), &headers[lat_idx])?;
        let lon: f64 = parse_coord(record.get(lon_idx), &headers[lon_idx])?;

        let asset_id = id_idx
            .and_then(|idx| record.get(idx))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .unwrap_or_else(|| format!("site_{}", i + 1));

        let mut site = Site::new(lon, lat, asset_id);
        for (idx, header) in headers.iter().enumerate() {
            if idx == lat_idx || idx == lon_idx || Some(idx) == id_idx {
                continue;
            }
            if let Some(raw) = record.get(idx) {
                site.set_attribute(header.clone(), parse_attribute(raw));
            }
        }
        sites.push(site);
    }

    Ok(sites)
}

fn find_column(headers: &[String], candidates: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|h| candidates.contains(&h.to_ascii_lowercase().as_str()))
}

fn parse_coord(raw: Option<&str>, column: &str) -> Result<f64> {
    raw.map(str::trim)
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| Error::InvalidParameter {
            name: "coordinate",
            value: raw.unwrap_or("").to_string(),
            reason: format!("column '{column}' must contain numeric coordinates"),
        })
}

fn parse_attribute(raw: &str) -> AttributeValue {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return AttributeValue::Null;
    }
    if let Ok(v) = trimmed.parse::<i64>() {
        return AttributeValue::Int(v);
    }
    if let Ok(v) = trimmed.parse::<f64>() {
        return AttributeValue::Float(v);
    }
    match trimmed.to_ascii_lowercase().as_str() {
        "true" => AttributeValue::Bool(true),
        "false" => AttributeValue::Bool(false),
        _ => AttributeValue::String(trimmed.to_string()),
    }
}

// ── GeoJSON ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct GeoJsonCollection {
    #[serde(rename = "type")]
    kind: String,
    features: Vec<GeoJsonFeature>,
}

#[derive(Debug, Deserialize)]
struct GeoJsonFeature {
    geometry: Option<GeoJsonGeometry>,
    #[serde(default)]
    properties: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct GeoJsonGeometry {
    #[serde(rename = "type")]
    kind: String,
    // Kept untyped so non-Point geometries fail with a clear error
    // instead of a serde type mismatch
    coordinates: serde_json::Value,
}

impl GeoJsonGeometry {
    fn point_coords(&self) -> Option<(f64, f64)> {
        let arr = self.coordinates.as_array()?;
        if arr.len() < 2 {
            return None;
        }
        Some((arr[0].as_f64()?, arr[1].as_f64()?))
    }
}

/// Read sites from a GeoJSON FeatureCollection of Point features
pub fn read_sites_geojson<P: AsRef<Path>>(path: P) -> Result<SiteCollection> {
    let file = File::open(path.as_ref())?;
    let collection: GeoJsonCollection = serde_json::from_reader(file)?;

    if collection.kind != "FeatureCollection" {
        return Err(Error::InvalidGeoJson(format!(
            "expected FeatureCollection, got {}",
            collection.kind
        )));
    }

    let mut sites = SiteCollection::new();
    for (i, feature) in collection.features.into_iter().enumerate() {
        let geometry = feature
            .geometry
            .ok_or_else(|| Error::InvalidGeoJson(format!("feature {i} has no geometry")))?;
        if geometry.kind != "Point" {
            return Err(Error::InvalidGeoJson(format!(
                "feature {i}: expected Point geometry, got {}",
                geometry.kind
            )));
        }
        let (lon, lat) = geometry.point_coords().ok_or_else(|| {
            Error::InvalidGeoJson(format!("feature {i}: Point needs [lon, lat] coordinates"))
        })?;
        let properties = feature.properties.unwrap_or_default();

        let asset_id = properties
            .get("asset_id")
            .and_then(json_to_id)
            .unwrap_or_else(|| format!("site_{}", i + 1));

        let mut site = Site::new(lon, lat, asset_id);
        for (key, value) in properties {
            if key == "asset_id" {
                continue;
            }
            site.set_attribute(key, json_to_attribute(value));
        }
        sites.push(site);
    }

    Ok(sites)
}

fn json_to_id(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn json_to_attribute(value: serde_json::Value) -> AttributeValue {
    match value {
        serde_json::Value::Null => AttributeValue::Null,
        serde_json::Value::Bool(b) => AttributeValue::Bool(b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                AttributeValue::Int(i)
            } else {
                AttributeValue::Float(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        serde_json::Value::String(s) => AttributeValue::String(s),
        other => AttributeValue::String(other.to_string()),
    }
}
