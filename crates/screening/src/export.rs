//! Screened-record exports: CSV and GeoJSON.

use aquascreen_core::{Error, Result};
use serde_json::{json, Value};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::pipeline::SiteRecord;

/// Write screened records as CSV, one row per site
pub fn write_records_csv<P: AsRef<Path>>(path: P, records: &[SiteRecord]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path.as_ref())?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write screened records as a WGS84 GeoJSON FeatureCollection.
///
/// Every record field lands in the feature's properties; the geometry is
/// the site's point location.
pub fn write_records_geojson<P: AsRef<Path>>(path: P, records: &[SiteRecord]) -> Result<()> {
    let features: Vec<Value> = records
        .iter()
        .map(|record| {
            let properties = serde_json::to_value(record)?;
            Ok(json!({
                "type": "Feature",
                "geometry": {
                    "type": "Point",
                    "coordinates": [record.longitude, record.latitude],
                },
                "properties": properties,
            }))
        })
        .collect::<Result<_>>()?;

    let collection = json!({
        "type": "FeatureCollection",
        "features": features,
    });

    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &collection)
        .map_err(Error::Json)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recharge::{AwcCategory, Confidence, RechargeClass};

    fn sample_record() -> SiteRecord {
        SiteRecord {
            asset_id: "A1".to_string(),
            longitude: -3.7045,
            latitude: 40.4145,
            elevation_m: Some(420.0),
            slope_percent: Some(3.5),
            awc_mm: None,
            land_cover_code: Some(231),
            land_cover_name: "Pastures",
            near_water: false,
            near_wetland: false,
            recharge_class: RechargeClass::Low,
            awc_category: AwcCategory::Unknown,
            recharge_confidence: Confidence::Low,
            slope_quality: "approx".to_string(),
            water_stress_flag: false,
            dem_nodata_flag: false,
            awc_nodata_flag: true,
        }
    }

    #[test]
    fn csv_roundtrip_headers_and_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.csv");
        write_records_csv(&path, &[sample_record()]).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert!(headers.iter().any(|h| h == "asset_id"));
        assert!(headers.iter().any(|h| h == "recharge_class"));
        assert!(headers.iter().any(|h| h == "awc_nodata_flag"));

        let row = reader.records().next().unwrap().unwrap();
        let field = |name: &str| {
            let i = headers.iter().position(|h| h == name).unwrap();
            row.get(i).unwrap().to_string()
        };
        assert_eq!(field("asset_id"), "A1");
        assert_eq!(field("recharge_class"), "Low");
        assert_eq!(field("recharge_confidence"), "low");
        assert_eq!(field("awc_mm"), "");
        assert_eq!(field("awc_nodata_flag"), "true");
    }

    #[test]
    fn geojson_structure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.geojson");
        write_records_geojson(&path, &[sample_record()]).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["type"], "FeatureCollection");

        let feature = &value["features"][0];
        assert_eq!(feature["geometry"]["type"], "Point");
        assert_eq!(feature["geometry"]["coordinates"][0], -3.7045);
        assert_eq!(feature["properties"]["asset_id"], "A1");
        assert_eq!(feature["properties"]["recharge_class"], "Low");
        assert_eq!(feature["properties"]["awc_mm"], Value::Null);
    }
}
