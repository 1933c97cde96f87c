//! Portfolio site model: point locations with attributes.

use geo_types::Point;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Attribute value types carried alongside a site
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl AttributeValue {
    /// Interpret the value as a float where possible
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Int(v) => Some(*v as f64),
            AttributeValue::Float(v) => Some(*v),
            AttributeValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

/// A portfolio site: a WGS84 point location with an asset id and attributes.
#[derive(Debug, Clone)]
pub struct Site {
    /// Location in WGS84 (longitude, latitude)
    pub location: Point<f64>,
    /// Asset identifier (autogenerated as `site_N` when absent from input)
    pub asset_id: String,
    /// Remaining input columns/properties
    pub attributes: HashMap<String, AttributeValue>,
}

impl Site {
    /// Create a site at (lon, lat) with the given asset id
    pub fn new(lon: f64, lat: f64, asset_id: impl Into<String>) -> Self {
        Self {
            location: Point::new(lon, lat),
            asset_id: asset_id.into(),
            attributes: HashMap::new(),
        }
    }

    /// Longitude in degrees
    pub fn lon(&self) -> f64 {
        self.location.x()
    }

    /// Latitude in degrees
    pub fn lat(&self) -> f64 {
        self.location.y()
    }

    /// Set an attribute
    pub fn set_attribute(&mut self, key: impl Into<String>, value: AttributeValue) {
        self.attributes.insert(key.into(), value);
    }

    /// Get an attribute
    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.get(key)
    }

    /// Get an attribute as a float, if present and numeric
    pub fn attribute_f64(&self, key: &str) -> Option<f64> {
        self.attributes.get(key).and_then(AttributeValue::as_f64)
    }
}

/// Collection of portfolio sites
#[derive(Debug, Clone, Default)]
pub struct SiteCollection {
    pub sites: Vec<Site>,
}

impl SiteCollection {
    pub fn new() -> Self {
        Self { sites: Vec::new() }
    }

    pub fn push(&mut self, site: Site) {
        self.sites.push(site);
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Site> {
        self.sites.iter()
    }

    /// All site coordinates as (lon, lat) pairs
    pub fn coords(&self) -> Vec<(f64, f64)> {
        self.sites.iter().map(|s| (s.lon(), s.lat())).collect()
    }
}

impl IntoIterator for SiteCollection {
    type Item = Site;
    type IntoIter = std::vec::IntoIter<Site>;

    fn into_iter(self) -> Self::IntoIter {
        self.sites.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_site_attributes() {
        let mut site = Site::new(-3.7, 40.4, "A1");
        site.set_attribute("water_use_m3y", AttributeValue::Float(1200.0));
        site.set_attribute("name", AttributeValue::String("Depot".into()));

        assert_eq!(site.attribute_f64("water_use_m3y"), Some(1200.0));
        assert_eq!(site.attribute_f64("name"), None);
        assert_eq!(site.attribute_f64("missing"), None);
    }

    #[test]
    fn test_numeric_string_attribute() {
        let mut site = Site::new(0.0, 0.0, "A1");
        site.set_attribute("water_use_m3y", AttributeValue::String("350.5".into()));
        assert_eq!(site.attribute_f64("water_use_m3y"), Some(350.5));
    }

    #[test]
    fn test_collection_coords() {
        let mut sites = SiteCollection::new();
        sites.push(Site::new(1.0, 2.0, "a"));
        sites.push(Site::new(3.0, 4.0, "b"));
        assert_eq!(sites.coords(), vec![(1.0, 2.0), (3.0, 4.0)]);
    }
}
