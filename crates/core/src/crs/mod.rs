//! Coordinate Reference System handling.
//!
//! Pure-Rust WGS84 ↔ UTM transforms (Snyder 1987, USGS formulas), covering
//! EPSG:4326 plus EPSG 326xx (UTM North) and 327xx (UTM South). No external
//! C dependencies (no libproj).

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

// ── WGS84 ellipsoid constants ────────────────────────────────────────────

const A: f64 = 6_378_137.0; // semi-major axis (m)
const F: f64 = 1.0 / 298.257_223_563; // flattening
const E2: f64 = 2.0 * F - F * F; // eccentricity squared
const E_PRIME2: f64 = E2 / (1.0 - E2); // second eccentricity squared
const K0: f64 = 0.9996; // UTM scale factor
const FALSE_EASTING: f64 = 500_000.0;
const FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

/// Metres per degree of latitude (spherical approximation)
const M_PER_DEG_LAT: f64 = 111_320.0;

/// Coordinate Reference System, EPSG-code backed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Crs {
    epsg: u32,
}

impl Crs {
    /// Create a CRS from an EPSG code
    pub fn from_epsg(code: u32) -> Self {
        Self { epsg: code }
    }

    /// WGS84 geographic CRS (EPSG:4326)
    pub fn wgs84() -> Self {
        Self::from_epsg(4326)
    }

    /// Get the EPSG code
    pub fn epsg(&self) -> u32 {
        self.epsg
    }

    /// Whether this CRS uses geographic (degree) coordinates
    pub fn is_geographic(&self) -> bool {
        self.epsg == 4326
    }

    /// Whether this is a supported CRS (WGS84 or a UTM zone)
    pub fn is_supported(&self) -> bool {
        self.is_geographic() || parse_utm_epsg(self.epsg).is_some()
    }

    /// Check if two CRS are equivalent
    pub fn is_equivalent(&self, other: &Crs) -> bool {
        self.epsg == other.epsg
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg)
    }
}

impl Default for Crs {
    fn default() -> Self {
        Self::wgs84()
    }
}

/// Parse an EPSG code into UTM zone info: `Some((zone, is_north))`.
///
/// - EPSG 326xx → zone xx, North hemisphere
/// - EPSG 327xx → zone xx, South hemisphere
pub fn parse_utm_epsg(epsg: u32) -> Option<(u32, bool)> {
    if (32601..=32660).contains(&epsg) {
        Some((epsg - 32600, true))
    } else if (32701..=32760).contains(&epsg) {
        Some((epsg - 32700, false))
    } else {
        None
    }
}

/// Metres per degree of latitude and longitude at the given latitude:
/// `(m_lat, m_lon)` with `m_lat = 111320` and `m_lon = 111320·cos(lat)`.
pub fn metres_per_degree(lat_deg: f64) -> (f64, f64) {
    let m_lat = M_PER_DEG_LAT;
    let m_lon = M_PER_DEG_LAT * lat_deg.to_radians().cos();
    (m_lat, m_lon)
}

/// Transform a point between two supported CRS.
///
/// Supported pairs are identity, WGS84 ↔ UTM, and UTM ↔ UTM (via WGS84).
pub fn transform_point(x: f64, y: f64, from: &Crs, to: &Crs) -> Result<(f64, f64)> {
    if from.is_equivalent(to) {
        return Ok((x, y));
    }

    match (from.is_geographic(), to.is_geographic()) {
        (true, false) => {
            let (zone, north) = parse_utm_epsg(to.epsg())
                .ok_or_else(|| Error::UnsupportedCrs(to.to_string()))?;
            Ok(wgs84_to_utm(x, y, zone, north))
        }
        (false, true) => {
            let (zone, north) = parse_utm_epsg(from.epsg())
                .ok_or_else(|| Error::UnsupportedCrs(from.to_string()))?;
            Ok(utm_to_wgs84(x, y, zone, north))
        }
        (false, false) => {
            let (lon, lat) = transform_point(x, y, from, &Crs::wgs84())?;
            transform_point(lon, lat, &Crs::wgs84(), to)
        }
        (true, true) => Err(Error::UnsupportedCrs(to.to_string())),
    }
}

/// Transform a bounding box between two supported CRS.
///
/// Transforms all four corners and takes the envelope, which handles the
/// non-linear distortion of the UTM projection better than transforming
/// only min/max.
pub fn transform_bounds(
    bounds: (f64, f64, f64, f64),
    from: &Crs,
    to: &Crs,
) -> Result<(f64, f64, f64, f64)> {
    let (min_x, min_y, max_x, max_y) = bounds;
    let corners = [
        (min_x, min_y),
        (min_x, max_y),
        (max_x, min_y),
        (max_x, max_y),
    ];

    let mut out_min_x = f64::MAX;
    let mut out_min_y = f64::MAX;
    let mut out_max_x = f64::MIN;
    let mut out_max_y = f64::MIN;

    for &(x, y) in &corners {
        let (tx, ty) = transform_point(x, y, from, to)?;
        out_min_x = out_min_x.min(tx);
        out_min_y = out_min_y.min(ty);
        out_max_x = out_max_x.max(tx);
        out_max_y = out_max_y.max(ty);
    }

    Ok((out_min_x, out_min_y, out_max_x, out_max_y))
}

// ── Core projection (Snyder 1987, USGS Prof. Paper 1395, pp. 61-64) ─────

/// Convert WGS84 (longitude, latitude) in degrees to UTM (easting, northing)
/// in metres for the given zone and hemisphere.
pub fn wgs84_to_utm(lon_deg: f64, lat_deg: f64, zone: u32, north: bool) -> (f64, f64) {
    let lat = lat_deg.to_radians();
    let lon = lon_deg.to_radians();

    // Central meridian of the zone
    let lon0 = ((zone as f64 - 1.0) * 6.0 - 180.0 + 3.0).to_radians();

    let sin_lat = lat.sin();
    let cos_lat = lat.cos();
    let tan_lat = lat.tan();

    let n = A / (1.0 - E2 * sin_lat * sin_lat).sqrt();
    let t = tan_lat * tan_lat;
    let c = E_PRIME2 * cos_lat * cos_lat;
    let a_coeff = cos_lat * (lon - lon0);

    // Meridional arc length M (Snyder eq. 3-21)
    let m = meridional_arc(lat);

    let a2 = a_coeff * a_coeff;
    let a4 = a2 * a2;
    let a6 = a4 * a2;

    // Easting (Snyder eq. 8-9)
    let easting = K0 * n
        * (a_coeff
            + (1.0 - t + c) * a2 * a_coeff / 6.0
            + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * E_PRIME2) * a4 * a_coeff / 120.0)
        + FALSE_EASTING;

    // Northing (Snyder eq. 8-10)
    let northing = K0
        * (m
            + n * tan_lat
                * (a2 / 2.0
                    + (5.0 - t + 9.0 * c + 4.0 * c * c) * a4 / 24.0
                    + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * E_PRIME2) * a6 / 720.0));

    let northing = if north {
        northing
    } else {
        northing + FALSE_NORTHING_SOUTH
    };

    (easting, northing)
}

/// Convert UTM (easting, northing) in metres to WGS84 (longitude, latitude)
/// in degrees for the given zone and hemisphere.
///
/// Inverse transverse Mercator, Snyder eq. 8-16..8-18 with the footpoint
/// latitude series (eq. 3-26).
pub fn utm_to_wgs84(easting: f64, northing: f64, zone: u32, north: bool) -> (f64, f64) {
    let x = easting - FALSE_EASTING;
    let y = if north {
        northing
    } else {
        northing - FALSE_NORTHING_SOUTH
    };

    let lon0 = ((zone as f64 - 1.0) * 6.0 - 180.0 + 3.0).to_radians();

    // Footpoint latitude (Snyder eq. 7-19, 3-26)
    let m = y / K0;
    let e4 = E2 * E2;
    let e6 = e4 * E2;
    let mu = m / (A * (1.0 - E2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0));

    let e1 = (1.0 - (1.0 - E2).sqrt()) / (1.0 + (1.0 - E2).sqrt());
    let e1_2 = e1 * e1;
    let e1_3 = e1_2 * e1;
    let e1_4 = e1_3 * e1;

    let phi1 = mu
        + (3.0 * e1 / 2.0 - 27.0 * e1_3 / 32.0) * (2.0 * mu).sin()
        + (21.0 * e1_2 / 16.0 - 55.0 * e1_4 / 32.0) * (4.0 * mu).sin()
        + (151.0 * e1_3 / 96.0) * (6.0 * mu).sin()
        + (1097.0 * e1_4 / 512.0) * (8.0 * mu).sin();

    let sin_phi1 = phi1.sin();
    let cos_phi1 = phi1.cos();
    let tan_phi1 = phi1.tan();

    let c1 = E_PRIME2 * cos_phi1 * cos_phi1;
    let t1 = tan_phi1 * tan_phi1;
    let n1 = A / (1.0 - E2 * sin_phi1 * sin_phi1).sqrt();
    let r1 = A * (1.0 - E2) / (1.0 - E2 * sin_phi1 * sin_phi1).powf(1.5);
    let d = x / (n1 * K0);

    let d2 = d * d;
    let d3 = d2 * d;
    let d4 = d3 * d;
    let d5 = d4 * d;
    let d6 = d5 * d;

    // Latitude (Snyder eq. 8-17)
    let lat = phi1
        - (n1 * tan_phi1 / r1)
            * (d2 / 2.0
                - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * E_PRIME2) * d4 / 24.0
                + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1
                    - 252.0 * E_PRIME2
                    - 3.0 * c1 * c1)
                    * d6
                    / 720.0);

    // Longitude (Snyder eq. 8-18)
    let lon = lon0
        + (d - (1.0 + 2.0 * t1 + c1) * d3 / 6.0
            + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * E_PRIME2 + 24.0 * t1 * t1)
                * d5
                / 120.0)
            / cos_phi1;

    (lon.to_degrees(), lat.to_degrees())
}

/// Meridional arc from equator to latitude `lat` (radians).
/// Snyder eq. 3-21.
fn meridional_arc(lat: f64) -> f64 {
    let e2 = E2;
    let e4 = e2 * e2;
    let e6 = e4 * e2;

    A * ((1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * lat
        - (3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * lat).sin()
        + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * lat).sin()
        - (35.0 * e6 / 3072.0) * (6.0 * lat).sin())
}

// ── Tests ────────────────────────────────────────────────────────────────
