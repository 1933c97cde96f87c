//! Groundwater recharge classification.
//!
//! Screening-grade rules over AWC (available water capacity, mm) and
//! slope (percent): flat sites on high-capacity soils recharge well,
//! steep or thin-soiled sites do not. Missing inputs classify as Low
//! (conservative).

use aquascreen_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Class edges for one recharge class
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassEdges {
    /// Minimum AWC in mm
    pub awc_min: f64,
    /// Maximum slope in percent
    pub slope_max: f64,
}

/// Recharge classification thresholds.
///
/// Loaded from a TOML file:
/// ```toml
/// [high]
/// awc_min = 150.0
/// slope_max = 5.0
///
/// [medium]
/// awc_min = 50.0
/// slope_max = 15.0
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub high: ClassEdges,
    pub medium: ClassEdges,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            high: ClassEdges {
                awc_min: 150.0,
                slope_max: 5.0,
            },
            medium: ClassEdges {
                awc_min: 50.0,
                slope_max: 15.0,
            },
        }
    }
}

/// Load thresholds from a TOML file
pub fn load_thresholds<P: AsRef<Path>>(path: P) -> Result<Thresholds> {
    let text = std::fs::read_to_string(path.as_ref())?;
    toml::from_str(&text).map_err(|e| Error::InvalidParameter {
        name: "thresholds",
        value: path.as_ref().display().to_string(),
        reason: e.to_string(),
    })
}

/// Groundwater recharge potential class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RechargeClass {
    High,
    Medium,
    Low,
}

impl fmt::Display for RechargeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RechargeClass::High => write!(f, "High"),
            RechargeClass::Medium => write!(f, "Medium"),
            RechargeClass::Low => write!(f, "Low"),
        }
    }
}

/// AWC category relative to the recharge thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AwcCategory {
    Low,
    Medium,
    High,
    Unknown,
}

impl fmt::Display for AwcCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AwcCategory::Low => write!(f, "Low"),
            AwcCategory::Medium => write!(f, "Medium"),
            AwcCategory::High => write!(f, "High"),
            AwcCategory::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Confidence in a recharge classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Confidence::High => write!(f, "high"),
            Confidence::Medium => write!(f, "medium"),
            Confidence::Low => write!(f, "low"),
        }
    }
}

fn valid(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

/// Classify recharge potential from AWC (mm) and slope (percent).
///
/// Missing either input is Low (conservative). High needs both a
/// high-capacity soil and gentle slope; Medium needs either a medium
/// soil or a moderate slope.
pub fn classify(awc_mm: Option<f64>, slope_percent: Option<f64>, thr: &Thresholds) -> RechargeClass {
    let (Some(a), Some(s)) = (valid(awc_mm), valid(slope_percent)) else {
        return RechargeClass::Low;
    };
    if a > thr.high.awc_min && s < thr.high.slope_max {
        return RechargeClass::High;
    }
    if a >= thr.medium.awc_min || s <= thr.medium.slope_max {
        return RechargeClass::Medium;
    }
    RechargeClass::Low
}

/// Categorise AWC by the same edges the recharge classes use
pub fn awc_category(awc_mm: Option<f64>, thr: &Thresholds) -> AwcCategory {
    let Some(a) = valid(awc_mm) else {
        return AwcCategory::Unknown;
    };
    if a < thr.medium.awc_min {
        AwcCategory::Low
    } else if a < thr.high.awc_min {
        AwcCategory::Medium
    } else {
        AwcCategory::High
    }
}

/// Heuristic classification confidence from the distance of both inputs
/// to their nearest class edge. Missing inputs are Low.
pub fn confidence(
    awc_mm: Option<f64>,
    slope_percent: Option<f64>,
    thr: &Thresholds,
) -> Confidence {
    let (Some(a), Some(s)) = (valid(awc_mm), valid(slope_percent)) else {
        return Confidence::Low;
    };

    let awc_edges = [thr.medium.awc_min, thr.high.awc_min];
    let slope_edges = [thr.high.slope_max, thr.medium.slope_max];

    let awc_margin = awc_edges
        .iter()
        .map(|e| (a - e).abs())
        .fold(f64::INFINITY, f64::min);
    let slope_margin = slope_edges
        .iter()
        .map(|e| (s - e).abs())
        .fold(f64::INFINITY, f64::min);

    if awc_margin >= 30.0 && slope_margin >= 5.0 {
        Confidence::High
    } else if awc_margin >= 10.0 && slope_margin >= 2.0 {
        Confidence::Medium
    } else {
        Confidence::Low
    }
}
