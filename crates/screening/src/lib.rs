//! # Aquascreen Screening
//!
//! The portfolio screening pipeline: samples elevation, slope, available
//! water capacity (AWC) and CLC2018 land cover at portfolio sites, then
//! classifies groundwater recharge potential and assembles per-site
//! records, a portfolio summary and exports.

pub mod export;
pub mod landcover;
pub mod pipeline;
pub mod recharge;
pub mod summary;

pub use export::{write_records_csv, write_records_geojson};
pub use landcover::{clc_name, decode, LandCover};
pub use pipeline::{
    coverage_report, run_screening, CoverageReport, ScreeningInputs, SiteRecord,
};
pub use recharge::{
    awc_category, classify, confidence, load_thresholds, AwcCategory, Confidence,
    RechargeClass, Thresholds,
};
pub use summary::{render_memo_html, PortfolioSummary};
