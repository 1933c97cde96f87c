//! Portfolio-level summary and the HTML screening memo.

use std::collections::HashMap;
use std::fmt;

use crate::pipeline::SiteRecord;
use crate::recharge::RechargeClass;

/// Aggregated view over a set of screened site records
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioSummary {
    pub n_sites: usize,
    pub pct_low: f64,
    pub pct_medium: f64,
    pub pct_high: f64,
    pub water_stress_count: usize,
    pub near_water_count: usize,
    pub dominant_land_cover: String,
    /// `"precomputed"` when any record used the slope raster
    pub slope_quality: &'static str,
    pub dem_nodata_count: usize,
    pub awc_nodata_count: usize,
}

impl PortfolioSummary {
    pub fn from_records(records: &[SiteRecord]) -> Self {
        let n = records.len();
        let pct = |class: RechargeClass| {
            if n == 0 {
                0.0
            } else {
                records.iter().filter(|r| r.recharge_class == class).count() as f64 / n as f64
                    * 100.0
            }
        };

        let mut cover_counts: HashMap<&str, usize> = HashMap::new();
        for r in records {
            *cover_counts.entry(r.land_cover_name).or_insert(0) += 1;
        }
        // Deterministic mode: highest count, name order breaks ties
        let dominant_land_cover = cover_counts
            .into_iter()
            .max_by(|(na, ca), (nb, cb)| ca.cmp(cb).then(nb.cmp(na)))
            .map(|(name, _)| name.to_string())
            .unwrap_or_else(|| "Unknown".to_string());

        let slope_quality = if records.iter().any(|r| r.slope_quality == "precomputed") {
            "precomputed"
        } else {
            "approx"
        };

        Self {
            n_sites: n,
            pct_low: pct(RechargeClass::Low),
            pct_medium: pct(RechargeClass::Medium),
            pct_high: pct(RechargeClass::High),
            water_stress_count: records.iter().filter(|r| r.water_stress_flag).count(),
            near_water_count: records.iter().filter(|r| r.near_water).count(),
            dominant_land_cover,
            slope_quality,
            dem_nodata_count: records.iter().filter(|r| r.dem_nodata_flag).count(),
            awc_nodata_count: records.iter().filter(|r| r.awc_nodata_flag).count(),
        }
    }
}

impl fmt::Display for PortfolioSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Portfolio Water Summary")?;
        writeln!(f, "- Sites analyzed: {}", self.n_sites)?;
        writeln!(
            f,
            "- Recharge classes: {:.0}% Low, {:.0}% Medium, {:.0}% High",
            self.pct_low, self.pct_medium, self.pct_high
        )?;
        writeln!(f, "- Water stress flags: {} site(s)", self.water_stress_count)?;
        writeln!(f, "- Near water (CLC water): {} site(s)", self.near_water_count)?;
        writeln!(f, "- Dominant land cover: {}", self.dominant_land_cover)?;
        writeln!(f, "- Slope quality: {}", self.slope_quality)?;
        writeln!(f, "- DEM nodata: {} site(s)", self.dem_nodata_count)?;
        write!(f, "- AWC nodata: {} site(s)", self.awc_nodata_count)
    }
}

/// Render the self-contained HTML screening memo
pub fn render_memo_html(records: &[SiteRecord]) -> String {
    let s = PortfolioSummary::from_records(records);
    let slope_lineage = if s.slope_quality == "precomputed" {
        "precomputed slope raster (preferred)"
    } else {
        "3x3 DEM window (approx)"
    };
    format!(
        r#"<!doctype html>
<html><head><meta charset="utf-8"><title>Water Screening Memo</title>
<style>
body {{ font-family: system-ui, -apple-system, Segoe UI, Roboto, sans-serif; margin: 24px; color: #222; }}
.badge {{ display:inline-block; padding:4px 8px; border-radius:8px; background:#eef; margin-right:6px; }}
.section {{ margin-top: 18px; }}
ul {{ margin-top: 6px; }}
</style></head>
<body>
<h1>Water Screening Memo</h1>
<div class="section">
  <div class="badge">Sites: {n}</div>
  <div class="badge">Low: {low:.0}%</div>
  <div class="badge">Medium: {med:.0}%</div>
  <div class="badge">High: {high:.0}%</div>
  <div class="badge">Stress flags: {stress}</div>
  <div class="badge">Near water: {near_water}</div>
  <div class="badge">Slope: {slope_q}</div>
</div>
<div class="section">
  <h2>Executive Summary</h2>
  <ul>
    <li>Dominant land cover: <b>{dom_lc}</b></li>
    <li>{low:.0}% of sites classify as <b>Low recharge</b> (screening-grade)</li>
    <li>{stress} site(s) flagged for potential <b>water stress</b> (high use on low recharge)</li>
  </ul>
</div>
<div class="section">
  <h2>Data Lineage &amp; Assumptions</h2>
  <ul>
    <li><b>Slope:</b> {slope_lineage}.</li>
    <li><b>AWC &amp; CLC sampling:</b> nearest pixel; screening-grade only.</li>
    <li><b>Scope:</b> No watershed delineation / ET / water balance in this screening tier.</li>
  </ul>
</div>
</body></html>"#,
        n = s.n_sites,
        low = s.pct_low,
        med = s.pct_medium,
        high = s.pct_high,
        stress = s.water_stress_count,
        near_water = s.near_water_count,
        slope_q = s.slope_quality,
        dom_lc = s.dominant_land_cover,
        slope_lineage = slope_lineage,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recharge::{AwcCategory, Confidence};

    fn record(
        id: &str,
        class: RechargeClass,
        cover: &'static str,
        stress: bool,
        quality: &str,
    ) -> SiteRecord {
        SiteRecord {
            asset_id: id.to_string(),
            longitude: 0.0,
            latitude: 0.0,
            elevation_m: Some(100.0),
            slope_percent: Some(5.0),
            awc_mm: Some(100.0),
            land_cover_code: Some(231),
            land_cover_name: cover,
            near_water: cover == "Water bodies",
            near_wetland: false,
            recharge_class: class,
            awc_category: AwcCategory::Medium,
            recharge_confidence: Confidence::Medium,
            slope_quality: quality.to_string(),
            water_stress_flag: stress,
            dem_nodata_flag: false,
            awc_nodata_flag: false,
        }
    }

    #[test]
    fn summary_aggregates() {
        let records = vec![
            record("a", RechargeClass::Low, "Pastures", true, "approx"),
            record("b", RechargeClass::Low, "Pastures", false, "approx"),
            record("c", RechargeClass::Medium, "Water bodies", false, "approx"),
            record("d", RechargeClass::High, "Pastures", false, "approx"),
        ];
        let s = PortfolioSummary::from_records(&records);

        assert_eq!(s.n_sites, 4);
        assert_eq!(s.pct_low, 50.0);
        assert_eq!(s.pct_medium, 25.0);
        assert_eq!(s.pct_high, 25.0);
        assert_eq!(s.water_stress_count, 1);
        assert_eq!(s.near_water_count, 1);
        assert_eq!(s.dominant_land_cover, "Pastures");
        assert_eq!(s.slope_quality, "approx");
    }

    #[test]
    fn summary_of_empty_portfolio() {
        let s = PortfolioSummary::from_records(&[]);
        assert_eq!(s.n_sites, 0);
        assert_eq!(s.pct_low, 0.0);
        assert_eq!(s.dominant_land_cover, "Unknown");
    }

    #[test]
    fn precomputed_quality_wins() {
        let records = vec![
            record("a", RechargeClass::Low, "Pastures", false, "approx"),
            record("b", RechargeClass::Low, "Pastures", false, "precomputed"),
        ];
        let s = PortfolioSummary::from_records(&records);
        assert_eq!(s.slope_quality, "precomputed");
    }

    #[test]
    fn display_block() {
        let records = vec![record("a", RechargeClass::Low, "Pastures", true, "approx")];
        let text = PortfolioSummary::from_records(&records).to_string();
        assert!(text.starts_with("Portfolio Water Summary"));
        assert!(text.contains("- Sites analyzed: 1"));
        assert!(text.contains("100% Low"));
        assert!(text.contains("- Water stress flags: 1 site(s)"));
    }

    #[test]
    fn memo_html_contains_sections() {
        let records = vec![record("a", RechargeClass::Low, "Pastures", true, "precomputed")];
        let html = render_memo_html(&records);
        assert!(html.contains("<title>Water Screening Memo</title>"));
        assert!(html.contains("Executive Summary"));
        assert!(html.contains("Data Lineage"));
        assert!(html.contains("precomputed slope raster (preferred)"));
        assert!(html.contains("Sites: 1"));
    }
}
