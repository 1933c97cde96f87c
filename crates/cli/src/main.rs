//! Aquascreen CLI - DEM preprocessing and portfolio water screening

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use aquascreen_core::crs::{self, Crs};
use aquascreen_core::io::{read_geotiff, read_sites, read_sites_csv, write_geotiff};
use aquascreen_core::{Raster, SiteCollection};
use aquascreen_screening::{
    coverage_report, load_thresholds, render_memo_html, run_screening, write_records_csv,
    write_records_geojson, PortfolioSummary, ScreeningInputs, Thresholds,
};
use aquascreen_terrain::convert::ConvertParams;
use aquascreen_terrain::sample::{Resampling, Wgs84Sampler};
use aquascreen_terrain::slope::{slope, SlopeParams, SlopeUnits};
use aquascreen_terrain::warp::{warp, WarpParams};
use aquascreen_terrain::convert_slope_units;

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "aquascreen")]
#[command(author, version, about = "DEM preprocessing and portfolio water screening", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about a raster file
    Info {
        /// Input raster file
        input: PathBuf,
    },
    /// Calculate slope from a DEM
    Slope {
        /// Input DEM file
        input: PathBuf,
        /// Output file
        output: PathBuf,
        /// Output units: degrees, percent, radians
        #[arg(short, long, default_value = "degrees")]
        units: String,
        /// Z-factor for unit conversion
        #[arg(short, long, default_value = "1.0")]
        z_factor: f64,
        /// Clamp the window at raster borders instead of writing nodata
        #[arg(long)]
        compute_edges: bool,
    },
    /// Convert a slope raster between units
    Convert {
        /// Input slope raster
        input: PathBuf,
        /// Output file
        output: PathBuf,
        /// Units of the input raster: degrees, percent, radians
        #[arg(long, default_value = "degrees")]
        from: String,
        /// Units of the output raster: degrees, percent, radians
        #[arg(long, default_value = "percent")]
        to: String,
        /// Explicit output nodata value
        #[arg(long)]
        nodata: Option<f64>,
    },
    /// Reproject a raster
    Warp {
        /// Input raster
        input: PathBuf,
        /// Output file
        output: PathBuf,
        /// Target CRS, e.g. EPSG:4326
        #[arg(long, default_value = "EPSG:4326")]
        t_srs: String,
        /// Resampling: bilinear, nearest
        #[arg(short, long, default_value = "bilinear")]
        resampling: String,
    },
    /// Preprocess a DEM into slope rasters (degrees + percent)
    Precompute {
        /// Input DEM file
        dem: PathBuf,
        /// Output directory
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
        /// Also reproject the percent raster, e.g. EPSG:4326
        #[arg(long)]
        reproject_to: Option<String>,
    },
    /// Screen a site portfolio against DEM, AWC and land-cover rasters
    Screen {
        /// Sites file (CSV or GeoJSON)
        #[arg(long)]
        sites: PathBuf,
        /// DEM raster
        #[arg(long)]
        dem: PathBuf,
        /// Available water capacity raster (mm)
        #[arg(long)]
        awc: PathBuf,
        /// CLC2018 land-cover raster
        #[arg(long)]
        clc: PathBuf,
        /// Precomputed slope raster in percent (optional)
        #[arg(long)]
        slope: Option<PathBuf>,
        /// Recharge thresholds TOML (defaults built in)
        #[arg(long)]
        thresholds: Option<PathBuf>,
        /// Write screened records as CSV
        #[arg(long)]
        out_csv: Option<PathBuf>,
        /// Write screened records as GeoJSON
        #[arg(long)]
        out_geojson: Option<PathBuf>,
        /// Write the HTML screening memo
        #[arg(long)]
        memo: Option<PathBuf>,
    },
    /// DEM sampling diagnostics for a site list
    Probe {
        /// Sites CSV with latitude/longitude columns
        #[arg(long)]
        sites: PathBuf,
        /// DEM raster
        #[arg(long)]
        dem: PathBuf,
        /// Write the probe report as JSON
        #[arg(long)]
        report: Option<PathBuf>,
        /// Probe at most N sites
        #[arg(long)]
        limit: Option<usize>,
    },
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn read_raster(path: &PathBuf) -> Result<Raster<f64>> {
    let pb = spinner("Reading raster...");
    let raster: Raster<f64> = read_geotiff(path, None)
        .with_context(|| format!("Failed to read raster: {}", path.display()))?;
    pb.finish_and_clear();
    info!("Input: {} x {}", raster.cols(), raster.rows());
    Ok(raster)
}

fn write_result(raster: &Raster<f64>, path: &PathBuf) -> Result<()> {
    let pb = spinner("Writing output...");
    write_geotiff(raster, path, None)
        .with_context(|| format!("Failed to write output: {}", path.display()))?;
    pb.finish_and_clear();
    Ok(())
}

fn done(name: &str, path: &PathBuf, elapsed: std::time::Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

fn parse_units(s: &str) -> SlopeUnits {
    match s.to_lowercase().as_str() {
        "degrees" | "deg" | "d" => SlopeUnits::Degrees,
        "percent" | "pct" | "%" => SlopeUnits::Percent,
        "radians" | "rad" | "r" => SlopeUnits::Radians,
        _ => {
            eprintln!("Unknown units: {}. Using degrees.", s);
            SlopeUnits::Degrees
        }
    }
}

fn parse_resampling(s: &str) -> Resampling {
    match s.to_lowercase().as_str() {
        "bilinear" | "b" => Resampling::Bilinear,
        "nearest" | "near" | "n" => Resampling::Nearest,
        _ => {
            eprintln!("Unknown resampling: {}. Using bilinear.", s);
            Resampling::Bilinear
        }
    }
}

fn parse_epsg(s: &str) -> Result<Crs> {
    let trimmed = s.trim();
    let code = trimmed
        .strip_prefix("EPSG:")
        .or_else(|| trimmed.strip_prefix("epsg:"))
        .unwrap_or(trimmed);
    let code: u32 = code
        .parse()
        .with_context(|| format!("Invalid CRS: {} (expected EPSG:<code>)", s))?;
    Ok(Crs::from_epsg(code))
}

fn file_stem(path: &PathBuf) -> Result<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(|s| s.to_string())
        .with_context(|| format!("Cannot derive a file stem from: {}", path.display()))
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        // ── Info ─────────────────────────────────────────────────────
        Commands::Info { input } => {
            let raster = read_raster(&input)?;
            let (rows, cols) = raster.shape();
            let bounds = raster.bounds();
            let stats = raster.statistics();

            println!("File: {}", input.display());
            println!("Dimensions: {} x {} ({} cells)", cols, rows, raster.len());
            println!("Cell size: {}", raster.cell_size());
            println!("GeoTransform: {:?}", raster.transform().to_gdal());
            println!(
                "Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
                bounds.0, bounds.1, bounds.2, bounds.3
            );
            if let Some(crs) = raster.crs() {
                println!("CRS: {}", crs);
            }
            if let Some(nodata) = raster.nodata() {
                println!("NoData: {}", nodata);
            }
            println!("\nStatistics:");
            if let Some(min) = stats.min {
                println!("  Min: {:.4}", min);
            }
            if let Some(max) = stats.max {
                println!("  Max: {:.4}", max);
            }
            if let Some(mean) = stats.mean {
                println!("  Mean: {:.4}", mean);
            }
            println!(
                "  Valid cells: {} ({:.1}%)",
                stats.valid_count,
                100.0 * stats.valid_count as f64 / raster.len() as f64
            );
        }

        // ── Slope ────────────────────────────────────────────────────
        Commands::Slope {
            input,
            output,
            units,
            z_factor,
            compute_edges,
        } => {
            let units = parse_units(&units);
            let dem = read_raster(&input)?;
            let start = Instant::now();
            let result = slope(
                &dem,
                SlopeParams {
                    units,
                    z_factor,
                    compute_edges,
                },
            )
            .context("Failed to calculate slope")?;
            let elapsed = start.elapsed();
            write_result(&result, &output)?;
            done("Slope", &output, elapsed);
        }

        // ── Convert ──────────────────────────────────────────────────
        Commands::Convert {
            input,
            output,
            from,
            to,
            nodata,
        } => {
            let raster = read_raster(&input)?;
            let start = Instant::now();
            let result = convert_slope_units(
                &raster,
                ConvertParams {
                    from: parse_units(&from),
                    to: parse_units(&to),
                    output_nodata: nodata,
                },
            )
            .context("Failed to convert slope units")?;
            let elapsed = start.elapsed();
            write_result(&result, &output)?;
            done("Converted slope", &output, elapsed);
        }

        // ── Warp ─────────────────────────────────────────────────────
        Commands::Warp {
            input,
            output,
            t_srs,
            resampling,
        } => {
            let raster = read_raster(&input)?;
            let start = Instant::now();
            let result = warp(
                &raster,
                WarpParams {
                    target_crs: parse_epsg(&t_srs)?,
                    resampling: parse_resampling(&resampling),
                    target_cell_size: None,
                },
            )
            .context("Failed to warp raster")?;
            let elapsed = start.elapsed();
            write_result(&result, &output)?;
            done("Warped raster", &output, elapsed);
        }

        // ── Precompute ───────────────────────────────────────────────
        Commands::Precompute {
            dem,
            out_dir,
            reproject_to,
        } => {
            std::fs::create_dir_all(&out_dir)
                .with_context(|| format!("Cannot create output dir: {}", out_dir.display()))?;
            let stem = file_stem(&dem)?;
            let raster = read_raster(&dem)?;
            let start = Instant::now();

            // 1) slope in degrees, edges included (gdaldem -compute_edges)
            info!("Computing slope (degrees)");
            let deg = slope(
                &raster,
                SlopeParams {
                    units: SlopeUnits::Degrees,
                    z_factor: 1.0,
                    compute_edges: true,
                },
            )
            .context("Failed to calculate slope")?;
            let deg_path = out_dir.join(format!("{}_slope_deg.tif", stem));
            write_result(&deg, &deg_path)?;
            info!("Slope (degrees): {}", deg_path.display());

            // 2) percent conversion, nodata 0
            info!("Converting to percent");
            let pct = convert_slope_units(
                &deg,
                ConvertParams {
                    from: SlopeUnits::Degrees,
                    to: SlopeUnits::Percent,
                    output_nodata: Some(0.0),
                },
            )
            .context("Failed to convert slope units")?;
            let pct_path = out_dir.join(format!("{}_slope_pct.tif", stem));
            write_result(&pct, &pct_path)?;
            info!("Slope (percent): {}", pct_path.display());

            // 3) optional reprojection
            if let Some(target) = reproject_to {
                let target_crs = parse_epsg(&target)?;
                info!("Reprojecting percent raster to {}", target_crs);
                let reproj = warp(
                    &pct,
                    WarpParams {
                        target_crs,
                        resampling: Resampling::Bilinear,
                        target_cell_size: None,
                    },
                )
                .context("Failed to reproject slope raster")?;
                let reproj_path =
                    out_dir.join(format!("{}_slope_pct_EPSG_{}.tif", stem, target_crs.epsg()));
                write_result(&reproj, &reproj_path)?;
                println!("Slope raster (percent, reprojected): {}", reproj_path.display());
            } else {
                println!("Slope raster (percent): {}", pct_path.display());
            }
            println!("  Processing time: {:.2?}", start.elapsed());
        }

        // ── Screen ───────────────────────────────────────────────────
        Commands::Screen {
            sites,
            dem,
            awc,
            clc,
            slope: slope_path,
            thresholds,
            out_csv,
            out_geojson,
            memo,
        } => {
            let portfolio = load_portfolio(&sites)?;
            info!("Loaded {} site(s)", portfolio.len());

            let thresholds = match thresholds {
                Some(path) => load_thresholds(&path)
                    .with_context(|| format!("Failed to load thresholds: {}", path.display()))?,
                None => Thresholds::default(),
            };

            let dem = read_raster(&dem)?;
            let awc = read_raster(&awc)?;
            let clc = read_raster(&clc)?;
            let slope_raster = match &slope_path {
                Some(path) => Some(read_raster(path)?),
                None => None,
            };

            // Bounds-only preflight before any sampling
            let coverage = coverage_report(&portfolio, &dem).context("Coverage preflight failed")?;
            if coverage.n_inside_bounds < coverage.n_total {
                warn!(
                    "{} of {} site(s) fall outside the DEM extent",
                    coverage.n_total - coverage.n_inside_bounds,
                    coverage.n_total
                );
            }

            let inputs = ScreeningInputs {
                dem: &dem,
                awc: &awc,
                clc: &clc,
                slope: slope_raster.as_ref(),
            };

            let pb = spinner("Screening sites...");
            let start = Instant::now();
            let records =
                run_screening(&portfolio, &inputs, &thresholds).context("Screening failed")?;
            let elapsed = start.elapsed();
            pb.finish_and_clear();

            println!("{}", PortfolioSummary::from_records(&records));
            println!("  Processing time: {:.2?}", elapsed);

            if let Some(path) = out_csv {
                write_records_csv(&path, &records)
                    .with_context(|| format!("Failed to write CSV: {}", path.display()))?;
                println!("Records saved to: {}", path.display());
            }
            if let Some(path) = out_geojson {
                write_records_geojson(&path, &records)
                    .with_context(|| format!("Failed to write GeoJSON: {}", path.display()))?;
                println!("Records saved to: {}", path.display());
            }
            if let Some(path) = memo {
                std::fs::write(&path, render_memo_html(&records))
                    .with_context(|| format!("Failed to write memo: {}", path.display()))?;
                println!("Memo saved to: {}", path.display());
            }
        }

        // ── Probe ────────────────────────────────────────────────────
        Commands::Probe {
            sites,
            dem,
            report,
            limit,
        } => {
            let mut portfolio = read_sites_csv(&sites)
                .with_context(|| format!("Failed to read sites: {}", sites.display()))?;
            if let Some(n) = limit {
                portfolio.sites.truncate(n);
            }
            let dem = read_raster(&dem)?;
            run_probe(&portfolio, &dem, report.as_deref())?;
        }
    }

    Ok(())
}

fn load_portfolio(path: &PathBuf) -> Result<SiteCollection> {
    read_sites(path).with_context(|| format!("Failed to read sites: {}", path.display()))
}

/// DEM sampling diagnostics: compares direct source-CRS samples with the
/// WGS84 sampling path and reports how many distinct cells the sites hit.
fn run_probe(
    portfolio: &SiteCollection,
    dem: &Raster<f64>,
    report_path: Option<&std::path::Path>,
) -> Result<()> {
    let dem_crs = dem.crs().copied().unwrap_or_else(Crs::wgs84);
    let transform = dem.transform();
    let (rows, cols) = dem.shape();

    println!("DEM metadata");
    println!("  CRS: {}", dem_crs);
    println!(
        "  Resolution: ({}, {})",
        transform.pixel_width, transform.pixel_height
    );
    println!("  Size: {} x {}", cols, rows);
    match dem.nodata() {
        Some(nd) => println!("  NoData: {}", nd),
        None => println!("  NoData: none"),
    }

    // A) direct sample in the source CRS
    let mut direct: Vec<Option<f64>> = Vec::with_capacity(portfolio.len());
    for site in portfolio.iter() {
        let sample = crs::transform_point(site.lon(), site.lat(), &Crs::wgs84(), &dem_crs)
            .ok()
            .and_then(|(x, y)| dem.sample_nearest(x, y));
        direct.push(sample);
    }

    // B) the WGS84 bilinear path the screening pipeline uses
    let sampler = Wgs84Sampler::new(dem).context("DEM not usable for WGS84 sampling")?;
    let mut via_wgs84: Vec<Option<f64>> = Vec::with_capacity(portfolio.len());
    let mut cells: Vec<Option<(i64, i64)>> = Vec::with_capacity(portfolio.len());
    for site in portfolio.iter() {
        via_wgs84.push(sampler.value_at(site.lon(), site.lat(), Resampling::Bilinear));
        let cell = crs::transform_point(site.lon(), site.lat(), &Crs::wgs84(), &dem_crs)
            .ok()
            .map(|(x, y)| {
                let (col_f, row_f) = dem.geo_to_pixel(x, y);
                (row_f.floor() as i64, col_f.floor() as i64)
            });
        cells.push(cell);
    }

    let unique_f64 = |values: &[Option<f64>]| {
        values
            .iter()
            .map(|v| v.map(f64::to_bits))
            .collect::<HashSet<_>>()
            .len()
    };
    let unique_direct = unique_f64(&direct);
    let unique_wgs84 = unique_f64(&via_wgs84);
    let unique_cells = cells.iter().collect::<HashSet<_>>().len();

    let head = |values: &[Option<f64>]| values.iter().take(10).copied().collect::<Vec<_>>();
    println!("Direct sample (source CRS), first 10: {:?}", head(&direct));
    println!("  Unique values: {}", unique_direct);
    println!("WGS84-path sample, first 10: {:?}", head(&via_wgs84));
    println!("  Unique values: {}", unique_wgs84);
    println!("Unique (row,col) hits: {} of {}", unique_cells, cells.len());

    if unique_cells == 1 && portfolio.len() > 1 {
        warn!("All sites hit the same DEM cell; check site coordinates and DEM extent");
    }
    if unique_direct == 1 && unique_wgs84 == 1 {
        warn!("Samples are constant; the DEM may be flat, nodata-filled, or sites duplicated");
    }

    if let Some(path) = report_path {
        let report = serde_json::json!({
            "dem": {
                "crs": dem_crs.to_string(),
                "resolution": [transform.pixel_width, transform.pixel_height],
                "width": cols,
                "height": rows,
                "nodata": dem.nodata(),
            },
            "n_sites": portfolio.len(),
            "direct_samples": direct,
            "wgs84_samples": via_wgs84,
            "cells": cells,
            "unique_direct_values": unique_direct,
            "unique_wgs84_values": unique_wgs84,
            "unique_cells": unique_cells,
        });
        std::fs::write(path, serde_json::to_string_pretty(&report)?)
            .with_context(|| format!("Failed to write report: {}", path.display()))?;
        println!("Report saved to: {}", path.display());
    }

    Ok(())
}
