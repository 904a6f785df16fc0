use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};

#[path = "../bands.rs"]
mod bands;
#[path = "../composite.rs"]
mod composite;
#[path = "../config.rs"]
mod config;
#[path = "../export.rs"]
mod export;
#[path = "../planner.rs"]
mod planner;

const USAGE: &str = "usage: slice_probe <out-dir> <image>...";

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args();
    let _bin = args.next();
    let out_dir = args.next().map(PathBuf::from).context(USAGE)?;
    let (files, skipped): (Vec<PathBuf>, Vec<PathBuf>) = args
        .map(PathBuf::from)
        .partition(|p| composite::is_supported_image(p));
    for path in &skipped {
        eprintln!("skipping unsupported file {}", path.display());
    }
    if files.is_empty() {
        anyhow::bail!("no supported images given\n{}", USAGE);
    }

    let app_config = config::AppConfig::load();
    let limits = app_config.limits();

    let t0 = Instant::now();
    let composite = composite::build_composite(&files, limits.canvas_width)
        .context("none of the images could be decoded")?;
    let build_ms = t0.elapsed().as_secs_f64() * 1000.0;

    let selection = bands::BandSet::full(composite.height() as f32);
    let plan = planner::SlicePlan::compute(&selection, limits.max_slice_height);
    let stats =
        planner::SliceStats::from_plan(&plan, limits.max_slice_height, limits.max_images);

    println!("METRIC source_count={}", files.len());
    println!("METRIC composite_height={}", composite.height());
    println!("METRIC composite_build_ms={:.2}", build_ms);
    println!("METRIC output_count={}", stats.output_count);
    if let Some(warning) = stats.warning() {
        anyhow::bail!("{}", warning);
    }

    let target = export::ExportTarget::new(
        &out_dir,
        &app_config.desc_prefix(),
        config::DEFAULT_DESC_PREFIX,
        limits.jpeg_quality,
    );
    let t0 = Instant::now();
    let report = export::export_resliced(&composite, &selection, limits.max_slice_height, &target)
        .with_context(|| format!("export to {} failed", out_dir.display()))?;
    for file in &report.files {
        let rows: Vec<String> = file
            .sources
            .iter()
            .map(|(top, bottom)| format!("{}..{}", top, bottom))
            .collect();
        println!("WROTE {} rows={}", file.path.display(), rows.join(","));
    }
    println!(
        "METRIC export_ms={:.2}",
        t0.elapsed().as_secs_f64() * 1000.0
    );

    Ok(())
}
