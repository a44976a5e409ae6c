//! EngageForge: engagement analytics CLI
//!
//! Entry point that loads an upload, labels it with the model bundle (or
//! reuses stored labels), and writes the report, labeled CSV and charts.

use anyhow::{Context, Result};
use clap::Parser;
use engageforge::{
    viz, AnalyticsConfig, AnalyticsReport, Args, LabeledDataset, ModelBundle, PipelineOptions,
    PostFrame,
};
use std::path::Path;
use std::time::Instant;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args);

    let config = AnalyticsConfig::load(args.config.as_deref().map(Path::new))
        .context("failed to load configuration")?;
    let options = args.pipeline_options(&config);

    let start_time = Instant::now();

    let frame = PostFrame::from_csv(&args.input)
        .with_context(|| format!("failed to load posts from {}", args.input))?;
    println!("✓ Data loaded: {} posts", frame.len());

    let (labeled, report) = if args.labeled {
        run_labeled_mode(&frame, options)?
    } else {
        run_full_pipeline(&args, &config, &frame, options)?
    };

    if let Some(path) = &args.export {
        frame
            .write_labeled_csv(&labeled.labels(), &labeled.distances(), path)
            .with_context(|| format!("failed to export labeled CSV to {path}"))?;
        println!("✓ Labeled dataset saved to: {}", path);
    }

    if let Some(path) = &args.report {
        report
            .write_json(path)
            .with_context(|| format!("failed to write report to {path}"))?;
        println!("✓ Report saved to: {}", path);
    }

    match (&args.chart, args.hour_chart_path()) {
        (Some(scatter_path), Some(hour_path)) => {
            viz::generate_visualization_report(&report, scatter_path, &hour_path)?;
            println!("\nScatter plot saved to: {}", scatter_path);
            println!("Hourly chart saved to: {}", hour_path);
        }
        _ => viz::print_report(&report),
    }

    println!(
        "\nTotal processing time: {:.2}s",
        start_time.elapsed().as_secs_f64()
    );
    Ok(())
}

fn init_tracing(args: &Args) {
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

/// Label the upload with the model bundle, then derive the report
fn run_full_pipeline(
    args: &Args,
    config: &AnalyticsConfig,
    frame: &PostFrame,
    options: PipelineOptions,
) -> Result<(LabeledDataset, AnalyticsReport)> {
    let model_path = args.model_path(config);
    info!(path = %model_path.display(), "loading model bundle");

    let bundle = ModelBundle::global(&model_path)
        .with_context(|| format!("failed to load model bundle {}", model_path.display()))?;

    let (labeled, report) = engageforge::run(frame, &bundle, options)?;
    println!(
        "✓ Inference complete: {} posts in {} clusters",
        labeled.len(),
        report.clusters.len()
    );
    Ok((labeled, report))
}

/// Rebuild the report from stored labels without touching the model
fn run_labeled_mode(
    frame: &PostFrame,
    options: PipelineOptions,
) -> Result<(LabeledDataset, AnalyticsReport)> {
    let labeled = LabeledDataset::from_labeled_frame(frame)?;
    let report = AnalyticsReport::from_labeled(&labeled, options)?;
    println!(
        "✓ Stored labels reused: {} posts in {} clusters",
        labeled.len(),
        report.clusters.len()
    );
    Ok((labeled, report))
}
