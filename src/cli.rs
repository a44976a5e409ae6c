//! Command-line interface definitions and argument parsing

use crate::config::AnalyticsConfig;
use crate::pipeline::PipelineOptions;
use clap::Parser;
use std::path::PathBuf;

/// Cluster-based engagement analytics for social media post exports
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the uploaded posts CSV
    #[arg(short, long)]
    pub input: String,

    /// Path to the model bundle (overrides configuration)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Input already carries cluster_label and dist_centroid; skip inference
    #[arg(long)]
    pub labeled: bool,

    /// Exemplar posts kept per cluster, at least 1 (overrides configuration)
    #[arg(
        short = 'n',
        long,
        value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..)
    )]
    pub top_n: Option<usize>,

    /// Write the full report as JSON
    #[arg(short, long)]
    pub report: Option<String>,

    /// Write the labeled dataset as CSV
    #[arg(short, long)]
    pub export: Option<String>,

    /// Write the engagement scatter PNG (a reactions-by-hour chart is written next to it)
    #[arg(long)]
    pub chart: Option<String>,

    /// Configuration file (TOML, JSON or YAML)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    pub log_json: bool,
}

impl Args {
    /// Model path from the command line, falling back to configuration
    pub fn model_path(&self, config: &AnalyticsConfig) -> PathBuf {
        self.model
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| config.model_path.clone())
    }

    /// Pipeline tunables with command-line overrides applied
    pub fn pipeline_options(&self, config: &AnalyticsConfig) -> PipelineOptions {
        let mut options = config.pipeline_options();
        if let Some(top_n) = self.top_n {
            options.top_n = top_n;
        }
        options
    }

    /// Path of the hourly chart derived from the scatter chart path
    pub fn hour_chart_path(&self) -> Option<String> {
        self.chart.as_ref().map(|path| match path.strip_suffix(".png") {
            Some(stem) => format!("{stem}_hours.png"),
            None => format!("{path}_hours.png"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["engageforge", "--input", "posts.csv"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_overrides() {
        let config = AnalyticsConfig::default();

        let parsed = args(&["--model", "bundle.json", "-n", "5"]);
        assert_eq!(parsed.model_path(&config), PathBuf::from("bundle.json"));
        assert_eq!(parsed.pipeline_options(&config).top_n, 5);

        let parsed = args(&["--labeled"]);
        assert!(parsed.labeled);
        assert_eq!(parsed.pipeline_options(&config).top_n, 3);
    }

    #[test]
    fn test_zero_top_n_rejected_at_parse() {
        let err = Args::try_parse_from(["engageforge", "--input", "posts.csv", "-n", "0"])
            .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);

        let negative = Args::try_parse_from(["engageforge", "--input", "posts.csv", "--top-n", "-2"]);
        assert!(negative.is_err());
        assert_eq!(args(&["--top-n", "1"]).top_n, Some(1));
    }

    #[test]
    fn test_hour_chart_path() {
        assert_eq!(
            args(&["--chart", "out/plot.png"]).hour_chart_path(),
            Some("out/plot_hours.png".to_string())
        );
        assert_eq!(
            args(&["--chart", "plot"]).hour_chart_path(),
            Some("plot_hours.png".to_string())
        );
        assert_eq!(args(&[]).hour_chart_path(), None);
    }

    #[test]
    fn test_input_is_required() {
        assert!(Args::try_parse_from(["engageforge"]).is_err());
    }
}
