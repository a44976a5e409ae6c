//! Runtime configuration from an optional file and `ENGAGEFORGE_*` variables

use crate::exemplar::DEFAULT_TOP_N;
use crate::pipeline::PipelineOptions;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Analytics configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AnalyticsConfig {
    /// Location of the model bundle artifact
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,

    /// Exemplars kept per cluster
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Labeled rows included in the report preview
    #[serde(default = "default_preview_rows")]
    pub preview_rows: usize,
}

fn default_model_path() -> PathBuf {
    PathBuf::from("models/live_pipeline.json")
}

fn default_top_n() -> usize {
    DEFAULT_TOP_N
}

fn default_preview_rows() -> usize {
    100
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            model_path: default_model_path(),
            top_n: default_top_n(),
            preview_rows: default_preview_rows(),
        }
    }
}

impl AnalyticsConfig {
    /// Load configuration; environment variables take precedence over the file.
    ///
    /// A `top_n` of zero is rejected as a configuration error.
    pub fn load(file: Option<&Path>) -> crate::Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path));
        }
        let config = builder
            .add_source(config::Environment::with_prefix("ENGAGEFORGE").try_parsing(true))
            .build()?;

        let loaded: Self = config.try_deserialize()?;
        if loaded.top_n == 0 {
            return Err(config::ConfigError::Message("top_n must be at least 1".to_string()).into());
        }
        Ok(loaded)
    }

    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            top_n: self.top_n,
            preview_rows: self.preview_rows,
        }
    }
}
