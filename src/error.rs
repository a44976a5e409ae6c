//! Error taxonomy for the analytics pipeline

use polars::prelude::PolarsError;
use thiserror::Error;

/// Errors produced while loading the model bundle or analysing a dataset.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// Model artifact missing, unreadable or malformed. Aborts the run.
    #[error("model artifact error: {0}")]
    Artifact(String),

    /// Uploaded dataset lacks a required column or holds an unusable value.
    #[error("schema error: {0}")]
    Schema(String),

    /// A `status_published` value could not be read as a timestamp.
    #[error("unparseable timestamp at row {row}: {value:?}")]
    Parse { row: usize, value: String },

    /// Not enough rows or categories to derive a value.
    #[error("insufficient data: {0}")]
    InsufficientData(String),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("dataframe error: {0}")]
    Frame(#[from] PolarsError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AnalyticsError {
    /// Whether this error only invalidates a single derived value rather than the run.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, AnalyticsError::InsufficientData(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let err = AnalyticsError::Schema("missing required column(s): num_likes".into());
        assert_eq!(
            err.to_string(),
            "schema error: missing required column(s): num_likes"
        );

        let err = AnalyticsError::Parse {
            row: 4,
            value: "yesterday".into(),
        };
        assert_eq!(
            err.to_string(),
            "unparseable timestamp at row 4: \"yesterday\""
        );
    }

    #[test]
    fn only_insufficient_data_is_recoverable() {
        assert!(AnalyticsError::InsufficientData("one type".into()).is_recoverable());
        assert!(!AnalyticsError::Artifact("gone".into()).is_recoverable());
        assert!(!AnalyticsError::Schema("gone".into()).is_recoverable());
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AnalyticsError>();
    }
}
