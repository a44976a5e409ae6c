//! EngageForge: cluster-based engagement analytics for social media posts
//!
//! An uploaded export of post metrics is projected through a pre-trained
//! scaler/PCA/K-Means bundle, labeled with behavioral clusters, and summarised
//! into KPIs, exemplar posts and recommendations.

pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod exemplar;
pub mod inference;
pub mod kpi;
pub mod model;
pub mod pipeline;
pub mod recommend;
pub mod viz;

// Re-export public items for easier access
pub use cli::Args;
pub use config::AnalyticsConfig;
pub use data::{Post, PostFrame};
pub use error::AnalyticsError;
pub use exemplar::{top_exemplars, Exemplar};
pub use inference::{ClusterInferenceEngine, LabeledDataset, LabeledPost};
pub use kpi::{ClusterKpi, GlobalKpis, HourPerformance, TypePerformance};
pub use model::{LazyBundle, ModelBundle};
pub use pipeline::{run, AnalyticsReport, PipelineOptions};
pub use recommend::Recommendation;

/// Common result type used throughout the library
pub type Result<T> = std::result::Result<T, AnalyticsError>;
