//! End-to-end analytics run and the report bundle shared by every output surface

use crate::data::PostFrame;
use crate::exemplar::{top_exemplars, Exemplar, DEFAULT_TOP_N};
use crate::inference::{ClusterInferenceEngine, LabeledDataset, LabeledPost};
use crate::kpi::{
    cluster_kpis, global_kpis, hour_performance, type_performance, ClusterKpi, GlobalKpis,
    HourPerformance, TypePerformance,
};
use crate::model::ModelBundle;
use crate::recommend::{synthesize, Recommendation};
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Tunables for report derivation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Exemplars kept per cluster
    pub top_n: usize,
    /// Labeled rows copied into the report preview
    pub preview_rows: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            top_n: DEFAULT_TOP_N,
            preview_rows: 100,
        }
    }
}

/// Likes/comments coordinates for the engagement scatter
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScatterPoint {
    pub num_likes: i64,
    pub num_comments: i64,
    pub cluster_label: usize,
}

/// Everything a dashboard, export or printed report needs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsReport {
    pub kpis: GlobalKpis,
    pub cluster_kpis: Vec<ClusterKpi>,
    pub type_performance: Vec<TypePerformance>,
    pub hour_performance: Vec<HourPerformance>,
    pub top_posts: Vec<Exemplar>,
    pub recommendations: Vec<Recommendation>,
    pub clusters: Vec<usize>,
    pub scatter: Vec<ScatterPoint>,
    pub preview: Vec<LabeledPost>,
}

impl AnalyticsReport {
    /// Derive every aggregate from a labeled dataset.
    ///
    /// Does not touch the model, so a stored labeled dataset regenerates the
    /// same report without repeating inference.
    pub fn from_labeled(labeled: &LabeledDataset, options: PipelineOptions) -> crate::Result<Self> {
        let rows = labeled.rows();
        let frame = labeled.to_frame()?;

        let kpis = global_kpis(&frame)?;
        let cluster_kpis = cluster_kpis(&frame)?;
        let type_performance = type_performance(&frame)?;
        let hour_performance = hour_performance(&frame)?;
        let top_posts = top_exemplars(&frame, options.top_n)?;
        debug!(
            types = type_performance.len(),
            hours = hour_performance.len(),
            exemplars = top_posts.len(),
            "aggregates computed"
        );

        let recommendations = synthesize(&frame, &type_performance, &hour_performance, &top_posts)?;

        let scatter = rows
            .iter()
            .map(|row| ScatterPoint {
                num_likes: row.post.num_likes,
                num_comments: row.post.num_comments,
                cluster_label: row.cluster_label,
            })
            .collect();

        Ok(Self {
            kpis,
            cluster_kpis,
            type_performance,
            hour_performance,
            top_posts,
            recommendations,
            clusters: labeled.cluster_ids(),
            scatter,
            preview: rows.iter().take(options.preview_rows).cloned().collect(),
        })
    }

    /// Rendered recommendation sentences, in rule order
    pub fn recommendation_texts(&self) -> Vec<String> {
        self.recommendations.iter().map(ToString::to_string).collect()
    }

    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> crate::Result<()> {
        fs::write(path.as_ref(), self.to_json()?)?;
        debug!(path = %path.as_ref().display(), "report written");
        Ok(())
    }
}

/// Label an upload with `bundle` and derive its report
pub fn run(
    frame: &PostFrame,
    bundle: &ModelBundle,
    options: PipelineOptions,
) -> crate::Result<(LabeledDataset, AnalyticsReport)> {
    let start = Instant::now();

    let labeled = ClusterInferenceEngine::new(bundle).infer(frame)?;
    let report = AnalyticsReport::from_labeled(&labeled, options)?;

    info!(
        rows = labeled.len(),
        recommendations = report.recommendations.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "analytics run complete"
    );
    Ok((labeled, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnalyticsError;
    use crate::kpi::tests::post;

    fn labeled_rows() -> LabeledDataset {
        let mut rows = vec![
            post("a", "video", "2018-04-22 06:00:00", 300, 0),
            post("b", "photo", "2018-04-22 09:00:00", 20, 1),
            post("c", "video", "2018-04-22 13:00:00", 200, 0),
            post("d", "status", "2018-04-22 21:00:00", 10, 1),
            post("e", "photo", "2018-04-23 06:30:00", 40, 1),
        ];
        for (i, row) in rows.iter_mut().enumerate() {
            row.dist_centroid = 0.1 * (5 - i) as f64;
        }
        LabeledDataset::new(rows)
    }

    #[test]
    fn test_report_from_labeled() {
        let report = AnalyticsReport::from_labeled(&labeled_rows(), PipelineOptions::default())
            .unwrap();

        assert_eq!(report.kpis.mean_likes, 114);
        assert_eq!(report.clusters, vec![0, 1]);
        assert_eq!(report.cluster_kpis.len(), 2);
        assert_eq!(report.type_performance[0].status_type, "video");
        assert_eq!(report.hour_performance.len(), 4);
        assert_eq!(report.top_posts.len(), 5);
        assert_eq!(report.recommendations.len(), 4);
        assert_eq!(report.scatter.len(), 5);
        assert_eq!(report.preview.len(), 5);

        assert_eq!(
            report.recommendations[1],
            Recommendation::PostingWindow {
                hours: vec![6, 9, 13]
            }
        );
        assert_eq!(
            report.recommendations[2],
            Recommendation::TopCluster {
                cluster_label: 0,
                mean_reactions: 250.0
            }
        );
        assert_eq!(
            report.recommendations[3],
            Recommendation::RecyclePosts {
                status_ids: vec!["c".into(), "a".into(), "e".into()]
            }
        );
    }

    #[test]
    fn test_report_is_reproducible() {
        let labeled = labeled_rows();
        let options = PipelineOptions {
            top_n: 2,
            preview_rows: 3,
        };
        let first = AnalyticsReport::from_labeled(&labeled, options).unwrap();
        let second = AnalyticsReport::from_labeled(&labeled, options).unwrap();

        assert_eq!(first.preview.len(), 3);
        assert_eq!(first.top_posts.len(), 4);
        assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());
        assert_eq!(first.recommendation_texts(), second.recommendation_texts());
    }

    #[test]
    fn test_report_json_shape() {
        let report = AnalyticsReport::from_labeled(&labeled_rows(), PipelineOptions::default())
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();

        assert_eq!(value["kpis"]["mean_likes"], 114);
        assert_eq!(value["recommendations"][0]["rule"], "best_content_type");
        assert_eq!(value["top_posts"][0]["status_id"], "c");
        assert!(value["top_posts"][0].get("dist_centroid").is_none());
        assert_eq!(value["preview"][0]["status_id"], "a");
        assert_eq!(value["preview"][0]["cluster_label"], 0);
    }

    #[test]
    fn test_bad_timestamp_fails_the_run() {
        let mut rows = labeled_rows().rows().to_vec();
        rows[3].post.status_published = "soon".to_string();
        let err = AnalyticsReport::from_labeled(&LabeledDataset::new(rows), PipelineOptions::default())
            .unwrap_err();
        assert!(matches!(err, AnalyticsError::Parse { row: 3, .. }));
    }
}
