//! Cluster inference: feature selection, projection and centroid distances

use crate::data::{
    float_column, int_column, Post, PostFrame, CLUSTER_LABEL, DIST_CENTROID, NUM_COMMENTS,
    NUM_LIKES, NUM_REACTIONS, NUM_SHARES, STATUS_ID, STATUS_PUBLISHED, STATUS_TYPE,
};
use crate::error::AnalyticsError;
use crate::model::ModelBundle;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, info};

/// A post augmented with its cluster assignment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledPost {
    #[serde(flatten)]
    pub post: Post,
    pub cluster_label: usize,
    /// Euclidean distance to the assigned cluster's centroid in reduced space
    pub dist_centroid: f64,
}

/// The output of one inference pass, consumed by every downstream computation
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LabeledDataset {
    rows: Vec<LabeledPost>,
}

impl LabeledDataset {
    pub fn new(rows: Vec<LabeledPost>) -> Self {
        Self { rows }
    }

    /// Rebuild from an upload that already carries `cluster_label` and `dist_centroid`
    pub fn from_labeled_frame(frame: &PostFrame) -> crate::Result<Self> {
        if !frame.is_labeled() {
            return Err(AnalyticsError::Schema(format!(
                "labeled dataset requires `{CLUSTER_LABEL}` and `{DIST_CENTROID}` columns"
            )));
        }

        let labels = int_column(frame.frame(), CLUSTER_LABEL)?;
        let distances = float_column(frame.frame(), DIST_CENTROID)?;

        let rows = frame
            .posts()
            .iter()
            .zip(labels.into_iter().zip(distances))
            .enumerate()
            .map(|(row, (post, (label, distance)))| {
                let cluster_label = usize::try_from(label).map_err(|_| {
                    AnalyticsError::Schema(format!("negative cluster_label {label} at row {row}"))
                })?;
                if distance.is_nan() || distance < 0.0 {
                    return Err(AnalyticsError::Schema(format!(
                        "invalid dist_centroid {distance} at row {row}"
                    )));
                }
                Ok(LabeledPost {
                    post: post.clone(),
                    cluster_label,
                    dist_centroid: distance,
                })
            })
            .collect::<crate::Result<Vec<_>>>()?;

        debug!(rows = rows.len(), "labeled dataset restored without inference");
        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[LabeledPost] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn labels(&self) -> Vec<usize> {
        self.rows.iter().map(|row| row.cluster_label).collect()
    }

    pub fn distances(&self) -> Vec<f64> {
        self.rows.iter().map(|row| row.dist_centroid).collect()
    }

    /// The labeled rows as a frame, post columns followed by `cluster_label` and `dist_centroid`
    pub fn to_frame(&self) -> crate::Result<DataFrame> {
        let posts: Vec<&Post> = self.rows.iter().map(|row| &row.post).collect();
        let labels: Vec<u64> = self.rows.iter().map(|row| row.cluster_label as u64).collect();

        let frame = DataFrame::new(vec![
            Series::new(STATUS_ID, posts.iter().map(|p| p.status_id.as_str()).collect::<Vec<_>>()),
            Series::new(
                STATUS_TYPE,
                posts.iter().map(|p| p.status_type.as_str()).collect::<Vec<_>>(),
            ),
            Series::new(
                STATUS_PUBLISHED,
                posts.iter().map(|p| p.status_published.as_str()).collect::<Vec<_>>(),
            ),
            Series::new(NUM_REACTIONS, posts.iter().map(|p| p.num_reactions).collect::<Vec<_>>()),
            Series::new(NUM_LIKES, posts.iter().map(|p| p.num_likes).collect::<Vec<_>>()),
            Series::new(NUM_COMMENTS, posts.iter().map(|p| p.num_comments).collect::<Vec<_>>()),
            Series::new(NUM_SHARES, posts.iter().map(|p| p.num_shares).collect::<Vec<_>>()),
            Series::new(CLUSTER_LABEL, labels),
            Series::new(DIST_CENTROID, self.distances()),
        ])?;
        Ok(frame)
    }

    /// Distinct observed cluster ids, ascending
    pub fn cluster_ids(&self) -> Vec<usize> {
        self.rows
            .iter()
            .map(|row| row.cluster_label)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// Applies a model bundle to uploaded posts
#[derive(Debug, Clone, Copy)]
pub struct ClusterInferenceEngine<'a> {
    bundle: &'a ModelBundle,
}

impl<'a> ClusterInferenceEngine<'a> {
    pub fn new(bundle: &'a ModelBundle) -> Self {
        Self { bundle }
    }

    /// Label every row and record its distance to the assigned centroid
    pub fn infer(&self, frame: &PostFrame) -> crate::Result<LabeledDataset> {
        let features = frame.feature_matrix(self.bundle.feature_columns())?;
        let reduced = self.bundle.project(&features)?;

        let assigner = self.bundle.assigner();
        let labels = assigner.predict(&reduced);

        let rows = frame
            .posts()
            .iter()
            .zip(reduced.outer_iter())
            .zip(labels)
            .map(|((post, point), cluster_label)| {
                Ok(LabeledPost {
                    post: post.clone(),
                    cluster_label,
                    dist_centroid: assigner.distance_to(point, cluster_label)?,
                })
            })
            .collect::<crate::Result<Vec<_>>>()?;

        let dataset = LabeledDataset { rows };
        info!(
            rows = dataset.len(),
            clusters = dataset.cluster_ids().len(),
            "cluster inference complete"
        );
        Ok(dataset)
    }
}
