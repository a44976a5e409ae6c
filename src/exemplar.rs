//! Representative posts per cluster, ranked by distance to the centroid

use crate::data::{
    float_column, int_column, string_column, CLUSTER_LABEL, DIST_CENTROID, NUM_COMMENTS,
    NUM_REACTIONS, NUM_SHARES, STATUS_ID, STATUS_TYPE,
};
use polars::prelude::*;
use serde::Serialize;

/// Default number of exemplars kept per cluster
pub const DEFAULT_TOP_N: usize = 3;

/// A post chosen as typical for its cluster
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Exemplar {
    pub cluster_label: usize,
    pub status_id: String,
    pub status_type: String,
    pub num_reactions: i64,
    pub num_comments: i64,
    pub num_shares: i64,
    #[serde(skip)]
    pub dist_centroid: f64,
}

/// Up to `n` closest posts per cluster of a labeled frame, ordered by cluster
/// id then distance.
///
/// Posts at equal distance keep their upload order.
pub fn top_exemplars(frame: &DataFrame, n: usize) -> crate::Result<Vec<Exemplar>> {
    if n == 0 || frame.height() == 0 {
        return Ok(Vec::new());
    }

    let top = frame
        .clone()
        .lazy()
        .sort(
            [CLUSTER_LABEL, DIST_CENTROID],
            SortMultipleOptions::default().with_maintain_order(true),
        )
        .group_by_stable([col(CLUSTER_LABEL)])
        .head(Some(n))
        .collect()?;

    let labels = int_column(&top, CLUSTER_LABEL)?;
    let ids = string_column(&top, STATUS_ID)?;
    let types = string_column(&top, STATUS_TYPE)?;
    let reactions = int_column(&top, NUM_REACTIONS)?;
    let comments = int_column(&top, NUM_COMMENTS)?;
    let shares = int_column(&top, NUM_SHARES)?;
    let distances = float_column(&top, DIST_CENTROID)?;

    Ok(ids
        .into_iter()
        .zip(types)
        .enumerate()
        .map(|(i, (status_id, status_type))| Exemplar {
            cluster_label: labels[i] as usize,
            status_id,
            status_type,
            num_reactions: reactions[i],
            num_comments: comments[i],
            num_shares: shares[i],
            dist_centroid: distances[i],
        })
        .collect())
}
