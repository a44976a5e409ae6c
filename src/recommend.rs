//! Rule-based recommendations derived from KPI and exemplar outputs

use crate::error::AnalyticsError;
use crate::exemplar::Exemplar;
use crate::kpi::{cluster_reactions, round1, HourPerformance, TypePerformance};
use polars::prelude::DataFrame;
use serde::Serialize;
use std::fmt;
use tracing::warn;

/// Maximum number of hours in the suggested posting window
pub const POSTING_WINDOW_HOURS: usize = 3;

/// Number of exemplar posts suggested for reuse
pub const RECYCLED_POSTS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum Recommendation {
    /// Highest versus lowest mean reactions by content type
    BestContentType {
        best_type: String,
        worst_type: String,
        /// Signed difference of the two means, rounded half to even
        delta: i64,
    },
    /// Hours with the highest mean reactions, ascending
    PostingWindow { hours: Vec<u32> },
    /// Cluster with the highest mean reactions
    TopCluster {
        cluster_label: usize,
        mean_reactions: f64,
    },
    /// Exemplar posts worth pinning or reposting
    RecyclePosts { status_ids: Vec<String> },
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recommendation::BestContentType {
                best_type, delta, ..
            } => write!(
                f,
                "{best_type} posts earn on average {delta:+} more reactions than the least engaging type."
            ),
            Recommendation::PostingWindow { hours } => {
                let window: Vec<String> = hours.iter().map(|h| format!("{h}h")).collect();
                write!(
                    f,
                    "Engagement peaks around {}. Schedule your posts at these hours.",
                    window.join(" - ")
                )
            }
            Recommendation::TopCluster { cluster_label, .. } => write!(
                f,
                "Cluster {cluster_label} performs best; sponsor this kind of content."
            ),
            Recommendation::RecyclePosts { status_ids } => {
                write!(f, "Recycle or pin posts {}.", status_ids.join(", "))
            }
        }
    }
}

/// Best versus worst content type, from `type_performance` ordering
pub fn best_content_type(type_perf: &[TypePerformance]) -> crate::Result<Recommendation> {
    let (best, worst) = match type_perf {
        [best, .., worst] => (best, worst),
        _ => {
            return Err(AnalyticsError::InsufficientData(format!(
                "content type comparison needs 2 types, found {}",
                type_perf.len()
            )))
        }
    };

    Ok(Recommendation::BestContentType {
        best_type: best.status_type.clone(),
        worst_type: worst.status_type.clone(),
        delta: (best.num_reactions - worst.num_reactions).round_ties_even() as i64,
    })
}

/// The highest-scoring hours (at most three), listed in clock order
pub fn posting_window(hour_perf: &[HourPerformance]) -> crate::Result<Recommendation> {
    if hour_perf.is_empty() {
        return Err(AnalyticsError::InsufficientData(
            "posting window needs at least one publication hour".to_string(),
        ));
    }

    let mut ranked: Vec<&HourPerformance> = hour_perf.iter().collect();
    ranked.sort_by_key(|h| h.hour);
    ranked.sort_by(|a, b| b.num_reactions.total_cmp(&a.num_reactions));

    let mut hours: Vec<u32> = ranked
        .into_iter()
        .take(POSTING_WINDOW_HOURS)
        .map(|h| h.hour)
        .collect();
    hours.sort_unstable();

    Ok(Recommendation::PostingWindow { hours })
}

/// Cluster with the highest mean reactions in a labeled frame; ties go to the lowest id
pub fn top_cluster(frame: &DataFrame) -> crate::Result<Recommendation> {
    let mut best: Option<(usize, f64)> = None;
    for (label, mean) in cluster_reactions(frame)? {
        if best.map_or(true, |(_, best_mean)| mean > best_mean) {
            best = Some((label, mean));
        }
    }

    best.map(|(cluster_label, mean)| Recommendation::TopCluster {
        cluster_label,
        mean_reactions: round1(mean),
    })
    .ok_or_else(|| AnalyticsError::InsufficientData("no labeled posts".to_string()))
}

/// The first exemplars of the global ordering
pub fn recycle_posts(top_posts: &[Exemplar]) -> crate::Result<Recommendation> {
    if top_posts.is_empty() {
        return Err(AnalyticsError::InsufficientData(
            "no exemplar posts to recycle".to_string(),
        ));
    }

    Ok(Recommendation::RecyclePosts {
        status_ids: top_posts
            .iter()
            .take(RECYCLED_POSTS)
            .map(|p| p.status_id.clone())
            .collect(),
    })
}

/// Apply every rule in order, skipping rules that lack data
pub fn synthesize(
    frame: &DataFrame,
    type_perf: &[TypePerformance],
    hour_perf: &[HourPerformance],
    top_posts: &[Exemplar],
) -> crate::Result<Vec<Recommendation>> {
    let outcomes = [
        ("best_content_type", best_content_type(type_perf)),
        ("posting_window", posting_window(hour_perf)),
        ("top_cluster", top_cluster(frame)),
        ("recycle_posts", recycle_posts(top_posts)),
    ];

    let mut recommendations = Vec::with_capacity(outcomes.len());
    for (rule, outcome) in outcomes {
        match outcome {
            Ok(recommendation) => recommendations.push(recommendation),
            Err(err) if err.is_recoverable() => {
                warn!(rule, error = %err, "recommendation skipped");
            }
            Err(err) => return Err(err),
        }
    }
    Ok(recommendations)
}
