//! Aggregate engagement indicators over a labeled frame
//!
//! Every function takes the frame produced by [`LabeledDataset::to_frame`]
//! and runs its group-by as a lazy polars query.
//!
//! [`LabeledDataset::to_frame`]: crate::inference::LabeledDataset::to_frame

use crate::data::{
    float_column, int_column, published_hour, string_column, CLUSTER_LABEL, NUM_COMMENTS,
    NUM_LIKES, NUM_REACTIONS, NUM_SHARES, STATUS_PUBLISHED, STATUS_TYPE,
};
use crate::error::AnalyticsError;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Publication hour column added for the hourly aggregate
pub const HOUR: &str = "hour";

const POSTS: &str = "posts";

/// Dataset-wide means, truncated toward zero
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalKpis {
    pub mean_likes: i64,
    pub mean_comments: i64,
    pub mean_shares: i64,
}

/// Per-cluster means, rounded to one decimal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterKpi {
    pub cluster_label: usize,
    pub posts: usize,
    pub num_likes: f64,
    pub num_comments: f64,
    pub num_shares: f64,
}

/// Mean reactions for one `status_type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypePerformance {
    pub status_type: String,
    pub num_reactions: f64,
}

/// Mean reactions for posts published in one hour of the day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourPerformance {
    pub hour: u32,
    pub num_reactions: f64,
}

/// Round half to even at one decimal place
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round_ties_even() / 10.0
}

fn scalar(frame: &DataFrame, name: &str) -> crate::Result<f64> {
    float_column(frame, name)?
        .first()
        .copied()
        .ok_or_else(|| AnalyticsError::InsufficientData(format!("no mean for `{name}`")))
}

pub fn global_kpis(frame: &DataFrame) -> crate::Result<GlobalKpis> {
    if frame.height() == 0 {
        return Err(AnalyticsError::InsufficientData(
            "global KPIs need at least one post".to_string(),
        ));
    }

    let means = frame
        .clone()
        .lazy()
        .select([
            col(NUM_LIKES).mean(),
            col(NUM_COMMENTS).mean(),
            col(NUM_SHARES).mean(),
        ])
        .collect()?;

    Ok(GlobalKpis {
        mean_likes: scalar(&means, NUM_LIKES)?.trunc() as i64,
        mean_comments: scalar(&means, NUM_COMMENTS)?.trunc() as i64,
        mean_shares: scalar(&means, NUM_SHARES)?.trunc() as i64,
    })
}

/// One record per observed cluster, ascending by cluster id
pub fn cluster_kpis(frame: &DataFrame) -> crate::Result<Vec<ClusterKpi>> {
    let grouped = frame
        .clone()
        .lazy()
        .group_by([col(CLUSTER_LABEL)])
        .agg([
            len().alias(POSTS),
            col(NUM_LIKES).mean(),
            col(NUM_COMMENTS).mean(),
            col(NUM_SHARES).mean(),
        ])
        .sort([CLUSTER_LABEL], SortMultipleOptions::default())
        .collect()?;

    let labels = int_column(&grouped, CLUSTER_LABEL)?;
    let posts = int_column(&grouped, POSTS)?;
    let likes = float_column(&grouped, NUM_LIKES)?;
    let comments = float_column(&grouped, NUM_COMMENTS)?;
    let shares = float_column(&grouped, NUM_SHARES)?;

    Ok((0..grouped.height())
        .map(|i| ClusterKpi {
            cluster_label: labels[i] as usize,
            posts: posts[i] as usize,
            num_likes: round1(likes[i]),
            num_comments: round1(comments[i]),
            num_shares: round1(shares[i]),
        })
        .collect())
}

/// Mean reactions per content type, best first.
///
/// Types with equal rounded means keep the order in which they first appear.
pub fn type_performance(frame: &DataFrame) -> crate::Result<Vec<TypePerformance>> {
    let mut grouped = frame
        .clone()
        .lazy()
        .group_by_stable([col(STATUS_TYPE)])
        .agg([col(NUM_REACTIONS).mean()])
        .collect()?;

    // rounded before ranking so equal displayed means stay in upload order
    let rounded: Vec<f64> = float_column(&grouped, NUM_REACTIONS)?
        .into_iter()
        .map(round1)
        .collect();
    grouped.with_column(Series::new(NUM_REACTIONS, rounded))?;

    let ranked = grouped
        .lazy()
        .sort(
            [NUM_REACTIONS],
            SortMultipleOptions::default()
                .with_order_descending(true)
                .with_maintain_order(true),
        )
        .collect()?;

    let types = string_column(&ranked, STATUS_TYPE)?;
    let reactions = float_column(&ranked, NUM_REACTIONS)?;
    Ok(types
        .into_iter()
        .zip(reactions)
        .map(|(status_type, num_reactions)| TypePerformance {
            status_type,
            num_reactions,
        })
        .collect())
}

/// Mean reactions per publication hour, ascending by hour.
///
/// Every context that needs hourly figures goes through this function.
pub fn hour_performance(frame: &DataFrame) -> crate::Result<Vec<HourPerformance>> {
    let hours = string_column(frame, STATUS_PUBLISHED)?
        .iter()
        .enumerate()
        .map(|(row, raw)| published_hour(row, raw))
        .collect::<crate::Result<Vec<u32>>>()?;

    let mut with_hour = frame.clone();
    with_hour.with_column(Series::new(HOUR, hours))?;

    let grouped = with_hour
        .lazy()
        .group_by([col(HOUR)])
        .agg([col(NUM_REACTIONS).mean()])
        .sort([HOUR], SortMultipleOptions::default())
        .collect()?;

    let hours = int_column(&grouped, HOUR)?;
    let reactions = float_column(&grouped, NUM_REACTIONS)?;
    Ok(hours
        .into_iter()
        .zip(reactions)
        .map(|(hour, mean)| HourPerformance {
            hour: hour as u32,
            num_reactions: round1(mean),
        })
        .collect())
}

/// Mean reactions per cluster, unrounded, ascending by cluster id
pub fn cluster_reactions(frame: &DataFrame) -> crate::Result<Vec<(usize, f64)>> {
    let grouped = frame
        .clone()
        .lazy()
        .group_by([col(CLUSTER_LABEL)])
        .agg([col(NUM_REACTIONS).mean()])
        .sort([CLUSTER_LABEL], SortMultipleOptions::default())
        .collect()?;

    let labels = int_column(&grouped, CLUSTER_LABEL)?;
    let means = float_column(&grouped, NUM_REACTIONS)?;
    Ok(labels
        .into_iter()
        .map(|label| label as usize)
        .zip(means)
        .collect())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::data::Post;
    use crate::inference::{LabeledDataset, LabeledPost};

    pub(crate) fn post(
        id: &str,
        status_type: &str,
        published: &str,
        reactions: i64,
        cluster_label: usize,
    ) -> LabeledPost {
        LabeledPost {
            post: Post {
                status_id: id.to_string(),
                status_type: status_type.to_string(),
                status_published: published.to_string(),
                num_reactions: reactions,
                num_likes: reactions,
                num_comments: 0,
                num_shares: 0,
            },
            cluster_label,
            dist_centroid: 0.0,
        }
    }

    pub(crate) fn frame_of(rows: Vec<LabeledPost>) -> DataFrame {
        LabeledDataset::new(rows).to_frame().unwrap()
    }

    fn with_metrics(mut row: LabeledPost, likes: i64, comments: i64, shares: i64) -> LabeledPost {
        row.post.num_likes = likes;
        row.post.num_comments = comments;
        row.post.num_shares = shares;
        row
    }

    #[test]
    fn test_global_kpis_truncate() {
        let frame = frame_of(vec![
            with_metrics(post("a", "video", "2018-01-01 10:00", 1, 0), 10, 1, 0),
            with_metrics(post("b", "video", "2018-01-01 10:00", 1, 0), 11, 2, 0),
            with_metrics(post("c", "video", "2018-01-01 10:00", 1, 0), 12, 2, 1),
        ]);
        let kpis = global_kpis(&frame).unwrap();

        assert_eq!(kpis.mean_likes, 11);
        // 5/3 = 1.67 truncates to 1, 1/3 to 0
        assert_eq!(kpis.mean_comments, 1);
        assert_eq!(kpis.mean_shares, 0);
    }

    #[test]
    fn test_global_kpis_empty() {
        assert!(matches!(
            global_kpis(&frame_of(Vec::new())),
            Err(AnalyticsError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_cluster_kpis() {
        let rows = vec![
            with_metrics(post("a", "video", "2018-01-01 10:00", 1, 2), 1, 1, 1),
            with_metrics(post("b", "video", "2018-01-01 10:00", 1, 0), 10, 0, 0),
            with_metrics(post("c", "video", "2018-01-01 10:00", 1, 2), 2, 2, 2),
            with_metrics(post("d", "video", "2018-01-01 10:00", 1, 2), 2, 2, 3),
        ];
        let total = rows.len();
        let kpis = cluster_kpis(&frame_of(rows)).unwrap();

        assert_eq!(kpis.len(), 2);
        assert_eq!(kpis[0].cluster_label, 0);
        assert_eq!(kpis[0].posts, 1);
        assert_eq!(kpis[0].num_likes, 10.0);
        assert_eq!(kpis[1].cluster_label, 2);
        assert_eq!(kpis[1].posts, 3);
        assert_eq!(kpis[1].num_likes, 1.7);
        assert_eq!(kpis[1].num_shares, 2.0);
        assert_eq!(kpis.iter().map(|k| k.posts).sum::<usize>(), total);
    }

    #[test]
    fn test_cluster_kpis_sorted_for_many_clusters() {
        // enough groups that a hash group-by would not come back ordered
        let rows: Vec<LabeledPost> = (0..40)
            .rev()
            .map(|label| {
                post(&format!("p{label}"), "video", "2018-01-01 10:00", label as i64, label)
            })
            .collect();
        let kpis = cluster_kpis(&frame_of(rows)).unwrap();

        let labels: Vec<usize> = kpis.iter().map(|k| k.cluster_label).collect();
        assert_eq!(labels, (0..40).collect::<Vec<_>>());
        assert!(kpis.iter().all(|k| k.posts == 1));
    }

    #[test]
    fn test_type_performance_sorted_with_stable_ties() {
        let frame = frame_of(vec![
            post("a", "status", "2018-01-01 10:00", 5, 0),
            post("b", "video", "2018-01-01 10:00", 100, 0),
            post("c", "photo", "2018-01-01 10:00", 5, 0),
            post("d", "link", "2018-01-01 10:00", 50, 0),
            post("e", "video", "2018-01-01 10:00", 50, 0),
        ]);
        let performance = type_performance(&frame).unwrap();

        let types: Vec<&str> = performance.iter().map(|t| t.status_type.as_str()).collect();
        assert_eq!(types, vec!["video", "link", "status", "photo"]);
        assert_eq!(performance[0].num_reactions, 75.0);
        assert!(performance
            .windows(2)
            .all(|w| w[0].num_reactions >= w[1].num_reactions));
    }

    #[test]
    fn test_type_performance_rounded_ties_keep_first_appearance() {
        // video averages 211/21 (10.048), shown as 10.0 like photo
        let mut rows = vec![
            post("a", "photo", "2018-01-01 10:00", 10, 0),
            post("b", "link", "2018-01-01 10:00", 20, 0),
        ];
        rows.extend((0..20).map(|i| post(&format!("v{i}"), "video", "2018-01-01 10:00", 10, 0)));
        rows.push(post("v20", "video", "2018-01-01 10:00", 11, 0));
        let performance = type_performance(&frame_of(rows)).unwrap();

        let types: Vec<&str> = performance.iter().map(|t| t.status_type.as_str()).collect();
        assert_eq!(types, vec!["link", "photo", "video"]);
        assert_eq!(performance[2].num_reactions, 10.0);
    }

    #[test]
    fn test_type_performance_empty() {
        assert!(type_performance(&frame_of(Vec::new())).unwrap().is_empty());
    }

    #[test]
    fn test_hour_performance() {
        let frame = frame_of(vec![
            post("a", "video", "4/22/2018 22:10", 10, 0),
            post("b", "video", "4/22/2018 6:00", 3, 0),
            post("c", "video", "4/23/2018 6:45", 4, 0),
            post("d", "video", "4/23/2018 22:00", 20, 0),
        ]);
        let performance = hour_performance(&frame).unwrap();

        assert_eq!(
            performance,
            vec![
                HourPerformance { hour: 6, num_reactions: 3.5 },
                HourPerformance { hour: 22, num_reactions: 15.0 },
            ]
        );
    }

    #[test]
    fn test_hour_performance_reports_bad_row() {
        let frame = frame_of(vec![
            post("a", "video", "4/22/2018 22:10", 10, 0),
            post("b", "video", "not a date", 3, 0),
        ]);
        match hour_performance(&frame).unwrap_err() {
            AnalyticsError::Parse { row, .. } => assert_eq!(row, 1),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_cluster_reactions_unrounded() {
        let frame = frame_of(vec![
            post("a", "video", "2018-01-01 10:00", 1, 3),
            post("b", "video", "2018-01-01 10:00", 2, 1),
            post("c", "video", "2018-01-01 10:00", 0, 1),
            post("d", "video", "2018-01-01 10:00", 2, 3),
            post("e", "video", "2018-01-01 10:00", 2, 3),
        ]);
        let reactions = cluster_reactions(&frame).unwrap();

        assert_eq!(reactions.len(), 2);
        assert_eq!(reactions[0], (1, 1.0));
        assert_eq!(reactions[1].0, 3);
        assert!((reactions[1].1 - 5.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_round1_half_to_even() {
        assert_eq!(round1(1.25), 1.2);
        assert_eq!(round1(3.14159), 3.1);
        assert_eq!(round1(2.0 / 3.0), 0.7);
        assert_eq!(round1(-0.75), -0.8);
    }
}
