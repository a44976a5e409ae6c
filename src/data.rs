//! Dataset loading, timestamp parsing and labeled CSV export using Polars

use crate::error::AnalyticsError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Timelike};
use ndarray::Array2;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;
use tracing::debug;

pub const STATUS_ID: &str = "status_id";
pub const STATUS_TYPE: &str = "status_type";
pub const STATUS_PUBLISHED: &str = "status_published";
pub const NUM_REACTIONS: &str = "num_reactions";
pub const NUM_LIKES: &str = "num_likes";
pub const NUM_COMMENTS: &str = "num_comments";
pub const NUM_SHARES: &str = "num_shares";
pub const CLUSTER_LABEL: &str = "cluster_label";
pub const DIST_CENTROID: &str = "dist_centroid";

/// Columns every upload must carry regardless of the model's feature list
pub const REQUIRED_COLUMNS: [&str; 7] = [
    STATUS_ID,
    STATUS_TYPE,
    STATUS_PUBLISHED,
    NUM_REACTIONS,
    NUM_LIKES,
    NUM_COMMENTS,
    NUM_SHARES,
];

/// Timestamp layouts tried after RFC 3339, in order
const TIMESTAMP_FORMATS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// One post with the metric columns the analytics rely on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub status_id: String,
    pub status_type: String,
    /// Raw publication timestamp as uploaded
    pub status_published: String,
    pub num_reactions: i64,
    pub num_likes: i64,
    pub num_comments: i64,
    pub num_shares: i64,
}

/// An uploaded dataset: the full frame plus typed records for the core columns
#[derive(Debug, Clone)]
pub struct PostFrame {
    frame: DataFrame,
    posts: Vec<Post>,
}

impl PostFrame {
    /// Read a CSV upload from disk
    pub fn from_csv<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        let frame = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(1000))
            .try_into_reader_with_file_path(Some(path.to_path_buf()))?
            .finish()?;

        debug!(path = %path.display(), rows = frame.height(), "CSV upload parsed");
        Self::from_frame(frame)
    }

    /// Wrap an in-memory frame, validating the core columns
    pub fn from_frame(frame: DataFrame) -> crate::Result<Self> {
        require_columns(&frame, &REQUIRED_COLUMNS)?;

        if frame.height() == 0 {
            return Err(AnalyticsError::InsufficientData(
                "uploaded dataset has no rows".to_string(),
            ));
        }

        let status_ids = string_column(&frame, STATUS_ID)?;
        let status_types = string_column(&frame, STATUS_TYPE)?;
        let published = string_column(&frame, STATUS_PUBLISHED)?;
        let reactions = int_column(&frame, NUM_REACTIONS)?;
        let likes = int_column(&frame, NUM_LIKES)?;
        let comments = int_column(&frame, NUM_COMMENTS)?;
        let shares = int_column(&frame, NUM_SHARES)?;

        let posts = (0..frame.height())
            .map(|i| Post {
                status_id: status_ids[i].clone(),
                status_type: status_types[i].clone(),
                status_published: published[i].clone(),
                num_reactions: reactions[i],
                num_likes: likes[i],
                num_comments: comments[i],
                num_shares: shares[i],
            })
            .collect();

        Ok(Self { frame, posts })
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    /// Whether the upload already carries inference output columns
    pub fn is_labeled(&self) -> bool {
        has_column(&self.frame, CLUSTER_LABEL) && has_column(&self.frame, DIST_CENTROID)
    }

    /// Select `columns` in exactly the given order as a (rows, columns) matrix
    pub fn feature_matrix(&self, columns: &[String]) -> crate::Result<Array2<f64>> {
        if columns.is_empty() {
            return Err(AnalyticsError::Schema(
                "feature column list is empty".to_string(),
            ));
        }
        let names: Vec<&str> = columns.iter().map(String::as_str).collect();
        require_columns(&self.frame, &names)?;

        let n_rows = self.frame.height();
        let mut matrix = Array2::zeros((n_rows, columns.len()));
        for (j, name) in names.iter().enumerate() {
            let values = float_column(&self.frame, name)?;
            for (i, value) in values.into_iter().enumerate() {
                matrix[[i, j]] = value;
            }
        }

        Ok(matrix)
    }

    /// Write the upload with `cluster_label` and `dist_centroid` appended
    pub fn write_labeled_csv<P: AsRef<Path>>(
        &self,
        labels: &[usize],
        distances: &[f64],
        path: P,
    ) -> crate::Result<()> {
        if labels.len() != self.len() || distances.len() != self.len() {
            return Err(AnalyticsError::Schema(format!(
                "labels ({}) and distances ({}) must match the {} uploaded rows",
                labels.len(),
                distances.len(),
                self.len()
            )));
        }

        let labels: Vec<u64> = labels.iter().map(|&label| label as u64).collect();
        let mut out = self.frame.clone();
        out.with_column(Series::new(CLUSTER_LABEL, labels))?;
        out.with_column(Series::new(DIST_CENTROID, distances.to_vec()))?;

        let mut file = File::create(path.as_ref())?;
        CsvWriter::new(&mut file)
            .include_header(true)
            .finish(&mut out)?;

        debug!(path = %path.as_ref().display(), rows = out.height(), "labeled CSV written");
        Ok(())
    }
}

/// Parse a publication timestamp, keeping its wall-clock time
pub fn parse_published(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }
    for format in TIMESTAMP_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// Hour of day (0-23) of the post at `row`
pub fn published_hour(row: usize, raw: &str) -> crate::Result<u32> {
    parse_published(raw)
        .map(|dt| dt.hour())
        .ok_or_else(|| AnalyticsError::Parse {
            row,
            value: raw.to_string(),
        })
}

pub(crate) fn has_column(frame: &DataFrame, name: &str) -> bool {
    frame.get_column_names().contains(&name)
}

pub(crate) fn require_columns(frame: &DataFrame, names: &[&str]) -> crate::Result<()> {
    let missing: Vec<&str> = names
        .iter()
        .copied()
        .filter(|name| !has_column(frame, name))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(AnalyticsError::Schema(format!(
            "missing required column(s): {}",
            missing.join(", ")
        )))
    }
}

fn null_value(name: &str, row: usize) -> AnalyticsError {
    AnalyticsError::Schema(format!(
        "column `{name}` has a missing or non-numeric value at row {row}"
    ))
}

pub(crate) fn string_column(frame: &DataFrame, name: &str) -> crate::Result<Vec<String>> {
    let series = frame.column(name)?.cast(&DataType::String)?;
    series
        .str()?
        .into_iter()
        .enumerate()
        .map(|(row, value)| value.map(str::to_string).ok_or_else(|| null_value(name, row)))
        .collect()
}

/// Integer column; fractional cells are rejected rather than truncated
pub(crate) fn int_column(frame: &DataFrame, name: &str) -> crate::Result<Vec<i64>> {
    float_column(frame, name)?
        .into_iter()
        .enumerate()
        .map(|(row, value)| {
            if value.fract() == 0.0 && value.abs() <= i64::MAX as f64 {
                Ok(value as i64)
            } else {
                Err(AnalyticsError::Schema(format!(
                    "column `{name}` has a non-integral value {value} at row {row}"
                )))
            }
        })
        .collect()
}

pub(crate) fn float_column(frame: &DataFrame, name: &str) -> crate::Result<Vec<f64>> {
    let series = frame.column(name)?.cast(&DataType::Float64)?;
    series
        .f64()?
        .into_iter()
        .enumerate()
        .map(|(row, value)| value.ok_or_else(|| null_value(name, row)))
        .collect()
}
