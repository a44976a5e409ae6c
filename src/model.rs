//! Pre-trained model bundle: scaler, PCA projection and K-Means assigner
//!
//! The bundle is produced by an offline training job and shipped as a JSON
//! artifact. It is loaded once per process and shared read-only afterwards.

use crate::error::AnalyticsError;
use linfa_nn::distance::{Distance, L2Dist};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex, OnceLock};
use tracing::info;

#[derive(Debug, Deserialize)]
struct BundleArtifact {
    columns: Vec<String>,
    scaler: ScalerParams,
    pca: PcaParams,
    kmeans: KMeansParams,
}

#[derive(Debug, Deserialize)]
struct ScalerParams {
    #[serde(alias = "mean_")]
    mean: Vec<f64>,
    #[serde(alias = "scale_")]
    scale: Vec<f64>,
}

#[derive(Debug, Deserialize)]
struct PcaParams {
    #[serde(alias = "mean_")]
    mean: Vec<f64>,
    #[serde(alias = "components_")]
    components: Vec<Vec<f64>>,
    #[serde(default, alias = "explained_variance_")]
    explained_variance: Option<Vec<f64>>,
    #[serde(default)]
    whiten: bool,
}

#[derive(Debug, Deserialize)]
struct KMeansParams {
    #[serde(alias = "cluster_centers_")]
    cluster_centers: Vec<Vec<f64>>,
}

/// Fitted standardization: `(x - mean) / scale`
#[derive(Debug, Clone)]
pub struct StandardScaler {
    mean: Array1<f64>,
    scale: Array1<f64>,
}

impl StandardScaler {
    pub fn new(mean: Array1<f64>, scale: Array1<f64>) -> crate::Result<Self> {
        if mean.len() != scale.len() {
            return Err(artifact(format!(
                "scaler mean has {} entries but scale has {}",
                mean.len(),
                scale.len()
            )));
        }
        // Constant features were fitted with a zero scale
        let scale = scale.mapv(|s| if s == 0.0 { 1.0 } else { s });
        Ok(Self { mean, scale })
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    pub fn transform(&self, x: &Array2<f64>) -> Array2<f64> {
        (x - &self.mean) / &self.scale
    }
}

/// Fitted linear projection onto principal components
#[derive(Debug, Clone)]
pub struct Pca {
    mean: Array1<f64>,
    /// (n_components, n_features)
    components: Array2<f64>,
    whiten_scale: Option<Array1<f64>>,
}

impl Pca {
    pub fn new(
        mean: Array1<f64>,
        components: Array2<f64>,
        explained_variance: Option<Array1<f64>>,
        whiten: bool,
    ) -> crate::Result<Self> {
        if components.nrows() == 0 {
            return Err(artifact("pca has no components"));
        }
        if components.ncols() != mean.len() {
            return Err(artifact(format!(
                "pca components have {} features but mean has {}",
                components.ncols(),
                mean.len()
            )));
        }

        let whiten_scale = if whiten {
            let variance = explained_variance
                .ok_or_else(|| artifact("pca whitening requires explained_variance"))?;
            if variance.len() != components.nrows() {
                return Err(artifact(format!(
                    "pca explained_variance has {} entries for {} components",
                    variance.len(),
                    components.nrows()
                )));
            }
            Some(variance.mapv(f64::sqrt))
        } else {
            None
        };

        Ok(Self {
            mean,
            components,
            whiten_scale,
        })
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    pub fn n_components(&self) -> usize {
        self.components.nrows()
    }

    pub fn transform(&self, x: &Array2<f64>) -> Array2<f64> {
        let projected = (x - &self.mean).dot(&self.components.t());
        match &self.whiten_scale {
            Some(scale) => projected / scale,
            None => projected,
        }
    }
}

/// Nearest-centroid cluster assignment in the reduced space
#[derive(Debug, Clone)]
pub struct KMeansAssigner {
    /// (n_clusters, n_components)
    centroids: Array2<f64>,
}

impl KMeansAssigner {
    pub fn new(centroids: Array2<f64>) -> crate::Result<Self> {
        if centroids.nrows() == 0 {
            return Err(artifact("kmeans has no cluster centers"));
        }
        Ok(Self { centroids })
    }

    pub fn centroids(&self) -> &Array2<f64> {
        &self.centroids
    }

    pub fn n_clusters(&self) -> usize {
        self.centroids.nrows()
    }

    pub fn n_components(&self) -> usize {
        self.centroids.ncols()
    }

    /// Cluster id of the closest centroid for each row; ties go to the lowest id
    pub fn predict(&self, reduced: &Array2<f64>) -> Vec<usize> {
        reduced
            .axis_iter(Axis(0))
            .map(|point| {
                let mut min_distance = f64::INFINITY;
                let mut closest_cluster = 0;
                for (cluster_idx, centroid) in self.centroids.outer_iter().enumerate() {
                    let distance = L2Dist.distance(point, centroid);
                    if distance < min_distance {
                        min_distance = distance;
                        closest_cluster = cluster_idx;
                    }
                }
                closest_cluster
            })
            .collect()
    }

    /// Euclidean distance from `point` to the centroid of cluster `label`
    pub fn distance_to(&self, point: ArrayView1<f64>, label: usize) -> crate::Result<f64> {
        if label >= self.n_clusters() {
            return Err(AnalyticsError::Schema(format!(
                "cluster_label {label} is not one of the {} model clusters",
                self.n_clusters()
            )));
        }
        Ok(L2Dist.distance(point, self.centroids.row(label)))
    }
}

/// Feature list plus the three fitted transforms, in application order
#[derive(Debug, Clone)]
pub struct ModelBundle {
    feature_columns: Vec<String>,
    scaler: StandardScaler,
    reducer: Pca,
    assigner: KMeansAssigner,
}

impl ModelBundle {
    /// Assemble a bundle, checking that every stage agrees on its input width
    pub fn new(
        feature_columns: Vec<String>,
        scaler: StandardScaler,
        reducer: Pca,
        assigner: KMeansAssigner,
    ) -> crate::Result<Self> {
        if feature_columns.is_empty() {
            return Err(artifact("feature column list is empty"));
        }
        let n_features = feature_columns.len();
        if scaler.n_features() != n_features {
            return Err(artifact(format!(
                "scaler was fitted on {} features, bundle lists {n_features} columns",
                scaler.n_features()
            )));
        }
        if reducer.n_features() != n_features {
            return Err(artifact(format!(
                "pca was fitted on {} features, bundle lists {n_features} columns",
                reducer.n_features()
            )));
        }
        if assigner.n_components() != reducer.n_components() {
            return Err(artifact(format!(
                "kmeans centers have {} dimensions, pca produces {}",
                assigner.n_components(),
                reducer.n_components()
            )));
        }

        Ok(Self {
            feature_columns,
            scaler,
            reducer,
            assigner,
        })
    }

    /// Read and validate a JSON artifact
    pub fn load<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| artifact(format!("cannot read {}: {e}", path.display())))?;
        let bundle = Self::from_json(&text)?;

        info!(
            path = %path.display(),
            features = bundle.feature_columns.len(),
            components = bundle.reducer.n_components(),
            clusters = bundle.assigner.n_clusters(),
            "model bundle loaded"
        );
        Ok(bundle)
    }

    pub fn from_json(text: &str) -> crate::Result<Self> {
        let raw: BundleArtifact = serde_json::from_str(text)
            .map_err(|e| artifact(format!("malformed bundle: {e}")))?;

        let scaler = StandardScaler::new(
            Array1::from(raw.scaler.mean),
            Array1::from(raw.scaler.scale),
        )?;
        let reducer = Pca::new(
            Array1::from(raw.pca.mean),
            matrix_from_rows(raw.pca.components, "pca components")?,
            raw.pca.explained_variance.map(Array1::from),
            raw.pca.whiten,
        )?;
        let assigner =
            KMeansAssigner::new(matrix_from_rows(raw.kmeans.cluster_centers, "kmeans centers")?)?;

        Self::new(raw.columns, scaler, reducer, assigner)
    }

    /// Process-wide bundle, loaded from `path` on first use
    pub fn global<P: AsRef<Path>>(path: P) -> crate::Result<Arc<ModelBundle>> {
        static GLOBAL_BUNDLE: LazyBundle = LazyBundle::new();
        GLOBAL_BUNDLE.get_or_load(path)
    }

    pub fn feature_columns(&self) -> &[String] {
        &self.feature_columns
    }

    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    pub fn reducer(&self) -> &Pca {
        &self.reducer
    }

    pub fn assigner(&self) -> &KMeansAssigner {
        &self.assigner
    }

    /// Scale then project raw feature rows into the clustering space
    pub fn project(&self, features: &Array2<f64>) -> crate::Result<Array2<f64>> {
        if features.ncols() != self.feature_columns.len() {
            return Err(AnalyticsError::Schema(format!(
                "expected {} feature columns, got {}",
                self.feature_columns.len(),
                features.ncols()
            )));
        }
        let scaled = self.scaler.transform(features);
        Ok(self.reducer.transform(&scaled))
    }
}

/// One-time initialization cell for a shared bundle.
///
/// The first successful initializer publishes the bundle; concurrent callers
/// block on the guard and then observe that same instance. A failed load
/// leaves the cell empty so a later call can retry.
#[derive(Debug, Default)]
pub struct LazyBundle {
    cell: OnceLock<Arc<ModelBundle>>,
    guard: Mutex<()>,
}

impl LazyBundle {
    pub const fn new() -> Self {
        Self {
            cell: OnceLock::new(),
            guard: Mutex::new(()),
        }
    }

    pub fn get(&self) -> Option<Arc<ModelBundle>> {
        self.cell.get().cloned()
    }

    pub fn get_or_load<P: AsRef<Path>>(&self, path: P) -> crate::Result<Arc<ModelBundle>> {
        self.get_or_try_init(|| ModelBundle::load(path))
    }

    pub fn get_or_try_init<F>(&self, init: F) -> crate::Result<Arc<ModelBundle>>
    where
        F: FnOnce() -> crate::Result<ModelBundle>,
    {
        if let Some(bundle) = self.cell.get() {
            return Ok(Arc::clone(bundle));
        }

        let _lock = self.guard.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(bundle) = self.cell.get() {
            return Ok(Arc::clone(bundle));
        }

        let bundle = Arc::new(init()?);
        // Only the guard holder ever sets the cell
        let _ = self.cell.set(Arc::clone(&bundle));
        Ok(bundle)
    }
}

fn matrix_from_rows(rows: Vec<Vec<f64>>, what: &str) -> crate::Result<Array2<f64>> {
    let n_rows = rows.len();
    let n_cols = rows.first().map_or(0, Vec::len);
    if rows.iter().any(|row| row.len() != n_cols) {
        return Err(artifact(format!("{what} rows have inconsistent lengths")));
    }
    let flat: Vec<f64> = rows.into_iter().flatten().collect();
    Array2::from_shape_vec((n_rows, n_cols), flat)
        .map_err(|e| artifact(format!("{what}: {e}")))
}

fn artifact(message: impl Into<String>) -> AnalyticsError {
    AnalyticsError::Artifact(message.into())
}
