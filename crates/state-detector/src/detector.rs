//! Clustering-based state detector

use crate::clustering::{KMeans, KMeansFit};
use crate::StateError;
use feature_engine::{RollingFeatures, DEFAULT_WINDOW};
use serde::{Deserialize, Serialize};
use signal_series::SignalSeries;
use tracing::info;

/// Clustering configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusteringConfig {
    /// Number of operating states to discover
    pub n_states: usize,
    /// Rolling feature window (samples)
    pub window: usize,
    /// Lloyd iteration budget
    pub max_iterations: usize,
    /// Convergence threshold on total squared centroid shift
    pub tolerance: f64,
    /// RNG seed for centroid seeding
    pub seed: u64,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            n_states: 5,
            window: DEFAULT_WINDOW,
            max_iterations: 300,
            tolerance: 1e-4,
            seed: 42,
        }
    }
}

/// Labels each sample with a discovered state cluster
#[derive(Debug, Clone, Copy)]
pub struct StateDetector {
    features: RollingFeatures,
    kmeans: KMeans,
}

impl StateDetector {
    pub fn new(config: ClusteringConfig) -> Result<Self, StateError> {
        let features =
            RollingFeatures::new(config.window).map_err(|e| StateError::InvalidConfig(e.to_string()))?;
        let kmeans = KMeans::new(config.n_states, config.max_iterations, config.tolerance, config.seed)?;
        Ok(Self { features, kmeans })
    }

    /// Fit clusters on the rolling features of `series`
    pub fn fit(&self, series: &SignalSeries) -> Result<KMeansFit, StateError> {
        let matrix = self.features.extract(&series.values());
        self.kmeans.fit(&matrix)
    }

    /// Cluster id per sample, in `0..n_states`
    pub fn classify_states(&self, series: &SignalSeries) -> Result<Vec<usize>, StateError> {
        let fit = self.fit(series)?;
        info!(
            "Clustered {} samples into {} states in {} iterations",
            series.len(),
            fit.centroids.nrows(),
            fit.iterations
        );
        Ok(fit.labels)
    }
}
