//! Machine Operating State Detection
//!
//! Two independent labelers over the same energy series:
//! - Rule-based threshold table (Off / On / Standby / production)
//! - K-means clustering over rolling signal features

mod clustering;
mod detector;
mod rules;

pub use clustering::{KMeans, KMeansFit};
pub use detector::{ClusteringConfig, StateDetector};
pub use rules::{OperatingState, RuleBasedStateDetector, StateThresholds};

use thiserror::Error;

/// State detection errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StateError {
    /// Fewer samples than requested clusters
    #[error("need at least {required} samples to form {required} states, got {actual}")]
    TooFewSamples { required: usize, actual: usize },

    /// Configuration out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
