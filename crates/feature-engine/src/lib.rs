//! Feature Engineering Engine
//!
//! Provides rolling-window features of an energy signal for state clustering.

mod features;
mod statistics;

pub use features::{FeatureMatrix, RollingFeatures, DEFAULT_WINDOW, FEATURE_DIMENSION, FEATURE_NAMES};
pub use statistics::WindowStatistics;

use thiserror::Error;

/// Feature extraction errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FeatureError {
    /// Rolling window of zero samples
    #[error("rolling window must be at least 1 sample, got {0}")]
    InvalidWindow(usize),
}
