//! Engine configuration

use crate::error::EngineError;
use crate::period::Frequency;
use serde::{Deserialize, Serialize};

/// Relative deviation from the baseline beyond which a cycle is anomalous
pub const DEFAULT_ANOMALY_TOLERANCE: f64 = 0.5;

/// Default activation level (same unit as the meter readings)
pub const DEFAULT_ACTIVATION_THRESHOLD: f64 = 10.0;

/// Default minimum number of consecutive active samples in a cycle
pub const DEFAULT_MIN_RUN_LENGTH: usize = 5;

/// Cycle engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// A sample is active when its value is strictly above this level
    pub activation_threshold: f64,

    /// Consecutive active samples required to keep a run as a cycle
    pub min_run_length: usize,

    /// Allowed |duration - baseline| as a fraction of the baseline
    pub anomaly_tolerance_fraction: f64,

    /// Bucket width used when counting cycles per period
    pub default_resample_width: Frequency,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            activation_threshold: DEFAULT_ACTIVATION_THRESHOLD,
            min_run_length: DEFAULT_MIN_RUN_LENGTH,
            anomaly_tolerance_fraction: DEFAULT_ANOMALY_TOLERANCE,
            default_resample_width: Frequency::hourly(),
        }
    }
}

impl EngineConfig {
    /// Tighter duration tolerance for well-characterised processes
    pub fn strict() -> Self {
        Self {
            anomaly_tolerance_fraction: 0.25,
            ..Default::default()
        }
    }

    /// Looser duration tolerance for machines with variable job sizes
    pub fn lenient() -> Self {
        Self {
            anomaly_tolerance_fraction: 0.75,
            ..Default::default()
        }
    }

    /// Check every field against its contract
    pub fn validate(&self) -> Result<(), EngineError> {
        if !self.activation_threshold.is_finite() {
            return Err(EngineError::InvalidThreshold(self.activation_threshold));
        }
        if self.min_run_length < 1 {
            return Err(EngineError::InvalidMinRunLength(self.min_run_length));
        }
        if !self.anomaly_tolerance_fraction.is_finite() || self.anomaly_tolerance_fraction < 0.0 {
            return Err(EngineError::InvalidTolerance(self.anomaly_tolerance_fraction));
        }
        Ok(())
    }
}
