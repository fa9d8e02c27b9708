//! Engine Error Types

use signal_series::SeriesError;
use thiserror::Error;

/// Errors raised by the cycle engine when a caller breaks the input contract
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// Activation threshold is NaN or infinite
    #[error("activation threshold must be finite, got {0}")]
    InvalidThreshold(f64),

    /// Minimum run length below one sample
    #[error("minimum run length must be at least 1, got {0}")]
    InvalidMinRunLength(usize),

    /// Explicit baseline duration is negative or non-finite
    #[error("expected cycle duration must be a finite, non-negative number of seconds, got {0}")]
    InvalidBaseline(f64),

    /// Anomaly tolerance is negative or non-finite
    #[error("anomaly tolerance fraction must be finite and non-negative, got {0}")]
    InvalidTolerance(f64),

    /// Resample width could not be parsed or is not positive
    #[error("invalid resample width: {0}")]
    InvalidFrequency(String),

    /// Cycle id column does not line up with the samples
    #[error("cycle id column has {ids} entries but series has {samples} samples")]
    LengthMismatch { samples: usize, ids: usize },

    /// Underlying series contract violation
    #[error(transparent)]
    Series(#[from] SeriesError),
}
