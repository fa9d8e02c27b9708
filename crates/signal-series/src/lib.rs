//! Energy Signal Series
//!
//! Ordered (timestamp, value) samples read from a single machine's power meter.

mod series;

pub use series::SignalSeries;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single power-draw reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

impl Sample {
    /// Create a new sample
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// Errors raised when a series breaks its ordering or value contract
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SeriesError {
    /// Timestamps go backwards
    #[error("sample {index} at {timestamp} precedes the previous sample at {previous}")]
    Unordered {
        index: usize,
        timestamp: DateTime<Utc>,
        previous: DateTime<Utc>,
    },

    /// NaN or infinite reading
    #[error("sample {index} has non-finite value {value}")]
    NonFiniteValue { index: usize, value: f64 },

    /// Generated timestamp falls outside the representable range
    #[error("timestamp of sample {index} is out of range")]
    TimestampOverflow { index: usize },

    /// Parallel columns of different lengths
    #[error("column length mismatch: {timestamps} timestamps, {values} values")]
    LengthMismatch { timestamps: usize, values: usize },
}
