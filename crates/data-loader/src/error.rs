//! Loader Error Types

use signal_series::SeriesError;
use thiserror::Error;

/// Errors while reading or cleaning a record source
#[derive(Debug, Error)]
pub enum LoadError {
    /// Source could not be read
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Source is not valid JSON
    #[error("Invalid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// Top-level JSON value is not a list of records
    #[error("Expected a JSON array of records, found {0}")]
    NotAnArray(&'static str),

    /// Cleaned readings still violate the series contract
    #[error("Cleaned readings do not form a valid series: {0}")]
    Series(#[from] SeriesError),
}
