//! JSON Record Loader

use crate::error::LoadError;
use crate::preprocess::{preprocess, FillMethod, LoadReport};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use signal_series::SignalSeries;
use std::path::Path;
use tracing::{info, warn};

/// Loader configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Record field holding the timestamp
    pub timestamp_field: String,
    /// Record field holding the energy reading
    pub value_field: String,
    /// How missing readings are filled
    pub fill_method: FillMethod,
    /// Remove readings that are zero or negative before filling
    pub drop_non_positive: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            timestamp_field: "timestamp".to_string(),
            value_field: "value".to_string(),
            fill_method: FillMethod::Interpolate,
            drop_non_positive: true,
        }
    }
}

/// A parsed record whose reading may still be missing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawReading {
    pub timestamp: DateTime<Utc>,
    pub value: Option<f64>,
}

/// Chronologically sorted readings before cleaning
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawReadings {
    pub readings: Vec<RawReading>,
    /// Records in the source
    pub records_read: usize,
    /// Records dropped because the timestamp could not be parsed
    pub unparseable_timestamps: usize,
}

/// Reads machine energy records into a [`SignalSeries`]
#[derive(Debug, Clone, Default)]
pub struct MachineDataLoader {
    config: LoaderConfig,
}

impl MachineDataLoader {
    pub fn new(config: LoaderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Read and sort the records in a JSON file
    pub fn load(&self, path: impl AsRef<Path>) -> Result<RawReadings, LoadError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.display().to_string(),
            source,
        })?;
        self.load_from_str(&text)
    }

    /// Read and sort the records in a JSON document
    pub fn load_from_str(&self, json: &str) -> Result<RawReadings, LoadError> {
        let document: Value = serde_json::from_str(json)?;
        let records = match document {
            Value::Array(records) => records,
            other => return Err(LoadError::NotAnArray(json_kind(&other))),
        };

        let records_read = records.len();
        let mut readings: Vec<RawReading> = records
            .iter()
            .filter_map(|record| {
                let timestamp = record.get(&self.config.timestamp_field).and_then(parse_timestamp)?;
                let value = record
                    .get(&self.config.value_field)
                    .and_then(Value::as_f64)
                    .filter(|v| v.is_finite());
                Some(RawReading { timestamp, value })
            })
            .collect();

        let unparseable_timestamps = records_read - readings.len();
        if unparseable_timestamps > 0 {
            warn!(
                "Dropped {} of {} records with missing or unparseable '{}'",
                unparseable_timestamps, records_read, self.config.timestamp_field
            );
        }

        readings.sort_by_key(|r| r.timestamp);

        Ok(RawReadings {
            readings,
            records_read,
            unparseable_timestamps,
        })
    }

    /// Clean sorted readings into a series
    pub fn preprocess(&self, raw: RawReadings) -> Result<(SignalSeries, LoadReport), LoadError> {
        preprocess(raw, self.config.fill_method, self.config.drop_non_positive)
    }

    /// Load, sort and clean a JSON file in one step
    pub fn load_series(&self, path: impl AsRef<Path>) -> Result<(SignalSeries, LoadReport), LoadError> {
        let raw = self.load(path)?;
        let (series, report) = self.preprocess(raw)?;
        info!(
            "Loaded {} samples from {} records ({} non-positive dropped, {} missing filled)",
            series.len(),
            report.records_read,
            report.non_positive_dropped,
            report.missing_filled
        );
        Ok((series, report))
    }
}

/// Parse a timestamp from a string or from integer epoch milliseconds
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_timestamp_str(s),
        Value::Number(n) => n.as_i64().and_then(DateTime::<Utc>::from_timestamp_millis),
        _ => None,
    }
}

fn parse_timestamp_str(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
