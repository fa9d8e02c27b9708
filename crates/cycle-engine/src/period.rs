//! Units Produced per Period
//!
//! Counts cycle starts in fixed-width buckets aligned to the Unix epoch.

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::segmenter::SegmentedSeries;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Widest accepted bucket: 100 years of 366 days
pub const MAX_WIDTH_SECONDS: i64 = 100 * 366 * 86_400;

/// Fixed bucket width, stored in whole seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Frequency {
    seconds: i64,
}

impl Frequency {
    /// Create a width of `seconds`, in `1..=MAX_WIDTH_SECONDS`
    pub fn from_seconds(seconds: i64) -> Result<Self, EngineError> {
        if seconds <= 0 {
            return Err(EngineError::InvalidFrequency(format!(
                "width must be positive, got {seconds}s"
            )));
        }
        if seconds > MAX_WIDTH_SECONDS {
            return Err(EngineError::InvalidFrequency(format!(
                "width must be at most {MAX_WIDTH_SECONDS}s, got {seconds}s"
            )));
        }
        Ok(Self { seconds })
    }

    /// One hour
    pub fn hourly() -> Self {
        Self { seconds: 3600 }
    }

    /// One day
    pub fn daily() -> Self {
        Self { seconds: 86_400 }
    }

    /// Width in seconds
    pub fn as_seconds(&self) -> i64 {
        self.seconds
    }

    /// Start of the bucket containing `ts`, clamped to the earliest
    /// representable instant
    pub fn floor(&self, ts: DateTime<Utc>) -> DateTime<Utc> {
        let offset = Duration::seconds(ts.timestamp().rem_euclid(self.seconds))
            + Duration::nanoseconds(i64::from(ts.timestamp_subsec_nanos()));
        ts.checked_sub_signed(offset).unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

impl FromStr for Frequency {
    type Err = EngineError;

    /// Parse widths like `1H`, `2h`, `30min`, `15T`, `45s`, `1D`, `1W`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
        let (count, unit) = s.split_at(split);

        let count: i64 = if count.is_empty() {
            1
        } else {
            count
                .parse()
                .map_err(|_| EngineError::InvalidFrequency(s.to_string()))?
        };

        let unit_seconds = match unit {
            "s" | "S" | "sec" => 1,
            "min" | "T" | "m" => 60,
            "h" | "H" => 3600,
            "d" | "D" => 86_400,
            "w" | "W" => 604_800,
            _ => return Err(EngineError::InvalidFrequency(s.to_string())),
        };

        count
            .checked_mul(unit_seconds)
            .ok_or_else(|| EngineError::InvalidFrequency(s.to_string()))
            .and_then(Self::from_seconds)
    }
}

impl TryFrom<String> for Frequency {
    type Error = EngineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Frequency> for String {
    fn from(freq: Frequency) -> Self {
        freq.to_string()
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.seconds;
        if s % 604_800 == 0 {
            write!(f, "{}W", s / 604_800)
        } else if s % 86_400 == 0 {
            write!(f, "{}D", s / 86_400)
        } else if s % 3600 == 0 {
            write!(f, "{}H", s / 3600)
        } else if s % 60 == 0 {
            write!(f, "{}min", s / 60)
        } else {
            write!(f, "{s}s")
        }
    }
}

/// Number of cycles started within one bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodCount {
    pub period_start: DateTime<Utc>,
    pub units_produced: usize,
}

/// Start timestamp of every cycle, in order of first appearance
pub fn cycle_starts(segmented: &SegmentedSeries) -> Vec<DateTime<Utc>> {
    let mut seen = HashSet::new();
    segmented
        .in_cycle()
        .filter(|row| seen.insert(row.cycle_id))
        .map(|row| row.sample.timestamp)
        .collect()
}

/// Count cycle starts per bucket of width `freq`
///
/// Only non-empty buckets are returned, in ascending order.
pub fn count_units_by_period(segmented: &SegmentedSeries, freq: Frequency) -> Vec<PeriodCount> {
    let starts = cycle_starts(segmented);

    let mut buckets: BTreeMap<DateTime<Utc>, usize> = BTreeMap::new();
    for ts in &starts {
        *buckets.entry(freq.floor(*ts)).or_insert(0) += 1;
    }

    debug!(
        "Counted {} cycle starts into {} buckets of {}",
        starts.len(),
        buckets.len(),
        freq
    );

    buckets
        .into_iter()
        .map(|(period_start, units_produced)| PeriodCount {
            period_start,
            units_produced,
        })
        .collect()
}

/// Aggregator bound to a configured bucket width
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodAggregator {
    freq: Frequency,
}

impl PeriodAggregator {
    pub fn new(freq: Frequency) -> Self {
        Self { freq }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.default_resample_width)
    }

    pub fn frequency(&self) -> Frequency {
        self.freq
    }

    pub fn count(&self, segmented: &SegmentedSeries) -> Vec<PeriodCount> {
        count_units_by_period(segmented, self.freq)
    }
}
