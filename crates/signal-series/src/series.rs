//! Ordered Sample Series

use crate::{Sample, SeriesError};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Chronologically non-decreasing sequence of samples
///
/// Construction validates ordering and finiteness once, so downstream stages
/// can consume the samples in input order without re-checking or re-sorting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Sample>", into = "Vec<Sample>")]
pub struct SignalSeries {
    samples: Vec<Sample>,
}

impl SignalSeries {
    /// Build a series, rejecting out-of-order timestamps and non-finite values
    pub fn new(samples: Vec<Sample>) -> Result<Self, SeriesError> {
        for (index, sample) in samples.iter().enumerate() {
            if !sample.value.is_finite() {
                return Err(SeriesError::NonFiniteValue {
                    index,
                    value: sample.value,
                });
            }
            if index > 0 {
                let previous = samples[index - 1].timestamp;
                if sample.timestamp < previous {
                    return Err(SeriesError::Unordered {
                        index,
                        timestamp: sample.timestamp,
                        previous,
                    });
                }
            }
        }
        Ok(Self { samples })
    }

    /// Build a series from parallel timestamp and value columns
    pub fn from_columns(
        timestamps: &[DateTime<Utc>],
        values: &[f64],
    ) -> Result<Self, SeriesError> {
        if timestamps.len() != values.len() {
            return Err(SeriesError::LengthMismatch {
                timestamps: timestamps.len(),
                values: values.len(),
            });
        }
        let samples = timestamps
            .iter()
            .zip(values)
            .map(|(&timestamp, &value)| Sample::new(timestamp, value))
            .collect();
        Self::new(samples)
    }

    /// Build an evenly spaced series starting at `start`
    pub fn regular(
        start: DateTime<Utc>,
        step: Duration,
        values: &[f64],
    ) -> Result<Self, SeriesError> {
        let samples = values
            .iter()
            .enumerate()
            .map(|(index, &value)| {
                i32::try_from(index)
                    .ok()
                    .and_then(|i| step.checked_mul(i))
                    .and_then(|offset| start.checked_add_signed(offset))
                    .map(|timestamp| Sample::new(timestamp, value))
                    .ok_or(SeriesError::TimestampOverflow { index })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(samples)
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if the series holds no samples
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Borrow the samples in time order
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Iterate over samples in time order
    pub fn iter(&self) -> std::slice::Iter<'_, Sample> {
        self.samples.iter()
    }

    /// Copy out the value column
    pub fn values(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.value).collect()
    }

    /// First timestamp, if any
    pub fn start(&self) -> Option<DateTime<Utc>> {
        self.samples.first().map(|s| s.timestamp)
    }

    /// Last timestamp, if any
    pub fn end(&self) -> Option<DateTime<Utc>> {
        self.samples.last().map(|s| s.timestamp)
    }

    /// Consume the series and return its samples
    pub fn into_samples(self) -> Vec<Sample> {
        self.samples
    }
}

impl TryFrom<Vec<Sample>> for SignalSeries {
    type Error = SeriesError;

    fn try_from(samples: Vec<Sample>) -> Result<Self, Self::Error> {
        Self::new(samples)
    }
}

impl From<SignalSeries> for Vec<Sample> {
    fn from(series: SignalSeries) -> Self {
        series.samples
    }
}

impl<'a> IntoIterator for &'a SignalSeries {
    type Item = &'a Sample;
    type IntoIter = std::slice::Iter<'a, Sample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_regular_series() {
        let series = SignalSeries::regular(t0(), Duration::minutes(1), &[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(series.start(), Some(t0()));
        assert_eq!(series.end(), Some(t0() + Duration::minutes(2)));
        assert_eq!(series.values(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_regular_out_of_range() {
        let err = SignalSeries::regular(t0(), Duration::days(100_000_000), &[1.0, 2.0]).unwrap_err();
        assert_eq!(err, SeriesError::TimestampOverflow { index: 1 });
    }

    #[test]
    fn test_empty_series_is_valid() {
        let series = SignalSeries::new(Vec::new()).unwrap();
        assert!(series.is_empty());
        assert_eq!(series.start(), None);
    }

    #[test]
    fn test_rejects_unordered() {
        let samples = vec![
            Sample::new(t0() + Duration::seconds(10), 1.0),
            Sample::new(t0(), 2.0),
        ];
        let err = SignalSeries::new(samples).unwrap_err();
        assert!(matches!(err, SeriesError::Unordered { index: 1, .. }));
    }

    #[test]
    fn test_equal_timestamps_allowed() {
        let samples = vec![Sample::new(t0(), 1.0), Sample::new(t0(), 2.0)];
        assert!(SignalSeries::new(samples).is_ok());
    }

    #[test]
    fn test_rejects_nan() {
        let err = SignalSeries::regular(t0(), Duration::seconds(1), &[1.0, f64::NAN]).unwrap_err();
        assert!(matches!(err, SeriesError::NonFiniteValue { index: 1, .. }));
    }

    #[test]
    fn test_column_length_mismatch() {
        let err = SignalSeries::from_columns(&[t0()], &[1.0, 2.0]).unwrap_err();
        assert_eq!(
            err,
            SeriesError::LengthMismatch {
                timestamps: 1,
                values: 2
            }
        );
    }

    #[test]
    fn test_deserialize_validates_order() {
        let json = r#"[
            {"timestamp": "2024-01-01T00:01:00Z", "value": 1.0},
            {"timestamp": "2024-01-01T00:00:00Z", "value": 2.0}
        ]"#;
        assert!(serde_json::from_str::<SignalSeries>(json).is_err());
    }

    proptest! {
        #[test]
        fn prop_sorted_offsets_always_accepted(mut offsets in prop::collection::vec(0i64..10_000, 0..64)) {
            offsets.sort_unstable();
            let samples = offsets
                .iter()
                .map(|&s| Sample::new(t0() + Duration::seconds(s), s as f64))
                .collect();
            let series = SignalSeries::new(samples).unwrap();
            prop_assert_eq!(series.len(), offsets.len());
        }
    }
}
