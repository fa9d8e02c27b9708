//! Production Cycle Segmentation
//!
//! Splits an energy signal into production cycles in three pure steps:
//!
//! 1. find every maximal run of active samples (`value > threshold`)
//! 2. drop runs shorter than the minimum run length, except a run that is
//!    still open when the series ends
//! 3. number the surviving runs 1, 2, 3, ... in time order
//!
//! Samples outside a surviving run get cycle id 0.

use crate::config::EngineConfig;
use crate::error::EngineError;
use serde::Serialize;
use signal_series::{Sample, SignalSeries};
use tracing::{debug, info};

/// Half-open index range `[start, end)` of consecutive active samples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ActiveSpan {
    pub start: usize,
    pub end: usize,
}

impl ActiveSpan {
    /// Number of samples in the span
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Spans produced by [`active_spans`] are never empty
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// Find all maximal runs of samples whose value is strictly above `threshold`
pub fn active_spans(samples: &[Sample], threshold: f64) -> Vec<ActiveSpan> {
    let mut spans = Vec::new();
    let mut open: Option<usize> = None;

    for (i, sample) in samples.iter().enumerate() {
        let active = sample.value > threshold;
        match (active, open) {
            (true, None) => open = Some(i),
            (false, Some(start)) => {
                spans.push(ActiveSpan { start, end: i });
                open = None;
            }
            _ => {}
        }
    }

    if let Some(start) = open {
        spans.push(ActiveSpan {
            start,
            end: samples.len(),
        });
    }

    spans
}

/// Keep spans of at least `min_run_length` samples
///
/// A span reaching `series_len` is kept whatever its length: the series ended
/// before the run did, so there is nothing to judge it against.
pub fn retain_spans(
    spans: Vec<ActiveSpan>,
    min_run_length: usize,
    series_len: usize,
) -> (Vec<ActiveSpan>, usize) {
    let total = spans.len();
    let kept: Vec<ActiveSpan> = spans
        .into_iter()
        .filter(|span| span.len() >= min_run_length || span.end == series_len)
        .collect();
    let discarded = total - kept.len();
    (kept, discarded)
}

/// Assign ids 1..=k to `spans` over a column of `len` samples
pub fn label_spans(len: usize, spans: &[ActiveSpan]) -> Vec<u32> {
    let mut ids = vec![0u32; len];
    for (n, span) in spans.iter().enumerate() {
        let id = n as u32 + 1;
        ids[span.start..span.end].fill(id);
    }
    ids
}

/// Energy series annotated with a cycle id per sample
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentedSeries {
    series: SignalSeries,
    cycle_ids: Vec<u32>,
}

/// One row of a segmented series
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SegmentedSample {
    #[serde(flatten)]
    pub sample: Sample,
    pub cycle_id: u32,
}

impl SegmentedSeries {
    /// Pair a series with an externally produced id column
    pub fn from_parts(series: SignalSeries, cycle_ids: Vec<u32>) -> Result<Self, EngineError> {
        if series.len() != cycle_ids.len() {
            return Err(EngineError::LengthMismatch {
                samples: series.len(),
                ids: cycle_ids.len(),
            });
        }
        Ok(Self { series, cycle_ids })
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.cycle_ids.len()
    }

    /// Check if there are no samples
    pub fn is_empty(&self) -> bool {
        self.cycle_ids.is_empty()
    }

    /// Underlying series
    pub fn series(&self) -> &SignalSeries {
        &self.series
    }

    /// Cycle id per sample (0 = no cycle)
    pub fn cycle_ids(&self) -> &[u32] {
        &self.cycle_ids
    }

    /// Iterate rows in time order
    pub fn iter(&self) -> impl Iterator<Item = SegmentedSample> + '_ {
        self.series
            .iter()
            .zip(&self.cycle_ids)
            .map(|(&sample, &cycle_id)| SegmentedSample { sample, cycle_id })
    }

    /// Rows that belong to a cycle
    pub fn in_cycle(&self) -> impl Iterator<Item = SegmentedSample> + '_ {
        self.iter().filter(|row| row.cycle_id > 0)
    }

    /// Number of distinct positive cycle ids
    pub fn cycle_count(&self) -> usize {
        let mut ids: Vec<u32> = self.cycle_ids.iter().copied().filter(|&id| id > 0).collect();
        ids.sort_unstable();
        ids.dedup();
        ids.len()
    }
}

/// Threshold/run-length segmenter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleSegmenter {
    threshold: f64,
    min_run_length: usize,
}

impl CycleSegmenter {
    /// Create a segmenter, rejecting non-finite thresholds and zero run lengths
    pub fn new(threshold: f64, min_run_length: usize) -> Result<Self, EngineError> {
        if !threshold.is_finite() {
            return Err(EngineError::InvalidThreshold(threshold));
        }
        if min_run_length < 1 {
            return Err(EngineError::InvalidMinRunLength(min_run_length));
        }
        Ok(Self {
            threshold,
            min_run_length,
        })
    }

    /// Create a segmenter from engine configuration
    pub fn from_config(config: &EngineConfig) -> Result<Self, EngineError> {
        Self::new(config.activation_threshold, config.min_run_length)
    }

    /// Activation threshold
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Minimum run length
    pub fn min_run_length(&self) -> usize {
        self.min_run_length
    }

    /// Retained cycle spans for a series
    pub fn spans(&self, series: &SignalSeries) -> Vec<ActiveSpan> {
        let runs = active_spans(series.samples(), self.threshold);
        let found = runs.len();
        let (kept, discarded) = retain_spans(runs, self.min_run_length, series.len());

        if discarded > 0 {
            debug!(
                "Discarded {} of {} active runs shorter than {} samples",
                discarded, found, self.min_run_length
            );
        }
        metrics::counter!("cycles_retained_total").increment(kept.len() as u64);
        metrics::counter!("cycles_discarded_total").increment(discarded as u64);

        kept
    }

    /// Segment a series into production cycles
    pub fn segment(&self, series: &SignalSeries) -> SegmentedSeries {
        let spans = self.spans(series);
        let cycle_ids = label_spans(series.len(), &spans);

        info!(
            "Segmented {} samples into {} cycles (threshold={}, min_run_length={})",
            series.len(),
            spans.len(),
            self.threshold,
            self.min_run_length
        );

        SegmentedSeries {
            series: series.clone(),
            cycle_ids,
        }
    }
}

/// Segment `series` with an explicit threshold and minimum run length
pub fn segment(
    series: &SignalSeries,
    threshold: f64,
    min_run_length: usize,
) -> Result<SegmentedSeries, EngineError> {
    Ok(CycleSegmenter::new(threshold, min_run_length)?.segment(series))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use proptest::prelude::*;

    fn series(values: &[f64]) -> SignalSeries {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        SignalSeries::regular(t0, Duration::minutes(1), values).unwrap()
    }

    /// Single-pass state machine: a run that ends short is relabelled 0 and
    /// gives its id back
    fn reference_ids(values: &[f64], threshold: f64, min_run_length: usize) -> Vec<u32> {
        let mut ids = Vec::with_capacity(values.len());
        let mut next_id = 0u32;
        let mut in_cycle = false;
        let mut run = 0usize;
        for &v in values {
            if v > threshold {
                if !in_cycle {
                    in_cycle = true;
                    run = 1;
                    next_id += 1;
                } else {
                    run += 1;
                }
                ids.push(next_id);
            } else {
                if in_cycle && run < min_run_length {
                    next_id -= 1;
                    let len = ids.len();
                    ids[len - run..].iter_mut().for_each(|id| *id = 0);
                }
                in_cycle = false;
                run = 0;
                ids.push(0);
            }
        }
        ids
    }

    #[test]
    fn test_basic_segmentation() {
        let s = series(&[0.0, 5.0, 15.0, 15.0, 5.0, 0.0, 20.0, 25.0, 0.0]);
        let out = segment(&s, 10.0, 2).unwrap();
        assert_eq!(out.cycle_ids(), &[0, 0, 1, 1, 0, 0, 2, 2, 0]);
        assert_eq!(out.cycle_count(), 2);
    }

    #[test]
    fn test_short_run_discarded_and_id_reused() {
        let s = series(&[20.0, 0.0, 20.0, 20.0, 20.0, 0.0, 20.0, 20.0, 20.0, 0.0]);
        let out = segment(&s, 10.0, 3).unwrap();
        assert_eq!(out.cycle_ids(), &[0, 0, 1, 1, 1, 0, 2, 2, 2, 0]);
    }

    #[test]
    fn test_leading_short_run_unlabelled() {
        let out = segment(&series(&[20.0, 0.0]), 5.0, 2).unwrap();
        assert_eq!(out.cycle_ids(), &[0, 0]);
        let out = segment(&series(&[20.0, 0.0, 20.0]), 10.0, 2).unwrap();
        assert_eq!(out.cycle_ids(), &[0, 0, 1]);
    }

    #[test]
    fn test_trailing_short_run_kept() {
        let s = series(&[20.0, 20.0, 20.0, 0.0, 20.0]);
        let out = segment(&s, 10.0, 3).unwrap();
        assert_eq!(out.cycle_ids(), &[1, 1, 1, 0, 2]);
    }

    #[test]
    fn test_threshold_is_strict() {
        let s = series(&[10.0, 10.0, 10.0]);
        let out = segment(&s, 10.0, 1).unwrap();
        assert_eq!(out.cycle_ids(), &[0, 0, 0]);
    }

    #[test]
    fn test_everything_active_is_one_cycle() {
        let s = series(&[50.0; 8]);
        let out = segment(&s, 10.0, 20).unwrap();
        assert_eq!(out.cycle_ids(), &[1; 8]);
    }

    #[test]
    fn test_empty_series() {
        let out = segment(&SignalSeries::default(), 10.0, 2).unwrap();
        assert!(out.is_empty());
        assert_eq!(out.cycle_count(), 0);
    }

    #[test]
    fn test_single_sample() {
        let out = segment(&series(&[42.0]), 10.0, 5).unwrap();
        assert_eq!(out.cycle_ids(), &[1]);
    }

    #[test]
    fn test_invalid_parameters() {
        let s = series(&[1.0]);
        assert_eq!(
            segment(&s, f64::NAN, 2).unwrap_err().to_string(),
            "activation threshold must be finite, got NaN"
        );
        assert_eq!(segment(&s, 10.0, 0), Err(EngineError::InvalidMinRunLength(0)));
    }

    #[test]
    fn test_spans_phases() {
        let s = series(&[20.0, 0.0, 20.0, 20.0, 0.0, 20.0]);
        let runs = active_spans(s.samples(), 10.0);
        assert_eq!(
            runs,
            vec![
                ActiveSpan { start: 0, end: 1 },
                ActiveSpan { start: 2, end: 4 },
                ActiveSpan { start: 5, end: 6 },
            ]
        );
        let (kept, discarded) = retain_spans(runs, 2, s.len());
        assert_eq!(discarded, 1);
        assert_eq!(kept.len(), 2);
        assert_eq!(label_spans(s.len(), &kept), vec![0, 0, 1, 1, 0, 2]);
    }

    #[test]
    fn test_from_parts_length_check() {
        let err = SegmentedSeries::from_parts(series(&[1.0, 2.0]), vec![0]).unwrap_err();
        assert_eq!(err, EngineError::LengthMismatch { samples: 2, ids: 1 });
    }

    proptest! {
        #[test]
        fn prop_matches_single_pass_reference(
            values in prop::collection::vec(0.0f64..40.0, 0..200),
            threshold in 5.0f64..30.0,
            min_run_length in 1usize..6,
        ) {
            let out = segment(&series(&values), threshold, min_run_length).unwrap();
            prop_assert_eq!(out.cycle_ids().to_vec(), reference_ids(&values, threshold, min_run_length));
        }

        #[test]
        fn prop_short_closed_runs_unlabelled(
            values in prop::collection::vec(0.0f64..40.0, 0..200),
            min_run_length in 1usize..6,
        ) {
            let threshold = 20.0;
            let out = segment(&series(&values), threshold, min_run_length).unwrap();
            let ids = out.cycle_ids();
            let mut start = None;
            for (i, &v) in values.iter().enumerate() {
                match (v > threshold, start) {
                    (true, None) => start = Some(i),
                    (false, Some(s)) => {
                        if i - s < min_run_length {
                            prop_assert!(ids[s..i].iter().all(|&id| id == 0));
                        } else {
                            prop_assert!(ids[s..i].iter().all(|&id| id > 0));
                        }
                        start = None;
                    }
                    _ => {}
                }
            }
        }

        #[test]
        fn prop_ids_are_consecutive_from_one(
            values in prop::collection::vec(0.0f64..40.0, 0..200),
            min_run_length in 1usize..6,
        ) {
            let out = segment(&series(&values), 20.0, min_run_length).unwrap();
            let mut seen: Vec<u32> = out.cycle_ids().iter().copied().filter(|&id| id > 0).collect();
            seen.dedup();
            let expected: Vec<u32> = (1..=seen.len() as u32).collect();
            prop_assert_eq!(seen, expected);
        }

        #[test]
        fn prop_minimum_run_law(
            values in prop::collection::vec(0.0f64..40.0, 0..200),
            min_run_length in 1usize..6,
        ) {
            let out = segment(&series(&values), 20.0, min_run_length).unwrap();
            let ids = out.cycle_ids();
            let k = out.cycle_count() as u32;
            for id in 1..k {
                let count = ids.iter().filter(|&&x| x == id).count();
                prop_assert!(count >= min_run_length);
            }
        }

        #[test]
        fn prop_inactive_samples_never_in_cycle(
            values in prop::collection::vec(0.0f64..40.0, 0..200),
        ) {
            let out = segment(&series(&values), 20.0, 3).unwrap();
            for row in out.iter() {
                if row.sample.value <= 20.0 {
                    prop_assert_eq!(row.cycle_id, 0);
                }
            }
        }
    }
}
