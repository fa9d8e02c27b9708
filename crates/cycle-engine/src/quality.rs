//! Cycle Duration Quality Assessment

use crate::config::{EngineConfig, DEFAULT_ANOMALY_TOLERANCE};
use crate::error::EngineError;
use crate::segmenter::SegmentedSeries;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Outcome of comparing a cycle against the baseline duration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityFlag {
    Ok,
    Anomalous,
}

/// Boundaries of one production cycle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cycle {
    pub cycle_id: u32,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// `end_time - start_time`; zero for a single-sample cycle
    pub duration_sec: f64,
}

/// Cycle plus its quality flag
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    #[serde(flatten)]
    pub cycle: Cycle,
    pub quality_flag: QualityFlag,
}

/// Reports for one call together with the baseline that produced them
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityAssessment {
    /// `None` only when there were no cycles and no explicit baseline
    pub baseline_sec: Option<f64>,
    pub reports: Vec<QualityReport>,
}

impl QualityAssessment {
    /// Number of cycles flagged anomalous
    pub fn anomalous_count(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| r.quality_flag == QualityFlag::Anomalous)
            .count()
    }
}

/// Build one [`Cycle`] per distinct positive id, ordered by id
pub fn extract_cycles(segmented: &SegmentedSeries) -> Vec<Cycle> {
    let mut bounds: BTreeMap<u32, (DateTime<Utc>, DateTime<Utc>)> = BTreeMap::new();

    for row in segmented.in_cycle() {
        let ts = row.sample.timestamp;
        bounds
            .entry(row.cycle_id)
            .and_modify(|(start, end)| {
                *start = (*start).min(ts);
                *end = (*end).max(ts);
            })
            .or_insert((ts, ts));
    }

    bounds
        .into_iter()
        .map(|(cycle_id, (start_time, end_time))| Cycle {
            cycle_id,
            start_time,
            end_time,
            duration_sec: seconds_between(start_time, end_time),
        })
        .collect()
}

fn seconds_between(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    let delta = end - start;
    delta.num_seconds() as f64 + f64::from(delta.subsec_nanos()) / 1e9
}

/// Median of `values`, averaging the two middle values for even counts
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Flags cycles whose duration strays from a baseline
///
/// A zero baseline flags every cycle with a nonzero duration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleQualityAssessor {
    tolerance: f64,
}

impl Default for CycleQualityAssessor {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_ANOMALY_TOLERANCE,
        }
    }
}

impl CycleQualityAssessor {
    /// Create an assessor with a relative tolerance
    pub fn new(tolerance: f64) -> Result<Self, EngineError> {
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(EngineError::InvalidTolerance(tolerance));
        }
        Ok(Self { tolerance })
    }

    /// Create an assessor from engine configuration
    pub fn from_config(config: &EngineConfig) -> Result<Self, EngineError> {
        Self::new(config.anomaly_tolerance_fraction)
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Flag for a single duration against `baseline`
    pub fn classify(&self, duration_sec: f64, baseline: f64) -> QualityFlag {
        if (duration_sec - baseline).abs() > self.tolerance * baseline {
            QualityFlag::Anomalous
        } else {
            QualityFlag::Ok
        }
    }

    /// Assess every cycle in `segmented`
    ///
    /// Without `expected_duration` the baseline is the median duration of the
    /// cycles in this call.
    pub fn assess(
        &self,
        segmented: &SegmentedSeries,
        expected_duration: Option<f64>,
    ) -> Result<QualityAssessment, EngineError> {
        if let Some(expected) = expected_duration {
            if !expected.is_finite() || expected < 0.0 {
                return Err(EngineError::InvalidBaseline(expected));
            }
        }

        let cycles = extract_cycles(segmented);
        let durations: Vec<f64> = cycles.iter().map(|c| c.duration_sec).collect();
        let baseline = expected_duration.or_else(|| median(&durations));

        let Some(baseline) = baseline else {
            debug!("No cycles to assess");
            return Ok(QualityAssessment::default());
        };

        let reports: Vec<QualityReport> = cycles
            .into_iter()
            .map(|cycle| {
                metrics::histogram!("cycle_duration_seconds").record(cycle.duration_sec);
                QualityReport {
                    quality_flag: self.classify(cycle.duration_sec, baseline),
                    cycle,
                }
            })
            .collect();

        let assessment = QualityAssessment {
            baseline_sec: Some(baseline),
            reports,
        };
        let anomalous = assessment.anomalous_count();
        metrics::counter!("cycles_anomalous_total").increment(anomalous as u64);

        info!(
            "Assessed {} cycles against baseline {:.1}s: {} anomalous",
            assessment.reports.len(),
            baseline,
            anomalous
        );

        Ok(assessment)
    }
}

/// Assess cycle quality with the default tolerance
pub fn assess_cycle_quality(
    segmented: &SegmentedSeries,
    expected_duration: Option<f64>,
) -> Result<Vec<QualityReport>, EngineError> {
    CycleQualityAssessor::default()
        .assess(segmented, expected_duration)
        .map(|a| a.reports)
}
