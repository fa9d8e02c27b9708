//! Combined analysis report

use crate::config::PipelineConfig;
use crate::PipelineError;
use chrono::{DateTime, Utc};
use cycle_engine::{
    CycleQualityAssessor, CycleSegmenter, Frequency, PeriodAggregator, PeriodCount, QualityReport,
};
use data_loader::LoadReport;
use serde::Serialize;
use signal_series::SignalSeries;
use state_detector::{OperatingState, RuleBasedStateDetector, StateDetector};
use tracing::info;

/// Per-call options that are not part of the persistent configuration
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunOptions {
    /// Explicit baseline cycle duration (seconds); median when `None`
    pub expected_duration: Option<f64>,
    /// Also label samples with clustering-based states
    pub cluster_states: bool,
}

/// One sample with every per-sample annotation joined on position
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabeledSample {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    pub cycle_id: u32,
    pub state: OperatingState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_cluster: Option<usize>,
}

/// Headline numbers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSummary {
    pub total_samples: usize,
    pub cycles: usize,
    pub anomalous_cycles: usize,
    pub baseline_sec: Option<f64>,
    pub resample_width: Frequency,
}

/// Everything derived from one series
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnergyReport {
    pub summary: ReportSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load: Option<LoadReport>,
    pub period_counts: Vec<PeriodCount>,
    pub quality: Vec<QualityReport>,
    pub samples: Vec<LabeledSample>,
}

/// Run segmentation, counting, quality and state labeling over `series`
pub fn run_pipeline(
    series: &SignalSeries,
    config: &PipelineConfig,
    options: &RunOptions,
) -> Result<EnergyReport, PipelineError> {
    let segmenter = CycleSegmenter::from_config(&config.engine)?;
    let aggregator = PeriodAggregator::from_config(&config.engine);
    let assessor = CycleQualityAssessor::from_config(&config.engine)?;
    let rules = RuleBasedStateDetector::new(config.states)?;

    let segmented = segmenter.segment(series);
    let period_counts = aggregator.count(&segmented);
    let assessment = assessor.assess(&segmented, options.expected_duration)?;
    let states = rules.classify_states(series);

    let clusters = if options.cluster_states {
        Some(StateDetector::new(config.clustering)?.classify_states(series)?)
    } else {
        None
    };

    let samples = segmented
        .iter()
        .zip(states)
        .enumerate()
        .map(|(i, (row, state))| LabeledSample {
            timestamp: row.sample.timestamp,
            value: row.sample.value,
            cycle_id: row.cycle_id,
            state,
            state_cluster: clusters.as_ref().map(|c| c[i]),
        })
        .collect();

    let summary = ReportSummary {
        total_samples: series.len(),
        cycles: segmented.cycle_count(),
        anomalous_cycles: assessment.anomalous_count(),
        baseline_sec: assessment.baseline_sec,
        resample_width: aggregator.frequency(),
    };

    info!(
        "Pipeline finished: {} samples, {} cycles, {} anomalous, {} periods",
        summary.total_samples,
        summary.cycles,
        summary.anomalous_cycles,
        period_counts.len()
    );

    Ok(EnergyReport {
        summary,
        load: None,
        period_counts,
        quality: assessment.reports,
        samples,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn series(values: &[f64]) -> SignalSeries {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        SignalSeries::regular(t0, Duration::minutes(1), values).unwrap()
    }

    #[test]
    fn test_joined_samples() {
        let config = PipelineConfig {
            engine: cycle_engine::EngineConfig {
                min_run_length: 2,
                ..Default::default()
            },
            ..Default::default()
        };
        let s = series(&[0.0, 5.0, 15.0, 15.0, 5.0, 0.0, 20.0, 25.0, 0.0]);
        let report = run_pipeline(&s, &config, &RunOptions::default()).unwrap();

        let ids: Vec<u32> = report.samples.iter().map(|s| s.cycle_id).collect();
        assert_eq!(ids, vec![0, 0, 1, 1, 0, 0, 2, 2, 0]);
        assert_eq!(report.samples[0].state, OperatingState::Off);
        assert_eq!(report.samples[7].state, OperatingState::Standby);
        assert!(report.samples.iter().all(|s| s.state_cluster.is_none()));
        assert_eq!(report.summary.cycles, 2);
        assert_eq!(report.quality.len(), 2);
        assert_eq!(report.period_counts.iter().map(|p| p.units_produced).sum::<usize>(), 2);
    }

    #[test]
    fn test_empty_series() {
        let report =
            run_pipeline(&SignalSeries::default(), &PipelineConfig::default(), &RunOptions::default())
                .unwrap();
        assert!(report.samples.is_empty());
        assert!(report.period_counts.is_empty());
        assert!(report.quality.is_empty());
        assert_eq!(report.summary.baseline_sec, None);
    }

    #[test]
    fn test_clustering_attached() {
        let values: Vec<f64> = (0..40).map(|i| if i % 10 < 5 { 80.0 } else { 2.0 }).collect();
        let options = RunOptions {
            cluster_states: true,
            ..Default::default()
        };
        let report = run_pipeline(&series(&values), &PipelineConfig::default(), &options).unwrap();
        assert!(report.samples.iter().all(|s| s.state_cluster.is_some()));
    }

    #[test]
    fn test_clustering_failure_surfaces() {
        let options = RunOptions {
            cluster_states: true,
            ..Default::default()
        };
        let err = run_pipeline(&series(&[1.0, 2.0]), &PipelineConfig::default(), &options).unwrap_err();
        assert!(matches!(err, PipelineError::State(_)));
    }
}
