//! Production Cycle Engine
//!
//! Turns a machine's energy signal into discrete production cycles and the
//! two views built on them:
//! - Cycle segmentation (threshold + minimum run length)
//! - Units produced per calendar period
//! - Cycle duration quality against a baseline

pub mod config;
pub mod error;
pub mod period;
pub mod quality;
pub mod segmenter;

pub use config::{
    EngineConfig, DEFAULT_ACTIVATION_THRESHOLD, DEFAULT_ANOMALY_TOLERANCE, DEFAULT_MIN_RUN_LENGTH,
};
pub use error::EngineError;
pub use period::{
    count_units_by_period, cycle_starts, Frequency, PeriodAggregator, PeriodCount, MAX_WIDTH_SECONDS,
};
pub use quality::{
    assess_cycle_quality, extract_cycles, median, Cycle, CycleQualityAssessor, QualityAssessment,
    QualityFlag, QualityReport,
};
pub use segmenter::{
    active_spans, label_spans, retain_spans, segment, ActiveSpan, CycleSegmenter,
    SegmentedSample, SegmentedSeries,
};
