//! Reading Cleanup and Gap Filling

use crate::error::LoadError;
use crate::loader::RawReadings;
use serde::{Deserialize, Serialize};
use signal_series::{Sample, SignalSeries};
use tracing::{debug, warn};

/// How missing readings are filled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillMethod {
    /// Linear interpolation by position; trailing gaps repeat the last reading
    #[default]
    Interpolate,
    /// Repeat the previous reading
    ForwardFill,
    /// Remove records without a reading
    Drop,
}

/// Row accounting for one load
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadReport {
    pub records_read: usize,
    pub unparseable_timestamps: usize,
    pub non_positive_dropped: usize,
    pub missing_filled: usize,
    pub missing_dropped: usize,
    pub samples: usize,
}

/// Turn sorted raw readings into a series
///
/// Zero and negative readings are removed first when `drop_non_positive` is
/// set; remaining gaps are then filled with `method`. Gaps that cannot be
/// filled (a leading gap) are removed.
pub fn preprocess(
    raw: RawReadings,
    method: FillMethod,
    drop_non_positive: bool,
) -> Result<(SignalSeries, LoadReport), LoadError> {
    let before = raw.readings.len();
    let readings: Vec<_> = raw
        .readings
        .into_iter()
        .filter(|r| !drop_non_positive || r.value.map_or(true, |v| v > 0.0))
        .collect();
    let non_positive_dropped = before - readings.len();

    let values: Vec<Option<f64>> = readings.iter().map(|r| r.value).collect();
    let missing = values.iter().filter(|v| v.is_none()).count();
    let filled = match method {
        FillMethod::Interpolate => interpolate(&values),
        FillMethod::ForwardFill => forward_fill(&values),
        FillMethod::Drop => values,
    };

    let samples: Vec<Sample> = readings
        .iter()
        .zip(&filled)
        .filter_map(|(r, v)| v.map(|value| Sample::new(r.timestamp, value)))
        .collect();
    let missing_dropped = readings.len() - samples.len();
    let missing_filled = missing - missing_dropped;

    if missing_dropped > 0 {
        warn!("Dropped {} readings that could not be filled", missing_dropped);
    }
    debug!(
        "Preprocessed {} readings with {:?}: {} filled, {} non-positive removed",
        before, method, missing_filled, non_positive_dropped
    );

    let report = LoadReport {
        records_read: raw.records_read,
        unparseable_timestamps: raw.unparseable_timestamps,
        non_positive_dropped,
        missing_filled,
        missing_dropped,
        samples: samples.len(),
    };
    Ok((SignalSeries::new(samples)?, report))
}

/// Linear interpolation between known neighbours
pub fn interpolate(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut out = values.to_vec();
    let mut prev: Option<(usize, f64)> = None;

    for (i, value) in values.iter().enumerate() {
        let Some(v) = *value else { continue };
        if let Some((p, pv)) = prev {
            let span = (i - p) as f64;
            for (j, slot) in out.iter_mut().enumerate().take(i).skip(p + 1) {
                *slot = Some(pv + (v - pv) * (j - p) as f64 / span);
            }
        }
        prev = Some((i, v));
    }

    if let Some((p, pv)) = prev {
        for slot in out.iter_mut().skip(p + 1) {
            *slot = Some(pv);
        }
    }
    out
}

/// Carry the last known reading forward
pub fn forward_fill(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut last = None;
    values
        .iter()
        .map(|v| {
            if v.is_some() {
                last = *v;
            }
            last
        })
        .collect()
}
