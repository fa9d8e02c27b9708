//! Feature Matrix Assembly

use crate::statistics::WindowStatistics;
use crate::FeatureError;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Number of features per sample
pub const FEATURE_DIMENSION: usize = 4;

/// Column names, in matrix order
pub const FEATURE_NAMES: [&str; FEATURE_DIMENSION] = ["value", "delta", "rolling_mean", "rolling_std"];

/// Default rolling window (samples)
pub const DEFAULT_WINDOW: usize = 5;

/// One row per sample, [`FEATURE_DIMENSION`] columns
pub type FeatureMatrix = Array2<f64>;

/// Rolling feature extractor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollingFeatures {
    /// Centred window size (samples)
    window: usize,
}

impl Default for RollingFeatures {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
        }
    }
}

impl RollingFeatures {
    /// Create an extractor with the given window
    pub fn new(window: usize) -> Result<Self, FeatureError> {
        if window == 0 {
            return Err(FeatureError::InvalidWindow(window));
        }
        Ok(Self { window })
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Build the feature matrix for a value column
    ///
    /// Columns:
    /// 1. raw value
    /// 2. absolute change from the previous sample (0 for the first)
    /// 3. centred rolling mean, edges back-filled then forward-filled
    /// 4. centred rolling standard deviation, 0 at the edges
    pub fn extract(&self, values: &[f64]) -> FeatureMatrix {
        let n = values.len();
        let rolling = WindowStatistics::rolling_centered(values, self.window);

        let rolling_mean = fill_edges(&rolling.iter().map(|s| s.map(|s| s.mean)).collect::<Vec<_>>())
            .unwrap_or_else(|| vec![WindowStatistics::compute(values).mean; n]);

        debug!(
            "Extracting features: {} samples, window={}, {} full windows",
            n,
            self.window,
            rolling.iter().filter(|s| s.is_some()).count()
        );

        let mut matrix = Array2::zeros((n, FEATURE_DIMENSION));
        for i in 0..n {
            matrix[[i, 0]] = values[i];
            matrix[[i, 1]] = if i == 0 { 0.0 } else { (values[i] - values[i - 1]).abs() };
            matrix[[i, 2]] = rolling_mean[i];
            matrix[[i, 3]] = rolling[i].map(|s| s.std_dev).unwrap_or(0.0);
        }
        matrix
    }
}

/// Back-fill then forward-fill gaps; `None` if there is nothing to fill from
fn fill_edges(column: &[Option<f64>]) -> Option<Vec<f64>> {
    let first = column.iter().position(Option::is_some)?;
    let mut filled = Vec::with_capacity(column.len());
    let mut last = column[first]?;
    for (i, value) in column.iter().enumerate() {
        if i >= first {
            if let Some(v) = value {
                last = *v;
            }
        }
        filled.push(last);
    }
    Some(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_feature_shape() {
        let values: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let matrix = RollingFeatures::default().extract(&values);
        assert_eq!(matrix.dim(), (20, FEATURE_DIMENSION));
    }

    #[test]
    fn test_delta_column() {
        let matrix = RollingFeatures::default().extract(&[5.0, 8.0, 2.0]);
        assert_eq!(matrix[[0, 1]], 0.0);
        assert_eq!(matrix[[1, 1]], 3.0);
        assert_eq!(matrix[[2, 1]], 6.0);
    }

    #[test]
    fn test_rolling_mean_edges_filled() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0];
        let matrix = RollingFeatures::default().extract(&values);
        // full windows centred at 2, 3, 4 -> means 3, 4, 5
        let means: Vec<f64> = matrix.column(2).to_vec();
        assert_eq!(means, vec![3.0, 3.0, 3.0, 4.0, 5.0, 5.0, 5.0]);
        // std is zero outside full windows
        assert_eq!(matrix[[0, 3]], 0.0);
        assert!(matrix[[3, 3]] > 0.0);
    }

    #[test]
    fn test_short_series_uses_overall_mean() {
        let matrix = RollingFeatures::default().extract(&[2.0, 4.0]);
        assert_eq!(matrix[[0, 2]], 3.0);
        assert_eq!(matrix[[1, 2]], 3.0);
    }

    #[test]
    fn test_empty_series() {
        let matrix = RollingFeatures::default().extract(&[]);
        assert_eq!(matrix.nrows(), 0);
    }

    #[test]
    fn test_zero_window_rejected() {
        assert_eq!(RollingFeatures::new(0), Err(FeatureError::InvalidWindow(0)));
    }

    proptest! {
        #[test]
        fn prop_matrix_shape_and_signs(
            values in prop::collection::vec(-1e4f64..1e4, 0..120),
            window in 1usize..12,
        ) {
            let matrix = RollingFeatures::new(window).unwrap().extract(&values);
            prop_assert_eq!(matrix.dim(), (values.len(), FEATURE_DIMENSION));
            prop_assert!(matrix.iter().all(|x| x.is_finite()));
            prop_assert!(matrix.column(1).iter().all(|&d| d >= 0.0));
            prop_assert!(matrix.column(3).iter().all(|&s| s >= 0.0));
            let min = values.iter().copied().fold(f64::INFINITY, f64::min);
            let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            for &m in matrix.column(2) {
                prop_assert!(m >= min - 1e-6 && m <= max + 1e-6);
            }
        }
    }
}
