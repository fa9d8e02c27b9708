//! Window Statistics Computation

/// Summary statistics for one window of samples
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WindowStatistics {
    /// Mean value
    pub mean: f64,
    /// Sample standard deviation (n - 1 denominator, 0 for a single value)
    pub std_dev: f64,
    /// Minimum value
    pub min: f64,
    /// Maximum value
    pub max: f64,
}

impl WindowStatistics {
    /// Compute statistics from a slice of values
    pub fn compute(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }

        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let min = values.iter().cloned().fold(f64::MAX, f64::min);
        let max = values.iter().cloned().fold(f64::MIN, f64::max);

        let std_dev = if values.len() >= 2 {
            let m2: f64 = values.iter().map(|v| (v - mean) * (v - mean)).sum();
            (m2 / (n - 1.0)).sqrt()
        } else {
            0.0
        };

        Self {
            mean,
            std_dev,
            min,
            max,
        }
    }

    /// Statistics of the centred window around each index
    ///
    /// The window around `i` covers `[i - window / 2, i - window / 2 + window)`.
    /// Indices whose window would leave the series yield `None`.
    pub fn rolling_centered(values: &[f64], window: usize) -> Vec<Option<Self>> {
        let half = window / 2;
        (0..values.len())
            .map(|i| {
                let start = i.checked_sub(half)?;
                let end = start + window;
                (window > 0 && end <= values.len()).then(|| Self::compute(&values[start..end]))
            })
            .collect()
    }
}
