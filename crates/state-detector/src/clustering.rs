//! Batch k-means clustering.
//!
//! Centroids are seeded with k-means++ from a seeded RNG, then refined with
//! Lloyd iterations until the total squared centroid shift drops to the
//! tolerance or the iteration budget runs out. A fixed seed gives identical
//! labels on identical input.

use crate::StateError;
use ndarray::{Array2, ArrayView1};
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

/// K-means parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KMeans {
    k: usize,
    max_iterations: usize,
    tolerance: f64,
    seed: u64,
}

/// Fitted clustering
#[derive(Debug, Clone, PartialEq)]
pub struct KMeansFit {
    /// `k` rows, one per cluster
    pub centroids: Array2<f64>,
    /// Cluster index per input row
    pub labels: Vec<usize>,
    /// Lloyd iterations performed
    pub iterations: usize,
    /// Sum of squared distances to assigned centroids
    pub inertia: f64,
}

impl KMeans {
    pub fn new(k: usize, max_iterations: usize, tolerance: f64, seed: u64) -> Result<Self, StateError> {
        if k == 0 {
            return Err(StateError::InvalidConfig("number of clusters must be at least 1".into()));
        }
        if max_iterations == 0 {
            return Err(StateError::InvalidConfig("max_iterations must be at least 1".into()));
        }
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(StateError::InvalidConfig(format!(
                "tolerance must be finite and non-negative, got {tolerance}"
            )));
        }
        Ok(Self {
            k,
            max_iterations,
            tolerance,
            seed,
        })
    }

    /// Cluster the rows of `data`
    pub fn fit(&self, data: &Array2<f64>) -> Result<KMeansFit, StateError> {
        let n = data.nrows();
        if n < self.k {
            return Err(StateError::TooFewSamples {
                required: self.k,
                actual: n,
            });
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut centroids = self.seed_centroids(data, &mut rng);
        let mut labels = vec![0usize; n];
        let mut iterations = 0;

        while iterations < self.max_iterations {
            iterations += 1;
            assign(data, &centroids, &mut labels);
            let updated = recompute(data, &labels, &centroids);

            let shift: f64 = centroids
                .outer_iter()
                .zip(updated.outer_iter())
                .map(|(a, b)| sq_dist(a, b))
                .sum();
            centroids = updated;

            if shift <= self.tolerance {
                break;
            }
        }

        assign(data, &centroids, &mut labels);
        let inertia = data
            .outer_iter()
            .zip(&labels)
            .map(|(row, &label)| sq_dist(row, centroids.row(label)))
            .sum();

        debug!(
            "K-means converged: k={}, n={}, iterations={}, inertia={:.3}",
            self.k, n, iterations, inertia
        );

        Ok(KMeansFit {
            centroids,
            labels,
            iterations,
            inertia,
        })
    }

    /// k-means++ seeding
    fn seed_centroids(&self, data: &Array2<f64>, rng: &mut StdRng) -> Array2<f64> {
        let n = data.nrows();
        let mut centroids = Array2::zeros((self.k, data.ncols()));
        let first = rng.gen_range(0..n);
        centroids.row_mut(0).assign(&data.row(first));

        let mut closest: Vec<f64> = data
            .outer_iter()
            .map(|row| sq_dist(row, data.row(first)))
            .collect();

        for c in 1..self.k {
            // All remaining points coincide with a centroid: pick uniformly
            let next = match WeightedIndex::new(&closest) {
                Ok(dist) => dist.sample(rng),
                Err(_) => rng.gen_range(0..n),
            };
            centroids.row_mut(c).assign(&data.row(next));

            for (d, row) in closest.iter_mut().zip(data.outer_iter()) {
                *d = d.min(sq_dist(row, data.row(next)));
            }
        }
        centroids
    }
}

fn assign(data: &Array2<f64>, centroids: &Array2<f64>, labels: &mut [usize]) {
    for (row, label) in data.outer_iter().zip(labels.iter_mut()) {
        let mut best = 0;
        let mut best_dist = f64::MAX;
        for (c, centroid) in centroids.outer_iter().enumerate() {
            let dist = sq_dist(row, centroid);
            if dist < best_dist {
                best_dist = dist;
                best = c;
            }
        }
        *label = best;
    }
}

/// Mean of each cluster's members; empty clusters keep their centroid
fn recompute(data: &Array2<f64>, labels: &[usize], previous: &Array2<f64>) -> Array2<f64> {
    let mut sums = Array2::<f64>::zeros(previous.dim());
    let mut counts = vec![0usize; previous.nrows()];

    for (row, &label) in data.outer_iter().zip(labels) {
        let mut sum = sums.row_mut(label);
        sum += &row;
        counts[label] += 1;
    }

    let mut updated = previous.clone();
    for (c, &count) in counts.iter().enumerate() {
        if count > 0 {
            let mean = &sums.row(c) / count as f64;
            updated.row_mut(c).assign(&mean);
        }
    }
    updated
}

fn sq_dist(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_two_separated_groups() {
        let data = array![
            [0.0, 0.0],
            [0.1, 0.2],
            [0.2, 0.1],
            [10.0, 10.0],
            [10.1, 9.9],
            [9.8, 10.2],
        ];
        let fit = KMeans::new(2, 100, 1e-6, 42).unwrap().fit(&data).unwrap();
        assert_eq!(fit.labels[0], fit.labels[1]);
        assert_eq!(fit.labels[1], fit.labels[2]);
        assert_eq!(fit.labels[3], fit.labels[4]);
        assert_eq!(fit.labels[4], fit.labels[5]);
        assert_ne!(fit.labels[0], fit.labels[3]);
        assert!(fit.inertia < 1.0);
    }

    #[test]
    fn test_deterministic_for_seed() {
        let data = Array2::from_shape_fn((50, 3), |(i, j)| ((i * 7 + j * 13) % 17) as f64);
        let model = KMeans::new(4, 300, 1e-4, 7).unwrap();
        let a = model.fit(&data).unwrap();
        let b = model.fit(&data).unwrap();
        assert_eq!(a.labels, b.labels);
    }

    #[test]
    fn test_identical_points() {
        let data = Array2::from_elem((5, 2), 3.0);
        let fit = KMeans::new(3, 10, 1e-4, 1).unwrap().fit(&data).unwrap();
        assert_eq!(fit.labels.len(), 5);
        assert!(fit.labels.iter().all(|&l| l < 3));
        assert_eq!(fit.inertia, 0.0);
    }

    #[test]
    fn test_too_few_samples() {
        let data = Array2::zeros((2, 4));
        let err = KMeans::new(3, 10, 1e-4, 1).unwrap().fit(&data).unwrap_err();
        assert_eq!(err, StateError::TooFewSamples { required: 3, actual: 2 });
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(KMeans::new(0, 10, 1e-4, 1).is_err());
        assert!(KMeans::new(2, 0, 1e-4, 1).is_err());
        assert!(KMeans::new(2, 10, f64::NAN, 1).is_err());
    }
}
