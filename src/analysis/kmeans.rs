// src/analysis/kmeans.rs
//
// Seeded centroid partitioning. Knows nothing about traffic: callers hand
// in row-major feature vectors and read back assignments and centroids.
// Identical input and seed always produce identical output. Each fit runs
// several independent initializations and keeps the lowest-inertia one,
// since a single unlucky seeding can converge to a split/merged partition.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Debug, Clone)]
pub struct KMeans {
    k: usize,
    max_iterations: usize,
    seed: u64,
    restarts: usize,
    centroids: Vec<Vec<f64>>,
    assignments: Vec<usize>,
    inertia: f64,
}

#[derive(Debug)]
struct FitResult {
    centroids: Vec<Vec<f64>>,
    assignments: Vec<usize>,
    inertia: f64,
}

impl KMeans {
    pub fn new(k: usize, max_iterations: usize, seed: u64) -> Self {
        Self {
            k,
            max_iterations,
            seed,
            restarts: 10,
            centroids: Vec::new(),
            assignments: Vec::new(),
            inertia: f64::INFINITY,
        }
    }

    pub fn with_restarts(mut self, restarts: usize) -> Self {
        self.restarts = restarts.max(1);
        self
    }

    /// Partition `samples` into k clusters. Callers guarantee
    /// `samples.len() >= k` and uniform dimensionality.
    pub fn fit(&mut self, samples: &[Vec<f64>]) {
        debug_assert!(samples.len() >= self.k);

        let mut best = self.fit_once(samples, self.seed);
        for attempt in 1..self.restarts {
            let result = self.fit_once(samples, self.seed.wrapping_add(attempt as u64));
            if result.inertia < best.inertia {
                best = result;
            }
        }

        self.centroids = best.centroids;
        self.assignments = best.assignments;
        self.inertia = best.inertia;
    }

    fn fit_once(&self, samples: &[Vec<f64>], seed: u64) -> FitResult {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut centroids = self.seed_centroids(samples, &mut rng);
        let mut assignments = vec![0usize; samples.len()];

        for _ in 0..self.max_iterations {
            let mut changed = false;
            for (i, sample) in samples.iter().enumerate() {
                let nearest = nearest_centroid(&centroids, sample);
                if assignments[i] != nearest {
                    assignments[i] = nearest;
                    changed = true;
                }
            }

            recompute_centroids(self.k, samples, &assignments, &mut centroids);

            if !changed {
                break;
            }
        }

        let inertia = samples
            .iter()
            .zip(&assignments)
            .map(|(sample, &cluster)| squared_distance(sample, &centroids[cluster]))
            .sum();

        FitResult {
            centroids,
            assignments,
            inertia,
        }
    }

    /// k-means++ seeding: spread the initial centroids out by sampling
    /// proportionally to squared distance from the ones already chosen.
    fn seed_centroids(&self, samples: &[Vec<f64>], rng: &mut StdRng) -> Vec<Vec<f64>> {
        let mut centroids: Vec<Vec<f64>> = Vec::with_capacity(self.k);
        centroids.push(samples[rng.gen_range(0..samples.len())].clone());

        while centroids.len() < self.k {
            let weights: Vec<f64> = samples
                .iter()
                .map(|sample| {
                    centroids
                        .iter()
                        .map(|centroid| squared_distance(sample, centroid))
                        .fold(f64::INFINITY, f64::min)
                })
                .collect();

            let total: f64 = weights.iter().sum();
            if total <= 0.0 {
                // All remaining samples coincide with a centroid; any pick works.
                centroids.push(samples[rng.gen_range(0..samples.len())].clone());
                continue;
            }

            let target = rng.gen::<f64>() * total;
            let mut cumulative = 0.0;
            let mut chosen = samples.len() - 1;
            for (i, weight) in weights.iter().enumerate() {
                cumulative += weight;
                if cumulative >= target {
                    chosen = i;
                    break;
                }
            }
            centroids.push(samples[chosen].clone());
        }

        centroids
    }

    pub fn centroids(&self) -> &[Vec<f64>] {
        &self.centroids
    }

    pub fn assignments(&self) -> &[usize] {
        &self.assignments
    }

    pub fn inertia(&self) -> f64 {
        self.inertia
    }
}

fn recompute_centroids(
    k: usize,
    samples: &[Vec<f64>],
    assignments: &[usize],
    centroids: &mut [Vec<f64>],
) {
    let dims = samples[0].len();
    let mut sums = vec![vec![0.0; dims]; k];
    let mut counts = vec![0usize; k];

    for (sample, &cluster) in samples.iter().zip(assignments) {
        counts[cluster] += 1;
        for (dim, value) in sample.iter().enumerate() {
            sums[cluster][dim] += value;
        }
    }

    for cluster in 0..k {
        if counts[cluster] > 0 {
            for value in sums[cluster].iter_mut() {
                *value /= counts[cluster] as f64;
            }
            centroids[cluster] = std::mem::take(&mut sums[cluster]);
        } else if let Some(farthest) = farthest_sample(samples, assignments, centroids) {
            // Orphaned cluster: reseat it on the sample farthest from its
            // current assignment so it can pick up members next pass.
            centroids[cluster] = samples[farthest].clone();
        }
    }
}

fn farthest_sample(
    samples: &[Vec<f64>],
    assignments: &[usize],
    centroids: &[Vec<f64>],
) -> Option<usize> {
    samples
        .iter()
        .enumerate()
        .map(|(i, sample)| (i, squared_distance(sample, &centroids[assignments[i]])))
        .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(i, _)| i)
}

fn nearest_centroid(centroids: &[Vec<f64>], sample: &[f64]) -> usize {
    let mut best = 0;
    let mut best_distance = f64::INFINITY;
    for (i, centroid) in centroids.iter().enumerate() {
        let distance = squared_distance(sample, centroid);
        if distance < best_distance {
            best = i;
            best_distance = distance;
        }
    }
    best
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn band_samples() -> Vec<Vec<f64>> {
        let mut samples = Vec::new();
        for base in [10.0, 30.0, 50.0, 85.0] {
            for offset in 0..5 {
                samples.push(vec![base + offset as f64]);
            }
        }
        samples
    }

    #[test]
    fn test_recovers_separated_bands() {
        let samples = band_samples();
        let mut model = KMeans::new(4, 100, 7);
        model.fit(&samples);

        // Samples from the same band must share a cluster.
        for band in 0..4 {
            let first = model.assignments()[band * 5];
            for i in 1..5 {
                assert_eq!(model.assignments()[band * 5 + i], first);
            }
        }

        // And the four bands must occupy four distinct clusters.
        let mut clusters: Vec<usize> = (0..4).map(|band| model.assignments()[band * 5]).collect();
        clusters.sort_unstable();
        clusters.dedup();
        assert_eq!(clusters.len(), 4);
    }

    #[test]
    fn test_same_seed_is_deterministic() {
        let samples = band_samples();
        let mut first = KMeans::new(4, 100, 42);
        let mut second = KMeans::new(4, 100, 42);
        first.fit(&samples);
        second.fit(&samples);
        assert_eq!(first.assignments(), second.assignments());
        assert_eq!(first.centroids(), second.centroids());
    }

    #[test]
    fn test_single_restart_still_fits() {
        let samples = band_samples();
        let mut model = KMeans::new(4, 100, 3).with_restarts(1);
        model.fit(&samples);
        assert!(model.inertia().is_finite());
        assert_eq!(model.assignments().len(), samples.len());
    }
}
