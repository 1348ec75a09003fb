//! Bootstrap resampling engine.
//!
//! Each iteration draws `n` values uniformly with replacement from the sample
//! and reduces the draw with a [`Statistic`]. Every iteration owns an RNG
//! seeded from the base seed and its iteration index, so the distribution is
//! identical whether iterations run sequentially or across the rayon pool.

use crate::error::{BootstrapError, Result};
use crate::interval::{self, ConfidenceInterval};
use crate::statistic::{self, Statistic};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::Serialize;

/// Default number of bootstrap iterations
pub const DEFAULT_ITERATIONS: usize = 10_000;

/// Default base seed
pub const DEFAULT_SEED: u64 = 42;

/// Empirical sampling distribution of a statistic
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResampleDistribution {
    values: Vec<f64>,
    sample_size: usize,
    statistic: String,
}

impl ResampleDistribution {
    /// Wrap precomputed statistic values
    pub fn from_values(values: Vec<f64>, sample_size: usize, statistic: impl Into<String>) -> Self {
        Self { values, sample_size, statistic: statistic.into() }
    }

    /// Statistic values in iteration order
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn into_values(self) -> Vec<f64> {
        self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Size of the sample every draw was taken from
    pub fn sample_size(&self) -> usize {
        self.sample_size
    }

    /// Name of the statistic that produced the values
    pub fn statistic(&self) -> &str {
        &self.statistic
    }

    pub fn mean(&self) -> f64 {
        statistic::mean(&self.values)
    }

    pub fn min(&self) -> f64 {
        self.values.iter().copied().fold(f64::INFINITY, f64::min)
    }

    pub fn max(&self) -> f64 {
        self.values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    /// Percentile at `q` in [0, 100]
    pub fn percentile(&self, q: f64) -> Result<f64> {
        interval::percentile(&self.values, q)
    }

    pub fn percentiles(&self, qs: &[f64]) -> Result<Vec<f64>> {
        interval::percentiles(&self.values, qs)
    }

    pub fn confidence_interval(&self, alpha: f64) -> Result<ConfidenceInterval> {
        interval::confidence_interval(self, alpha)
    }
}

/// Bootstrap resampler with a fixed iteration count and base seed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resampler {
    pub iterations: usize,
    pub seed: u64,
    /// Spread iterations over the rayon pool
    pub parallel: bool,
}

impl Default for Resampler {
    fn default() -> Self {
        Self { iterations: DEFAULT_ITERATIONS, seed: DEFAULT_SEED, parallel: true }
    }
}

impl Resampler {
    pub fn new(iterations: usize, seed: u64) -> Self {
        Self { iterations, seed, ..Default::default() }
    }

    /// Same settings with a different base seed
    pub fn with_seed(&self, seed: u64) -> Self {
        Self { seed, ..*self }
    }

    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Build the sampling distribution of `statistic` over `sample`
    pub fn resample(&self, sample: &[f64], statistic: &Statistic) -> Result<ResampleDistribution> {
        if self.iterations == 0 {
            return Err(BootstrapError::invalid_parameter("n_iterations must be greater than 0"));
        }
        if sample.is_empty() {
            return Err(BootstrapError::EmptySample);
        }
        if let Some(bad) = sample.iter().find(|v| !v.is_finite()) {
            return Err(BootstrapError::invalid_parameter(format!(
                "sample contains non-finite value {bad}"
            )));
        }

        let n = sample.len();
        let seed = self.seed;
        let values: Vec<f64> = if self.parallel {
            (0..self.iterations)
                .into_par_iter()
                .map_init(
                    || vec![0.0; n],
                    |draw, i| draw_statistic(sample, statistic, seed, i as u64, draw),
                )
                .collect()
        } else {
            let mut draw = vec![0.0; n];
            (0..self.iterations)
                .map(|i| draw_statistic(sample, statistic, seed, i as u64, &mut draw))
                .collect()
        };

        Ok(ResampleDistribution::from_values(values, n, statistic.name()))
    }
}

/// Resample `sample` `n_iterations` times with replacement and reduce every draw with `statistic`
pub fn resample(
    sample: &[f64],
    statistic: &Statistic,
    n_iterations: usize,
    seed: u64,
) -> Result<ResampleDistribution> {
    Resampler::new(n_iterations, seed).resample(sample, statistic)
}

fn draw_statistic(
    sample: &[f64],
    statistic: &Statistic,
    seed: u64,
    iteration: u64,
    draw: &mut [f64],
) -> f64 {
    let mut rng = ChaCha8Rng::seed_from_u64(counter_seed(seed, iteration));
    let n = sample.len();
    for slot in draw.iter_mut() {
        *slot = sample[rng.gen_range(0..n)];
    }
    statistic.compute(draw)
}

/// SplitMix64 of `base_seed` and `counter`.
///
/// Gives each iteration (or partition) a well-spread, independent seed
/// without sharing a mutable generator.
#[inline]
pub fn counter_seed(base_seed: u64, counter: u64) -> u64 {
    let mut z = base_seed.wrapping_add(counter.wrapping_mul(0x9e37_79b9_7f4a_7c15));
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

/// Seed for one partition, stable across runs and platforms.
///
/// FNV-1a of the partition label fed through [`counter_seed`].
pub fn partition_seed(base_seed: u64, label: &str) -> u64 {
    const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

    let hash = label
        .bytes()
        .fold(FNV_OFFSET, |acc, b| (acc ^ u64::from(b)).wrapping_mul(FNV_PRIME));
    counter_seed(base_seed, hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distribution_length() {
        let dist = resample(&[1.0, 2.0, 3.0], &Statistic::Mean, 250, 42).unwrap();
        assert_eq!(dist.len(), 250);
        assert_eq!(dist.sample_size(), 3);
        assert_eq!(dist.statistic(), "mean");
    }

    #[test]
    fn test_same_seed_same_distribution() {
        let sample = [3.5, -2.0, 7.25, 0.0, 11.0, -4.5];
        let a = resample(&sample, &Statistic::Median, 500, 7).unwrap();
        let b = resample(&sample, &Statistic::Median, 500, 7).unwrap();
        assert_eq!(a.values(), b.values());
    }

    #[test]
    fn test_different_seed_different_distribution() {
        let sample = [3.5, -2.0, 7.25, 0.0, 11.0, -4.5];
        let a = resample(&sample, &Statistic::Mean, 200, 1).unwrap();
        let b = resample(&sample, &Statistic::Mean, 200, 2).unwrap();
        assert_ne!(a.values(), b.values());
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let sample: Vec<f64> = (0..40).map(|x| x as f64 * 0.5 - 7.0).collect();
        let resampler = Resampler::new(1_000, 42);
        let parallel = resampler.resample(&sample, &Statistic::Mean).unwrap();
        let sequential = resampler.sequential().resample(&sample, &Statistic::Mean).unwrap();
        assert_eq!(parallel.values(), sequential.values());
    }

    #[test]
    fn test_draws_come_from_sample() {
        let sample = [2.0, 4.0, 8.0];
        let first = Statistic::custom("first", |s| s[0]);
        let dist = resample(&sample, &first, 300, 42).unwrap();
        assert!(dist.values().iter().all(|v| sample.contains(v)));
    }

    #[test]
    fn test_single_value_sample_is_degenerate() {
        let dist = resample(&[4.2], &Statistic::Mean, 100, 42).unwrap();
        assert!(dist.values().iter().all(|&v| v == 4.2));
    }

    #[test]
    fn test_empty_sample_is_an_error() {
        let err = resample(&[], &Statistic::Mean, 100, 42).unwrap_err();
        assert!(matches!(err, BootstrapError::EmptySample));
    }

    #[test]
    fn test_zero_iterations_is_an_error() {
        let err = resample(&[1.0], &Statistic::Mean, 0, 42).unwrap_err();
        assert!(matches!(err, BootstrapError::InvalidParameter(_)));
    }

    #[test]
    fn test_non_finite_sample_is_an_error() {
        let err = resample(&[1.0, f64::INFINITY], &Statistic::Mean, 10, 42).unwrap_err();
        assert!(matches!(err, BootstrapError::InvalidParameter(_)));
    }

    #[test]
    fn test_end_to_end_mean_of_one_to_five() {
        let sample = [1.0, 2.0, 3.0, 4.0, 5.0];
        let dist = resample(&sample, &Statistic::Mean, DEFAULT_ITERATIONS, DEFAULT_SEED).unwrap();
        assert!((dist.mean() - 3.0).abs() < 0.05);
        let ci = dist.confidence_interval(0.05).unwrap();
        assert!(ci.contains(3.0));
    }

    #[test]
    fn test_partition_seed_is_stable_and_distinct() {
        assert_eq!(partition_seed(42, "espn|QB"), partition_seed(42, "espn|QB"));
        assert_ne!(partition_seed(42, "espn|QB"), partition_seed(42, "espn|RB"));
        assert_ne!(partition_seed(42, "espn|QB"), partition_seed(43, "espn|QB"));
    }

    #[test]
    fn test_counter_seed_spreads_consecutive_counters() {
        let a = counter_seed(42, 0);
        let b = counter_seed(42, 1);
        assert_ne!(a, b);
        assert!((a ^ b).count_ones() > 10);
    }
}
