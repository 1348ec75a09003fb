//! Percentile confidence intervals over resample distributions.

use crate::error::{BootstrapError, Result};
use crate::resampler::ResampleDistribution;
use serde::{Deserialize, Serialize};

/// Default two-sided alpha (95% interval)
pub const DEFAULT_ALPHA: f64 = 0.05;

/// Percentile bounds on a resampled statistic
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
    pub alpha: f64,
}

impl ConfidenceInterval {
    pub fn contains(&self, value: f64) -> bool {
        self.lower <= value && value <= self.upper
    }

    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }

    /// Confidence level, e.g. 0.95 for alpha = 0.05
    pub fn level(&self) -> f64 {
        1.0 - self.alpha
    }
}

/// Percentile bounds at `alpha / 2` and `100 - alpha / 2`
pub fn confidence_interval(
    distribution: &ResampleDistribution,
    alpha: f64,
) -> Result<ConfidenceInterval> {
    validate_alpha(alpha)?;
    let sorted = sorted_values(distribution.values())?;
    let tail = alpha * 100.0 / 2.0;
    let lower = percentile_sorted(&sorted, tail);
    let upper = percentile_sorted(&sorted, 100.0 - tail);
    Ok(ConfidenceInterval { lower, upper, alpha })
}

/// Percentile of `values` at `q` in [0, 100], interpolating linearly between order statistics
pub fn percentile(values: &[f64], q: f64) -> Result<f64> {
    validate_q(q)?;
    let sorted = sorted_values(values)?;
    Ok(percentile_sorted(&sorted, q))
}

/// Several percentiles with a single sort
pub fn percentiles(values: &[f64], qs: &[f64]) -> Result<Vec<f64>> {
    for &q in qs {
        validate_q(q)?;
    }
    let sorted = sorted_values(values)?;
    Ok(qs.iter().map(|&q| percentile_sorted(&sorted, q)).collect())
}

pub(crate) fn validate_alpha(alpha: f64) -> Result<()> {
    if !(alpha > 0.0 && alpha < 1.0) {
        return Err(BootstrapError::invalid_parameter(format!(
            "alpha must lie strictly between 0 and 1, got {alpha}"
        )));
    }
    Ok(())
}

fn validate_q(q: f64) -> Result<()> {
    if !(0.0..=100.0).contains(&q) {
        return Err(BootstrapError::invalid_parameter(format!(
            "percentile must lie in [0, 100], got {q}"
        )));
    }
    Ok(())
}

fn sorted_values(values: &[f64]) -> Result<Vec<f64>> {
    if values.is_empty() {
        return Err(BootstrapError::EmptySample);
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    Ok(sorted)
}

fn percentile_sorted(sorted: &[f64], q: f64) -> f64 {
    let h = (sorted.len() - 1) as f64 * q / 100.0;
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    let frac = h - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentile_linear_interpolation() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(percentile(&values, 0.0).unwrap(), 1.0);
        assert_eq!(percentile(&values, 100.0).unwrap(), 4.0);
        assert_eq!(percentile(&values, 50.0).unwrap(), 2.5);
        // h = 3 * 0.25 = 0.75 -> 1 + 0.75
        assert!((percentile(&values, 25.0).unwrap() - 1.75).abs() < 1e-12);
    }

    #[test]
    fn test_percentiles_ignore_input_order() {
        let values = [5.0, 1.0, 4.0, 2.0, 3.0];
        let qs = percentiles(&values, &[2.5, 50.0, 97.5]).unwrap();
        assert_eq!(qs[1], 3.0);
        assert!((qs[0] - 1.1).abs() < 1e-12);
        assert!((qs[2] - 4.9).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_percentile_inputs() {
        assert!(matches!(percentile(&[], 50.0), Err(BootstrapError::EmptySample)));
        assert!(matches!(percentile(&[1.0], 101.0), Err(BootstrapError::InvalidParameter(_))));
    }

    #[test]
    fn test_confidence_interval_bounds() {
        let dist = ResampleDistribution::from_values((0..=100).map(f64::from).collect(), 101, "mean");
        let ci = confidence_interval(&dist, 0.05).unwrap();
        assert!((ci.lower - 2.5).abs() < 1e-12);
        assert!((ci.upper - 97.5).abs() < 1e-12);
        assert!(ci.contains(50.0));
        assert!((ci.level() - 0.95).abs() < 1e-12);
    }

    #[test]
    fn test_confidence_interval_rejects_bad_alpha() {
        let dist = ResampleDistribution::from_values(vec![1.0, 2.0], 2, "mean");
        for alpha in [0.0, 1.0, -0.1, 1.5, f64::NAN] {
            assert!(matches!(
                confidence_interval(&dist, alpha),
                Err(BootstrapError::InvalidParameter(_))
            ));
        }
    }

    #[test]
    fn test_degenerate_distribution() {
        let dist = ResampleDistribution::from_values(vec![3.0; 50], 5, "mean");
        let ci = confidence_interval(&dist, 0.05).unwrap();
        assert_eq!(ci.lower, 3.0);
        assert_eq!(ci.upper, 3.0);
        assert_eq!(ci.width(), 0.0);
    }
}
