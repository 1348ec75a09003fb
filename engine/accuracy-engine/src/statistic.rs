//! Reductions applied to each resampled draw.

use crate::error::BootstrapError;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

type ReduceFn = dyn Fn(&[f64]) -> f64 + Send + Sync;

/// Statistic computed on every bootstrap draw
#[derive(Clone, Default)]
pub enum Statistic {
    /// Arithmetic mean
    #[default]
    Mean,
    /// Median; even-length draws average the two middle values
    Median,
    /// Any reduction of a numeric sequence to a single real
    Custom { name: String, func: Arc<ReduceFn> },
}

impl Statistic {
    /// Wrap an arbitrary reduction
    pub fn custom<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&[f64]) -> f64 + Send + Sync + 'static,
    {
        Statistic::Custom { name: name.into(), func: Arc::new(func) }
    }

    pub fn name(&self) -> &str {
        match self {
            Statistic::Mean => "mean",
            Statistic::Median => "median",
            Statistic::Custom { name, .. } => name,
        }
    }

    /// Reduce a draw to a single value.
    ///
    /// The draw is scratch space and may be reordered.
    pub fn compute(&self, draw: &mut [f64]) -> f64 {
        match self {
            Statistic::Mean => mean(draw),
            Statistic::Median => median_in_place(draw),
            Statistic::Custom { func, .. } => func(draw),
        }
    }
}

impl fmt::Debug for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statistic::Custom { name, .. } => f.debug_struct("Custom").field("name", name).finish(),
            other => f.write_str(other.name()),
        }
    }
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Statistic {
    type Err = BootstrapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mean" => Ok(Statistic::Mean),
            "median" => Ok(Statistic::Median),
            other => Err(BootstrapError::invalid_parameter(format!("unknown statistic '{other}'"))),
        }
    }
}

/// Arithmetic mean; NaN for an empty slice
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Median computed by partial selection; reorders `values`
pub fn median_in_place(values: &mut [f64]) -> f64 {
    let n = values.len();
    if n == 0 {
        return f64::NAN;
    }
    let mid = n / 2;
    let (lower, upper_mid, _) = values.select_nth_unstable_by(mid, f64::total_cmp);
    let upper_mid = *upper_mid;
    if n % 2 == 1 {
        return upper_mid;
    }
    let lower_mid = lower.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    (lower_mid + upper_mid) / 2.0
}
