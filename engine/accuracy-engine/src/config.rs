//! # Configuration Management
//!
//! Configuration structures for an accuracy run.

use crate::aggregation::GroupBy;
use crate::error::{BootstrapError, Result};
use crate::interval::{self, DEFAULT_ALPHA};
use crate::models::{ErrorField, Position};
use crate::ranker::RelevanceCutoffs;
use crate::resampler::{Resampler, DEFAULT_ITERATIONS, DEFAULT_SEED};
use crate::statistic::Statistic;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Main configuration for the AccuracyEngine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AccuracyConfig {
    /// Bootstrap settings
    #[serde(default)]
    pub resampling: ResamplingConfig,
    /// Confidence interval settings
    #[serde(default)]
    pub interval: IntervalConfig,
    /// "Fantasy relevant" filter
    #[serde(default)]
    pub relevance: RelevanceConfig,
    /// Which breakdowns to compute
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

/// Bootstrap configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResamplingConfig {
    /// Draws per resample distribution
    pub iterations: usize,
    /// Base seed; partitions derive their own seed from it
    pub seed: u64,
    /// Use the rayon pool for partitions and iterations
    pub parallel: bool,
}

impl Default for ResamplingConfig {
    fn default() -> Self {
        Self { iterations: DEFAULT_ITERATIONS, seed: DEFAULT_SEED, parallel: true }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntervalConfig {
    /// Two-sided alpha, 0.05 gives 2.5th/97.5th percentiles
    pub alpha: f64,
}

impl Default for IntervalConfig {
    fn default() -> Self {
        Self { alpha: DEFAULT_ALPHA }
    }
}

/// Relevance filter configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelevanceConfig {
    /// Restrict to the top-N projected players per expert, position and week
    pub enabled: bool,
    /// Position code -> top N (e.g. "QB" = 20, "D/ST" = 15)
    pub cutoffs: HashMap<String, usize>,
}

impl Default for RelevanceConfig {
    fn default() -> Self {
        let cutoffs = RelevanceCutoffs::default()
            .as_map()
            .iter()
            .map(|(position, n)| (position.to_string(), *n))
            .collect();
        Self { enabled: true, cutoffs }
    }
}

impl RelevanceConfig {
    /// Parse the position table
    pub fn cutoffs(&self) -> Result<RelevanceCutoffs> {
        let mut parsed = HashMap::new();
        for (code, n) in &self.cutoffs {
            let position: Position = code.parse()?;
            parsed.insert(position, *n);
        }
        Ok(RelevanceCutoffs::new(parsed))
    }
}

/// Breakdowns computed by a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub groupings: Vec<GroupBy>,
    pub error_fields: Vec<ErrorField>,
    /// Statistic names ("mean", "median")
    pub statistics: Vec<String>,
    /// Also build the per-player error table
    pub player_table: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            groupings: vec![GroupBy::Expert, GroupBy::ExpertPosition, GroupBy::ExpertWeek],
            error_fields: vec![ErrorField::Absolute, ErrorField::Relative],
            statistics: vec!["mean".to_string(), "median".to_string()],
            player_table: false,
        }
    }
}

impl AnalysisConfig {
    pub fn statistics(&self) -> Result<Vec<Statistic>> {
        self.statistics.iter().map(|name| name.parse()).collect()
    }
}

impl AccuracyConfig {
    /// Load configuration from a TOML file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: AccuracyConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Apply overrides from environment variables
    pub fn apply_env(mut self) -> Result<Self> {
        if let Ok(iterations) = std::env::var("ACCURACY_ITERATIONS") {
            self.resampling.iterations = iterations.parse().map_err(|_| {
                BootstrapError::config(format!("ACCURACY_ITERATIONS is not an integer: {iterations}"))
            })?;
        }

        if let Ok(seed) = std::env::var("ACCURACY_SEED") {
            self.resampling.seed = seed.parse().map_err(|_| {
                BootstrapError::config(format!("ACCURACY_SEED is not an integer: {seed}"))
            })?;
        }

        if let Ok(alpha) = std::env::var("ACCURACY_ALPHA") {
            self.interval.alpha = alpha
                .parse()
                .map_err(|_| BootstrapError::config(format!("ACCURACY_ALPHA is not a number: {alpha}")))?;
        }

        if let Ok(parallel) = std::env::var("ACCURACY_PARALLEL") {
            self.resampling.parallel = parallel.parse().map_err(|_| {
                BootstrapError::config(format!("ACCURACY_PARALLEL is not a boolean: {parallel}"))
            })?;
        }

        Ok(self)
    }

    /// Defaults with environment overrides
    pub fn from_env() -> Result<Self> {
        Self::default().apply_env()
    }

    pub fn resampler(&self) -> Resampler {
        Resampler {
            iterations: self.resampling.iterations,
            seed: self.resampling.seed,
            parallel: self.resampling.parallel,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.resampling.iterations == 0 {
            return Err(BootstrapError::invalid_parameter("n_iterations must be greater than 0"));
        }

        interval::validate_alpha(self.interval.alpha)?;

        if self.analysis.groupings.is_empty() {
            return Err(BootstrapError::config("analysis.groupings must not be empty"));
        }

        if self.analysis.error_fields.is_empty() {
            return Err(BootstrapError::config("analysis.error_fields must not be empty"));
        }

        if self.analysis.statistics.is_empty() {
            return Err(BootstrapError::config("analysis.statistics must not be empty"));
        }

        self.analysis.statistics()?;
        self.relevance.cutoffs()?;

        Ok(())
    }
}
