//! # Accuracy Engine
//!
//! Bootstrap estimation of fantasy football projection error.
//!
//! Given joined (expert, position, week, projected, actual) observations, the
//! engine ranks players to find the fantasy relevant subset, partitions the
//! table by expert (optionally by position or week), builds a resampled
//! distribution of the mean or median error per partition and summarizes each
//! distribution with percentile confidence intervals.
//!
//! Everything here is a pure, synchronous computation. Reading tables and
//! rendering results live in other crates.

pub mod aggregation;
pub mod config;
pub mod engine;
pub mod error;
pub mod interval;
pub mod models;
pub mod ranker;
pub mod report;
pub mod resampler;
pub mod statistic;

// Re-export main types for easy usage
pub use aggregation::{aggregate, Aggregation, Aggregator, GroupBy, GroupKey};
pub use config::AccuracyConfig;
pub use engine::AccuracyEngine;
pub use error::{BootstrapError, Result};
pub use interval::{confidence_interval, ConfidenceInterval};
pub use models::{ErrorField, Observation, Position, RankedObservation};
pub use ranker::{
    fantasy_relevant, filter_relevant, rank, RankField, RelevanceCutoffs, ScoreField,
    RELEVANCE_GROUPING,
};
pub use report::{AccuracyReport, ErrorSummary, ReportSection, SourceRow};
pub use resampler::{resample, ResampleDistribution, Resampler};
pub use statistic::Statistic;
