//! # Accuracy Report
//!
//! Interval summaries of aggregated distributions, shaped for JSON export
//! to data tables and charts.

use crate::aggregation::{Aggregation, Aggregator, GroupBy, GroupKey};
use crate::config::AccuracyConfig;
use crate::error::{BootstrapError, Result};
use crate::models::{ErrorField, Observation, Position};
use crate::resampler::ResampleDistribution;
use crate::statistic::Statistic;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Interval summary of one resample distribution
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorSummary {
    /// Canonical label of the partition
    pub key: String,
    /// Observations in the partition
    pub observations: usize,
    pub statistic: String,
    /// Mean of the resampled statistic
    pub mean: f64,
    /// 50th percentile of the resampled statistic
    pub median: f64,
    pub lower: f64,
    pub upper: f64,
    pub alpha: f64,
}

impl ErrorSummary {
    pub fn from_distribution(
        key: &GroupKey,
        distribution: &ResampleDistribution,
        alpha: f64,
    ) -> Result<Self> {
        let ci = distribution.confidence_interval(alpha)?;
        let median = distribution.percentile(50.0)?;
        Ok(Self {
            key: key.to_string(),
            observations: distribution.sample_size(),
            statistic: distribution.statistic().to_string(),
            mean: distribution.mean(),
            median,
            lower: ci.lower,
            upper: ci.upper,
            alpha,
        })
    }

    /// Interval excludes zero, i.e. the source is biased at this confidence level
    pub fn is_biased(&self) -> bool {
        self.lower > 0.0 || self.upper < 0.0
    }
}

/// Summaries for one grouping / error field / statistic combination
#[derive(Debug, Clone, Serialize)]
pub struct ReportSection {
    pub group_by: GroupBy,
    pub error_field: ErrorField,
    pub statistic: String,
    /// Sorted by partition key
    pub summaries: Vec<ErrorSummary>,
    pub skipped: Vec<String>,
    pub excluded_observations: usize,
}

impl ReportSection {
    pub fn from_aggregation(
        aggregation: &Aggregation,
        statistic: &Statistic,
        alpha: f64,
    ) -> Result<Self> {
        let summaries = aggregation
            .keys()
            .into_iter()
            .map(|key| {
                let distribution = &aggregation.distributions[key];
                ErrorSummary::from_distribution(key, distribution, alpha)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            group_by: aggregation.group_by,
            error_field: aggregation.error_field,
            statistic: statistic.name().to_string(),
            summaries,
            skipped: aggregation.skipped.iter().map(ToString::to_string).collect(),
            excluded_observations: aggregation.excluded_observations,
        })
    }

    pub fn summary(&self, key: &str) -> Option<&ErrorSummary> {
        self.summaries.iter().find(|s| s.key == key)
    }
}

/// One row of the per-source table: mean absolute and relative error with 95% style bounds
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceRow {
    pub key: String,
    /// Player rows only: position and team from the player's latest week
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,
    pub observations: usize,
    pub avg_points: f64,
    pub total_points: f64,
    pub abs_lower: f64,
    pub abs_mean_error: f64,
    pub abs_upper: f64,
    /// Absent when every projection for the key was zero
    pub relative: Option<ErrorSummary>,
}

/// Build per-key rows of mean error for `group_by` (usually experts or players)
pub fn source_rows(
    observations: &[Observation],
    group_by: GroupBy,
    aggregator: &Aggregator,
    alpha: f64,
) -> Result<Vec<SourceRow>> {
    let absolute = aggregator
        .aggregate(observations, group_by, ErrorField::Absolute, &Statistic::Mean)?
        .into_complete()?;
    let relative = aggregator
        .aggregate(observations, group_by, ErrorField::Relative, &Statistic::Mean)?
        .into_complete()?;

    let mut points: BTreeMap<GroupKey, KeyPoints> = BTreeMap::new();
    for observation in observations {
        let entry = points.entry(group_by.key_for(observation)).or_insert_with(|| KeyPoints {
            count: 0,
            total: 0.0,
            latest: observation,
        });
        entry.count += 1;
        entry.total += observation.actual_points;
        if observation.week >= entry.latest.week {
            entry.latest = observation;
        }
    }

    let describe_player = group_by == GroupBy::Player;
    points
        .into_iter()
        .filter_map(|(key, points)| {
            absolute.get(&key).map(|distribution| (key, points, distribution))
        })
        .map(|(key, points, distribution)| -> Result<SourceRow> {
            let abs = ErrorSummary::from_distribution(&key, distribution, alpha)?;
            let relative = relative
                .get(&key)
                .map(|d| ErrorSummary::from_distribution(&key, d, alpha))
                .transpose()?;
            let (position, team) = if describe_player {
                (Some(points.latest.position), points.latest.team.clone())
            } else {
                (None, None)
            };
            Ok(SourceRow {
                key: key.to_string(),
                position,
                team,
                observations: points.count,
                avg_points: points.total / points.count as f64,
                total_points: points.total,
                abs_lower: abs.lower,
                abs_mean_error: abs.mean,
                abs_upper: abs.upper,
                relative,
            })
        })
        .collect()
}

struct KeyPoints<'a> {
    count: usize,
    total: f64,
    latest: &'a Observation,
}

/// Full output of an accuracy run
#[derive(Debug, Clone, Serialize)]
pub struct AccuracyReport {
    pub generated_at: DateTime<Utc>,
    pub config: AccuracyConfig,
    pub total_observations: usize,
    pub relevant_observations: usize,
    pub sources: Vec<SourceRow>,
    /// Per-player table, filled when `analysis.player_table` is set
    pub players: Vec<SourceRow>,
    pub sections: Vec<ReportSection>,
}

impl AccuracyReport {
    pub fn section(
        &self,
        group_by: GroupBy,
        error_field: ErrorField,
        statistic: &str,
    ) -> Option<&ReportSection> {
        self.sections.iter().find(|s| {
            s.group_by == group_by && s.error_field == error_field && s.statistic == statistic
        })
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(BootstrapError::from)
    }

    /// Write the report as pretty JSON
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resampler::Resampler;

    #[test]
    fn test_summary_from_distribution() {
        let key = GroupKey::Expert("espn".into());
        let dist = ResampleDistribution::from_values(vec![-1.0, 0.0, 1.0, 2.0, 3.0], 12, "mean");
        let summary = ErrorSummary::from_distribution(&key, &dist, 0.05).unwrap();
        assert_eq!(summary.key, "espn");
        assert_eq!(summary.observations, 12);
        assert_eq!(summary.mean, 1.0);
        assert_eq!(summary.median, 1.0);
        assert!(summary.lower < summary.upper);
        assert!(!summary.is_biased());
    }

    #[test]
    fn test_biased_summary() {
        let key = GroupKey::Expert("cbs".into());
        let dist = ResampleDistribution::from_values(vec![1.0, 1.5, 2.0], 3, "mean");
        let summary = ErrorSummary::from_distribution(&key, &dist, 0.05).unwrap();
        assert!(summary.is_biased());
    }

    #[test]
    fn test_source_rows() {
        let observations = vec![
            Observation::new("espn", "A", Position::QB, 1, 20.0, 10.0),
            Observation::new("espn", "B", Position::RB, 1, 10.0, 20.0),
            Observation::new("cbs", "A", Position::QB, 1, 0.0, 10.0),
        ];
        let aggregator = Aggregator::new(Resampler::new(100, 42));
        let rows = source_rows(&observations, GroupBy::Expert, &aggregator, 0.05).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].key, "cbs");
        assert_eq!(rows[0].total_points, 10.0);
        assert!(rows[0].relative.is_none());
        assert_eq!(rows[1].key, "espn");
        assert_eq!(rows[1].observations, 2);
        assert_eq!(rows[1].avg_points, 15.0);
        assert!(rows[1].abs_lower <= rows[1].abs_mean_error);
        assert!(rows[1].abs_mean_error <= rows[1].abs_upper);
        assert!(rows[1].relative.is_some());
        assert!(rows[1].position.is_none());
    }

    #[test]
    fn test_player_rows_carry_latest_position_and_team() {
        let observations = vec![
            Observation::new("espn", "Ty Montgomery", Position::WR, 1, 8.0, 6.0).with_team("GB"),
            Observation::new("espn", "Ty Montgomery", Position::RB, 6, 12.0, 15.0).with_team("GB"),
            Observation::new("cbs", "Ty Montgomery", Position::WR, 2, 9.0, 4.0),
        ];
        let aggregator = Aggregator::new(Resampler::new(100, 42));
        let rows = source_rows(&observations, GroupBy::Player, &aggregator, 0.05).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].key, "player:Ty Montgomery");
        assert_eq!(rows[0].observations, 3);
        assert_eq!(rows[0].position, Some(Position::RB));
        assert_eq!(rows[0].team.as_deref(), Some("GB"));
    }
}
