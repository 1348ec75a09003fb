//! # Error Aggregation
//!
//! Partitions the observation table by a grouping key and drives the
//! resampler once per partition.
//!
//! Compound groupings enumerate their whole key domain (every expert at every
//! position, every expert in every observed week). Keys in that domain with no
//! usable values are empty partitions: they are skipped and reported in
//! [`Aggregation::skipped`] instead of being resampled.
//!
//! A partition that cannot be resampled is recorded in [`Aggregation::failed`];
//! the other partitions still come back.

use crate::error::{BootstrapError, Result};
use crate::models::{ErrorField, Observation, Position};
use crate::resampler::{partition_seed, ResampleDistribution, Resampler};
use crate::statistic::Statistic;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Dimension(s) observations are partitioned by before resampling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupBy {
    /// Global error per source
    Expert,
    ExpertPosition,
    ExpertWeek,
    /// Across all experts
    Position,
    Week,
    Player,
}

impl GroupBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupBy::Expert => "expert",
            GroupBy::ExpertPosition => "expert_position",
            GroupBy::ExpertWeek => "expert_week",
            GroupBy::Position => "position",
            GroupBy::Week => "week",
            GroupBy::Player => "player",
        }
    }

    /// Key of the partition an observation falls into
    pub fn key_for(&self, observation: &Observation) -> GroupKey {
        match self {
            GroupBy::Expert => GroupKey::Expert(observation.expert.clone()),
            GroupBy::ExpertPosition => GroupKey::ExpertPosition {
                expert: observation.expert.clone(),
                position: observation.position,
            },
            GroupBy::ExpertWeek => {
                GroupKey::ExpertWeek { expert: observation.expert.clone(), week: observation.week }
            }
            GroupBy::Position => GroupKey::Position(observation.position),
            GroupBy::Week => GroupKey::Week(observation.week),
            GroupBy::Player => GroupKey::Player(observation.player.clone()),
        }
    }

    /// Every key this grouping can produce for the given table, sorted
    pub fn key_domain(&self, observations: &[Observation]) -> Vec<GroupKey> {
        let experts: BTreeSet<&str> = observations.iter().map(|o| o.expert.as_str()).collect();
        // observed weeks only: a stray week number must not blow up the domain
        let weeks: BTreeSet<u32> = observations.iter().map(|o| o.week).collect();

        let keys: BTreeSet<GroupKey> = match self {
            GroupBy::Expert => experts.iter().map(|e| GroupKey::Expert(e.to_string())).collect(),
            GroupBy::ExpertPosition => experts
                .iter()
                .flat_map(|e| {
                    Position::ALL
                        .iter()
                        .map(|&position| GroupKey::ExpertPosition { expert: e.to_string(), position })
                })
                .collect(),
            GroupBy::ExpertWeek => experts
                .iter()
                .flat_map(|e| {
                    weeks.iter().map(|&week| GroupKey::ExpertWeek { expert: e.to_string(), week })
                })
                .collect(),
            GroupBy::Position => Position::ALL.iter().map(|&p| GroupKey::Position(p)).collect(),
            GroupBy::Week => weeks.iter().map(|&week| GroupKey::Week(week)).collect(),
            GroupBy::Player => {
                observations.iter().map(|o| GroupKey::Player(o.player.clone())).collect()
            }
        };
        keys.into_iter().collect()
    }
}

impl fmt::Display for GroupBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GroupBy {
    type Err = BootstrapError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "expert" => Ok(GroupBy::Expert),
            "expert_position" => Ok(GroupBy::ExpertPosition),
            "expert_week" => Ok(GroupBy::ExpertWeek),
            "position" => Ok(GroupBy::Position),
            "week" => Ok(GroupBy::Week),
            "player" => Ok(GroupBy::Player),
            other => Err(BootstrapError::invalid_parameter(format!("unknown grouping '{other}'"))),
        }
    }
}

/// Literal key of one partition
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupKey {
    Expert(String),
    ExpertPosition { expert: String, position: Position },
    ExpertWeek { expert: String, week: u32 },
    Position(Position),
    Week(u32),
    Player(String),
}

impl GroupKey {
    pub fn expert(&self) -> Option<&str> {
        match self {
            GroupKey::Expert(expert)
            | GroupKey::ExpertPosition { expert, .. }
            | GroupKey::ExpertWeek { expert, .. } => Some(expert),
            _ => None,
        }
    }
}

/// Canonical label, also the input to per-partition seeding
impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::Expert(expert) => write!(f, "{expert}"),
            GroupKey::ExpertPosition { expert, position } => write!(f, "{expert}|{position}"),
            GroupKey::ExpertWeek { expert, week } => write!(f, "{expert}|w{week}"),
            GroupKey::Position(position) => write!(f, "{position}"),
            GroupKey::Week(week) => write!(f, "w{week}"),
            GroupKey::Player(player) => write!(f, "player:{player}"),
        }
    }
}

/// Resample distributions for every non-empty partition
#[derive(Debug)]
pub struct Aggregation {
    pub group_by: GroupBy,
    pub error_field: ErrorField,
    pub distributions: HashMap<GroupKey, ResampleDistribution>,
    /// Domain keys with no usable observations, sorted
    pub skipped: Vec<GroupKey>,
    /// Partitions that could not be resampled, sorted by key
    pub failed: Vec<(GroupKey, BootstrapError)>,
    /// Observations left out because their error value is undefined
    pub excluded_observations: usize,
}

impl Aggregation {
    pub fn get(&self, key: &GroupKey) -> Option<&ResampleDistribution> {
        self.distributions.get(key)
    }

    pub fn len(&self) -> usize {
        self.distributions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.distributions.is_empty()
    }

    /// Keys with a distribution, sorted
    pub fn keys(&self) -> Vec<&GroupKey> {
        let mut keys: Vec<&GroupKey> = self.distributions.keys().collect();
        keys.sort();
        keys
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Turn the first failed partition into an error
    pub fn into_complete(mut self) -> Result<Self> {
        if self.failed.is_empty() {
            return Ok(self);
        }
        let (key, source) = self.failed.swap_remove(0);
        Err(BootstrapError::partition(key, source))
    }
}

/// Drives the resampler over partitions of an observation table
#[derive(Debug, Clone, Copy, Default)]
pub struct Aggregator {
    resampler: Resampler,
}

impl Aggregator {
    pub fn new(resampler: Resampler) -> Self {
        Self { resampler }
    }

    pub fn resampler(&self) -> &Resampler {
        &self.resampler
    }

    /// Resample `error_field` within every `group_by` partition.
    ///
    /// Each partition is seeded from the base seed and its key label, so
    /// results do not depend on partition order or scheduling.
    pub fn aggregate(
        &self,
        observations: &[Observation],
        group_by: GroupBy,
        error_field: ErrorField,
        statistic: &Statistic,
    ) -> Result<Aggregation> {
        if self.resampler.iterations == 0 {
            return Err(BootstrapError::invalid_parameter("n_iterations must be greater than 0"));
        }

        let mut partitions: HashMap<GroupKey, Vec<f64>> = HashMap::new();
        let mut invalid: HashMap<GroupKey, BootstrapError> = HashMap::new();
        let mut excluded_observations = 0;
        for (row, observation) in observations.iter().enumerate() {
            let key = group_by.key_for(observation);
            if invalid.contains_key(&key) {
                continue;
            }
            if let Err(e) = observation.validate(row) {
                partitions.remove(&key);
                invalid.insert(key, e);
                continue;
            }
            match observation.error_value(error_field) {
                Some(value) => partitions.entry(key).or_default().push(value),
                None => excluded_observations += 1,
            }
        }

        let mut work = Vec::new();
        let mut skipped = Vec::new();
        let mut failed = Vec::new();
        for key in group_by.key_domain(observations) {
            if let Some(e) = invalid.remove(&key) {
                failed.push((key, e));
                continue;
            }
            match partitions.remove(&key) {
                Some(values) if !values.is_empty() => work.push((key, values)),
                _ => {
                    debug!("Skipping empty partition {}", key);
                    skipped.push(key);
                }
            }
        }

        let resample_partition = |(key, values): (GroupKey, Vec<f64>)| {
            let seed = partition_seed(self.resampler.seed, &key.to_string());
            let outcome = self.resampler.with_seed(seed).resample(&values, statistic);
            (key, outcome)
        };

        let attempted = work.len() + failed.len();
        let outcomes: Vec<(GroupKey, Result<ResampleDistribution>)> = if self.resampler.parallel {
            work.into_par_iter().map(resample_partition).collect()
        } else {
            work.into_iter().map(resample_partition).collect()
        };

        let mut distributions = HashMap::with_capacity(outcomes.len());
        for (key, outcome) in outcomes {
            match outcome {
                Ok(distribution) => {
                    distributions.insert(key, distribution);
                }
                Err(e) => failed.push((key, e)),
            }
        }
        failed.sort_by(|a, b| a.0.cmp(&b.0));
        for (key, e) in &failed {
            warn!("Partition {} failed: {}", key, e);
        }

        info!(
            "Aggregated {} {} error by {}: {} of {} partitions resampled, {} empty partitions skipped, {} observations excluded",
            statistic.name(),
            error_field,
            group_by,
            distributions.len(),
            attempted,
            skipped.len(),
            excluded_observations
        );

        Ok(Aggregation {
            group_by,
            error_field,
            distributions,
            skipped,
            failed,
            excluded_observations,
        })
    }
}

/// Resample `error_field` per `group_by` partition with the given resampler settings
pub fn aggregate(
    observations: &[Observation],
    group_by: GroupBy,
    error_field: ErrorField,
    statistic: &Statistic,
    resampler: Resampler,
) -> Result<Aggregation> {
    Aggregator::new(resampler).aggregate(observations, group_by, error_field, statistic)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Vec<Observation> {
        vec![
            Observation::new("espn", "Peyton Manning", Position::QB, 1, 25.0, 30.0),
            Observation::new("espn", "Matt Forte", Position::RB, 1, 15.0, 9.0),
            Observation::new("espn", "Matt Forte", Position::RB, 3, 14.0, 20.0),
            Observation::new("cbs", "Peyton Manning", Position::QB, 1, 22.0, 30.0),
            Observation::new("cbs", "Stephen Gostkowski", Position::K, 2, 0.0, 8.0),
        ]
    }

    fn aggregator() -> Aggregator {
        Aggregator::new(Resampler::new(200, 42))
    }

    #[test]
    fn test_group_key_labels() {
        let key = GroupKey::ExpertPosition { expert: "espn".into(), position: Position::DST };
        assert_eq!(key.to_string(), "espn|D/ST");
        assert_eq!(GroupKey::ExpertWeek { expert: "cbs".into(), week: 4 }.to_string(), "cbs|w4");
        assert_eq!(key.expert(), Some("espn"));
        assert_eq!(GroupKey::Week(2).expert(), None);
    }

    #[test]
    fn test_aggregate_by_expert() {
        let result = aggregator()
            .aggregate(&table(), GroupBy::Expert, ErrorField::Absolute, &Statistic::Mean)
            .unwrap();
        assert_eq!(result.len(), 2);
        assert!(result.skipped.is_empty());
        let espn = result.get(&GroupKey::Expert("espn".into())).unwrap();
        assert_eq!(espn.len(), 200);
        assert_eq!(espn.sample_size(), 3);
    }

    #[test]
    fn test_expert_week_domain_skips_missing_weeks() {
        let result = aggregator()
            .aggregate(&table(), GroupBy::ExpertWeek, ErrorField::Absolute, &Statistic::Mean)
            .unwrap();
        // espn: weeks 1 and 3; cbs: weeks 1 and 2; max week is 3
        assert_eq!(result.len(), 4);
        assert_eq!(
            result.skipped,
            vec![
                GroupKey::ExpertWeek { expert: "cbs".into(), week: 3 },
                GroupKey::ExpertWeek { expert: "espn".into(), week: 2 },
            ]
        );
    }

    #[test]
    fn test_relative_error_excludes_zero_projections() {
        let result = aggregator()
            .aggregate(&table(), GroupBy::ExpertPosition, ErrorField::Relative, &Statistic::Median)
            .unwrap();
        assert_eq!(result.excluded_observations, 1);
        let cbs_k = GroupKey::ExpertPosition { expert: "cbs".into(), position: Position::K };
        assert!(result.get(&cbs_k).is_none());
        assert!(result.skipped.contains(&cbs_k));
        assert!(result
            .distributions
            .values()
            .all(|d| d.values().iter().all(|v| v.is_finite())));
    }

    #[test]
    fn test_partition_results_independent_of_table_order() {
        let forward = table();
        let mut reversed = table();
        reversed.reverse();
        // weeks 2 and 3 hold one row each, so only partition order changes
        let a = aggregator()
            .aggregate(&forward, GroupBy::Week, ErrorField::Absolute, &Statistic::Mean)
            .unwrap();
        let b = aggregator()
            .aggregate(&reversed, GroupBy::Week, ErrorField::Absolute, &Statistic::Mean)
            .unwrap();
        assert_eq!(a.get(&GroupKey::Week(2)), b.get(&GroupKey::Week(2)));
        assert_eq!(a.get(&GroupKey::Week(3)), b.get(&GroupKey::Week(3)));
    }

    #[test]
    fn test_parallel_and_sequential_aggregation_agree() {
        let parallel = aggregator()
            .aggregate(&table(), GroupBy::ExpertPosition, ErrorField::Absolute, &Statistic::Mean)
            .unwrap();
        let sequential = Aggregator::new(Resampler::new(200, 42).sequential())
            .aggregate(&table(), GroupBy::ExpertPosition, ErrorField::Absolute, &Statistic::Mean)
            .unwrap();
        assert_eq!(parallel.distributions, sequential.distributions);
        assert_eq!(parallel.skipped, sequential.skipped);
    }

    #[test]
    fn test_empty_table_yields_empty_aggregation() {
        let result = aggregator()
            .aggregate(&[], GroupBy::Expert, ErrorField::Absolute, &Statistic::Mean)
            .unwrap();
        assert!(result.is_empty());
        assert!(result.skipped.is_empty());
    }

    #[test]
    fn test_week_domain_follows_observed_weeks() {
        let observations = vec![
            Observation::new("espn", "Matt Forte", Position::RB, 1, 14.0, 20.0),
            Observation::new("espn", "Matt Forte", Position::RB, 3_000_000, 15.0, 9.0),
            Observation::new("cbs", "Matt Forte", Position::RB, 1, 13.0, 20.0),
        ];
        let result = Aggregator::new(Resampler::new(10, 42))
            .aggregate(&observations, GroupBy::ExpertWeek, ErrorField::Absolute, &Statistic::Mean)
            .unwrap();
        assert_eq!(result.len(), 3);
        assert_eq!(
            result.skipped,
            vec![GroupKey::ExpertWeek { expert: "cbs".into(), week: 3_000_000 }]
        );

        let by_week = Aggregator::new(Resampler::new(10, 42))
            .aggregate(&observations, GroupBy::Week, ErrorField::Absolute, &Statistic::Mean)
            .unwrap();
        assert_eq!(by_week.len(), 2);
        assert!(by_week.skipped.is_empty());
    }

    #[test]
    fn test_bad_row_fails_only_its_partition() {
        let observations = vec![
            Observation::new("espn", "Peyton Manning", Position::QB, 1, 25.0, 30.0),
            Observation::new("cbs", "Peyton Manning", Position::QB, 1, 22.0, f64::INFINITY),
            Observation::new("cbs", "Matt Forte", Position::RB, 1, 12.0, 10.0),
            Observation::new("yahoo", "Matt Forte", Position::RB, 1, 11.0, 10.0),
        ];
        let result = aggregator()
            .aggregate(&observations, GroupBy::Expert, ErrorField::Absolute, &Statistic::Mean)
            .unwrap();

        assert_eq!(result.len(), 2);
        assert!(result.get(&GroupKey::Expert("espn".into())).is_some());
        assert!(result.get(&GroupKey::Expert("yahoo".into())).is_some());
        assert!(result.get(&GroupKey::Expert("cbs".into())).is_none());
        assert!(!result.is_complete());
        assert_eq!(result.failed.len(), 1);
        assert_eq!(result.failed[0].0, GroupKey::Expert("cbs".into()));
        assert!(matches!(
            result.failed[0].1,
            BootstrapError::MissingField { field: "actual_points", row: 1 }
        ));

        match result.into_complete() {
            Err(BootstrapError::Partition { key, source }) => {
                assert_eq!(key, GroupKey::Expert("cbs".into()));
                assert!(matches!(*source, BootstrapError::MissingField { .. }));
            }
            other => panic!("Expected partition error, got {other:?}"),
        }
    }

    #[test]
    fn test_zero_iterations_rejected() {
        let err = Aggregator::new(Resampler::new(0, 42))
            .aggregate(&table(), GroupBy::Expert, ErrorField::Absolute, &Statistic::Mean)
            .unwrap_err();
        assert!(matches!(err, BootstrapError::InvalidParameter(_)));
    }

    #[test]
    fn test_parse_group_by() {
        assert_eq!("expert_week".parse::<GroupBy>().unwrap(), GroupBy::ExpertWeek);
        assert!("team".parse::<GroupBy>().is_err());
    }
}
