//! Within-group ranking and the "fantasy relevant" filter.

use crate::models::{Observation, Position, RankedObservation};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Observation field used to partition before ranking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankField {
    Expert,
    Position,
    Week,
    Player,
}

/// Observation field ranked on, highest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreField {
    Projected,
    Actual,
}

impl ScoreField {
    fn value(&self, observation: &Observation) -> f64 {
        match self {
            ScoreField::Projected => observation.projected_points,
            ScoreField::Actual => observation.actual_points,
        }
    }
}

/// Grouping used to decide relevance: each expert's players at one position in one week
pub const RELEVANCE_GROUPING: [RankField; 3] = [RankField::Expert, RankField::Position, RankField::Week];

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum FieldValue<'a> {
    Text(&'a str),
    Position(Position),
    Week(u32),
}

fn partition_key<'a>(observation: &'a Observation, group_by: &[RankField]) -> Vec<FieldValue<'a>> {
    group_by
        .iter()
        .map(|field| match field {
            RankField::Expert => FieldValue::Text(&observation.expert),
            RankField::Player => FieldValue::Text(&observation.player),
            RankField::Position => FieldValue::Position(observation.position),
            RankField::Week => FieldValue::Week(observation.week),
        })
        .collect()
}

/// Rank observations inside each `group_by` partition by `score_field`, highest first.
///
/// Output keeps input order. Equal scores keep their input order; NaN scores rank last.
pub fn rank(
    observations: &[Observation],
    group_by: &[RankField],
    score_field: ScoreField,
) -> Vec<RankedObservation> {
    let mut partitions: HashMap<Vec<FieldValue<'_>>, Vec<usize>> = HashMap::new();
    for (idx, observation) in observations.iter().enumerate() {
        partitions.entry(partition_key(observation, group_by)).or_default().push(idx);
    }

    let mut ranks = vec![0usize; observations.len()];
    for members in partitions.values_mut() {
        // stable: ties resolve to input order
        members.sort_by(|&a, &b| {
            let (sa, sb) = (score_field.value(&observations[a]), score_field.value(&observations[b]));
            match (sa.is_nan(), sb.is_nan()) {
                (false, false) => sb.total_cmp(&sa),
                (a_nan, b_nan) => a_nan.cmp(&b_nan),
            }
        });
        for (position, &idx) in members.iter().enumerate() {
            ranks[idx] = position + 1;
        }
    }

    debug!("Ranked {} observations across {} partitions", observations.len(), partitions.len());

    observations
        .iter()
        .zip(ranks)
        .map(|(observation, rank)| RankedObservation { observation: observation.clone(), rank })
        .collect()
}

/// Top-N cutoff per position
#[derive(Debug, Clone, PartialEq)]
pub struct RelevanceCutoffs {
    cutoffs: HashMap<Position, usize>,
}

impl Default for RelevanceCutoffs {
    fn default() -> Self {
        let mut cutoffs = HashMap::new();
        cutoffs.insert(Position::QB, 20);
        cutoffs.insert(Position::RB, 60);
        cutoffs.insert(Position::WR, 60);
        cutoffs.insert(Position::TE, 20);
        cutoffs.insert(Position::K, 15);
        cutoffs.insert(Position::DST, 15);
        Self { cutoffs }
    }
}

impl RelevanceCutoffs {
    pub fn new(cutoffs: HashMap<Position, usize>) -> Self {
        Self { cutoffs }
    }

    pub fn cutoff(&self, position: Position) -> Option<usize> {
        self.cutoffs.get(&position).copied()
    }

    pub fn set(&mut self, position: Position, top_n: usize) {
        self.cutoffs.insert(position, top_n);
    }

    pub fn is_relevant(&self, ranked: &RankedObservation) -> bool {
        self.cutoff(ranked.observation.position).is_some_and(|n| ranked.rank <= n)
    }

    pub fn as_map(&self) -> &HashMap<Position, usize> {
        &self.cutoffs
    }
}

/// Keep observations ranked within their position's cutoff; positions without a cutoff are dropped
pub fn filter_relevant(ranked: &[RankedObservation], cutoffs: &RelevanceCutoffs) -> Vec<Observation> {
    ranked
        .iter()
        .filter(|r| cutoffs.is_relevant(r))
        .map(|r| r.observation.clone())
        .collect()
}

/// Rank by projection inside each expert/position/week group and keep the relevant rows
pub fn fantasy_relevant(observations: &[Observation], cutoffs: &RelevanceCutoffs) -> Vec<Observation> {
    let ranked = rank(observations, &RELEVANCE_GROUPING, ScoreField::Projected);
    filter_relevant(&ranked, cutoffs)
}
