use crate::aggregation::{Aggregation, Aggregator, GroupBy};
use crate::config::AccuracyConfig;
use crate::error::Result;
use crate::models::{ErrorField, Observation};
use crate::ranker::{self, RelevanceCutoffs};
use crate::report::{self, AccuracyReport, ReportSection};
use crate::statistic::Statistic;
use chrono::Utc;
use tracing::{info, info_span};

/// Runs the full rank -> filter -> aggregate -> summarize pipeline
pub struct AccuracyEngine {
    config: AccuracyConfig,
    aggregator: Aggregator,
    cutoffs: RelevanceCutoffs,
    statistics: Vec<Statistic>,
}

impl AccuracyEngine {
    /// Create an engine; fails if the configuration is invalid
    pub fn new(config: AccuracyConfig) -> Result<Self> {
        config.validate()?;

        let aggregator = Aggregator::new(config.resampler());
        let cutoffs = config.relevance.cutoffs()?;
        let statistics = config.analysis.statistics()?;

        info!(
            "Created AccuracyEngine ({} iterations, seed {}, alpha {})",
            config.resampling.iterations, config.resampling.seed, config.interval.alpha
        );

        Ok(Self { config, aggregator, cutoffs, statistics })
    }

    pub fn config(&self) -> &AccuracyConfig {
        &self.config
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    /// Observations that enter aggregation: the relevant subset when the filter is on
    pub fn select(&self, observations: &[Observation]) -> Vec<Observation> {
        if !self.config.relevance.enabled {
            return observations.to_vec();
        }
        let relevant = ranker::fantasy_relevant(observations, &self.cutoffs);
        info!("Kept {} of {} observations as fantasy relevant", relevant.len(), observations.len());
        relevant
    }

    /// Aggregate one breakdown of already-selected observations
    pub fn aggregate(
        &self,
        observations: &[Observation],
        group_by: GroupBy,
        error_field: ErrorField,
        statistic: &Statistic,
    ) -> Result<Aggregation> {
        self.aggregator.aggregate(observations, group_by, error_field, statistic)
    }

    /// Run every configured breakdown and assemble the report
    pub fn run(&self, observations: &[Observation]) -> Result<AccuracyReport> {
        let _span = info_span!("accuracy_run", observations = observations.len()).entered();

        for (row, observation) in observations.iter().enumerate() {
            observation.validate(row)?;
        }
        let selected = self.select(observations);
        let alpha = self.config.interval.alpha;

        let mut sections = Vec::new();
        for &group_by in &self.config.analysis.groupings {
            for &error_field in &self.config.analysis.error_fields {
                for statistic in &self.statistics {
                    let aggregation = self
                        .aggregate(&selected, group_by, error_field, statistic)?
                        .into_complete()?;
                    sections.push(ReportSection::from_aggregation(&aggregation, statistic, alpha)?);
                }
            }
        }

        let sources = report::source_rows(&selected, GroupBy::Expert, &self.aggregator, alpha)?;
        let players = if self.config.analysis.player_table {
            report::source_rows(&selected, GroupBy::Player, &self.aggregator, alpha)?
        } else {
            Vec::new()
        };
        let skipped: usize = sections.iter().map(|s| s.skipped.len()).sum();

        info!(
            "Accuracy run complete: {} sections, {} sources, {} players, {} empty partitions skipped",
            sections.len(),
            sources.len(),
            players.len(),
            skipped
        );

        Ok(AccuracyReport {
            generated_at: Utc::now(),
            config: self.config.clone(),
            total_observations: observations.len(),
            relevant_observations: selected.len(),
            sources,
            players,
            sections,
        })
    }
}
