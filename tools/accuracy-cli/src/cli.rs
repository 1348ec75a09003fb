//! # Command Line Interface
//!
//! Load a joined projection table, run the bootstrap and print intervals.

use accuracy_engine::{
    rank, AccuracyConfig, AccuracyEngine, AccuracyReport, ErrorField, GroupBy, GroupKey,
    ScoreField, Statistic, RELEVANCE_GROUPING,
};
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use projection_loader::{LoadOptions, LoadedObservations, ObservationLoader};
use std::path::{Path, PathBuf};
use tracing::info;

/// Bootstrap accuracy analysis for fantasy projection sources
#[derive(Parser)]
#[command(name = "accuracy-cli")]
#[command(about = "Estimate projection error with bootstrap confidence intervals")]
#[command(version)]
pub struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run every configured breakdown and write the report
    Analyze {
        /// Joined projection/scoring table (.csv or .json)
        #[arg(short, long)]
        input: PathBuf,

        /// TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Write the JSON report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(long)]
        iterations: Option<usize>,

        #[arg(long)]
        seed: Option<u64>,

        #[arg(long)]
        alpha: Option<f64>,

        /// Skip the fantasy relevance filter
        #[arg(long)]
        all_players: bool,

        /// Fail on malformed rows instead of skipping them
        #[arg(long)]
        strict: bool,
    },
    /// Rank players by projection within expert, position and week
    Rank {
        #[arg(short, long)]
        input: PathBuf,

        /// Only show ranks up to N
        #[arg(long)]
        top: Option<usize>,
    },
    /// Confidence interval of one expert's error
    Interval {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        expert: String,

        #[arg(long, default_value = "absolute")]
        field: ErrorField,

        /// mean or median
        #[arg(long, default_value = "mean")]
        statistic: String,
    },
    /// Write the default configuration as TOML
    Config {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// CLI handler
pub struct CliHandler {
    config: AccuracyConfig,
}

impl CliHandler {
    /// Defaults overridden by `ACCURACY_*` environment variables
    pub fn new() -> Result<Self> {
        let config = AccuracyConfig::from_env().context("invalid ACCURACY_* environment")?;
        Ok(Self { config })
    }

    /// Handle CLI commands
    pub async fn handle_command(&self, command: Commands) -> Result<()> {
        match command {
            Commands::Analyze {
                input,
                config,
                output,
                iterations,
                seed,
                alpha,
                all_players,
                strict,
            } => {
                let mut config = match config {
                    Some(path) => AccuracyConfig::load_from_file(&path)
                        .with_context(|| format!("failed to load config {}", path.display()))?
                        .apply_env()?,
                    None => self.config.clone(),
                };
                if let Some(iterations) = iterations {
                    config.resampling.iterations = iterations;
                }
                if let Some(seed) = seed {
                    config.resampling.seed = seed;
                }
                if let Some(alpha) = alpha {
                    config.interval.alpha = alpha;
                }
                if all_players {
                    config.relevance.enabled = false;
                }
                self.analyze(&input, config, output.as_deref(), strict).await?;
            }
            Commands::Rank { input, top } => {
                self.show_ranks(&input, top).await?;
            }
            Commands::Interval { input, expert, field, statistic } => {
                let statistic: Statistic = statistic.parse()?;
                self.show_interval(&input, &expert, field, &statistic).await?;
            }
            Commands::Config { output } => {
                self.write_config(output.as_deref())?;
            }
        }
        Ok(())
    }

    async fn load(&self, input: &Path, strict: bool) -> Result<LoadedObservations> {
        let loader = ObservationLoader::new(LoadOptions { strict });
        let loaded = loader
            .load_file(input)
            .await
            .with_context(|| format!("failed to load {}", input.display()))?;
        if loaded.observations.is_empty() {
            bail!("{} contains no usable observations", input.display());
        }
        Ok(loaded)
    }

    async fn analyze(
        &self,
        input: &Path,
        config: AccuracyConfig,
        output: Option<&Path>,
        strict: bool,
    ) -> Result<()> {
        let loaded = self.load(input, strict).await?;
        let engine = AccuracyEngine::new(config)?;
        let report = engine.run(&loaded.observations)?;

        print_sources(&report);

        match output {
            Some(path) => {
                report
                    .save_to_file(path)
                    .with_context(|| format!("failed to write report {}", path.display()))?;
                info!("Report written to {}", path.display());
            }
            None => println!("{}", report.to_json()?),
        }

        Ok(())
    }

    async fn show_ranks(&self, input: &Path, top: Option<usize>) -> Result<()> {
        let loaded = self.load(input, false).await?;
        let ranked = rank(&loaded.observations, &RELEVANCE_GROUPING, ScoreField::Projected);

        println!(
            "{:<12} {:<5} {:>4} {:>5}  {:<28} {:>9} {:>9}",
            "expert", "pos", "week", "rank", "player", "projected", "actual"
        );
        for entry in ranked.iter().filter(|r| top.map_or(true, |n| r.rank <= n)) {
            let obs = &entry.observation;
            println!(
                "{:<12} {:<5} {:>4} {:>5}  {:<28} {:>9.2} {:>9.2}",
                obs.expert,
                obs.position,
                obs.week,
                entry.rank,
                obs.player,
                obs.projected_points,
                obs.actual_points
            );
        }
        Ok(())
    }

    async fn show_interval(
        &self,
        input: &Path,
        expert: &str,
        field: ErrorField,
        statistic: &Statistic,
    ) -> Result<()> {
        let loaded = self.load(input, false).await?;
        let engine = AccuracyEngine::new(self.config.clone())?;
        let selected = engine.select(&loaded.observations);
        let aggregation = engine.aggregate(&selected, GroupBy::Expert, field, statistic)?;

        let key = GroupKey::Expert(expert.to_string());
        if let Some((_, e)) = aggregation.failed.iter().find(|(failed, _)| *failed == key) {
            bail!("partition {} failed: {}", key, e);
        }
        let Some(distribution) = aggregation.get(&key) else {
            bail!("no {} observations for expert '{}'", field, expert);
        };
        let ci = distribution.confidence_interval(self.config.interval.alpha)?;

        println!(
            "{} {} error for {} ({} observations)",
            statistic,
            field,
            expert,
            distribution.sample_size()
        );
        println!("  bootstrap mean: {:.3}", distribution.mean());
        println!("  {:.0}% interval: [{:.3}, {:.3}]", ci.level() * 100.0, ci.lower, ci.upper);
        Ok(())
    }

    fn write_config(&self, output: Option<&Path>) -> Result<()> {
        let config = AccuracyConfig::default();
        match output {
            Some(path) => {
                config
                    .save_to_file(path)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                info!("Default configuration written to {}", path.display());
            }
            None => print!("{}", toml::to_string_pretty(&config)?),
        }
        Ok(())
    }
}

fn print_sources(report: &AccuracyReport) {
    eprintln!(
        "{} observations, {} fantasy relevant",
        report.total_observations, report.relevant_observations
    );
    eprintln!(
        "{:<12} {:>6} {:>9} {:>9} {:>9} {:>9}",
        "source", "n", "avg pts", "lower", "mean err", "upper"
    );
    for row in &report.sources {
        eprintln!(
            "{:<12} {:>6} {:>9.2} {:>9.3} {:>9.3} {:>9.3}",
            row.key,
            row.observations,
            row.avg_points,
            row.abs_lower,
            row.abs_mean_error,
            row.abs_upper
        );
    }
}
