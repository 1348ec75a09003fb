use std::io::Read;
use std::path::Path;

use accuracy_engine::Observation;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{LoadError, Result};
use crate::types::{RawObservationRow, RawTable, RowOutcome};

/// Supported table formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Csv,
    Json,
}

impl InputFormat {
    /// Detect the format from a file extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());

        match extension.as_deref() {
            Some("csv") => Ok(InputFormat::Csv),
            Some("json") => Ok(InputFormat::Json),
            _ => Err(LoadError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Loader behaviour for rows that fail validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoadOptions {
    /// Fail on the first bad row instead of logging and skipping it
    pub strict: bool,
}

/// Counts reported alongside the loaded observations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct LoadSummary {
    /// Rows accepted as observations
    pub observations: usize,
    /// Rows with no actual score (player did not play, week not final)
    pub missing_actual: usize,
    /// Rows skipped as malformed (lenient mode only)
    pub rejected: usize,
}

impl LoadSummary {
    pub fn total_rows(&self) -> usize {
        self.observations + self.missing_actual + self.rejected
    }
}

/// Validated observations plus the load summary
#[derive(Debug, Clone)]
pub struct LoadedObservations {
    pub observations: Vec<Observation>,
    pub summary: LoadSummary,
}

/// Reads joined projection/scoring tables into observations
#[derive(Debug, Clone, Default)]
pub struct ObservationLoader {
    options: LoadOptions,
}

impl ObservationLoader {
    pub fn new(options: LoadOptions) -> Self {
        Self { options }
    }

    /// Loader that fails on the first malformed row
    pub fn strict() -> Self {
        Self::new(LoadOptions { strict: true })
    }

    pub fn options(&self) -> LoadOptions {
        self.options
    }

    /// Load a CSV or JSON file, format chosen by extension
    pub async fn load_file(&self, path: impl AsRef<Path>) -> Result<LoadedObservations> {
        let path = path.as_ref();
        let format = InputFormat::from_path(path)?;

        let content = tokio::fs::read(path)
            .await
            .map_err(|source| LoadError::Io { path: path.to_path_buf(), source })?;
        debug!("Read {} bytes from {}", content.len(), path.display());

        let loaded = match format {
            InputFormat::Csv => self.load_csv(content.as_slice())?,
            InputFormat::Json => self.load_json(&content)?,
        };

        info!(
            "Loaded {} observations from {} ({} missing actual, {} rejected)",
            loaded.summary.observations,
            path.display(),
            loaded.summary.missing_actual,
            loaded.summary.rejected
        );

        Ok(loaded)
    }

    /// Parse a CSV table with a header row
    pub fn load_csv<R: Read>(&self, reader: R) -> Result<LoadedObservations> {
        let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

        let mut state = LoadState::default();
        for (index, record) in csv_reader.deserialize::<RawObservationRow>().enumerate() {
            let row = index + 1;
            match record {
                Ok(raw) => self.accept(&mut state, raw, row)?,
                Err(e) if self.options.strict => return Err(LoadError::Csv(e)),
                Err(e) => {
                    warn!("Skipping unreadable CSV row {}: {}", row, e);
                    state.summary.rejected += 1;
                }
            }
        }

        Ok(state.finish())
    }

    /// Parse a JSON table: a bare array of rows or `{"observations": [...]}`
    pub fn load_json(&self, content: &[u8]) -> Result<LoadedObservations> {
        let table: RawTable = serde_json::from_slice(content)?;

        let mut state = LoadState::default();
        for (index, raw) in table.into_rows().into_iter().enumerate() {
            self.accept(&mut state, raw, index + 1)?;
        }

        Ok(state.finish())
    }

    fn accept(&self, state: &mut LoadState, raw: RawObservationRow, row: usize) -> Result<()> {
        match raw.validate(row) {
            Ok(RowOutcome::Valid(observation)) => {
                state.observations.push(observation);
                state.summary.observations += 1;
            }
            Ok(RowOutcome::MissingActual) => {
                debug!("Row {} has no actual score, excluded", row);
                state.summary.missing_actual += 1;
            }
            Err(e) if self.options.strict => return Err(e),
            Err(e) => {
                warn!("Skipping row: {}", e);
                state.summary.rejected += 1;
            }
        }
        Ok(())
    }
}

#[derive(Default)]
struct LoadState {
    observations: Vec<Observation>,
    summary: LoadSummary,
}

impl LoadState {
    fn finish(self) -> LoadedObservations {
        LoadedObservations { observations: self.observations, summary: self.summary }
    }
}
