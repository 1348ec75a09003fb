//! Error types for observation loading

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for loader operations
pub type Result<T> = std::result::Result<T, LoadError>;

/// Errors that can occur while reading an observation table
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A required column is empty or absent
    #[error("row {row} is missing required field '{field}'")]
    MissingField { field: &'static str, row: usize },

    /// A value is present but unusable (unknown position, week 0, non-finite points)
    #[error("row {row} is invalid: {reason}")]
    InvalidRow { row: usize, reason: String },

    #[error("unsupported input format: {0}")]
    UnsupportedFormat(String),
}

impl LoadError {
    pub fn invalid_row(row: usize, reason: impl Into<String>) -> Self {
        Self::InvalidRow { row, reason: reason.into() }
    }
}
