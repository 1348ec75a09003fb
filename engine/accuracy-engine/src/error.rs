//! Error types for the accuracy engine

use crate::aggregation::GroupKey;
use thiserror::Error;

/// Result type alias for accuracy engine operations
pub type Result<T> = std::result::Result<T, BootstrapError>;

/// Errors that can occur while ranking, resampling or summarizing observations
#[derive(Error, Debug)]
pub enum BootstrapError {
    /// Resampling was requested on an empty sample
    #[error("cannot resample an empty sample")]
    EmptySample,

    /// A parameter is outside its valid domain (alpha, iteration count, statistic name)
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// An observation reached the core without a required field
    #[error("observation {row} is missing required field '{field}'")]
    MissingField { field: &'static str, row: usize },

    /// Resampling of a single partition failed
    #[error("partition {key} failed: {source}")]
    Partition {
        key: GroupKey,
        #[source]
        source: Box<BootstrapError>,
    },

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O errors while reading or writing configuration
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML decoding errors
    #[error("TOML decode error: {0}")]
    TomlDecode(#[from] toml::de::Error),

    /// TOML encoding errors
    #[error("TOML encode error: {0}")]
    TomlEncode(#[from] toml::ser::Error),

    /// JSON serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BootstrapError {
    /// Create a new invalid parameter error
    pub fn invalid_parameter(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Wrap an error with the partition it came from
    pub fn partition(key: GroupKey, source: BootstrapError) -> Self {
        Self::Partition { key, source: Box::new(source) }
    }
}
