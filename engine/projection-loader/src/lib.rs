//! # Projection Loader
//!
//! Reads joined projection/scoring tables (CSV or JSON) and validates each
//! row into an [`accuracy_engine::Observation`]. Rows without an actual score
//! are excluded and counted; malformed rows are skipped with a warning, or
//! fail the load in strict mode.

pub mod error;
pub mod loader;
pub mod types;

pub use error::{LoadError, Result};
pub use loader::{InputFormat, LoadOptions, LoadSummary, LoadedObservations, ObservationLoader};
pub use types::RawObservationRow;
