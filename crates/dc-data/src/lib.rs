//! Data handling for the dashboard composer: sources, inference and filtering

pub mod config;
pub mod filter;
pub mod persistence;
pub mod registry;
pub mod schema;
pub mod sources;
pub mod value;

use thiserror::Error;
use tokio::task::JoinError;

// Re-exports
pub use config::{InferenceConfig, NullConfig};
pub use filter::{
    apply_filters, default_value, evaluate, DateRange, FilterId, FilterKind, FilterSpec,
    FilterValue, NumericRange,
};
pub use persistence::SqliteDashboardBackend;
pub use registry::{DataSource, DatasetOverview, SourceRegistry, SourceStatus};
pub use schema::{Column, ColumnRange, Enrichment, SemanticType, TypeInferencer};
pub use sources::{
    CsvSourceProvider, MemorySourceProvider, PreviewRows, SourceDescriptor, SourceKind,
    SourceProvider, SqliteSourceProvider,
};

/// Errors that can occur in data operations
#[derive(Error, Debug)]
pub enum DataError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(String),

    #[error("SQLite error: {0}")]
    Sqlite(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown source: {0}")]
    UnknownSource(String),

    #[error("A {kind:?} filter expects {expected}")]
    FilterShape {
        kind: FilterKind,
        expected: &'static str,
    },

    #[error("Join error: {0}")]
    Join(#[from] JoinError),

    #[error("Other error: {0}")]
    Other(String),
}

impl From<csv::Error> for DataError {
    fn from(error: csv::Error) -> Self {
        match error.kind() {
            csv::ErrorKind::Io(io_err) => DataError::Io(std::io::Error::new(io_err.kind(), error.to_string())),
            _ => DataError::Csv(error.to_string()),
        }
    }
}

impl From<rusqlite::Error> for DataError {
    fn from(error: rusqlite::Error) -> Self {
        DataError::Sqlite(error.to_string())
    }
}
