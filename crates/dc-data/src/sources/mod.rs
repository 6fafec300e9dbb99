//! Source providers: where datasets and snapshots come from

pub mod csv_source;
pub mod memory_source;
pub mod sqlite_source;

pub use csv_source::CsvSourceProvider;
pub use memory_source::MemorySourceProvider;
pub use sqlite_source::SqliteSourceProvider;

use std::fmt;

use async_trait::async_trait;
use dc_core::{Record, SourceId};
use serde::{Deserialize, Serialize};

use crate::DataError;

/// Whether a source is an uploaded dataset or a saved query result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Dataset,
    Snapshot,
}

impl SourceKind {
    /// Build the registry id for a backing table or file key
    pub fn source_id(&self, backing_key: &str) -> SourceId {
        format!("{}:{}", self, backing_key)
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Dataset => f.write_str("dataset"),
            SourceKind::Snapshot => f.write_str("snapshot"),
        }
    }
}

/// A source as listed by a provider, before any rows are fetched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceDescriptor {
    pub id: SourceId,
    pub kind: SourceKind,
    pub display_name: String,
    /// Table, result table or file name holding the rows
    pub backing_key: String,
}

impl SourceDescriptor {
    pub fn new(kind: SourceKind, display_name: impl Into<String>, backing_key: impl Into<String>) -> Self {
        let backing_key = backing_key.into();
        Self {
            id: kind.source_id(&backing_key),
            kind,
            display_name: display_name.into(),
            backing_key,
        }
    }
}

/// Already-tabular preview of a source
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreviewRows {
    /// Column names in source order
    pub columns: Vec<String>,
    pub rows: Vec<Record>,
}

/// Provider of tabular sources. The composer never parses files or runs
/// queries itself; it only consumes what a provider hands over.
#[async_trait]
pub trait SourceProvider: Send + Sync {
    /// List every source this provider can serve
    async fn list_sources(&self) -> Result<Vec<SourceDescriptor>, DataError>;

    /// Fetch up to `limit` rows of a source
    async fn preview_rows(&self, source_id: &str, limit: usize) -> Result<PreviewRows, DataError>;

    /// Provider name for logs
    fn provider_name(&self) -> &str;
}
