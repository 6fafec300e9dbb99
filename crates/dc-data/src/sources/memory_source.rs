//! In-memory source provider

use async_trait::async_trait;
use dc_core::Record;
use indexmap::IndexMap;
use parking_lot::RwLock;

use super::{PreviewRows, SourceDescriptor, SourceKind, SourceProvider};
use crate::DataError;

/// Provider over rows held in memory; used for demos and tests
#[derive(Default)]
pub struct MemorySourceProvider {
    sources: RwLock<IndexMap<String, (SourceDescriptor, PreviewRows)>>,
}

impl MemorySourceProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a dataset; column order follows the first row's keys
    pub fn with_dataset(self, name: &str, rows: Vec<Record>) -> Self {
        self.insert(SourceKind::Dataset, name, rows);
        self
    }

    /// Register a snapshot backed by `result_table`
    pub fn with_snapshot(self, name: &str, result_table: &str, rows: Vec<Record>) -> Self {
        let descriptor = SourceDescriptor::new(SourceKind::Snapshot, name, result_table);
        let preview = Self::preview(rows);
        self.sources
            .write()
            .insert(descriptor.id.clone(), (descriptor, preview));
        self
    }

    /// Add or replace a source
    pub fn insert(&self, kind: SourceKind, name: &str, rows: Vec<Record>) -> String {
        let descriptor = SourceDescriptor::new(kind, name, name);
        let id = descriptor.id.clone();
        self.sources
            .write()
            .insert(id.clone(), (descriptor, Self::preview(rows)));
        id
    }

    fn preview(rows: Vec<Record>) -> PreviewRows {
        let columns = rows
            .first()
            .map(|row| row.keys().cloned().collect())
            .unwrap_or_default();
        PreviewRows { columns, rows }
    }
}

#[async_trait]
impl SourceProvider for MemorySourceProvider {
    async fn list_sources(&self) -> Result<Vec<SourceDescriptor>, DataError> {
        Ok(self
            .sources
            .read()
            .values()
            .map(|(descriptor, _)| descriptor.clone())
            .collect())
    }

    async fn preview_rows(&self, source_id: &str, limit: usize) -> Result<PreviewRows, DataError> {
        let sources = self.sources.read();
        let (_, preview) = sources
            .get(source_id)
            .ok_or_else(|| DataError::UnknownSource(source_id.to_string()))?;

        Ok(PreviewRows {
            columns: preview.columns.clone(),
            rows: preview.rows.iter().take(limit).cloned().collect(),
        })
    }

    fn provider_name(&self) -> &str {
        "memory"
    }
}
