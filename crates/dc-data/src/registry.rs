//! Registry of available sources and the active one

use dc_core::{Record, SourceId};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::schema::{Column, SemanticType, TypeInferencer};
use crate::sources::{PreviewRows, SourceDescriptor, SourceKind, SourceProvider};
use crate::DataError;

/// Load state of a source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceStatus {
    Connected,
    Pending,
    Error,
}

/// A source with its rows and enriched columns
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSource {
    pub id: SourceId,
    #[serde(rename = "sourceKind")]
    pub kind: SourceKind,
    pub display_name: String,
    pub backing_key: String,
    pub rows: Vec<Record>,
    pub columns: Vec<Column>,
    pub status: SourceStatus,
}

impl DataSource {
    fn pending(descriptor: SourceDescriptor) -> Self {
        Self {
            id: descriptor.id,
            kind: descriptor.kind,
            display_name: descriptor.display_name,
            backing_key: descriptor.backing_key,
            rows: Vec::new(),
            columns: Vec::new(),
            status: SourceStatus::Pending,
        }
    }

    /// Column by inferred or original name, falling back to a
    /// case-insensitive match the way row lookups do
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns
            .iter()
            .find(|c| c.name == name || c.original_name == name)
            .or_else(|| {
                let wanted = name.to_lowercase();
                self.columns.iter().find(|c| {
                    c.name.to_lowercase() == wanted || c.original_name.to_lowercase() == wanted
                })
            })
    }

    pub fn overview(&self) -> DatasetOverview {
        let names_of = |ty: SemanticType| {
            self.columns
                .iter()
                .filter(|c| c.semantic_type == ty)
                .map(|c| c.name.clone())
                .collect::<Vec<_>>()
        };

        DatasetOverview {
            total_rows: self.rows.len(),
            numeric_columns: names_of(SemanticType::Number),
            categorical_columns: names_of(SemanticType::String),
            date_columns: names_of(SemanticType::Date),
        }
    }
}

/// Summary of a loaded source's shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetOverview {
    pub total_rows: usize,
    pub numeric_columns: Vec<String>,
    pub categorical_columns: Vec<String>,
    pub date_columns: Vec<String>,
}

/// Holds every known source and tracks which one is active.
///
/// Refresh replaces the whole set; a load replaces one source's rows and
/// columns in a single step once the fetch has finished.
pub struct SourceRegistry {
    sources: IndexMap<SourceId, DataSource>,
    active: Option<SourceId>,
    inferencer: TypeInferencer,
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::new(TypeInferencer::default())
    }
}

impl SourceRegistry {
    pub fn new(inferencer: TypeInferencer) -> Self {
        Self {
            sources: IndexMap::new(),
            active: None,
            inferencer,
        }
    }

    /// Replace the source list with what the provider currently offers
    pub async fn refresh(&mut self, provider: &dyn SourceProvider) -> Result<usize, DataError> {
        let descriptors = provider.list_sources().await?;

        let sources: IndexMap<_, _> = descriptors
            .into_iter()
            .map(|d| (d.id.clone(), DataSource::pending(d)))
            .collect();

        if let Some(active) = &self.active {
            if !sources.contains_key(active) {
                tracing::info!("Active source '{}' no longer listed", active);
                self.active = None;
            }
        }

        tracing::info!(
            "Refreshed {} sources from {} provider",
            sources.len(),
            provider.provider_name()
        );
        self.sources = sources;
        Ok(self.sources.len())
    }

    /// Fetch a source's preview rows and enrich its columns.
    ///
    /// On failure the source is marked `Error` and keeps no rows.
    pub async fn load_source(
        &mut self,
        provider: &dyn SourceProvider,
        source_id: &str,
        limit: usize,
    ) -> Result<&DataSource, DataError> {
        if !self.sources.contains_key(source_id) {
            return Err(DataError::UnknownSource(source_id.to_string()));
        }

        match provider.preview_rows(source_id, limit).await {
            Ok(preview) => self.install(source_id, preview),
            Err(e) => {
                tracing::warn!("Failed to load source '{}': {}", source_id, e);
                if let Some(source) = self.sources.get_mut(source_id) {
                    source.rows.clear();
                    source.columns.clear();
                    source.status = SourceStatus::Error;
                }
                Err(e)
            }
        }
    }

    /// Replace a source's rows and columns with a fetched preview
    pub fn install(&mut self, source_id: &str, preview: PreviewRows) -> Result<&DataSource, DataError> {
        let columns = self.inferencer.build_columns(&preview.columns, &preview.rows);
        let source = self
            .sources
            .get_mut(source_id)
            .ok_or_else(|| DataError::UnknownSource(source_id.to_string()))?;

        source.rows = preview.rows;
        source.columns = columns;
        source.status = SourceStatus::Connected;

        tracing::info!(
            "Loaded source '{}': {} rows, {} columns",
            source_id,
            source.rows.len(),
            source.columns.len()
        );
        Ok(source)
    }

    /// Mark a source as active; `None` clears the selection
    pub fn set_active(&mut self, source_id: Option<&str>) -> Result<(), DataError> {
        match source_id {
            Some(id) if !self.sources.contains_key(id) => {
                Err(DataError::UnknownSource(id.to_string()))
            }
            Some(id) => {
                self.active = Some(id.to_string());
                Ok(())
            }
            None => {
                self.active = None;
                Ok(())
            }
        }
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn active(&self) -> Option<&DataSource> {
        self.active.as_ref().and_then(|id| self.sources.get(id))
    }

    pub fn get(&self, source_id: &str) -> Option<&DataSource> {
        self.sources.get(source_id)
    }

    /// Sources in provider order
    pub fn sources(&self) -> impl Iterator<Item = &DataSource> {
        self.sources.values()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::MemorySourceProvider;
    use serde_json::json;

    fn record(value: serde_json::Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    fn provider() -> MemorySourceProvider {
        MemorySourceProvider::new().with_dataset(
            "sales",
            vec![
                record(json!({ "region": "N", "sales": 10, "day": "2024-01-02" })),
                record(json!({ "region": "S", "sales": 20, "day": "2024-01-05" })),
            ],
        )
    }

    #[tokio::test]
    async fn test_refresh_lists_pending_sources() {
        let mut registry = SourceRegistry::default();
        assert_eq!(registry.refresh(&provider()).await.unwrap(), 1);

        let source = registry.get("dataset:sales").unwrap();
        assert_eq!(source.status, SourceStatus::Pending);
        assert!(source.rows.is_empty());
    }

    #[tokio::test]
    async fn test_load_enriches_columns() {
        let provider = provider();
        let mut registry = SourceRegistry::default();
        registry.refresh(&provider).await.unwrap();

        let source = registry.load_source(&provider, "dataset:sales", 50).await.unwrap();
        assert_eq!(source.status, SourceStatus::Connected);
        assert_eq!(source.rows.len(), 2);
        assert_eq!(source.column("sales").unwrap().numeric_range(), Some((10.0, 20.0)));

        let overview = source.overview();
        assert_eq!(overview.total_rows, 2);
        assert_eq!(overview.numeric_columns, vec!["sales"]);
        assert_eq!(overview.categorical_columns, vec!["region"]);
        assert_eq!(overview.date_columns, vec!["day"]);

        assert_eq!(source.column("Region").unwrap().name, "region");
        assert!(source.column("territory").is_none());
    }

    #[tokio::test]
    async fn test_failed_load_marks_error() {
        let provider = provider();
        let mut registry = SourceRegistry::default();
        registry.refresh(&provider).await.unwrap();
        registry.load_source(&provider, "dataset:sales", 50).await.unwrap();

        // Source vanished from the provider after it was listed
        let empty = MemorySourceProvider::new();
        assert!(registry.load_source(&empty, "dataset:sales", 50).await.is_err());

        let source = registry.get("dataset:sales").unwrap();
        assert_eq!(source.status, SourceStatus::Error);
        assert!(source.rows.is_empty());
    }

    #[tokio::test]
    async fn test_refresh_drops_stale_active() {
        let provider = provider();
        let mut registry = SourceRegistry::default();
        registry.refresh(&provider).await.unwrap();
        registry.set_active(Some("dataset:sales")).unwrap();
        assert!(registry.active().is_some());

        registry.refresh(&MemorySourceProvider::new()).await.unwrap();
        assert!(registry.active().is_none());
        assert!(registry.set_active(Some("dataset:sales")).is_err());
    }
}
