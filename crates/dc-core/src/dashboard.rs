//! Dashboard persistence: the in-memory keyed store and the remote backend contract

use std::sync::Arc;

use ahash::AHashMap;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::chart::ChartConfig;
use crate::SourceId;

/// Identifier assigned by a persistence backend
pub type DashboardId = i64;

/// Ordered chart list saved for one source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub id: DashboardId,
    pub source_id: SourceId,
    pub name: String,
    pub charts: Vec<ChartConfig>,
}

/// Listing entry returned by a backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub id: DashboardId,
    pub source_id: SourceId,
    pub name: String,
    pub chart_count: usize,
    pub created_at: DateTime<Utc>,
}

/// Durable mirror of the dashboard store.
///
/// The backend is never consulted implicitly: the composition layer calls it
/// on explicit save/load actions only.
#[async_trait::async_trait]
pub trait DashboardBackend: Send + Sync {
    /// Store a new named dashboard; always creates a new entry
    async fn create(
        &self,
        source_id: &str,
        name: &str,
        charts: &[ChartConfig],
    ) -> anyhow::Result<DashboardSummary>;

    /// List dashboards saved for a source
    async fn list(&self, source_id: &str) -> anyhow::Result<Vec<DashboardSummary>>;

    /// Fetch a full dashboard
    async fn get(&self, id: DashboardId) -> anyhow::Result<Dashboard>;
}

/// Keyed in-memory dashboard store; last save wins
#[derive(Debug, Default, Clone)]
pub struct DashboardStore {
    dashboards: Arc<RwLock<AHashMap<SourceId, Vec<ChartConfig>>>>,
}

impl DashboardStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the chart list for `source_id`
    pub fn save(&self, source_id: &str, charts: &[ChartConfig]) {
        tracing::debug!("Saving {} charts for source '{}'", charts.len(), source_id);
        self.dashboards
            .write()
            .insert(source_id.to_string(), charts.to_vec());
    }

    /// Saved charts for `source_id`, or an empty list
    pub fn load(&self, source_id: &str) -> Vec<ChartConfig> {
        self.dashboards
            .read()
            .get(source_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn clear(&self, source_id: &str) {
        self.dashboards.write().remove(source_id);
    }

    pub fn contains(&self, source_id: &str) -> bool {
        self.dashboards.read().contains_key(source_id)
    }
}
