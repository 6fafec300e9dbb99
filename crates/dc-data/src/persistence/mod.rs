//! SQLite-backed dashboard persistence

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dc_core::{ChartConfig, Dashboard, DashboardBackend, DashboardId, DashboardSummary};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::DataError;

/// Table holding saved dashboards
pub const DASHBOARDS_TABLE: &str = "dashboards";

/// Stores named dashboards in a SQLite database.
///
/// Several dashboards may exist per source; `create` always inserts.
pub struct SqliteDashboardBackend {
    path: PathBuf,
}

/// Raw dashboard row before the chart config is parsed
struct StoredDashboard {
    id: DashboardId,
    source_id: String,
    name: String,
    config: String,
    created_at: String,
}

impl StoredDashboard {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            source_id: row.get(1)?,
            name: row.get(2)?,
            config: row.get(3)?,
            created_at: row.get(4)?,
        })
    }

    /// Stored configs that no longer parse load as an empty dashboard
    fn charts(&self) -> Vec<ChartConfig> {
        serde_json::from_str(&self.config).unwrap_or_else(|e| {
            tracing::warn!("Dashboard {} has an unreadable config: {}", self.id, e);
            Vec::new()
        })
    }

    fn created_at(&self) -> Result<DateTime<Utc>, DataError> {
        DateTime::parse_from_rfc3339(&self.created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| DataError::Other(format!("Bad timestamp on dashboard {}: {}", self.id, e)))
    }

    fn summary(&self) -> Result<DashboardSummary, DataError> {
        Ok(DashboardSummary {
            id: self.id,
            source_id: self.source_id.clone(),
            name: self.name.clone(),
            chart_count: self.charts().len(),
            created_at: self.created_at()?,
        })
    }
}

const SELECT_COLUMNS: &str = "id, source_id, name, config, created_at";

impl SqliteDashboardBackend {
    /// Open the database, creating the dashboards table if needed
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, DataError> {
        let backend = Self {
            path: path.as_ref().to_path_buf(),
        };
        let conn = backend.connect()?;
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                source_id TEXT NOT NULL,
                name TEXT NOT NULL,
                config TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
            DASHBOARDS_TABLE
        ))?;
        Ok(backend)
    }

    fn connect(&self) -> Result<Connection, DataError> {
        Connection::open(&self.path)
            .map_err(|e| DataError::Sqlite(format!("Failed to open SQLite database: {}", e)))
    }

    fn insert(
        &self,
        source_id: &str,
        name: &str,
        charts: &[ChartConfig],
    ) -> Result<DashboardSummary, DataError> {
        let config = serde_json::to_string(charts)?;
        let created_at = Utc::now();
        let conn = self.connect()?;
        conn.execute(
            &format!(
                "INSERT INTO {} (source_id, name, config, created_at) VALUES (?1, ?2, ?3, ?4)",
                DASHBOARDS_TABLE
            ),
            params![source_id, name, config, created_at.to_rfc3339()],
        )?;

        Ok(DashboardSummary {
            id: conn.last_insert_rowid(),
            source_id: source_id.to_string(),
            name: name.to_string(),
            chart_count: charts.len(),
            created_at,
        })
    }

    fn select_for_source(&self, source_id: &str) -> Result<Vec<DashboardSummary>, DataError> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM {} WHERE source_id = ?1 ORDER BY id",
            SELECT_COLUMNS, DASHBOARDS_TABLE
        ))?;
        let rows = stmt.query_map([source_id], StoredDashboard::from_row)?;

        let mut summaries = Vec::new();
        for row in rows {
            summaries.push(row?.summary()?);
        }
        Ok(summaries)
    }

    fn select_one(&self, id: DashboardId) -> Result<Option<Dashboard>, DataError> {
        let conn = self.connect()?;
        let stored = conn
            .query_row(
                &format!("SELECT {} FROM {} WHERE id = ?1", SELECT_COLUMNS, DASHBOARDS_TABLE),
                [id],
                StoredDashboard::from_row,
            )
            .optional()?;

        Ok(stored.map(|stored| Dashboard {
            id: stored.id,
            charts: stored.charts(),
            source_id: stored.source_id,
            name: stored.name,
        }))
    }
}

#[async_trait]
impl DashboardBackend for SqliteDashboardBackend {
    async fn create(
        &self,
        source_id: &str,
        name: &str,
        charts: &[ChartConfig],
    ) -> anyhow::Result<DashboardSummary> {
        let summary = self.insert(source_id, name, charts)?;
        tracing::info!(
            "Stored dashboard '{}' ({} charts) for source '{}' as #{}",
            name,
            charts.len(),
            source_id,
            summary.id
        );
        Ok(summary)
    }

    async fn list(&self, source_id: &str) -> anyhow::Result<Vec<DashboardSummary>> {
        Ok(self.select_for_source(source_id)?)
    }

    async fn get(&self, id: DashboardId) -> anyhow::Result<Dashboard> {
        self.select_one(id)?
            .ok_or_else(|| anyhow::anyhow!("Dashboard {} not found", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dc_core::{ChartType, Position, Size};

    fn backend(dir: &tempfile::TempDir) -> SqliteDashboardBackend {
        SqliteDashboardBackend::open(dir.path().join("dash.db")).unwrap()
    }

    fn charts() -> Vec<ChartConfig> {
        vec![
            ChartConfig::new(ChartType::Bar, Position::default(), Size::default()),
            ChartConfig::new(ChartType::Pie, Position::new(420.0, 0.0), Size::default()),
        ]
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let dir = tempfile::tempdir().unwrap();
        let backend = backend(&dir);
        let saved = charts();

        let summary = backend.create("dataset:sales", "Q3 review", &saved).await.unwrap();
        let loaded = backend.get(summary.id).await.unwrap();

        assert_eq!(loaded.name, "Q3 review");
        assert_eq!(loaded.source_id, "dataset:sales");
        assert_eq!(loaded.charts, saved);
    }

    #[tokio::test]
    async fn test_create_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let backend = backend(&dir);

        backend.create("dataset:sales", "A", &charts()).await.unwrap();
        backend.create("dataset:sales", "A", &charts()[..1]).await.unwrap();
        backend.create("dataset:other", "B", &[]).await.unwrap();

        let listed = backend.list("dataset:sales").await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].chart_count, 2);
        assert_eq!(listed[1].chart_count, 1);
    }

    #[tokio::test]
    async fn test_get_missing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(backend(&dir).get(42).await.is_err());
    }

    #[tokio::test]
    async fn test_unreadable_config_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let backend = backend(&dir);
        let summary = backend.create("dataset:sales", "broken", &charts()).await.unwrap();

        let conn = Connection::open(dir.path().join("dash.db")).unwrap();
        conn.execute("UPDATE dashboards SET config = 'not json' WHERE id = ?1", [summary.id])
            .unwrap();

        assert!(backend.get(summary.id).await.unwrap().charts.is_empty());
        assert_eq!(backend.list("dataset:sales").await.unwrap()[0].chart_count, 0);
    }
}
