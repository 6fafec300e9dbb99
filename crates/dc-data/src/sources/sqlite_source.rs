//! SQLite source provider

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use dc_core::Record;
use rusqlite::{types::ValueRef, Connection, OptionalExtension};
use serde_json::Value;

use super::{PreviewRows, SourceDescriptor, SourceKind, SourceProvider};
use crate::DataError;

/// Table listing saved query results
const SNAPSHOTS_TABLE: &str = "snapshots";

/// Tables that hold composer metadata rather than user data
const INTERNAL_TABLES: &[&str] = &[SNAPSHOTS_TABLE, crate::persistence::DASHBOARDS_TABLE];

/// Serves the tables of a SQLite database.
///
/// Every user table is a dataset; each row of the `snapshots` table
/// (`snapshot_name`, `result_table`) is a snapshot backed by its result table.
pub struct SqliteSourceProvider {
    path: PathBuf,
}

impl SqliteSourceProvider {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn open(path: &Path) -> Result<Connection, DataError> {
        Connection::open(path)
            .map_err(|e| DataError::Sqlite(format!("Failed to open SQLite database: {}", e)))
    }

    fn table_exists(conn: &Connection, table: &str) -> Result<bool, DataError> {
        let found: Option<String> = conn
            .query_row(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
                [table],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn list_snapshots(conn: &Connection) -> Result<Vec<SourceDescriptor>, DataError> {
        if !Self::table_exists(conn, SNAPSHOTS_TABLE)? {
            return Ok(Vec::new());
        }

        let mut stmt = conn.prepare(&format!(
            "SELECT snapshot_name, result_table FROM {} ORDER BY rowid",
            SNAPSHOTS_TABLE
        ))?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut descriptors = Vec::new();
        for row in rows {
            let (name, result_table) = row?;
            descriptors.push(SourceDescriptor::new(SourceKind::Snapshot, name, result_table));
        }
        Ok(descriptors)
    }

    fn list(path: &Path) -> Result<Vec<SourceDescriptor>, DataError> {
        let conn = Self::open(path)?;
        let snapshots = Self::list_snapshots(&conn)?;

        let mut stmt = conn.prepare(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )?;
        let tables = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut descriptors = Vec::new();
        for table in tables {
            let table = table?;
            let is_result_table = snapshots.iter().any(|s| s.backing_key == table);
            if INTERNAL_TABLES.contains(&table.as_str()) || is_result_table {
                continue;
            }
            descriptors.push(SourceDescriptor::new(SourceKind::Dataset, table.clone(), table));
        }
        descriptors.extend(snapshots);
        Ok(descriptors)
    }

    fn backing_table(source_id: &str) -> Result<&str, DataError> {
        [SourceKind::Dataset, SourceKind::Snapshot]
            .iter()
            .find_map(|kind| source_id.strip_prefix(&format!("{}:", kind)))
            .ok_or_else(|| DataError::UnknownSource(source_id.to_string()))
    }

    fn read_preview(path: &Path, source_id: &str, limit: usize) -> Result<PreviewRows, DataError> {
        let table = Self::backing_table(source_id)?;
        let conn = Self::open(path)?;
        if !Self::table_exists(&conn, table)? {
            return Err(DataError::UnknownSource(source_id.to_string()));
        }

        let query = format!(
            "SELECT * FROM \"{}\" LIMIT ?1",
            table.replace('"', "\"\"")
        );
        let mut stmt = conn.prepare(&query)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut rows = Vec::new();
        let mut cursor = stmt.query([limit])?;
        while let Some(row) = cursor.next()? {
            let mut record = Record::new();
            for (idx, name) in columns.iter().enumerate() {
                record.insert(name.clone(), Self::to_json(row.get_ref(idx)?));
            }
            rows.push(record);
        }

        Ok(PreviewRows { columns, rows })
    }

    fn to_json(value: ValueRef<'_>) -> Value {
        match value {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) => Value::from(i),
            ValueRef::Real(f) => serde_json::Number::from_f64(f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
            ValueRef::Blob(_) => Value::Null,
        }
    }
}

#[async_trait]
impl SourceProvider for SqliteSourceProvider {
    async fn list_sources(&self) -> Result<Vec<SourceDescriptor>, DataError> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || Self::list(&path)).await?
    }

    async fn preview_rows(&self, source_id: &str, limit: usize) -> Result<PreviewRows, DataError> {
        let path = self.path.clone();
        let source_id = source_id.to_string();
        tokio::task::spawn_blocking(move || Self::read_preview(&path, &source_id, limit)).await?
    }

    fn provider_name(&self) -> &str {
        "sqlite"
    }
}
