//! CSV directory source provider

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use csv::ReaderBuilder;
use dc_core::Record;
use serde_json::Value;

use super::{PreviewRows, SourceDescriptor, SourceKind, SourceProvider};
use crate::DataError;

/// Serves every `.csv` file in a directory as a dataset.
///
/// Cells are handed over as strings; typing is left to the inferencer.
pub struct CsvSourceProvider {
    root: PathBuf,
}

impl CsvSourceProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn file_for(&self, source_id: &str) -> Result<PathBuf, DataError> {
        let prefix = format!("{}:", SourceKind::Dataset);
        let file_name = source_id
            .strip_prefix(&prefix)
            .filter(|name| Path::new(name).file_name().and_then(|n| n.to_str()) == Some(*name))
            .ok_or_else(|| DataError::UnknownSource(source_id.to_string()))?;

        let path = self.root.join(file_name);
        if !path.is_file() {
            return Err(DataError::UnknownSource(source_id.to_string()));
        }
        Ok(path)
    }

    fn scan(root: &Path) -> Result<Vec<SourceDescriptor>, DataError> {
        let mut descriptors = Vec::new();
        for entry in std::fs::read_dir(root)? {
            let path = entry?.path();
            let is_csv = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.eq_ignore_ascii_case("csv"))
                .unwrap_or(false);
            if !is_csv || !path.is_file() {
                continue;
            }

            let (Some(file_name), Some(stem)) = (
                path.file_name().and_then(|n| n.to_str()),
                path.file_stem().and_then(|n| n.to_str()),
            ) else {
                continue;
            };
            descriptors.push(SourceDescriptor::new(SourceKind::Dataset, stem, file_name));
        }
        descriptors.sort_by(|a, b| a.display_name.cmp(&b.display_name));
        Ok(descriptors)
    }

    fn read_preview(path: &Path, limit: usize) -> Result<PreviewRows, DataError> {
        let file = File::open(path)?;
        let mut csv_reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(BufReader::new(file));

        let columns: Vec<String> = csv_reader.headers()?.iter().map(|h| h.to_string()).collect();

        let mut rows = Vec::new();
        for result in csv_reader.records().take(limit) {
            let record = result?;
            let mut row = Record::new();
            for (idx, name) in columns.iter().enumerate() {
                let cell = record
                    .get(idx)
                    .map(|s| Value::String(s.to_string()))
                    .unwrap_or(Value::Null);
                row.insert(name.clone(), cell);
            }
            rows.push(row);
        }

        Ok(PreviewRows { columns, rows })
    }
}

#[async_trait]
impl SourceProvider for CsvSourceProvider {
    async fn list_sources(&self) -> Result<Vec<SourceDescriptor>, DataError> {
        let root = self.root.clone();
        tokio::task::spawn_blocking(move || Self::scan(&root)).await?
    }

    async fn preview_rows(&self, source_id: &str, limit: usize) -> Result<PreviewRows, DataError> {
        let path = self.file_for(source_id)?;
        tokio::task::spawn_blocking(move || Self::read_preview(&path, limit)).await?
    }

    fn provider_name(&self) -> &str {
        "csv"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn write(dir: &Path, name: &str, body: &str) {
        std::fs::write(dir.join(name), body).unwrap();
    }

    #[tokio::test]
    async fn test_lists_csv_files_only() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "sales.csv", "region,sales\nN,10\n");
        write(dir.path(), "notes.txt", "ignored");

        let provider = CsvSourceProvider::new(dir.path());
        let sources = provider.list_sources().await.unwrap();

        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].id, "dataset:sales.csv");
        assert_eq!(sources[0].display_name, "sales");
    }

    #[tokio::test]
    async fn test_preview_keeps_strings_and_fills_short_rows() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "sales.csv", "region,sales\nN,10\nS\nE,30\n");

        let provider = CsvSourceProvider::new(dir.path());
        let preview = provider.preview_rows("dataset:sales.csv", 2).await.unwrap();

        assert_eq!(preview.columns, vec!["region", "sales"]);
        assert_eq!(preview.rows.len(), 2);
        assert_eq!(preview.rows[0]["sales"], json!("10"));
        assert_eq!(preview.rows[1]["sales"], Value::Null);
    }

    #[tokio::test]
    async fn test_rejects_paths_outside_root() {
        let dir = tempfile::tempdir().unwrap();
        let provider = CsvSourceProvider::new(dir.path());
        assert!(matches!(
            provider.preview_rows("dataset:../secret.csv", 10).await,
            Err(DataError::UnknownSource(_))
        ));
    }
}
