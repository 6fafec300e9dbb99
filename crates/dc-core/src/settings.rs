//! Composer settings

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::geometry::Size;

/// Settings for the whole composition engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposerSettings {
    /// Rows fetched per source preview
    pub preview_row_limit: usize,

    /// Column inference settings
    pub inference: InferenceSettings,

    /// Canvas layout settings
    pub layout: LayoutSettings,
}

/// Column inference settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceSettings {
    /// Rows sampled when classifying a column
    pub sample_size: usize,

    /// Above this many distinct values a column carries no unique-value list
    pub max_unique_values: usize,

    /// Tokens treated as empty cells (trimmed, case-insensitive)
    pub null_patterns: Vec<String>,
}

/// Canvas layout settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutSettings {
    pub min_width: f32,
    pub min_height: f32,
    pub default_width: f32,
    pub default_height: f32,
    /// Spacing between grid cards
    pub gap: f32,
    /// Columns in grid mode (1..=4)
    pub grid_columns: u8,
}

impl Default for ComposerSettings {
    fn default() -> Self {
        Self {
            preview_row_limit: 50,
            inference: InferenceSettings::default(),
            layout: LayoutSettings::default(),
        }
    }
}

impl Default for InferenceSettings {
    fn default() -> Self {
        Self {
            sample_size: 10,
            max_unique_values: 500,
            null_patterns: vec![
                String::new(),
                "-".to_string(),
                "N/A".to_string(),
                "null".to_string(),
                "None".to_string(),
            ],
        }
    }
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            min_width: 200.0,
            min_height: 150.0,
            default_width: 400.0,
            default_height: 300.0,
            gap: 16.0,
            grid_columns: 2,
        }
    }
}

impl LayoutSettings {
    pub fn default_size(&self) -> Size {
        Size::new(self.default_width, self.default_height)
    }
}

impl ComposerSettings {
    /// Load settings from a JSON file; missing fields take their defaults
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        let settings = serde_json::from_str(&text)
            .with_context(|| format!("Invalid settings file {}", path.display()))?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let settings: ComposerSettings =
            serde_json::from_str(r#"{ "layout": { "grid_columns": 3 } }"#).unwrap();

        assert_eq!(settings.layout.grid_columns, 3);
        assert_eq!(settings.layout.min_width, 200.0);
        assert_eq!(settings.preview_row_limit, 50);
        assert_eq!(settings.inference.sample_size, 10);
    }
}
