//! Null value handling for column inference

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Cell values treated as empty. Matching trims whitespace and ignores
/// ASCII case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NullConfig {
    pub patterns: Vec<String>,
}

impl Default for NullConfig {
    fn default() -> Self {
        Self::from_patterns(dc_core::InferenceSettings::default().null_patterns)
    }
}

impl NullConfig {
    pub fn from_patterns(patterns: Vec<String>) -> Self {
        Self { patterns }
    }

    /// Check if a text value should be treated as null
    pub fn is_null(&self, value: &str) -> bool {
        let value = value.trim();
        self.patterns
            .iter()
            .any(|pattern| value.eq_ignore_ascii_case(pattern.trim()))
    }

    /// Check if a cell is empty: JSON null or a null pattern
    pub fn is_null_value(&self, value: &Value) -> bool {
        match value {
            Value::Null => true,
            Value::String(s) => self.is_null(s),
            _ => false,
        }
    }
}
