//! Column type inference and statistical enrichment

use chrono::NaiveDate;
use dc_core::Record;
use indexmap::{IndexMap, IndexSet};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::InferenceConfig;
use crate::value::{as_number, day_key, display, lookup, parse_date_str};

/// Semantic type of a column as seen by filter controls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SemanticType {
    String,
    Number,
    Date,
}

/// Value range of a numeric or date column
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnRange {
    Number { min: f64, max: f64 },
    Date { min: NaiveDate, max: NaiveDate },
}

/// A column of a data source together with its enrichment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub name: String,
    pub semantic_type: SemanticType,
    pub original_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_values: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<ColumnRange>,
}

impl Column {
    /// Numeric bounds, if this is a number column with values
    pub fn numeric_range(&self) -> Option<(f64, f64)> {
        match self.range {
            Some(ColumnRange::Number { min, max }) => Some((min, max)),
            _ => None,
        }
    }

    pub fn unique_values(&self) -> &[Value] {
        self.unique_values.as_deref().unwrap_or(&[])
    }
}

/// Derived sets and ranges for one column
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Enrichment {
    pub unique_values: Option<Vec<Value>>,
    pub range: Option<ColumnRange>,
}

/// Classifies columns from sample values and derives their enrichment
pub struct TypeInferencer {
    config: InferenceConfig,
}

impl TypeInferencer {
    /// Create a new inferencer with default settings
    pub fn new() -> Self {
        Self {
            config: InferenceConfig::default(),
        }
    }

    pub fn with_config(config: InferenceConfig) -> Self {
        Self { config }
    }

    /// Set the sample size for classification
    pub fn with_sample_size(mut self, size: usize) -> Self {
        self.config.sample_size = size;
        self
    }

    pub fn config(&self) -> &InferenceConfig {
        &self.config
    }

    /// Classify a column from its first `sample_size` rows.
    ///
    /// Numbers win over dates, so numeric strings are never read as dates.
    /// A sample without any non-empty value is a string column.
    pub fn infer(&self, column: &str, rows: &[Record]) -> SemanticType {
        let samples: Vec<&Value> = rows
            .iter()
            .take(self.config.sample_size)
            .filter_map(|row| lookup(row, column))
            .filter(|value| !self.config.null_config.is_null_value(value))
            .collect();

        if samples.is_empty() {
            return SemanticType::String;
        }

        if samples.iter().all(|value| as_number(value).is_some()) {
            SemanticType::Number
        } else if samples.iter().all(|value| Self::looks_like_date(value)) {
            SemanticType::Date
        } else {
            SemanticType::String
        }
    }

    fn looks_like_date(value: &Value) -> bool {
        match value {
            Value::String(s) => parse_date_str(s).is_some(),
            _ => false,
        }
    }

    /// Derive unique values or ranges over every row of a column.
    ///
    /// Values that fail to parse for the column's type are skipped.
    pub fn enrich(&self, column: &str, semantic_type: SemanticType, rows: &[Record]) -> Enrichment {
        let values = rows
            .iter()
            .filter_map(|row| lookup(row, column))
            .filter(|value| !self.config.null_config.is_null_value(value));

        match semantic_type {
            SemanticType::Number => {
                let range = values.filter_map(as_number).fold(None, |acc, n| match acc {
                    None => Some((n, n)),
                    Some((min, max)) => Some((f64::min(min, n), f64::max(max, n))),
                });
                Enrichment {
                    unique_values: None,
                    range: range.map(|(min, max)| ColumnRange::Number { min, max }),
                }
            }
            SemanticType::String => {
                let mut unique: IndexMap<String, Value> = IndexMap::new();
                for value in values {
                    unique.entry(display(value)).or_insert_with(|| value.clone());
                }
                Enrichment {
                    unique_values: self.bounded(unique.into_values().collect()),
                    range: None,
                }
            }
            SemanticType::Date => {
                let mut days: Vec<String> = values
                    .filter_map(day_key)
                    .collect::<IndexSet<_>>()
                    .into_iter()
                    .collect();
                days.sort();

                let range = match (days.first(), days.last()) {
                    (Some(first), Some(last)) => {
                        let min = NaiveDate::parse_from_str(first, "%Y-%m-%d").ok();
                        let max = NaiveDate::parse_from_str(last, "%Y-%m-%d").ok();
                        min.zip(max).map(|(min, max)| ColumnRange::Date { min, max })
                    }
                    _ => None,
                };

                Enrichment {
                    unique_values: self.bounded(days.into_iter().map(Value::String).collect()),
                    range,
                }
            }
        }
    }

    fn bounded(&self, values: Vec<Value>) -> Option<Vec<Value>> {
        if values.len() > self.config.max_unique_values {
            None
        } else {
            Some(values)
        }
    }

    /// Infer and enrich a single column
    pub fn build_column(&self, original_name: &str, rows: &[Record]) -> Column {
        let semantic_type = self.infer(original_name, rows);
        let Enrichment { unique_values, range } = self.enrich(original_name, semantic_type, rows);

        Column {
            name: original_name.trim().to_string(),
            semantic_type,
            original_name: original_name.to_string(),
            unique_values,
            range,
        }
    }

    /// Infer and enrich every column, preserving the given order
    pub fn build_columns(&self, names: &[String], rows: &[Record]) -> Vec<Column> {
        names
            .par_iter()
            .map(|name| self.build_column(name, rows))
            .collect()
    }
}

impl Default for TypeInferencer {
    fn default() -> Self {
        Self::new()
    }
}
