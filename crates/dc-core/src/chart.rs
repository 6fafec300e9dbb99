//! Chart configuration and the partial updates applied to it

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::geometry::{Position, Size};
use crate::Record;

/// Unique identifier for a chart widget
pub type ChartId = Uuid;

/// Chart types the canvas knows how to host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    Bar,
    Line,
    Pie,
    Scatter,
    Heatmap,
    Treemap,
    Geo,
}

impl ChartType {
    pub const ALL: [ChartType; 7] = [
        ChartType::Bar,
        ChartType::Line,
        ChartType::Pie,
        ChartType::Scatter,
        ChartType::Heatmap,
        ChartType::Treemap,
        ChartType::Geo,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            ChartType::Bar => "Bar",
            ChartType::Line => "Line",
            ChartType::Pie => "Pie",
            ChartType::Scatter => "Scatter",
            ChartType::Heatmap => "Heatmap",
            ChartType::Treemap => "Treemap",
            ChartType::Geo => "Geo",
        }
    }

    fn key(&self) -> &'static str {
        match self {
            ChartType::Bar => "bar",
            ChartType::Line => "line",
            ChartType::Pie => "pie",
            ChartType::Scatter => "scatter",
            ChartType::Heatmap => "heatmap",
            ChartType::Treemap => "treemap",
            ChartType::Geo => "geo",
        }
    }
}

impl fmt::Display for ChartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for ChartType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        ChartType::ALL
            .into_iter()
            .find(|t| t.key() == wanted)
            .ok_or_else(|| format!("Unknown chart type '{}'", s))
    }
}

/// Committed configuration of a single chart widget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartConfig {
    pub id: ChartId,

    #[serde(rename = "type")]
    pub chart_type: ChartType,

    pub title: String,

    /// Row snapshot taken the last time the chart was bound
    #[serde(default)]
    pub data: Vec<Record>,

    /// X binding; empty until the user picks a column
    #[serde(default)]
    pub x: String,

    /// Y binding; empty until the user picks a column
    #[serde(default)]
    pub y: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legend_label: Option<String>,

    pub position: Position,

    pub size: Size,

    /// Denormalized column -> filter value snapshot, kept for export only
    #[serde(default)]
    pub filters: IndexMap<String, Value>,
}

impl ChartConfig {
    /// Create an unbound chart at the given slot
    pub fn new(chart_type: ChartType, position: Position, size: Size) -> Self {
        Self {
            id: Uuid::new_v4(),
            chart_type,
            title: format!("{} Chart", chart_type.display_name()),
            data: Vec::new(),
            x: String::new(),
            y: String::new(),
            legend_label: None,
            position,
            size,
            filters: IndexMap::new(),
        }
    }

    /// Whether both axis bindings have been chosen
    pub fn has_bindings(&self) -> bool {
        !self.x.trim().is_empty() && !self.y.trim().is_empty()
    }

    /// Merge a partial update into this configuration.
    ///
    /// Scalar fields are replaced when present in `update`; the filter map is
    /// merged key by key.
    pub fn apply_update(&mut self, update: &ChartUpdate) {
        if let Some(chart_type) = update.chart_type {
            self.chart_type = chart_type;
        }
        if let Some(title) = &update.title {
            self.title = title.clone();
        }
        if let Some(x) = &update.x {
            self.x = x.clone();
        }
        if let Some(y) = &update.y {
            self.y = y.clone();
        }
        if let Some(label) = &update.legend_label {
            self.legend_label = label.clone();
        }
        if let Some(position) = update.position {
            self.position = position;
        }
        if let Some(size) = update.size {
            self.size = size;
        }
        for (column, value) in &update.filters {
            self.filters.insert(column.clone(), value.clone());
        }
    }

    /// The configuration this chart would have after `update`
    pub fn with_update(&self, update: &ChartUpdate) -> Self {
        let mut next = self.clone();
        next.apply_update(update);
        next
    }
}

/// A partial chart configuration accumulated by previews
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartUpdate {
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub chart_type: Option<ChartType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,

    /// `Some(None)` clears the legend label; `"legendLabel": null` in JSON
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub legend_label: Option<Option<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<Size>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub filters: IndexMap<String, Value>,
}

/// A key that is present, even as `null`, becomes `Some`
fn deserialize_present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

impl ChartUpdate {
    /// Geometry-only update emitted by drag and resize gestures
    pub fn geometry(position: Position, size: Size) -> Self {
        Self {
            position: Some(position),
            size: Some(size),
            ..Default::default()
        }
    }

    pub fn with_type(mut self, chart_type: ChartType) -> Self {
        self.chart_type = Some(chart_type);
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_x(mut self, column: impl Into<String>) -> Self {
        self.x = Some(column.into());
        self
    }

    pub fn with_y(mut self, column: impl Into<String>) -> Self {
        self.y = Some(column.into());
        self
    }

    pub fn with_legend_label(mut self, label: Option<String>) -> Self {
        self.legend_label = Some(label);
        self
    }

    pub fn with_position(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_size(mut self, size: Size) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_filter(mut self, column: impl Into<String>, value: Value) -> Self {
        self.filters.insert(column.into(), value);
        self
    }

    /// Fold a later update into this one. Later values win on overlapping
    /// keys; untouched keys keep their earlier value.
    pub fn merge(&mut self, later: ChartUpdate) {
        if later.chart_type.is_some() {
            self.chart_type = later.chart_type;
        }
        if later.title.is_some() {
            self.title = later.title;
        }
        if later.x.is_some() {
            self.x = later.x;
        }
        if later.y.is_some() {
            self.y = later.y;
        }
        if later.legend_label.is_some() {
            self.legend_label = later.legend_label;
        }
        if later.position.is_some() {
            self.position = later.position;
        }
        if later.size.is_some() {
            self.size = later.size;
        }
        self.filters.extend(later.filters);
    }

    pub fn is_empty(&self) -> bool {
        *self == ChartUpdate::default()
    }

    /// Whether this update changes which columns the chart reads
    pub fn touches_bindings(&self) -> bool {
        self.x.is_some() || self.y.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_chart_is_unbound() {
        let chart = ChartConfig::new(ChartType::Bar, Position::default(), Size::default());
        assert_eq!(chart.title, "Bar Chart");
        assert!(chart.x.is_empty() && chart.y.is_empty());
        assert!(!chart.has_bindings());
    }

    #[test]
    fn test_merge_keeps_earlier_disjoint_keys() {
        let mut first = ChartUpdate::default().with_x("region").with_filter("a", json!(1));
        first.merge(ChartUpdate::default().with_y("sales").with_x("zone").with_filter("b", json!(2)));

        assert_eq!(first.x.as_deref(), Some("zone"));
        assert_eq!(first.y.as_deref(), Some("sales"));
        assert_eq!(first.filters.len(), 2);
    }

    #[test]
    fn test_legend_label_can_be_cleared() {
        let mut chart = ChartConfig::new(ChartType::Pie, Position::default(), Size::default());
        chart.apply_update(&ChartUpdate::default().with_legend_label(Some("Sales".into())));
        assert_eq!(chart.legend_label.as_deref(), Some("Sales"));

        chart.apply_update(&ChartUpdate::default().with_legend_label(None));
        assert_eq!(chart.legend_label, None);
    }

    #[test]
    fn test_json_null_clears_legend_label() {
        let cleared: ChartUpdate = serde_json::from_value(json!({ "legendLabel": null })).unwrap();
        assert_eq!(cleared.legend_label, Some(None));
        let untouched: ChartUpdate = serde_json::from_value(json!({ "title": "Sales" })).unwrap();
        assert_eq!(untouched.legend_label, None);

        let mut chart = ChartConfig::new(ChartType::Bar, Position::default(), Size::default());
        chart.legend_label = Some("Sales".into());
        chart.apply_update(&untouched);
        assert_eq!(chart.legend_label.as_deref(), Some("Sales"));
        chart.apply_update(&cleared);
        assert_eq!(chart.legend_label, None);
    }

    #[test]
    fn test_chart_type_parsing() {
        assert_eq!("Heatmap".parse::<ChartType>(), Ok(ChartType::Heatmap));
        assert!("radar".parse::<ChartType>().is_err());
    }

    #[test]
    fn test_chart_serializes_type_key() {
        let chart = ChartConfig::new(ChartType::Scatter, Position::default(), Size::default());
        let value = serde_json::to_value(&chart).unwrap();
        assert_eq!(value["type"], json!("scatter"));
        assert!(value.get("legendLabel").is_none());
    }
}
