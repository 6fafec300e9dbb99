//! Render contract: turns a chart and its filtered rows into plot-ready data

use dc_core::{ChartConfig, ChartType, Record};
use dc_data::value::{as_number, display, lookup};
use indexmap::IndexMap;
use serde::Serialize;

/// Message shown while a chart has no column bindings
pub const SELECT_COLUMNS: &str = "Select X and Y columns";

/// Message shown when no rows survive filtering
pub const NO_DATA: &str = "No data";

/// One heatmap cell
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatCell {
    pub x: String,
    pub y: String,
    pub count: usize,
}

/// What a chart widget should draw
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Visual {
    Placeholder { message: String },
    Empty { message: String },
    /// Category labels with summed values
    Series {
        chart_type: ChartType,
        labels: Vec<String>,
        values: Vec<f64>,
    },
    Points { points: Vec<(f64, f64)> },
    Cells { cells: Vec<HeatCell> },
}

impl Visual {
    fn placeholder() -> Self {
        Visual::Placeholder {
            message: SELECT_COLUMNS.to_string(),
        }
    }

    fn empty() -> Self {
        Visual::Empty {
            message: NO_DATA.to_string(),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, Visual::Placeholder { .. })
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Visual::Empty { .. })
    }
}

/// Prepare a chart's visual from already-filtered rows.
///
/// Total over its inputs: missing bindings give a placeholder, zero usable
/// rows give an empty state, and unusable cells are skipped.
pub fn render(chart: &ChartConfig, rows: &[Record]) -> Visual {
    if !chart.has_bindings() {
        return Visual::placeholder();
    }
    if rows.is_empty() {
        return Visual::empty();
    }

    let visual = match chart.chart_type {
        ChartType::Scatter => points(rows, &chart.x, &chart.y),
        ChartType::Heatmap => cells(rows, &chart.x, &chart.y),
        chart_type => series(chart_type, rows, &chart.x, &chart.y),
    };

    tracing::debug!("Rendered chart {} from {} rows", chart.id, rows.len());
    visual
}

fn series(chart_type: ChartType, rows: &[Record], x: &str, y: &str) -> Visual {
    // Group by label and sum values, in first-seen order
    let mut groups: IndexMap<String, f64> = IndexMap::new();
    for row in rows {
        let (Some(label), Some(value)) = (
            lookup(row, x).map(display),
            lookup(row, y).and_then(as_number),
        ) else {
            continue;
        };
        *groups.entry(label).or_insert(0.0) += value;
    }

    if groups.is_empty() {
        return Visual::empty();
    }

    let (labels, values) = groups.into_iter().unzip();
    Visual::Series {
        chart_type,
        labels,
        values,
    }
}

fn points(rows: &[Record], x: &str, y: &str) -> Visual {
    let points: Vec<(f64, f64)> = rows
        .iter()
        .filter_map(|row| {
            let x = lookup(row, x).and_then(as_number)?;
            let y = lookup(row, y).and_then(as_number)?;
            Some((x, y))
        })
        .collect();

    if points.is_empty() {
        Visual::empty()
    } else {
        Visual::Points { points }
    }
}

fn cells(rows: &[Record], x: &str, y: &str) -> Visual {
    let mut counts: IndexMap<(String, String), usize> = IndexMap::new();
    for row in rows {
        let (Some(xv), Some(yv)) = (lookup(row, x), lookup(row, y)) else {
            continue;
        };
        *counts.entry((display(xv), display(yv))).or_insert(0) += 1;
    }

    if counts.is_empty() {
        return Visual::empty();
    }

    Visual::Cells {
        cells: counts
            .into_iter()
            .map(|((x, y), count)| HeatCell { x, y, count })
            .collect(),
    }
}
