//! Dashboard export

use std::io::Write;

use chrono::{DateTime, Utc};
use dc_core::ChartConfig;
use dc_data::FilterSpec;
use serde::Serialize;

/// Read-only snapshot of a dashboard's committed charts and filters
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardExport<'a> {
    pub source_id: &'a str,
    pub exported_at: DateTime<Utc>,
    pub charts: &'a [ChartConfig],
    pub filters: &'a [FilterSpec],
}

impl<'a> DashboardExport<'a> {
    pub fn new(source_id: &'a str, charts: &'a [ChartConfig], filters: &'a [FilterSpec]) -> Self {
        Self {
            source_id,
            exported_at: Utc::now(),
            charts,
            filters,
        }
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write the export as pretty JSON
    pub fn write_to<W: Write>(&self, writer: W) -> Result<(), serde_json::Error> {
        serde_json::to_writer_pretty(writer, self)
    }
}
