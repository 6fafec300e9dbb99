//! Core functionality for the dashboard composer
//!
//! This crate provides the chart model, the transactional edit session,
//! the keyed dashboard store and the event bus shared by every other crate.

pub mod chart;
pub mod dashboard;
pub mod events;
pub mod geometry;
pub mod session;
pub mod settings;

// Re-export commonly used types
pub use chart::{ChartConfig, ChartId, ChartType, ChartUpdate};
pub use dashboard::{Dashboard, DashboardBackend, DashboardId, DashboardStore, DashboardSummary};
pub use events::EventBus;
pub use geometry::{Point, Position, Size};
pub use session::{ChartEditSession, EditOutcome, EditState, SessionError};
pub use settings::{ComposerSettings, InferenceSettings, LayoutSettings};

/// Identifier of a data source, e.g. `dataset:sales` or `snapshot:q3_top`
pub type SourceId = String;

/// One tabular row, keyed by column name in source order
pub type Record = serde_json::Map<String, serde_json::Value>;
