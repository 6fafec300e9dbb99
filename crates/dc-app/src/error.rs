//! Errors surfaced by the composition controller

use dc_core::{ChartId, SessionError, SourceId};
use dc_data::{DataError, FilterId};
use dc_views::LayoutError;
use thiserror::Error;

/// Every failure here is recoverable: state is left as it was and the user
/// gets a notice.
#[derive(Error, Debug)]
pub enum ComposeError {
    #[error("Select a data source first")]
    NoActiveSource,

    #[error("Source '{0}' has no rows to chart")]
    NoRows(SourceId),

    #[error("Dashboard name cannot be empty")]
    MissingName,

    #[error("Add at least one chart before saving")]
    NoCharts,

    #[error("Dashboard belongs to source '{found}', not '{active}'")]
    SourceMismatch { active: SourceId, found: SourceId },

    #[error("Charts can only be dragged or resized in free-form mode")]
    NotFreeForm,

    #[error("Unknown chart: {0}")]
    UnknownChart(ChartId),

    #[error("Unknown filter: {0}")]
    UnknownFilter(FilterId),

    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    #[error("Dashboard persistence failed: {0}")]
    Persistence(String),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Layout(#[from] LayoutError),

    #[error(transparent)]
    Session(#[from] SessionError),
}

impl ComposeError {
    pub fn persistence(error: anyhow::Error) -> Self {
        ComposeError::Persistence(format!("{:#}", error))
    }

    /// Whether the user can correct this by changing their input
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ComposeError::NoActiveSource
                | ComposeError::NoRows(_)
                | ComposeError::MissingName
                | ComposeError::NoCharts
                | ComposeError::SourceMismatch { .. }
                | ComposeError::NotFreeForm
                | ComposeError::Data(DataError::FilterShape { .. })
                | ComposeError::Layout(_)
        )
    }

    /// Nothing in the composition engine is fatal to the process
    pub fn is_recoverable(&self) -> bool {
        true
    }
}
