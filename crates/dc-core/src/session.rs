//! Transactional editing of a single chart's configuration
//!
//! A session holds one draft slot. Previews accumulate into the draft without
//! touching the committed configuration; `apply` folds the draft in, `cancel`
//! throws it away. Every terminal transition lands back in [`EditState::Idle`].

use thiserror::Error;

use crate::chart::{ChartConfig, ChartId, ChartUpdate};

/// Errors raised by an edit session
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error("Session edits chart {expected}, got configuration for {actual}")]
    ChartMismatch { expected: ChartId, actual: ChartId },
}

/// Current phase of an edit session
#[derive(Debug, Clone, PartialEq)]
pub enum EditState {
    /// No draft; the live view equals the committed configuration
    Idle,
    /// A draft diverges from the committed configuration
    Drafting(ChartUpdate),
}

/// Result of leaving the drafting phase
#[derive(Debug, Clone, PartialEq)]
pub enum EditOutcome {
    /// The draft was committed; carries the update that was folded in
    Applied(ChartUpdate),
    /// The draft was discarded
    Cancelled,
    /// There was no draft to apply or discard
    Unchanged,
}

/// Per-chart edit session owned by a configuration panel
#[derive(Debug, Clone)]
pub struct ChartEditSession {
    committed: ChartConfig,
    state: EditState,
}

impl ChartEditSession {
    /// Open a session over the committed configuration of a chart
    pub fn new(committed: ChartConfig) -> Self {
        Self {
            committed,
            state: EditState::Idle,
        }
    }

    pub fn chart_id(&self) -> ChartId {
        self.committed.id
    }

    pub fn state(&self) -> &EditState {
        &self.state
    }

    pub fn is_drafting(&self) -> bool {
        matches!(self.state, EditState::Drafting(_))
    }

    /// Last committed configuration seen by this session
    pub fn committed(&self) -> &ChartConfig {
        &self.committed
    }

    pub fn draft(&self) -> Option<&ChartUpdate> {
        match &self.state {
            EditState::Drafting(draft) => Some(draft),
            EditState::Idle => None,
        }
    }

    /// Configuration to show while editing: committed state with the draft on top
    pub fn current(&self) -> ChartConfig {
        match &self.state {
            EditState::Drafting(draft) => self.committed.with_update(draft),
            EditState::Idle => self.committed.clone(),
        }
    }

    /// Merge `updates` into the draft. Calls are folded in the order issued.
    pub fn preview(&mut self, updates: ChartUpdate) {
        match &mut self.state {
            EditState::Drafting(draft) => draft.merge(updates),
            EditState::Idle => {
                if !updates.is_empty() {
                    self.state = EditState::Drafting(updates);
                }
            }
        }
    }

    /// Commit the accumulated draft and return to idle
    pub fn apply(&mut self) -> EditOutcome {
        match std::mem::replace(&mut self.state, EditState::Idle) {
            EditState::Drafting(draft) => {
                self.committed.apply_update(&draft);
                EditOutcome::Applied(draft)
            }
            EditState::Idle => EditOutcome::Unchanged,
        }
    }

    /// Discard the draft, keeping the last applied configuration
    pub fn cancel(&mut self) -> EditOutcome {
        match std::mem::replace(&mut self.state, EditState::Idle) {
            EditState::Drafting(_) => EditOutcome::Cancelled,
            EditState::Idle => EditOutcome::Unchanged,
        }
    }

    /// Discard any draft and return to idle, regardless of phase
    pub fn reset(&mut self) {
        self.state = EditState::Idle;
    }

    /// Replace the committed baseline after the owner changed the chart
    /// outside this session (e.g. a drag on the canvas). The draft is kept.
    pub fn rebase(&mut self, committed: ChartConfig) -> Result<(), SessionError> {
        if committed.id != self.committed.id {
            return Err(SessionError::ChartMismatch {
                expected: self.committed.id,
                actual: committed.id,
            });
        }
        self.committed = committed;
        Ok(())
    }
}
