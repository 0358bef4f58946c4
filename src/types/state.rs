//! Pipeline lifecycle states

use serde::{Deserialize, Serialize};

/// Lifecycle state of a [`ModelManager`](crate::manager::ModelManager)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    #[default]
    Empty,
    AcquiringData,
    ProcessingData,
    Done,
    ClearingData,
}

impl PipelineState {
    /// Whether the state machine permits moving from `self` to `next`
    ///
    /// Staying in the same state is not a transition and is handled by the
    /// caller.
    pub fn can_transition_to(self, next: PipelineState) -> bool {
        use PipelineState::*;
        matches!(
            (self, next),
            (Empty, AcquiringData)
                | (Empty, ClearingData)
                | (AcquiringData, ProcessingData)
                | (AcquiringData, ClearingData)
                | (ProcessingData, Done)
                | (Done, ClearingData)
                | (ClearingData, Empty)
        )
    }
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineState::Empty => write!(f, "empty"),
            PipelineState::AcquiringData => write!(f, "acquiring_data"),
            PipelineState::ProcessingData => write!(f, "processing_data"),
            PipelineState::Done => write!(f, "done"),
            PipelineState::ClearingData => write!(f, "clearing_data"),
        }
    }
}
