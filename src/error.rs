//! Error taxonomy shared by the stores, the manager and the codec

use std::path::PathBuf;

use thiserror::Error;

use crate::types::PipelineState;

/// Result type for manager and store operations
pub type ManagerResult<T> = Result<T, ManagerError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ManagerError {
    /// Operation issued in a state that does not allow it
    #[error("{operation} is not allowed in state {state}")]
    InvalidState {
        operation: &'static str,
        state: PipelineState,
    },

    #[error("invalid interval: start {start} is after end {end}")]
    InvalidInterval { start: i64, end: i64 },

    #[error("I/O failure on {}: {reason}", path.display())]
    IoFailure { path: PathBuf, reason: String },

    #[error("malformed trace {} at byte {offset}: {reason}", path.display())]
    ParseFailure {
        path: PathBuf,
        offset: u64,
        reason: String,
    },

    /// A save or load task is already running
    #[error("a trace codec task is already in progress")]
    BusyAsync,

    #[error("trace codec task was cancelled")]
    Cancelled,

    #[error("no note with id {0}")]
    UnknownNote(u32),

    #[error("no event {event_index} of type {type_index}")]
    UnknownEvent { type_index: u32, event_index: u32 },
}

impl ManagerError {
    pub(crate) fn io(path: impl Into<PathBuf>, err: &std::io::Error) -> Self {
        ManagerError::IoFailure {
            path: path.into(),
            reason: err.to_string(),
        }
    }

    pub(crate) fn parse(path: impl Into<PathBuf>, offset: u64, reason: impl Into<String>) -> Self {
        ManagerError::ParseFailure {
            path: path.into(),
            offset,
            reason: reason.into(),
        }
    }

    /// Errors the user should see on the observer error channel
    ///
    /// Bad input and failed I/O qualify. Cancellation and misuse of the API
    /// are only logged.
    pub fn is_user_visible(&self) -> bool {
        matches!(
            self,
            ManagerError::IoFailure { .. }
                | ManagerError::ParseFailure { .. }
                | ManagerError::UnknownEvent { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ManagerError::InvalidState {
            operation: "add_event",
            state: PipelineState::Empty,
        };
        assert_eq!(err.to_string(), "add_event is not allowed in state empty");

        let err = ManagerError::parse("a.trace", 12, "unsupported version");
        assert_eq!(
            err.to_string(),
            "malformed trace a.trace at byte 12: unsupported version"
        );
        assert!(err.is_user_visible());
        assert!(!ManagerError::Cancelled.is_user_visible());
        assert!(!ManagerError::BusyAsync.is_user_visible());
        assert!(ManagerError::UnknownEvent {
            type_index: 3,
            event_index: 0
        }
        .is_user_visible());
    }
}
