//! Data types for profiler traces
//!
//! This module contains the core records shared by the stores, the manager
//! and the trace codec.

mod event;
mod feature;
mod note;
mod state;

pub use event::{DebugLevel, Event, EventDetail, EventType, Message, RangeType, SourceLocation};
pub use feature::{Feature, FeatureSet};
pub use note::Note;
pub use state::PipelineState;

/// Sentinel used by trace windows for "unset"
pub const UNSET_TIME: i64 = -1;
