//! In-memory trace model
//!
//! - `TraceWindow`: the observed `[start, end]` interval
//! - `EventStore`: event types and events, sorted after processing
//! - `NotesStore`: user annotations bound to events
//!
//! All three are owned by the [`ModelManager`](crate::manager::ModelManager)
//! and only mutated through it.

mod event_store;
mod notes;
mod trace_window;

pub use event_store::{EventStore, TypeStats};
pub use notes::NotesStore;
pub use trace_window::TraceWindow;
