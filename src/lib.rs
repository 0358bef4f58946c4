//! Profiler Trace
//!
//! Ingestion and lifecycle management for profiler traces: events stream in
//! from a profiled application, are fanned out to per-feature models, sorted
//! once acquisition ends, and can be saved to or loaded from trace files in
//! the background.
//!
//! # Modules
//!
//! - `types`: Core data structures (Event, EventType, Note, FeatureSet)
//! - `model`: Stores for events, notes and the trace window
//! - `manager`: ModelManager state machine, feature registry and notifications
//! - `codec`: Trace file format, reader, writer and worker tasks
//! - `utils`: Atomic file replacement
//! - `error`: Error taxonomy
//!
//! # Example
//!
//! ```no_run
//! use profiler_trace::{Feature, FeatureSet, ModelManager};
//! use profiler_trace::types::{Event, EventType, Message, RangeType, SourceLocation};
//!
//! fn main() -> profiler_trace::ManagerResult<()> {
//!     let mut manager = ModelManager::new();
//!     manager.announce_features(
//!         FeatureSet::from(Feature::JavaScript),
//!         |event: &Event, _: &EventType| println!("js at {}", event.start_time),
//!         || println!("done"),
//!     )?;
//!
//!     manager.start_acquiring()?;
//!     manager.add_event(
//!         Message::RangeStart,
//!         RangeType::Javascript,
//!         0,
//!         1000,
//!         50,
//!         "",
//!         SourceLocation::new("main.qml", 3, 1),
//!         [0; 5],
//!     )?;
//!     manager.acquiring_done()?;
//!
//!     manager.save("run.trace")?;
//!     if let Some(result) = manager.wait_for_codec() {
//!         result?;
//!     }
//!     Ok(())
//! }
//! ```

pub mod codec;
pub mod error;
pub mod manager;
pub mod model;
pub mod types;
pub mod utils;

// Re-export commonly used items at crate root
pub use codec::{CodecKind, TraceData};
pub use error::{ManagerError, ManagerResult};
pub use manager::{ManagerConfig, ManagerEvent, ModelManager, Notification};
pub use model::{EventStore, NotesStore, TraceWindow, TypeStats};
pub use types::{Feature, FeatureSet, PipelineState};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
