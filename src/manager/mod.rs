//! Model management
//!
//! - `model_manager`: the lifecycle state machine owning every store
//! - `registry`: which feature models are available, visible and who loads them
//! - `dispatch`: fan-out of accepted events to loaders
//! - `notify`: broadcast of change notifications to observers
//! - `config`: tunables for a manager instance

pub mod config;
pub mod dispatch;
pub mod model_manager;
pub mod notify;
pub mod registry;

pub use config::ManagerConfig;
pub use dispatch::Dispatcher;
pub use model_manager::ModelManager;
pub use notify::{drain, ManagerEvent, Notification, Notifier};
pub use registry::{AnnounceOutcome, FeatureRegistry, Finalizer, Loader};
