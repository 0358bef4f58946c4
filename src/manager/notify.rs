//! Observer notifications
//!
//! Consumers such as timeline views subscribe to a broadcast channel and
//! receive [`ManagerEvent`]s. A consumer that is not listening simply misses
//! events; the manager never blocks on its observers.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tokio::sync::broadcast;

use crate::types::{FeatureSet, PipelineState};

/// Change notification sent to subscribed consumers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ManagerEvent {
    StateChanged(PipelineState),
    AvailableFeaturesChanged(FeatureSet),
    VisibleFeaturesChanged(FeatureSet),
    RecordedFeaturesChanged(FeatureSet),
    NotesChanged,
    LoadFinished,
    SaveFinished,
    Error(String),
}

/// Envelope carrying a sequence number and wall-clock timestamp
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub event: ManagerEvent,
    pub sequence_id: u64,
    pub timestamp: i64,
}

/// Broadcasts manager events to all subscribers
pub struct Notifier {
    tx: broadcast::Sender<Notification>,
    sequence_counter: AtomicU64,
}

impl Notifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            sequence_counter: AtomicU64::new(0),
        }
    }

    pub fn emit(&self, event: ManagerEvent) {
        let seq = self.sequence_counter.fetch_add(1, Ordering::SeqCst);
        let msg = Notification {
            event,
            sequence_id: seq,
            timestamp: chrono::Utc::now().timestamp_millis(),
        };
        // No receivers is fine
        let _ = self.tx.send(msg);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }

    /// Number of notifications emitted so far
    pub fn current_sequence_id(&self) -> u64 {
        self.sequence_counter.load(Ordering::SeqCst)
    }
}

/// Drain every notification currently queued on `rx`
///
/// Lagged receivers skip what they missed and keep draining.
pub fn drain(rx: &mut broadcast::Receiver<Notification>) -> Vec<ManagerEvent> {
    let mut events = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(msg) => events.push(msg.event),
            Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
            Err(_) => break,
        }
    }
    events
}
