//! User annotations attached to events

use serde::{Deserialize, Serialize};

/// A note anchored to an event
///
/// `start_time` and `duration` duplicate the anchor event's timing so the note
/// can be re-bound after the events have been re-sorted or reloaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub type_index: u32,
    pub event_index: u32,
    pub start_time: i64,
    pub duration: i64,
    pub text: String,
}

impl Note {
    pub fn new(
        type_index: u32,
        event_index: u32,
        start_time: i64,
        duration: i64,
        text: impl Into<String>,
    ) -> Self {
        Self {
            type_index,
            event_index,
            start_time,
            duration,
            text: text.into(),
        }
    }
}
