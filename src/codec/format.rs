//! Trace file layout
//!
//! A trace file is JSON Lines. The first line is the [`TraceHeader`], then
//! three sections follow, each introduced by a [`SectionHeader`] line that
//! announces how many record lines it holds:
//!
//! ```text
//! {"version":256,"traceStart":1000,"traceEnd":1050,"duration":50,"featureSet":1}
//! {"section":"eventTypes","count":1}
//! {"message":"range_start","rangeType":"javascript","detailType":0,...}
//! {"section":"events","count":1}
//! {"typeIndex":0,"startTime":1000,"duration":50,"payload":[0,0,0,0,0]}
//! {"section":"notes","count":0}
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Event, EventType, FeatureSet, Note};

pub const FORMAT_MAJOR: u8 = 1;
pub const FORMAT_MINOR: u8 = 0;

/// Version written into new trace files
pub const FORMAT_VERSION: u16 = version(FORMAT_MAJOR, FORMAT_MINOR);

pub const fn version(major: u8, minor: u8) -> u16 {
    ((major as u16) << 8) | minor as u16
}

pub fn major(version: u16) -> u8 {
    (version >> 8) as u8
}

pub fn minor(version: u16) -> u8 {
    (version & 0xff) as u8
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceHeader {
    pub version: u16,
    pub trace_start: i64,
    pub trace_end: i64,
    pub duration: i64,
    pub feature_set: FeatureSet,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Section {
    EventTypes,
    Events,
    Notes,
}

impl Section {
    pub fn name(self) -> &'static str {
        match self {
            Section::EventTypes => "eventTypes",
            Section::Events => "events",
            Section::Notes => "notes",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionHeader {
    pub section: Section,
    pub count: u32,
}

/// Everything a trace file holds
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TraceData {
    pub trace_start: i64,
    pub trace_end: i64,
    pub features: FeatureSet,
    pub event_types: Vec<EventType>,
    pub events: Vec<Event>,
    pub notes: Vec<Note>,
}

impl TraceData {
    /// Number of lines the data occupies in a file
    pub fn record_count(&self) -> u64 {
        // header plus one line per section header
        4 + (self.event_types.len() + self.events.len() + self.notes.len()) as u64
    }

    pub fn header(&self) -> TraceHeader {
        let duration = if self.trace_start == -1 || self.trace_end == -1 {
            0
        } else {
            self.trace_end - self.trace_start
        };
        TraceHeader {
            version: FORMAT_VERSION,
            trace_start: self.trace_start,
            trace_end: self.trace_end,
            duration,
            feature_set: self.features,
            saved_at: Some(Utc::now()),
        }
    }
}
