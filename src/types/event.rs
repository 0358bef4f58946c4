//! Event and event type records
//!
//! An [`Event`] is a single timed observation. It references a de-duplicated
//! [`EventType`] by index; the type carries the message kind, the range kind
//! and the source location the event was emitted from.

use serde::{Deserialize, Serialize};

use super::feature::Feature;

/// Kind of message the profiled application reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Message {
    Event,
    RangeStart,
    RangeData,
    RangeLocation,
    RangeEnd,
    Complete,
    PixmapCacheEvent,
    SceneGraphFrame,
    MemoryAllocation,
    DebugMessage,
    Undefined,
}

impl Message {
    pub fn name(self) -> &'static str {
        match self {
            Message::Event => "Event",
            Message::RangeStart => "RangeStart",
            Message::RangeData => "RangeData",
            Message::RangeLocation => "RangeLocation",
            Message::RangeEnd => "RangeEnd",
            Message::Complete => "Complete",
            Message::PixmapCacheEvent => "PixmapCache",
            Message::SceneGraphFrame => "SceneGraph",
            Message::MemoryAllocation => "MemoryAllocation",
            Message::DebugMessage => "DebugMessage",
            Message::Undefined => "Undefined",
        }
    }
}

/// Kind of QML range an event belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeType {
    Painting,
    Compiling,
    Creating,
    Binding,
    HandlingSignal,
    Javascript,
    Undefined,
}

impl RangeType {
    pub fn name(self) -> &'static str {
        match self {
            RangeType::Painting => "Painting",
            RangeType::Compiling => "Compiling",
            RangeType::Creating => "Creating",
            RangeType::Binding => "Binding",
            RangeType::HandlingSignal => "HandlingSignal",
            RangeType::Javascript => "Javascript",
            RangeType::Undefined => "Undefined",
        }
    }

    /// Feature that records ranges of this kind
    pub fn feature(self) -> Option<Feature> {
        match self {
            RangeType::Painting => Some(Feature::Painting),
            RangeType::Compiling => Some(Feature::Compiling),
            RangeType::Creating => Some(Feature::Creating),
            RangeType::Binding => Some(Feature::Binding),
            RangeType::HandlingSignal => Some(Feature::HandlingSignal),
            RangeType::Javascript => Some(Feature::JavaScript),
            RangeType::Undefined => None,
        }
    }
}

/// Detail values carried by [`Message::Event`] types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventDetail {
    FramePaint = 0,
    Mouse = 1,
    Key = 2,
    AnimationFrame = 3,
    EndTrace = 4,
    StartTrace = 5,
}

impl EventDetail {
    pub fn from_detail(detail: i32) -> Option<EventDetail> {
        match detail {
            0 => Some(EventDetail::FramePaint),
            1 => Some(EventDetail::Mouse),
            2 => Some(EventDetail::Key),
            3 => Some(EventDetail::AnimationFrame),
            4 => Some(EventDetail::EndTrace),
            5 => Some(EventDetail::StartTrace),
            _ => None,
        }
    }
}

/// Severity of a debug message, stored as the detail of its type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DebugLevel {
    Debug = 0,
    Warning = 1,
    Critical = 2,
    Fatal = 3,
    Info = 4,
}

/// Where in the profiled sources an event originated
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SourceLocation {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub file: String,
    #[serde(default)]
    pub line: i32,
    #[serde(default)]
    pub column: i32,
}

impl SourceLocation {
    pub fn new(file: impl Into<String>, line: i32, column: i32) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.file.is_empty()
    }
}

/// De-duplicated descriptor referenced by events
///
/// Two types are the same type when all fields compare equal; the
/// [`EventStore`](crate::model::EventStore) interns on that identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventType {
    pub message: Message,
    pub range_type: RangeType,
    pub detail_type: i32,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub data: String,
    #[serde(default)]
    pub location: SourceLocation,
}

impl EventType {
    /// Create a type, deriving its display name from the location
    pub fn new(
        message: Message,
        range_type: RangeType,
        detail_type: i32,
        data: String,
        location: SourceLocation,
    ) -> Self {
        let display_name = if !location.is_empty() {
            let file = location
                .file
                .rsplit(['/', '\\'])
                .next()
                .unwrap_or(location.file.as_str());
            format!("{}:{}", file, location.line)
        } else if range_type != RangeType::Undefined {
            range_type.name().to_string()
        } else {
            message.name().to_string()
        };

        Self {
            message,
            range_type,
            detail_type,
            display_name,
            data,
            location,
        }
    }

    /// Feature this type's events are dispatched under, if any
    pub fn feature(&self) -> Option<Feature> {
        match self.message {
            Message::Event => match EventDetail::from_detail(self.detail_type) {
                Some(EventDetail::Mouse) | Some(EventDetail::Key) => Some(Feature::InputEvents),
                Some(EventDetail::AnimationFrame) => Some(Feature::Animations),
                _ => None,
            },
            Message::PixmapCacheEvent => Some(Feature::PixmapCache),
            Message::SceneGraphFrame => Some(Feature::SceneGraph),
            Message::MemoryAllocation => Some(Feature::MemoryUsage),
            Message::DebugMessage => Some(Feature::DebugMessages),
            _ => self.range_type.feature(),
        }
    }
}

/// A single timed observation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub type_index: u32,
    /// Nanoseconds since the trace clock origin
    pub start_time: i64,
    pub duration: i64,
    #[serde(default)]
    pub payload: [i64; 5],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Event {
    pub fn new(type_index: u32, start_time: i64, duration: i64, payload: [i64; 5]) -> Self {
        Self {
            type_index,
            start_time,
            duration,
            payload,
            text: None,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Timestamp at which the event ends
    pub fn end_time(&self) -> i64 {
        self.start_time.saturating_add(self.duration)
    }
}
