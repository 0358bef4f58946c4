//! Event Store - owns event types and events
//!
//! Events are appended while data is acquired and become readable through
//! [`EventStore::events`] once [`EventStore::process_data`] has sorted them.
//! Event types are interned: adding an event whose type tuple was seen
//! before reuses the existing type index.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{ManagerError, ManagerResult};
use crate::types::{Event, EventType, Message, PipelineState, RangeType, SourceLocation};

use super::trace_window::TraceWindow;

/// Per-type aggregates computed during processing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TypeStats {
    pub count: u64,
    pub min_duration: i64,
    pub max_duration: i64,
    pub total_duration: i64,
}

impl TypeStats {
    fn record(&mut self, duration: i64) {
        if self.count == 0 {
            self.min_duration = duration;
            self.max_duration = duration;
        } else {
            self.min_duration = self.min_duration.min(duration);
            self.max_duration = self.max_duration.max(duration);
        }
        self.count += 1;
        self.total_duration = self.total_duration.saturating_add(duration);
    }

    /// Mean duration, 0 for types without events
    pub fn average_duration(&self) -> i64 {
        if self.count == 0 {
            0
        } else {
            self.total_duration / self.count as i64
        }
    }
}

/// Storage for event types and events of one trace
#[derive(Debug, Default)]
pub struct EventStore {
    types: Vec<EventType>,
    type_ids: HashMap<EventType, u32>,
    events: Vec<Event>,
    stats: Vec<TypeStats>,
    last_time_mark: Option<i64>,
    processed: bool,
}

impl EventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event, interning its type
    ///
    /// Returns the index of the new event in insertion order.
    #[allow(clippy::too_many_arguments)]
    pub fn add_event(
        &mut self,
        message: Message,
        range_type: RangeType,
        detail_type: i32,
        start_time: i64,
        duration: i64,
        data: String,
        location: SourceLocation,
        payload: [i64; 5],
    ) -> ManagerResult<u32> {
        let ty = EventType::new(message, range_type, detail_type, data, location);
        self.push(ty, Event::new(0, start_time, duration, payload))
    }

    /// Append an event that carries free text, such as a debug message
    pub fn add_event_with_text(
        &mut self,
        ty: EventType,
        start_time: i64,
        duration: i64,
        text: String,
    ) -> ManagerResult<u32> {
        self.push(ty, Event::new(0, start_time, duration, [0; 5]).with_text(text))
    }

    fn push(&mut self, ty: EventType, mut event: Event) -> ManagerResult<u32> {
        if self.processed {
            return Err(ManagerError::InvalidState {
                operation: "add_event",
                state: PipelineState::Done,
            });
        }

        event.type_index = self.intern(ty);
        let index = self.events.len() as u32;
        self.events.push(event);
        Ok(index)
    }

    fn intern(&mut self, ty: EventType) -> u32 {
        if let Some(index) = self.type_ids.get(&ty) {
            return *index;
        }
        let index = self.types.len() as u32;
        self.type_ids.insert(ty.clone(), index);
        self.types.push(ty);
        index
    }

    /// Sort events and compute per-type statistics
    ///
    /// The sort is stable, so events sharing a start time keep their
    /// insertion order. Returns the latest end time seen, `None` for an
    /// empty trace.
    pub fn process_data(&mut self) -> ManagerResult<Option<i64>> {
        if self.processed {
            return Err(ManagerError::InvalidState {
                operation: "process_data",
                state: PipelineState::Done,
            });
        }

        self.events.sort_by_key(|e| e.start_time);

        let mut stats = vec![TypeStats::default(); self.types.len()];
        let mut last_time_mark: Option<i64> = None;
        for event in &self.events {
            if let Some(entry) = stats.get_mut(event.type_index as usize) {
                entry.record(event.duration);
            }
            let end = event.end_time();
            last_time_mark = Some(last_time_mark.map_or(end, |mark| mark.max(end)));
        }

        self.stats = stats;
        self.last_time_mark = last_time_mark;
        self.processed = true;
        Ok(last_time_mark)
    }

    /// Install a complete data set, typically read from a trace file
    ///
    /// The store goes back to the unprocessed phase; the caller still has to
    /// drive processing through the manager.
    pub fn set_data(
        &mut self,
        window: &mut TraceWindow,
        trace_start: i64,
        trace_end: i64,
        types: Vec<EventType>,
        events: Vec<Event>,
    ) -> ManagerResult<()> {
        if let Some((index, event)) = events
            .iter()
            .enumerate()
            .find(|(_, e)| e.type_index as usize >= types.len())
        {
            return Err(ManagerError::UnknownEvent {
                type_index: event.type_index,
                event_index: index as u32,
            });
        }

        window.set_time(trace_start, trace_start.max(trace_end))?;

        self.clear();
        for ty in types {
            // Duplicate types in a file keep their own slot
            let index = self.types.len() as u32;
            self.type_ids.entry(ty.clone()).or_insert(index);
            self.types.push(ty);
        }
        self.events = events;
        Ok(())
    }

    pub fn clear(&mut self) {
        self.types.clear();
        self.type_ids.clear();
        self.events.clear();
        self.stats.clear();
        self.last_time_mark = None;
        self.processed = false;
    }

    /// Sorted events, available once processing has completed
    pub fn events(&self) -> Option<&[Event]> {
        self.processed.then_some(self.events.as_slice())
    }

    /// Event types, available once processing has completed
    pub fn event_types(&self) -> Option<&[EventType]> {
        self.processed.then_some(self.types.as_slice())
    }

    /// Events in their current order, whether processed or not
    pub fn staged_events(&self) -> &[Event] {
        &self.events
    }

    /// Event types in index order, whether processed or not
    pub fn staged_types(&self) -> &[EventType] {
        &self.types
    }

    pub fn event_type(&self, index: u32) -> Option<&EventType> {
        self.types.get(index as usize)
    }

    pub fn event(&self, index: u32) -> Option<&Event> {
        self.events.get(index as usize)
    }

    pub fn type_stats(&self, index: u32) -> Option<&TypeStats> {
        self.stats.get(index as usize)
    }

    pub fn last_time_mark(&self) -> Option<i64> {
        self.last_time_mark
    }

    pub fn is_processed(&self) -> bool {
        self.processed
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.types.is_empty()
    }

    /// Find the index of an event by its anchor fields
    ///
    /// Uses binary search on the start time once the events are sorted.
    pub fn find_event(&self, type_index: u32, start_time: i64, duration: i64) -> Option<u32> {
        let matches = |e: &Event| {
            e.type_index == type_index && e.start_time == start_time && e.duration == duration
        };

        if self.processed {
            let first = self.events.partition_point(|e| e.start_time < start_time);
            self.events[first..]
                .iter()
                .take_while(|e| e.start_time == start_time)
                .position(matches)
                .map(|offset| (first + offset) as u32)
        } else {
            self.events.iter().position(matches).map(|i| i as u32)
        }
    }
}
