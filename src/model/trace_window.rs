//! Observed trace time window
//!
//! Events can arrive out of order, so the window only ever widens while data
//! is acquired. `-1` marks an unset bound.

use serde::{Deserialize, Serialize};

use crate::error::{ManagerError, ManagerResult};
use crate::types::UNSET_TIME;

/// Inclusive `[start, end]` interval covering all observed events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceWindow {
    start: i64,
    end: i64,
}

impl TraceWindow {
    pub fn new() -> Self {
        Self {
            start: UNSET_TIME,
            end: UNSET_TIME,
        }
    }

    pub fn start(&self) -> i64 {
        self.start
    }

    pub fn end(&self) -> i64 {
        self.end
    }

    /// True while neither bound has been observed
    pub fn is_empty(&self) -> bool {
        self.start == UNSET_TIME && self.end == UNSET_TIME
    }

    /// `end - start` when both bounds are set, otherwise 0
    pub fn duration(&self) -> i64 {
        if self.start == UNSET_TIME || self.end == UNSET_TIME {
            0
        } else {
            self.end - self.start
        }
    }

    /// Replace both bounds. Returns whether the window changed.
    pub fn set_time(&mut self, start: i64, end: i64) -> ManagerResult<bool> {
        if start > end {
            return Err(ManagerError::InvalidInterval { start, end });
        }
        let changed = start != self.start || end != self.end;
        self.start = start;
        self.end = end;
        Ok(changed)
    }

    /// Move the start earlier if `time` precedes it
    pub fn decrease_start(&mut self, time: i64) {
        if self.start == UNSET_TIME || time < self.start {
            self.start = time;
            if self.end == UNSET_TIME || self.end < self.start {
                self.end = self.start;
            }
        }
    }

    /// Move the end later if `time` follows it
    pub fn increase_end(&mut self, time: i64) {
        if self.end == UNSET_TIME || time > self.end {
            self.end = time;
            if self.start == UNSET_TIME || self.start > self.end {
                self.start = self.end;
            }
        }
    }

    /// Widen the window so that it encloses `[start, end]`
    pub fn enclose(&mut self, start: i64, end: i64) {
        self.decrease_start(start);
        self.increase_end(end.max(start));
    }

    pub fn clear(&mut self) {
        self.start = UNSET_TIME;
        self.end = UNSET_TIME;
    }
}

impl Default for TraceWindow {
    fn default() -> Self {
        Self::new()
    }
}
