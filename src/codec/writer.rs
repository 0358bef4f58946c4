//! Trace writer

use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::error::{ManagerError, ManagerResult};

use super::format::{Section, SectionHeader, TraceData};
use super::task::TaskContext;

/// Serializes a [`TraceData`] snapshot as JSON Lines
///
/// Progress is counted in records; cancellation is checked before every
/// record, never in the middle of one.
pub struct TraceWriter<'a, W: Write> {
    out: W,
    path: &'a Path,
    context: &'a TaskContext,
    bytes_written: u64,
}

impl<'a, W: Write> TraceWriter<'a, W> {
    pub fn new(out: W, path: &'a Path, context: &'a TaskContext) -> Self {
        Self {
            out,
            path,
            context,
            bytes_written: 0,
        }
    }

    /// Write the whole trace. Returns the number of bytes written.
    pub fn write(mut self, data: &TraceData) -> ManagerResult<u64> {
        self.context.set_total(data.record_count());

        self.record(&data.header())?;
        self.section(Section::EventTypes, &data.event_types)?;
        self.section(Section::Events, &data.events)?;
        self.section(Section::Notes, &data.notes)?;

        self.out.flush().map_err(|e| ManagerError::io(self.path, &e))?;
        Ok(self.bytes_written)
    }

    fn section<T: Serialize>(&mut self, section: Section, records: &[T]) -> ManagerResult<()> {
        let header = SectionHeader {
            section,
            count: records.len() as u32,
        };
        self.record(&header)?;
        for record in records {
            self.record(record)?;
        }
        Ok(())
    }

    fn record<T: Serialize>(&mut self, record: &T) -> ManagerResult<()> {
        self.context.check_cancelled()?;

        let mut line = serde_json::to_string(record).map_err(|e| ManagerError::IoFailure {
            path: self.path.to_path_buf(),
            reason: e.to_string(),
        })?;
        line.push('\n');
        self.out
            .write_all(line.as_bytes())
            .map_err(|e| ManagerError::io(self.path, &e))?;

        self.bytes_written += line.len() as u64;
        self.context.advance(1);
        Ok(())
    }
}
