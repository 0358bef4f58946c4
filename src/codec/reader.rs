//! Trace reader
//!
//! Parses the layout described in [`format`](super::format). Every failure is
//! reported as a `ParseFailure` carrying the byte offset of the offending
//! line, or the file length when the file ends early.

use std::io::BufRead;
use std::path::Path;

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{ManagerError, ManagerResult};
use crate::types::{Event, EventType};

use super::format::{
    self, Section, SectionHeader, TraceData, TraceHeader, FORMAT_MAJOR, FORMAT_MINOR,
};
use super::task::TaskContext;

/// Upper bound on capacity reserved from an untrusted record count
const MAX_PREALLOCATED: usize = 4096;

pub struct TraceReader<'a, R: BufRead> {
    input: R,
    path: &'a Path,
    context: &'a TaskContext,
    offset: u64,
    line_start: u64,
    line: String,
}

impl<'a, R: BufRead> TraceReader<'a, R> {
    /// `size` is the total input length, used for progress
    pub fn new(input: R, size: u64, path: &'a Path, context: &'a TaskContext) -> Self {
        context.set_total(size);
        Self {
            input,
            path,
            context,
            offset: 0,
            line_start: 0,
            line: String::new(),
        }
    }

    pub fn read(mut self) -> ManagerResult<TraceData> {
        let header: TraceHeader = self
            .next_record()?
            .ok_or_else(|| self.failure("empty trace file"))?;
        self.check_version(header.version)?;

        let event_types: Vec<EventType> = self.section(Section::EventTypes)?;
        let events: Vec<Event> = self.section(Section::Events)?;

        if let Some((index, event)) = events
            .iter()
            .enumerate()
            .find(|(_, e)| e.type_index as usize >= event_types.len())
        {
            return Err(self.failure(format!(
                "event {} references unknown type {}",
                index, event.type_index
            )));
        }

        // Files cut right after the events carry no notes
        let notes = if self.at_end()? {
            Vec::new()
        } else {
            self.section(Section::Notes)?
        };

        debug!(
            path = %self.path.display(),
            types = event_types.len(),
            events = events.len(),
            notes = notes.len(),
            "parsed trace"
        );

        Ok(TraceData {
            trace_start: header.trace_start,
            trace_end: header.trace_end,
            features: header.feature_set,
            event_types,
            events,
            notes,
        })
    }

    fn check_version(&self, version: u16) -> ManagerResult<()> {
        if format::major(version) != FORMAT_MAJOR {
            return Err(ManagerError::parse(self.path, 0, "unsupported version"));
        }
        if format::minor(version) > FORMAT_MINOR {
            debug!(
                version,
                "trace written by a newer minor version, skipping unknown fields"
            );
        }
        Ok(())
    }

    fn section<T: DeserializeOwned>(&mut self, expected: Section) -> ManagerResult<Vec<T>> {
        let header: SectionHeader = self.next_record()?.ok_or_else(|| {
            self.failure(format!(
                "unexpected end of file: missing {} section",
                expected.name()
            ))
        })?;
        if header.section != expected {
            return Err(self.failure(format!(
                "expected {} section, found {}",
                expected.name(),
                header.section.name()
            )));
        }

        let count = header.count as usize;
        let mut records = Vec::with_capacity(count.min(MAX_PREALLOCATED));
        for found in 0..count {
            let record = self.next_record()?.ok_or_else(|| {
                self.failure(format!(
                    "unexpected end of file: expected {} {} records, found {}",
                    count,
                    expected.name(),
                    found
                ))
            })?;
            records.push(record);
        }
        Ok(records)
    }

    /// Parse the next non-blank line. `None` at end of input.
    fn next_record<T: DeserializeOwned>(&mut self) -> ManagerResult<Option<T>> {
        self.context.check_cancelled()?;

        if !self.next_line()? {
            return Ok(None);
        }
        serde_json::from_str(self.line.trim())
            .map(Some)
            .map_err(|e| self.failure(e.to_string()))
    }

    fn next_line(&mut self) -> ManagerResult<bool> {
        loop {
            self.line.clear();
            self.line_start = self.offset;
            let read = self
                .input
                .read_line(&mut self.line)
                .map_err(|e| ManagerError::io(self.path, &e))?;
            if read == 0 {
                return Ok(false);
            }
            self.offset += read as u64;
            self.context.set_done(self.offset);

            if !self.line.trim().is_empty() {
                return Ok(true);
            }
        }
    }

    /// True when only blank lines remain
    fn at_end(&mut self) -> ManagerResult<bool> {
        loop {
            let buffer = self
                .input
                .fill_buf()
                .map_err(|e| ManagerError::io(self.path, &e))?;
            if buffer.is_empty() {
                return Ok(true);
            }

            let blank = buffer.iter().take_while(|b| b.is_ascii_whitespace()).count();
            if blank < buffer.len() {
                // Keep the start of the next record line in the buffer
                let whole_lines = buffer[..blank]
                    .iter()
                    .rposition(|b| *b == b'\n')
                    .map_or(0, |i| i + 1);
                self.skip(whole_lines);
                return Ok(false);
            }
            let len = buffer.len();
            self.skip(len);
        }
    }

    fn skip(&mut self, amount: usize) {
        self.input.consume(amount);
        self.offset += amount as u64;
        self.context.set_done(self.offset);
    }

    fn failure(&self, reason: impl Into<String>) -> ManagerError {
        ManagerError::parse(self.path, self.line_start, reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::writer::TraceWriter;
    use crate::types::{Feature, FeatureSet, Message, Note, RangeType, SourceLocation};
    use std::io::Cursor;

    fn sample() -> TraceData {
        TraceData {
            trace_start: 10,
            trace_end: 90,
            features: FeatureSet::from(Feature::Binding),
            event_types: vec![EventType::new(
                Message::RangeStart,
                RangeType::Binding,
                0,
                "width".to_string(),
                SourceLocation::new("Main.qml", 12, 3),
            )],
            events: vec![Event::new(0, 10, 5, [0; 5]), Event::new(0, 40, 50, [1, 0, 0, 0, 0])],
            notes: vec![Note::new(0, 1, 40, 50, "long binding")],
        }
    }

    fn encode(data: &TraceData) -> Vec<u8> {
        let context = TaskContext::new();
        let mut buffer = Vec::new();
        TraceWriter::new(&mut buffer, Path::new("t.trace"), &context)
            .write(data)
            .unwrap();
        buffer
    }

    fn decode(bytes: &[u8]) -> ManagerResult<TraceData> {
        let context = TaskContext::new();
        let size = bytes.len() as u64;
        TraceReader::new(Cursor::new(bytes), size, Path::new("t.trace"), &context).read()
    }

    #[test]
    fn test_reads_what_writer_wrote() {
        let data = sample();
        assert_eq!(decode(&encode(&data)).unwrap(), data);
    }

    #[test]
    fn test_truncated_event_section() {
        let text = String::from_utf8(encode(&sample())).unwrap();
        let truncated: String = text
            .lines()
            .take(4)
            .map(|l| format!("{}\n", l.replace(r#""count":2"#, r#""count":5000"#)))
            .collect();

        match decode(truncated.as_bytes()) {
            Err(ManagerError::ParseFailure { offset, reason, .. }) => {
                assert_eq!(offset, truncated.len() as u64);
                assert!(reason.contains("expected 5000 events records"), "{}", reason);
            }
            other => panic!("expected parse failure, got {:?}", other),
        }
    }

    #[test]
    fn test_unsupported_major_version() {
        let text = String::from_utf8(encode(&sample())).unwrap();
        let bumped = text.replacen(r#""version":256"#, r#""version":512"#, 1);
        match decode(bumped.as_bytes()) {
            Err(ManagerError::ParseFailure { reason, .. }) => {
                assert_eq!(reason, "unsupported version")
            }
            other => panic!("expected parse failure, got {:?}", other),
        }
    }

    #[test]
    fn test_newer_minor_version_with_unknown_fields() {
        let text = String::from_utf8(encode(&sample())).unwrap();
        let bumped = text
            .replacen(r#""version":256"#, r#""version":259,"compression":"none""#, 1)
            .replacen(r#""typeIndex":0,"#, r#""typeIndex":0,"threadId":7,"#, 1);
        assert_eq!(decode(bumped.as_bytes()).unwrap(), sample());
    }

    #[test]
    fn test_malformed_line_reports_offset() {
        let text = String::from_utf8(encode(&sample())).unwrap();
        let header_len = text.lines().next().unwrap().len() as u64 + 1;
        let broken = text.replacen(r#"{"section":"eventTypes","count":1}"#, "{not json", 1);
        match decode(broken.as_bytes()) {
            Err(ManagerError::ParseFailure { offset, .. }) => assert_eq!(offset, header_len),
            other => panic!("expected parse failure, got {:?}", other),
        }
    }

    #[test]
    fn test_event_with_unknown_type_rejected() {
        let mut data = sample();
        data.events.push(Event::new(3, 100, 1, [0; 5]));
        assert!(matches!(
            decode(&encode(&data)),
            Err(ManagerError::ParseFailure { .. })
        ));
    }

    #[test]
    fn test_missing_notes_section_is_accepted() {
        let text = String::from_utf8(encode(&sample())).unwrap();
        let without_notes: String = text.lines().take(6).map(|l| format!("{}\n", l)).collect();
        let data = decode(without_notes.as_bytes()).unwrap();
        assert!(data.notes.is_empty());
        assert_eq!(data.events.len(), 2);
    }

    #[test]
    fn test_blank_lines_before_end_without_notes() {
        let text = String::from_utf8(encode(&sample())).unwrap();
        let mut without_notes: String = text.lines().take(6).map(|l| format!("{}\n", l)).collect();
        without_notes.push_str("\n  \n\t\n");

        let data = decode(without_notes.as_bytes()).unwrap();
        assert!(data.notes.is_empty());
        assert_eq!(data.events.len(), 2);
    }

    #[test]
    fn test_blank_lines_before_notes_section() {
        let text = String::from_utf8(encode(&sample())).unwrap();
        let spaced = text.replacen(r#"{"section":"notes""#, "\n \n{\"section\":\"notes\"", 1);
        assert_eq!(decode(spaced.as_bytes()).unwrap(), sample());
    }

    #[test]
    fn test_empty_input() {
        assert!(matches!(decode(b""), Err(ManagerError::ParseFailure { offset: 0, .. })));
    }
}
