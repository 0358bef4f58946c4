//! Notes Store - user annotations on events
//!
//! Notes are addressed by an id handed out on [`NotesStore::add`]. Each note
//! remembers the timing of its anchor event so it can be re-bound after the
//! events were sorted or reloaded from a trace file.

use std::collections::BTreeMap;

use tracing::warn;

use crate::error::{ManagerError, ManagerResult};
use crate::types::Note;

use super::event_store::EventStore;

#[derive(Debug, Default)]
pub struct NotesStore {
    notes: BTreeMap<u32, Note>,
    next_id: u32,
    modified: bool,
}

impl NotesStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a note to an existing event
    pub fn add(
        &mut self,
        store: &EventStore,
        type_index: u32,
        event_index: u32,
        text: impl Into<String>,
    ) -> ManagerResult<u32> {
        let event = store
            .event(event_index)
            .filter(|e| e.type_index == type_index)
            .ok_or(ManagerError::UnknownEvent {
                type_index,
                event_index,
            })?;

        let note = Note::new(
            type_index,
            event_index,
            event.start_time,
            event.duration,
            text,
        );
        Ok(self.insert(note))
    }

    fn insert(&mut self, note: Note) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        self.notes.insert(id, note);
        self.modified = true;
        id
    }

    pub fn remove(&mut self, note_id: u32) -> ManagerResult<Note> {
        let note = self
            .notes
            .remove(&note_id)
            .ok_or(ManagerError::UnknownNote(note_id))?;
        self.modified = true;
        Ok(note)
    }

    pub fn update(&mut self, note_id: u32, text: impl Into<String>) -> ManagerResult<()> {
        let note = self
            .notes
            .get_mut(&note_id)
            .ok_or(ManagerError::UnknownNote(note_id))?;
        let text = text.into();
        if note.text != text {
            note.text = text;
            self.modified = true;
        }
        Ok(())
    }

    pub fn get(&self, note_id: u32) -> Option<&Note> {
        self.notes.get(&note_id)
    }

    /// Notes with their ids, in id order
    pub fn iter(&self) -> impl Iterator<Item = (u32, &Note)> {
        self.notes.iter().map(|(id, note)| (*id, note))
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Replace all notes, e.g. with the notes read from a trace file
    ///
    /// The notes are not bound to events until [`NotesStore::load_data`].
    pub fn set_notes(&mut self, notes: Vec<Note>) {
        self.notes.clear();
        self.next_id = 0;
        for note in notes {
            self.insert(note);
        }
        self.modified = false;
    }

    /// Re-bind every note to the event matching its anchor
    ///
    /// Notes without a matching event are dropped. Returns the number of
    /// notes dropped.
    pub fn load_data(&mut self, store: &EventStore) -> usize {
        let before = self.notes.len();
        self.notes.retain(|id, note| {
            match store.find_event(note.type_index, note.start_time, note.duration) {
                Some(index) => {
                    note.event_index = index;
                    true
                }
                None => {
                    warn!(
                        note_id = id,
                        type_index = note.type_index,
                        start_time = note.start_time,
                        "dropping note without matching event"
                    );
                    false
                }
            }
        });
        before - self.notes.len()
    }

    /// Snapshot of the notes for serialization
    pub fn save_data(&mut self) -> Vec<Note> {
        self.modified = false;
        self.notes.values().cloned().collect()
    }

    /// Whether notes changed since they were last loaded or saved
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn clear(&mut self) {
        self.notes.clear();
        self.next_id = 0;
        self.modified = false;
    }
}
