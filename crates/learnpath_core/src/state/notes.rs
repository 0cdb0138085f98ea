//! Free-text notes keyed by section path (`axis/chapter/section`).
//!
//! Empty text and a missing key both mean "no note"; saving blank text
//! deletes the entry.

use crate::store::{KvStore, StoreResult};
use std::collections::BTreeMap;

/// Storage key of the notes map.
pub const NOTES_KEY: &str = "progweb_notes";

/// Notes view over a shared store.
pub struct NotesStore<'s> {
    store: &'s KvStore,
}

impl<'s> NotesStore<'s> {
    pub fn new(store: &'s KvStore) -> Self {
        Self { store }
    }

    /// All notes keyed by section path.
    pub fn all(&self) -> BTreeMap<String, String> {
        self.store.get_json(NOTES_KEY)
    }

    /// Note text for one section, empty when absent.
    pub fn get(&self, section_path: &str) -> String {
        self.all().remove(section_path).unwrap_or_default()
    }

    pub fn has_note(&self, section_path: &str) -> bool {
        !self.get(section_path).trim().is_empty()
    }

    /// Saves note text. Blank text removes the note.
    pub fn set(&self, section_path: &str, text: &str) -> StoreResult<()> {
        if text.trim().is_empty() {
            return self.delete(section_path);
        }
        let mut notes = self.all();
        notes.insert(section_path.to_string(), text.to_string());
        self.store.set_json(NOTES_KEY, &notes)
    }

    pub fn delete(&self, section_path: &str) -> StoreResult<()> {
        let mut notes = self.all();
        if notes.remove(section_path).is_none() {
            return Ok(());
        }
        self.store.set_json(NOTES_KEY, &notes)
    }

    /// Number of non-blank notes.
    pub fn count(&self) -> usize {
        self.all()
            .values()
            .filter(|text| !text.trim().is_empty())
            .count()
    }
}
