use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::structs::{Note, NoteVector};

/// In-memory note table, owned by the running Rocket instance.
///
/// Every method locks for its own duration only. Handlers that look a note
/// up and then mutate it do so in two separate calls.
#[derive(Default)]
pub struct Notes {
    table: Mutex<NoteTable>,
}

#[derive(Default)]
struct NoteTable {
    last_id: i64,
    rows: NoteVector,
}

impl Notes {
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self) -> MutexGuard<'_, NoteTable> {
        // No method panics while holding the lock, so a poisoned table is still consistent.
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get_all(&self) -> NoteVector {
        self.table().rows.clone()
    }

    pub fn get_by_user(&self, user: &str) -> NoteVector {
        self.get_all()
            .into_iter()
            .filter(|note| note.user == user)
            .collect()
    }

    pub fn get_by_id(&self, id: i64) -> Option<Note> {
        self.table().rows.iter().find(|note| note.id == id).cloned()
    }

    /// Insert a note, then return the ID assigned to it
    pub fn add(&self, title: String, content: String, user: String) -> i64 {
        let mut table = self.table();
        table.last_id += 1;
        let id = table.last_id;
        table.rows.push(Note { id, title, content, user });

        id
    }

    pub fn update(&self, id: i64, title: String, content: String, user: String) -> bool {
        let mut table = self.table();
        match table.rows.iter_mut().find(|note| note.id == id) {
            Some(note) => {
                note.title = title;
                note.content = content;
                note.user = user;
                true
            }
            None => false,
        }
    }

    pub fn remove_by_id(&self, id: i64) -> bool {
        let mut table = self.table();
        let before = table.rows.len();
        table.rows.retain(|note| note.id != id);

        table.rows.len() < before
    }
}
