use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{TimeDelta, Utc};
use tokio::sync::RwLock;

use super::{NoteStore, StoreError};
use crate::models::{Note, NoteDraft};

/// Process-local store used when no database is configured, and by tests.
#[derive(Default)]
pub struct MemoryNoteStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    last_id: i64,
    notes: BTreeMap<i64, Note>,
}

impl MemoryNoteStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NoteStore for MemoryNoteStore {
    async fn insert(&self, draft: NoteDraft) -> Result<Note, StoreError> {
        let mut inner = self.inner.write().await;
        inner.last_id += 1;

        let now = Utc::now();
        let note = Note {
            id: inner.last_id,
            title: draft.title,
            content: draft.content,
            created_at: now,
            updated_at: now,
        };
        inner.notes.insert(note.id, note.clone());

        Ok(note)
    }

    async fn find(&self, id: i64) -> Result<Option<Note>, StoreError> {
        Ok(self.inner.read().await.notes.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<Note>, StoreError> {
        let mut notes: Vec<Note> = self.inner.read().await.notes.values().cloned().collect();
        notes.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });

        Ok(notes)
    }

    async fn update(&self, id: i64, draft: NoteDraft) -> Result<Option<Note>, StoreError> {
        let mut inner = self.inner.write().await;
        let Some(note) = inner.notes.get_mut(&id) else {
            return Ok(None);
        };

        note.title = draft.title;
        note.content = draft.content;
        note.updated_at = Utc::now().max(note.updated_at + TimeDelta::microseconds(1));

        Ok(Some(note.clone()))
    }

    async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        Ok(self.inner.write().await.notes.remove(&id).is_some())
    }
}
