//! In-memory note repository.
//!
//! Used when no `DATABASE_URL` is configured and as the backing store for
//! API tests. Contents are lost when the process exits.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{broadcast, RwLock};
use tracing::debug;
use uuid::Uuid;

use mediavault_core::{
    Error, EventBus, NewNote, Note, NoteEvent, NotePatch, NoteRepository, Result,
};

/// Notes grouped by owner.
#[derive(Debug, Default)]
pub struct MemoryNoteRepository {
    notes: RwLock<HashMap<String, HashMap<Uuid, Note>>>,
    events: EventBus,
}

impl MemoryNoteRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Share an existing event bus with other components.
    pub fn with_event_bus(events: EventBus) -> Self {
        Self {
            notes: RwLock::default(),
            events,
        }
    }
}

#[async_trait]
impl NoteRepository for MemoryNoteRepository {
    async fn insert(&self, user_id: &str, note: NewNote) -> Result<Note> {
        let now = Utc::now();
        let stored = Note {
            id: Uuid::now_v7(),
            user_id: user_id.to_string(),
            title: note.title,
            content: note.content,
            media_type: note.media_type,
            media_url: note.media_url,
            category: note.category,
            is_locked: note.is_locked,
            passkey: note.passkey,
            created_at: now,
            updated_at: now,
        };

        self.notes
            .write()
            .await
            .entry(user_id.to_string())
            .or_default()
            .insert(stored.id, stored.clone());

        debug!(
            subsystem = "database",
            component = "memory",
            op = "insert",
            note_id = %stored.id,
            "Note inserted"
        );
        self.events.emit(NoteEvent::Created {
            user_id: user_id.to_string(),
            note_id: stored.id,
        });
        Ok(stored)
    }

    async fn update(&self, user_id: &str, id: Uuid, patch: NotePatch) -> Result<Note> {
        let updated = {
            let mut notes = self.notes.write().await;
            let note = notes
                .get_mut(user_id)
                .and_then(|owned| owned.get_mut(&id))
                .ok_or(Error::NoteNotFound(id))?;
            patch.apply(note, Utc::now());
            note.clone()
        };

        self.events.emit(NoteEvent::Updated {
            user_id: user_id.to_string(),
            note_id: id,
        });
        Ok(updated)
    }

    async fn delete(&self, user_id: &str, id: Uuid) -> Result<()> {
        self.notes
            .write()
            .await
            .get_mut(user_id)
            .and_then(|owned| owned.remove(&id))
            .ok_or(Error::NoteNotFound(id))?;

        self.events.emit(NoteEvent::Deleted {
            user_id: user_id.to_string(),
            note_id: id,
        });
        Ok(())
    }

    async fn fetch(&self, user_id: &str, id: Uuid) -> Result<Note> {
        self.notes
            .read()
            .await
            .get(user_id)
            .and_then(|owned| owned.get(&id))
            .cloned()
            .ok_or(Error::NoteNotFound(id))
    }

    async fn list(&self, user_id: &str) -> Result<Vec<Note>> {
        let mut notes: Vec<Note> = self
            .notes
            .read()
            .await
            .get(user_id)
            .map(|owned| owned.values().cloned().collect())
            .unwrap_or_default();
        // v7 ids break ties between notes touched in the same instant
        notes.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(b.id.cmp(&a.id)));
        Ok(notes)
    }

    fn subscribe(&self) -> broadcast::Receiver<NoteEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediavault_core::MediaType;

    fn new_note(title: &str) -> NewNote {
        NewNote {
            title: title.to_string(),
            content: String::new(),
            media_type: MediaType::Text,
            media_url: None,
            category: "Notes".to_string(),
            is_locked: false,
            passkey: None,
        }
    }

    #[tokio::test]
    async fn test_notes_are_scoped_to_owner() {
        let repo = MemoryNoteRepository::new();
        let note = repo.insert("alice", new_note("mine")).await.unwrap();

        assert!(matches!(
            repo.fetch("bob", note.id).await,
            Err(Error::NoteNotFound(_))
        ));
        assert!(repo.list("bob").await.unwrap().is_empty());
        assert!(repo.delete("bob", note.id).await.is_err());
        assert_eq!(repo.list("alice").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_is_most_recent_first() {
        let repo = MemoryNoteRepository::new();
        let first = repo.insert("alice", new_note("first")).await.unwrap();
        let second = repo.insert("alice", new_note("second")).await.unwrap();

        let titles: Vec<String> = repo
            .list("alice")
            .await
            .unwrap()
            .into_iter()
            .map(|n| n.title)
            .collect();
        assert_eq!(titles, vec!["second", "first"]);

        repo.update(
            "alice",
            first.id,
            NotePatch {
                content: Some("touched".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let list = repo.list("alice").await.unwrap();
        assert_eq!(list[0].id, first.id);
        assert_eq!(list[1].id, second.id);
    }

    #[tokio::test]
    async fn test_writes_emit_events() {
        let repo = MemoryNoteRepository::new();
        let mut rx = repo.subscribe();

        let note = repo.insert("alice", new_note("x")).await.unwrap();
        repo.update("alice", note.id, NotePatch::default())
            .await
            .unwrap();
        repo.delete("alice", note.id).await.unwrap();

        assert_eq!(
            rx.recv().await.unwrap(),
            NoteEvent::Created {
                user_id: "alice".to_string(),
                note_id: note.id
            }
        );
        assert!(matches!(rx.recv().await.unwrap(), NoteEvent::Updated { .. }));
        assert!(matches!(rx.recv().await.unwrap(), NoteEvent::Deleted { .. }));
    }

    #[tokio::test]
    async fn test_failed_write_emits_nothing() {
        let repo = MemoryNoteRepository::new();
        let mut rx = repo.subscribe();
        assert!(repo
            .update("alice", Uuid::now_v7(), NotePatch::default())
            .await
            .is_err());
        assert!(rx.try_recv().is_err());
    }
}
