//! PostgreSQL note repository.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use tokio::sync::broadcast;
use uuid::Uuid;

use mediavault_core::{
    Error, EventBus, MediaType, NewNote, Note, NoteEvent, NotePatch, NoteRepository, Result,
};

const NOTE_COLUMNS: &str = "id, user_id, title, content, media_type, media_url, category, \
                            is_locked, passkey, created_at, updated_at";

/// PostgreSQL implementation of [`NoteRepository`].
///
/// Every statement filters on `user_id`, so a note owned by someone else
/// looks exactly like a missing one.
#[derive(Clone)]
pub struct PgNoteRepository {
    pool: Pool<Postgres>,
    events: EventBus,
}

impl PgNoteRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self::with_event_bus(pool, EventBus::default())
    }

    pub fn with_event_bus(pool: Pool<Postgres>, events: EventBus) -> Self {
        Self { pool, events }
    }

    fn row_to_note(row: &PgRow) -> Result<Note> {
        let media_type: String = row.try_get("media_type")?;
        Ok(Note {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            title: row.try_get("title")?,
            content: row.try_get("content")?,
            media_type: media_type.parse::<MediaType>()?,
            media_url: row.try_get("media_url")?,
            category: row.try_get("category")?,
            is_locked: row.try_get("is_locked")?,
            passkey: row.try_get("passkey")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[async_trait]
impl NoteRepository for PgNoteRepository {
    async fn insert(&self, user_id: &str, note: NewNote) -> Result<Note> {
        let now = Utc::now();
        let row = sqlx::query(&format!(
            "INSERT INTO note ({NOTE_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10) \
             RETURNING {NOTE_COLUMNS}"
        ))
        .bind(Uuid::now_v7())
        .bind(user_id)
        .bind(&note.title)
        .bind(&note.content)
        .bind(note.media_type.as_str())
        .bind(&note.media_url)
        .bind(&note.category)
        .bind(note.is_locked)
        .bind(&note.passkey)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        let stored = Self::row_to_note(&row)?;
        self.events.emit(NoteEvent::Created {
            user_id: user_id.to_string(),
            note_id: stored.id,
        });
        Ok(stored)
    }

    async fn update(&self, user_id: &str, id: Uuid, patch: NotePatch) -> Result<Note> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let row = sqlx::query(&format!(
            "SELECT {NOTE_COLUMNS} FROM note WHERE id = $1 AND user_id = $2 FOR UPDATE"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(Error::Database)?
        .ok_or(Error::NoteNotFound(id))?;

        let mut note = Self::row_to_note(&row)?;
        patch.apply(&mut note, Utc::now());

        sqlx::query(
            "UPDATE note SET title = $1, content = $2, media_type = $3, media_url = $4, \
             category = $5, is_locked = $6, passkey = $7, updated_at = $8 \
             WHERE id = $9 AND user_id = $10",
        )
        .bind(&note.title)
        .bind(&note.content)
        .bind(note.media_type.as_str())
        .bind(&note.media_url)
        .bind(&note.category)
        .bind(note.is_locked)
        .bind(&note.passkey)
        .bind(note.updated_at)
        .bind(id)
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        tx.commit().await.map_err(Error::Database)?;

        self.events.emit(NoteEvent::Updated {
            user_id: user_id.to_string(),
            note_id: id,
        });
        Ok(note)
    }

    async fn delete(&self, user_id: &str, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM note WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::NoteNotFound(id));
        }
        self.events.emit(NoteEvent::Deleted {
            user_id: user_id.to_string(),
            note_id: id,
        });
        Ok(())
    }

    async fn fetch(&self, user_id: &str, id: Uuid) -> Result<Note> {
        let row = sqlx::query(&format!(
            "SELECT {NOTE_COLUMNS} FROM note WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?
        .ok_or(Error::NoteNotFound(id))?;

        Self::row_to_note(&row)
    }

    async fn list(&self, user_id: &str) -> Result<Vec<Note>> {
        let rows = sqlx::query(&format!(
            "SELECT {NOTE_COLUMNS} FROM note WHERE user_id = $1 \
             ORDER BY updated_at DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        rows.iter().map(Self::row_to_note).collect()
    }

    fn subscribe(&self) -> broadcast::Receiver<NoteEvent> {
        self.events.subscribe()
    }
}
