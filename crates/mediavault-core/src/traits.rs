//! Core traits for MediaVault abstractions.
//!
//! These traits define the seams that concrete implementations must
//! satisfy: the persistent note store and the external reasoning service.
//! Components receive them as explicit `Arc<dyn Trait>` handles.

use async_trait::async_trait;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// NOTE REPOSITORY TRAITS
// =============================================================================

/// Per-user note collections keyed by note id.
///
/// Every operation is scoped to `user_id`; a note owned by another user is
/// reported as [`Error::NoteNotFound`](crate::Error::NoteNotFound).
#[async_trait]
pub trait NoteRepository: Send + Sync {
    /// Insert a new note, assigning its id and timestamps.
    async fn insert(&self, user_id: &str, note: NewNote) -> Result<Note>;

    /// Merge a partial update into an existing note.
    async fn update(&self, user_id: &str, id: Uuid, patch: NotePatch) -> Result<Note>;

    /// Permanently delete a note.
    async fn delete(&self, user_id: &str, id: Uuid) -> Result<()>;

    /// Fetch a note by id.
    async fn fetch(&self, user_id: &str, id: Uuid) -> Result<Note>;

    /// List a user's notes, most recently updated first.
    async fn list(&self, user_id: &str) -> Result<Vec<Note>>;

    /// Subscribe to change events for all users; filter by
    /// [`NoteEvent::user_id`] for a live per-user query.
    fn subscribe(&self) -> broadcast::Receiver<NoteEvent>;
}

// =============================================================================
// REASONING SERVICE TRAITS
// =============================================================================

/// External reasoning service deciding whether to grant an unlock override.
///
/// A response missing either field must come back as an error; callers
/// treat every error the same way.
#[async_trait]
pub trait UnlockAssistant: Send + Sync {
    /// Decide on a single turn.
    async fn decide(&self, request: &UnlockRequest) -> Result<UnlockDecision>;

    /// Name used in logs.
    fn name(&self) -> &str;
}

/// Backend for text generation with JSON-constrained output.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Generate a JSON document given a system preamble and a prompt.
    ///
    /// `schema` describes the expected object; backends that support
    /// schema-constrained decoding pass it through, others only request
    /// JSON mode.
    async fn generate_json_with_system(
        &self,
        system: &str,
        prompt: &str,
        schema: &serde_json::Value,
    ) -> Result<String>;

    /// Get the model name being used.
    fn model_name(&self) -> &str;

    /// Check if the backend is available and responding.
    async fn health_check(&self) -> Result<bool>;
}
