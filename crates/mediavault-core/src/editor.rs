//! Note editor: draft validation and saving.
//!
//! Validation always runs before the repository is touched, so a rejected
//! draft never produces a partial write.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::oneshot;
use tracing::{info, warn};
use uuid::Uuid;

use crate::defaults;
use crate::error::{Error, Result};
use crate::models::{Identity, MediaType, Note, NoteDraft, NotePatch};
use crate::traits::NoteRepository;

/// Check a draft against the editor rules.
///
/// - a locked draft needs a non-empty passkey
/// - an image note carrying an inline `data:` payload must be an image
pub fn validate_draft(draft: &NoteDraft) -> Result<()> {
    check_fields(
        draft.is_locked,
        draft.passkey.as_deref(),
        draft.media_type,
        draft.media_url.as_deref(),
    )
}

/// Check a stored (or merged) note against the same rules as a draft.
pub fn validate_note(note: &Note) -> Result<()> {
    check_fields(
        note.is_locked,
        note.passkey.as_deref(),
        note.media_type,
        note.media_url.as_deref(),
    )
}

fn check_fields(
    is_locked: bool,
    passkey: Option<&str>,
    media_type: MediaType,
    media_url: Option<&str>,
) -> Result<()> {
    if is_locked && passkey.map_or(true, str::is_empty) {
        return Err(Error::InvalidInput(defaults::PASSKEY_REQUIRED.to_string()));
    }
    if media_type == MediaType::Image {
        if let Some(url) = media_url {
            if url.starts_with("data:") && !url.starts_with("data:image/") {
                return Err(Error::InvalidInput(defaults::INVALID_IMAGE_TYPE.to_string()));
            }
        }
    }
    Ok(())
}

/// Validate and persist a draft for `identity`.
///
/// Drafts without an id are created under their own category or, failing
/// that, `active_category`. Drafts with an id are merged into the stored
/// note.
pub async fn save_draft(
    repo: &dyn NoteRepository,
    identity: &Identity,
    draft: NoteDraft,
    active_category: &str,
) -> Result<Note> {
    validate_draft(&draft)?;

    let note = match draft.id {
        Some(id) => repo.update(&identity.user_id, id, draft.into_patch()).await?,
        None => {
            repo.insert(&identity.user_id, draft.into_new_note(active_category))
                .await?
        }
    };
    info!(
        subsystem = "editor",
        note_id = %note.id,
        user_id = %identity.user_id,
        is_locked = note.is_locked,
        media_type = %note.media_type,
        "Note saved"
    );
    Ok(note)
}

/// Merge `patch` into a stored note.
///
/// Fields absent from the patch keep their stored value. The rules are
/// checked against the merged result; a rejected patch never reaches
/// [`NoteRepository::update`]. A blank title becomes
/// [`defaults::UNTITLED_NOTE`].
pub async fn update_note(
    repo: &dyn NoteRepository,
    identity: &Identity,
    id: Uuid,
    mut patch: NotePatch,
) -> Result<Note> {
    if patch.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
        patch.title = Some(defaults::UNTITLED_NOTE.to_string());
    }

    let mut merged = repo.fetch(&identity.user_id, id).await?;
    patch.clone().apply(&mut merged, Utc::now());
    validate_note(&merged)?;

    let note = repo.update(&identity.user_id, id, patch).await?;
    info!(
        subsystem = "editor",
        note_id = %note.id,
        user_id = %identity.user_id,
        is_locked = note.is_locked,
        media_type = %note.media_type,
        "Note updated"
    );
    Ok(note)
}

/// Completion signal for a write running in the background.
///
/// Dropping it detaches the write; failures are still logged.
#[derive(Debug)]
pub struct PendingWrite<T> {
    rx: oneshot::Receiver<Result<T>>,
}

impl<T> PendingWrite<T> {
    /// Wait for the write to finish.
    pub async fn wait(self) -> Result<T> {
        self.rx
            .await
            .map_err(|_| Error::Internal("Background write task was cancelled".to_string()))?
    }
}

fn spawn_write<T, F>(op: &'static str, fut: F) -> PendingWrite<T>
where
    T: Send + 'static,
    F: std::future::Future<Output = Result<T>> + Send + 'static,
{
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
        let result = fut.await;
        if let Err(e) = &result {
            warn!(subsystem = "editor", op, error = %e, "Background write failed");
        }
        let _ = tx.send(result);
    });
    PendingWrite { rx }
}

/// Validate synchronously, then save in the background.
///
/// A validation failure is returned immediately and nothing is spawned.
pub fn save_draft_detached(
    repo: Arc<dyn NoteRepository>,
    identity: Identity,
    draft: NoteDraft,
    active_category: String,
) -> Result<PendingWrite<Note>> {
    validate_draft(&draft)?;
    Ok(spawn_write("save", async move {
        save_draft(repo.as_ref(), &identity, draft, &active_category).await
    }))
}

/// Partial update in the background. Validation needs the stored note, so
/// a rejected patch surfaces through [`PendingWrite::wait`].
pub fn update_detached(
    repo: Arc<dyn NoteRepository>,
    identity: Identity,
    id: Uuid,
    patch: NotePatch,
) -> PendingWrite<Note> {
    spawn_write("update", async move {
        update_note(repo.as_ref(), &identity, id, patch).await
    })
}

/// Delete in the background.
pub fn delete_detached(
    repo: Arc<dyn NoteRepository>,
    identity: Identity,
    id: Uuid,
) -> PendingWrite<()> {
    spawn_write("delete", async move {
        repo.delete(&identity.user_id, id).await
    })
}
