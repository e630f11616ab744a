//! Note list and editor endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use mediavault_core::{
    default_categories, defaults, delete_detached, save_draft_detached, update_detached,
    Category, NoteContent, NoteDraft, NoteFilter, NotePatch, RenderedNote,
};

use crate::identity::Caller;
use crate::{ApiError, AppState};

/// Body of `POST /api/v1/notes`.
#[derive(Debug, Deserialize)]
pub struct CreateNoteBody {
    #[serde(flatten)]
    pub draft: NoteDraft,
    /// Sidebar category selected while composing; used when the draft names none.
    #[serde(default)]
    pub active_category: Option<String>,
}

pub async fn list_categories() -> Json<Vec<Category>> {
    Json(default_categories())
}

/// List the caller's notes. Locked notes only expose their title.
pub async fn list_notes(
    State(state): State<AppState>,
    Caller(identity): Caller,
    Query(filter): Query<NoteFilter>,
) -> Result<Json<Vec<RenderedNote>>, ApiError> {
    let notes = state.repo.list(&identity.user_id).await?;
    let rendered = filter
        .apply(notes)
        .iter()
        .map(|note| RenderedNote::of(note, false))
        .collect();
    Ok(Json(rendered))
}

pub async fn create_note(
    State(state): State<AppState>,
    Caller(identity): Caller,
    Json(body): Json<CreateNoteBody>,
) -> Result<(StatusCode, Json<NoteContent>), ApiError> {
    let mut draft = body.draft;
    draft.id = None;
    let active_category = body
        .active_category
        .unwrap_or_else(|| defaults::ALL_NOTES_CATEGORY.to_string());

    let note = save_draft_detached(state.repo.clone(), identity, draft, active_category)?
        .wait()
        .await?;
    Ok((StatusCode::CREATED, Json(NoteContent::from(&note))))
}

/// Partial update: only the fields present in the body change.
pub async fn update_note(
    State(state): State<AppState>,
    Caller(identity): Caller,
    Path(id): Path<Uuid>,
    Json(patch): Json<NotePatch>,
) -> Result<Json<NoteContent>, ApiError> {
    let note = update_detached(state.repo.clone(), identity, id, patch)
        .wait()
        .await?;
    Ok(Json(NoteContent::from(&note)))
}

pub async fn delete_note(
    State(state): State<AppState>,
    Caller(identity): Caller,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    delete_detached(state.repo.clone(), identity, id).wait().await?;
    Ok(StatusCode::NO_CONTENT)
}
