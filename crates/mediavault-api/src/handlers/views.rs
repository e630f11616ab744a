//! Note views: the access gate and the assistant dialog.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use mediavault_core::{DialogSnapshot, RenderedNote};

use crate::identity::Caller;
use crate::{ApiError, AppState};

#[derive(Debug, Serialize)]
pub struct OpenViewResponse {
    pub view_id: Uuid,
    pub note: RenderedNote,
}

#[derive(Debug, Deserialize)]
pub struct UnlockBody {
    pub passkey: String,
}

#[derive(Debug, Serialize)]
pub struct UnlockResponse {
    pub unlocked: bool,
    pub note: RenderedNote,
}

#[derive(Debug, Deserialize)]
pub struct MessageBody {
    pub message: String,
}

/// Open a view over one of the caller's notes. Each view starts locked.
pub async fn open_view(
    State(state): State<AppState>,
    Caller(identity): Caller,
    Path(note_id): Path<Uuid>,
) -> Result<(StatusCode, Json<OpenViewResponse>), ApiError> {
    let note = state.repo.fetch(&identity.user_id, note_id).await?;
    let view = state.open_view(note).await;
    Ok((
        StatusCode::CREATED,
        Json(OpenViewResponse {
            view_id: view.id(),
            note: view.render().await,
        }),
    ))
}

pub async fn get_view(
    State(state): State<AppState>,
    Caller(identity): Caller,
    Path(view_id): Path<Uuid>,
) -> Result<Json<RenderedNote>, ApiError> {
    let view = state.views.get(view_id, &identity).await?;
    Ok(Json(view.render().await))
}

pub async fn close_view(
    State(state): State<AppState>,
    Caller(identity): Caller,
    Path(view_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.views.remove(view_id, &identity).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Passkey attempt. A mismatch is a normal response, not an error.
pub async fn unlock_view(
    State(state): State<AppState>,
    Caller(identity): Caller,
    Path(view_id): Path<Uuid>,
    Json(body): Json<UnlockBody>,
) -> Result<Json<UnlockResponse>, ApiError> {
    let view = state.views.get(view_id, &identity).await?;
    let (unlocked, note) = view.attempt_unlock(&body.passkey).await;
    Ok(Json(UnlockResponse { unlocked, note }))
}

pub async fn relock_view(
    State(state): State<AppState>,
    Caller(identity): Caller,
    Path(view_id): Path<Uuid>,
) -> Result<Json<RenderedNote>, ApiError> {
    let view = state.views.get(view_id, &identity).await?;
    Ok(Json(view.relock().await))
}

pub async fn open_assistant(
    State(state): State<AppState>,
    Caller(identity): Caller,
    Path(view_id): Path<Uuid>,
) -> Result<Json<DialogSnapshot>, ApiError> {
    let view = state.views.get(view_id, &identity).await?;
    Ok(Json(view.open_assistant().await))
}

pub async fn get_assistant(
    State(state): State<AppState>,
    Caller(identity): Caller,
    Path(view_id): Path<Uuid>,
) -> Result<Json<DialogSnapshot>, ApiError> {
    let view = state.views.get(view_id, &identity).await?;
    Ok(Json(view.assistant().await))
}

/// One negotiation turn. Reasoning-service failures come back as the
/// fallback turn with status 200.
pub async fn send_assistant_message(
    State(state): State<AppState>,
    Caller(identity): Caller,
    Path(view_id): Path<Uuid>,
    Json(body): Json<MessageBody>,
) -> Result<Json<DialogSnapshot>, ApiError> {
    let view = state.views.get(view_id, &identity).await?;
    Ok(Json(view.send_assistant_message(body.message).await?))
}

pub async fn close_assistant(
    State(state): State<AppState>,
    Caller(identity): Caller,
    Path(view_id): Path<Uuid>,
) -> Result<Json<DialogSnapshot>, ApiError> {
    let view = state.views.get(view_id, &identity).await?;
    Ok(Json(view.close_assistant().await))
}
