//! # mediavault-api
//!
//! HTTP surface for MediaVault: the note list and editor, and per-view
//! access gates with the assistant unlock dialog.

pub mod config;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod logging;
pub mod state;

use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    routing::{get, patch, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

pub use config::ServerConfig;
pub use error::ApiError;
pub use state::{AppState, ViewRegistry};

use handlers::{health_check, notes, views};

/// Build the router over `state`, allowing CORS from `allowed_origins`.
pub fn router(state: AppState, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/v1/categories", get(notes::list_categories))
        .route(
            "/api/v1/notes",
            get(notes::list_notes).post(notes::create_note),
        )
        .route(
            "/api/v1/notes/:id",
            patch(notes::update_note).delete(notes::delete_note),
        )
        .route("/api/v1/notes/:id/views", post(views::open_view))
        .route(
            "/api/v1/views/:view_id",
            get(views::get_view).delete(views::close_view),
        )
        .route("/api/v1/views/:view_id/unlock", post(views::unlock_view))
        .route("/api/v1/views/:view_id/relock", post(views::relock_view))
        .route(
            "/api/v1/views/:view_id/assistant",
            get(views::get_assistant)
                .post(views::open_assistant)
                .delete(views::close_assistant),
        )
        .route(
            "/api/v1/views/:view_id/assistant/messages",
            post(views::send_assistant_message),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(allowed_origins))
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(subsystem = "api", origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            HeaderName::from_static(identity::USER_ID_HEADER),
        ])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}
