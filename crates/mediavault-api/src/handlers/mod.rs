//! HTTP request handlers.

pub mod notes;
pub mod views;

use axum::Json;
use serde_json::{json, Value};

/// Liveness check with the crate version.
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
