//! End-to-end tests over the router with the in-memory store and a mock
//! reasoning backend.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use mediavault_api::{router, AppState};
use mediavault_db::MemoryNoteRepository;
use mediavault_inference::{LlmUnlockAssistant, MockGenerationBackend};

const UNLOCK_DELAY: Duration = Duration::from_millis(200);

fn app_with(backend: MockGenerationBackend) -> Router {
    let state = AppState::new(
        Arc::new(MemoryNoteRepository::new()),
        Arc::new(LlmUnlockAssistant::new(backend)),
        UNLOCK_DELAY,
    );
    router(state, &["http://localhost:3000".to_string()])
}

fn app() -> Router {
    app_with(MockGenerationBackend::new())
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    user: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-user-id", user);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn create_locked(app: &Router, user: &str, title: &str) -> String {
    let (status, note) = send(
        app,
        "POST",
        "/api/v1/notes",
        user,
        Some(json!({
            "title": title,
            "content": "the combination is 12-34-56",
            "is_locked": true,
            "passkey": "hunter2",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(note.get("passkey").is_none());
    note["id"].as_str().unwrap().to_string()
}

async fn open_view(app: &Router, user: &str, note_id: &str) -> String {
    let (status, body) = send(app, "POST", &format!("/api/v1/notes/{}/views", note_id), user, None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["note"]["state"], "locked");
    body["view_id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health() {
    let (status, body) = send(&app(), "GET", "/health", "alice", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_categories_start_with_all_notes() {
    let (status, body) = send(&app(), "GET", "/api/v1/categories", "alice", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["name"], "Notes");
    assert_eq!(body.as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn test_locked_draft_without_passkey_is_rejected() {
    let (status, body) = send(
        &app(),
        "POST",
        "/api/v1/notes",
        "alice",
        Some(json!({"title": "Secret", "is_locked": true})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Passkey required"));
}

#[tokio::test]
async fn test_list_hides_locked_content_and_filters() {
    let app = app();
    create_locked(&app, "alice", "Bank codes").await;
    send(
        &app,
        "POST",
        "/api/v1/notes",
        "alice",
        Some(json!({"title": "Groceries", "content": "milk", "active_category": "Reminders"})),
    )
    .await;

    let (_, all) = send(&app, "GET", "/api/v1/notes", "alice", None).await;
    let all = all.as_array().unwrap();
    assert_eq!(all.len(), 2);
    let locked = all.iter().find(|n| n["title"] == "Bank codes").unwrap();
    assert_eq!(locked["state"], "locked");
    assert!(locked.get("content").is_none());

    let (_, reminders) = send(&app, "GET", "/api/v1/notes?category=Reminders", "alice", None).await;
    assert_eq!(reminders.as_array().unwrap().len(), 1);
    assert_eq!(reminders[0]["content"], "milk");

    let (_, found) = send(&app, "GET", "/api/v1/notes?q=BANK", "alice", None).await;
    assert_eq!(found.as_array().unwrap().len(), 1);

    let (_, other) = send(&app, "GET", "/api/v1/notes", "bob", None).await;
    assert!(other.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_passkey_unlock_and_relock() {
    let app = app();
    let note_id = create_locked(&app, "alice", "Bank codes").await;
    let view_id = open_view(&app, "alice", &note_id).await;
    let unlock_uri = format!("/api/v1/views/{}/unlock", view_id);

    let (status, body) = send(&app, "POST", &unlock_uri, "alice", Some(json!({"passkey": "Hunter2"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["unlocked"], false);
    assert_eq!(body["note"]["state"], "locked");

    let (_, body) = send(&app, "POST", &unlock_uri, "alice", Some(json!({"passkey": "hunter2"}))).await;
    assert_eq!(body["unlocked"], true);
    assert_eq!(body["note"]["state"], "open");
    assert_eq!(body["note"]["temporarily_unlocked"], true);
    assert_eq!(body["note"]["content"], "the combination is 12-34-56");

    let (_, body) = send(&app, "POST", &format!("/api/v1/views/{}/relock", view_id), "alice", None).await;
    assert_eq!(body["state"], "locked");

    // A second view starts locked regardless of the first.
    let other_view = open_view(&app, "alice", &note_id).await;
    assert_ne!(other_view, view_id);
}

#[tokio::test]
async fn test_views_are_private_to_their_owner() {
    let app = app();
    let note_id = create_locked(&app, "alice", "Diary").await;

    let (status, _) = send(&app, "POST", &format!("/api/v1/notes/{}/views", note_id), "bob", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let view_id = open_view(&app, "alice", &note_id).await;
    let (status, body) = send(&app, "GET", &format!("/api/v1/views/{}", view_id), "bob", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_assistant_override_unlocks_after_delay() {
    let backend = MockGenerationBackend::new()
        .then_respond(r#"{"reply":"Why do you need it?","shouldUnlock":false}"#)
        .then_respond(r#"{"reply":"That checks out.","shouldUnlock":true}"#);
    let app = app_with(backend.clone());
    let note_id = create_locked(&app, "alice", "Diary").await;
    let view_id = open_view(&app, "alice", &note_id).await;
    let assistant_uri = format!("/api/v1/views/{}/assistant", view_id);
    let messages_uri = format!("{}/messages", assistant_uri);

    let (status, dialog) = send(&app, "POST", &assistant_uri, "alice", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dialog["state"], "idle");
    assert!(dialog["greeting"].as_str().unwrap().contains("Diary"));
    assert!(dialog["transcript"].as_array().unwrap().is_empty());

    let (_, dialog) = send(&app, "POST", &messages_uri, "alice", Some(json!({"message": "It's mine"}))).await;
    assert_eq!(dialog["outcome"], "continue");
    assert_eq!(dialog["state"], "idle");

    let (_, dialog) = send(
        &app,
        "POST",
        &messages_uri,
        "alice",
        Some(json!({"message": "I wrote it on my birthday"})),
    )
    .await;
    assert_eq!(dialog["outcome"], "unlock");
    assert_eq!(dialog["state"], "unlocking");
    let transcript = dialog["transcript"].as_array().unwrap();
    assert_eq!(transcript.len(), 5);
    assert_eq!(transcript[4]["content"], "Identity verified. Unlocking note now...");

    // Only the title and the latest message reach the reasoning service.
    let calls = backend.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].prompt, "I wrote it on my birthday");
    assert!(!calls[1].system.contains("12-34-56"));

    let (_, note) = send(&app, "GET", &format!("/api/v1/views/{}", view_id), "alice", None).await;
    assert_eq!(note["state"], "locked");

    tokio::time::sleep(UNLOCK_DELAY * 4).await;
    let (_, note) = send(&app, "GET", &format!("/api/v1/views/{}", view_id), "alice", None).await;
    assert_eq!(note["state"], "open");
    let (_, dialog) = send(&app, "GET", &assistant_uri, "alice", None).await;
    assert_eq!(dialog["state"], "closed");
}

#[tokio::test]
async fn test_assistant_failure_becomes_fallback_turn() {
    let app = app_with(MockGenerationBackend::new().with_failure("model offline"));
    let note_id = create_locked(&app, "alice", "Diary").await;
    let view_id = open_view(&app, "alice", &note_id).await;
    let assistant_uri = format!("/api/v1/views/{}/assistant", view_id);
    send(&app, "POST", &assistant_uri, "alice", None).await;

    let (status, dialog) = send(
        &app,
        "POST",
        &format!("{}/messages", assistant_uri),
        "alice",
        Some(json!({"message": "please"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dialog["outcome"], "failed");
    assert_eq!(dialog["state"], "idle");
    assert_eq!(
        dialog["transcript"][1]["content"],
        "I'm having trouble processing that right now. Please try again."
    );
}

#[tokio::test]
async fn test_assistant_input_errors() {
    let app = app();
    let note_id = create_locked(&app, "alice", "Diary").await;
    let view_id = open_view(&app, "alice", &note_id).await;
    let assistant_uri = format!("/api/v1/views/{}/assistant", view_id);
    let messages_uri = format!("{}/messages", assistant_uri);

    let (status, _) = send(&app, "POST", &messages_uri, "alice", Some(json!({"message": "hi"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    send(&app, "POST", &assistant_uri, "alice", None).await;
    let (status, _) = send(&app, "POST", &messages_uri, "alice", Some(json!({"message": "   "}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, dialog) = send(&app, "DELETE", &assistant_uri, "alice", None).await;
    assert_eq!(dialog["state"], "closed");
    assert!(dialog["transcript"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_note_changes_reach_open_views() {
    let app = app();
    let note_id = create_locked(&app, "alice", "Diary").await;
    let view_id = open_view(&app, "alice", &note_id).await;
    let view_uri = format!("/api/v1/views/{}", view_id);

    let (status, _) = send(
        &app,
        "PATCH",
        &format!("/api/v1/notes/{}", note_id),
        "alice",
        Some(json!({"title": "Journal", "content": "open now", "is_locked": false})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let mut rendered = Value::Null;
    for _ in 0..50 {
        rendered = send(&app, "GET", &view_uri, "alice", None).await.1;
        if rendered["title"] == "Journal" {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(rendered["state"], "open");
    assert_eq!(rendered["content"], "open now");

    let (status, _) = send(&app, "DELETE", &format!("/api/v1/notes/{}", note_id), "alice", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let mut status = StatusCode::OK;
    for _ in 0..50 {
        status = send(&app, "GET", &view_uri, "alice", None).await.0;
        if status == StatusCode::NOT_FOUND {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_missing_header_uses_guest() {
    let app = app();
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/notes")
                .header("content-type", "application/json")
                .body(Body::from(json!({"title": "Shared"}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let (_, notes) = send(&app, "GET", "/api/v1/notes", "guest", None).await;
    assert_eq!(notes[0]["title"], "Shared");
}

#[tokio::test]
async fn test_partial_patch_keeps_lock_and_untouched_fields() {
    let app = app();
    let (status, created) = send(
        &app,
        "POST",
        "/api/v1/notes",
        "alice",
        Some(json!({
            "title": "Bank",
            "content": "sketch of the safe",
            "is_locked": true,
            "passkey": "k",
            "media_type": "scribble",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let note_uri = format!("/api/v1/notes/{}", created["id"].as_str().unwrap());

    let (status, updated) = send(&app, "PATCH", &note_uri, "alice", Some(json!({"content": "edited"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["is_locked"], true);
    assert_eq!(updated["title"], "Bank");
    assert_eq!(updated["media_type"], "scribble");
    assert_eq!(updated["content"], "edited");

    let (_, notes) = send(&app, "GET", "/api/v1/notes", "alice", None).await;
    assert_eq!(notes[0]["state"], "locked");
    assert!(notes[0].get("content").is_none());

    // Clearing the passkey of a locked note is rejected without a write.
    let (status, body) = send(&app, "PATCH", &note_uri, "alice", Some(json!({"passkey": ""}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Passkey required"));

    let view_id = open_view(&app, "alice", created["id"].as_str().unwrap()).await;
    let (_, unlocked) = send(
        &app,
        "POST",
        &format!("/api/v1/views/{}/unlock", view_id),
        "alice",
        Some(json!({"passkey": "k"})),
    )
    .await;
    assert_eq!(unlocked["unlocked"], true);
}

#[tokio::test]
async fn test_patch_missing_note_is_not_found() {
    let (status, _) = send(
        &app(),
        "PATCH",
        &format!("/api/v1/notes/{}", uuid::Uuid::nil()),
        "alice",
        Some(json!({"content": "x"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_message_while_reply_pending_is_conflict() {
    let backend = MockGenerationBackend::new().with_latency(Duration::from_millis(300));
    let app = app_with(backend.clone());
    let note_id = create_locked(&app, "alice", "Diary").await;
    let view_id = open_view(&app, "alice", &note_id).await;
    let assistant_uri = format!("/api/v1/views/{}/assistant", view_id);
    let messages_uri = format!("{}/messages", assistant_uri);
    send(&app, "POST", &assistant_uri, "alice", None).await;

    let first = tokio::spawn({
        let app = app.clone();
        let uri = messages_uri.clone();
        async move { send(&app, "POST", &uri, "alice", Some(json!({"message": "first"}))).await }
    });
    tokio::time::sleep(Duration::from_millis(100)).await;

    let (status, _) = send(&app, "POST", &messages_uri, "alice", Some(json!({"message": "second"}))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, dialog) = first.await.unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dialog["transcript"].as_array().unwrap().len(), 2);
    assert_eq!(backend.calls().len(), 1);
}
