//! Core data models for MediaVault.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::defaults;

// =============================================================================
// NOTE TYPES
// =============================================================================

/// Kind of media a note carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    #[default]
    Text,
    Image,
    Voice,
    Scribble,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Text => "text",
            MediaType::Image => "image",
            MediaType::Voice => "voice",
            MediaType::Scribble => "scribble",
        }
    }
}

impl std::str::FromStr for MediaType {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(MediaType::Text),
            "image" => Ok(MediaType::Image),
            "voice" => Ok(MediaType::Voice),
            "scribble" => Ok(MediaType::Scribble),
            other => Err(crate::Error::InvalidInput(format!(
                "Unknown media type: {}",
                other
            ))),
        }
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored note, owned by exactly one identity.
///
/// `passkey` is kept in plaintext next to the note and compared verbatim by
/// the access gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: Uuid,
    pub user_id: String,
    pub title: String,
    pub content: String,
    pub media_type: MediaType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
    pub category: String,
    pub is_locked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passkey: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fully resolved request for creating a note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNote {
    pub title: String,
    pub content: String,
    pub media_type: MediaType,
    pub media_url: Option<String>,
    pub category: String,
    pub is_locked: bool,
    pub passkey: Option<String>,
}

/// Partial update; `None` fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<MediaType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_locked: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passkey: Option<String>,
}

impl NotePatch {
    /// Merge this patch into `note`, stamping `updated_at`.
    pub fn apply(self, note: &mut Note, now: DateTime<Utc>) {
        if let Some(title) = self.title {
            note.title = title;
        }
        if let Some(content) = self.content {
            note.content = content;
        }
        if let Some(media_type) = self.media_type {
            note.media_type = media_type;
        }
        if let Some(media_url) = self.media_url {
            note.media_url = Some(media_url);
        }
        if let Some(category) = self.category {
            note.category = category;
        }
        if let Some(is_locked) = self.is_locked {
            note.is_locked = is_locked;
        }
        if let Some(passkey) = self.passkey {
            note.passkey = Some(passkey);
        }
        note.updated_at = now;
    }
}

/// Editor input before validation. No `id` means create.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteDraft {
    #[serde(default)]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub media_type: MediaType,
    #[serde(default)]
    pub media_url: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub is_locked: bool,
    #[serde(default)]
    pub passkey: Option<String>,
}

impl NoteDraft {
    /// Title to persist: blank titles become [`defaults::UNTITLED_NOTE`].
    pub fn resolved_title(&self) -> String {
        if self.title.trim().is_empty() {
            defaults::UNTITLED_NOTE.to_string()
        } else {
            self.title.clone()
        }
    }

    /// Resolve into a create request, filing it under `active_category`
    /// unless the draft names its own.
    pub fn into_new_note(self, active_category: &str) -> NewNote {
        let title = self.resolved_title();
        NewNote {
            title,
            content: self.content,
            media_type: self.media_type,
            media_url: self.media_url.filter(|u| !u.is_empty()),
            category: self
                .category
                .unwrap_or_else(|| active_category.to_string()),
            is_locked: self.is_locked,
            passkey: self.passkey,
        }
    }

    /// Resolve into a partial update for an existing note.
    pub fn into_patch(self) -> NotePatch {
        let title = self.resolved_title();
        NotePatch {
            title: Some(title),
            content: Some(self.content),
            media_type: Some(self.media_type),
            media_url: self.media_url,
            category: self.category,
            is_locked: Some(self.is_locked),
            passkey: self.passkey,
        }
    }
}

/// What a view exposes for a note, depending on the gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RenderedNote {
    /// Gate open: full content, passkey withheld.
    Open {
        #[serde(flatten)]
        note: NoteContent,
        /// Stored lock flag is set but this view is temporarily unlocked.
        temporarily_unlocked: bool,
    },
    /// Gate closed: only the title and metadata are shown.
    Locked {
        id: Uuid,
        title: String,
        category: String,
        is_locked: bool,
        updated_at: DateTime<Utc>,
    },
}

/// Note fields safe to render once the gate is open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoteContent {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub media_type: MediaType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
    pub category: String,
    pub is_locked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Note> for NoteContent {
    fn from(note: &Note) -> Self {
        Self {
            id: note.id,
            title: note.title.clone(),
            content: note.content.clone(),
            media_type: note.media_type,
            media_url: note.media_url.clone(),
            category: note.category.clone(),
            is_locked: note.is_locked,
            created_at: note.created_at,
            updated_at: note.updated_at,
        }
    }
}

impl RenderedNote {
    /// Render `note` for a view whose session unlock flag is `session_unlocked`.
    pub fn of(note: &Note, session_unlocked: bool) -> Self {
        if crate::gate::effective_lock_state(note, session_unlocked) {
            RenderedNote::Locked {
                id: note.id,
                title: note.title.clone(),
                category: note.category.clone(),
                is_locked: true,
                updated_at: note.updated_at,
            }
        } else {
            RenderedNote::Open {
                note: NoteContent::from(note),
                temporarily_unlocked: note.is_locked && session_unlocked,
            }
        }
    }

    pub fn is_locked(&self) -> bool {
        matches!(self, RenderedNote::Locked { .. })
    }
}

// =============================================================================
// CATEGORIES & IDENTITY
// =============================================================================

/// Sidebar category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// The sidebar categories every user starts with.
pub fn default_categories() -> Vec<Category> {
    let icons = ["lightbulb", "bell", "archive", "trash"];
    defaults::SIDEBAR_CATEGORIES
        .iter()
        .zip(icons)
        .map(|(name, icon)| Category {
            id: name.to_lowercase(),
            name: name.to_string(),
            icon: Some(icon.to_string()),
        })
        .collect()
}

/// Identity supplied by the upstream authentication collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: String,
    pub guest: bool,
}

impl Identity {
    pub fn user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            guest: false,
        }
    }

    pub fn guest() -> Self {
        Self {
            user_id: defaults::GUEST_USER_ID.to_string(),
            guest: true,
        }
    }
}

// =============================================================================
// NEGOTIATION TYPES
// =============================================================================

/// Speaker of a transcript turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One turn of a negotiation transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Turn-scoped request to the reasoning service. Only the title is fixed
/// context; earlier turns are never resent and the note body never leaves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockRequest {
    pub note_title: String,
    pub user_message: String,
}

/// Structured reasoning-service response. Both fields are mandatory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockDecision {
    pub reply: String,
    pub should_unlock: bool,
}

// =============================================================================
// EVENTS
// =============================================================================

/// Change notification published after a successful repository write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NoteEvent {
    Created { user_id: String, note_id: Uuid },
    Updated { user_id: String, note_id: Uuid },
    Deleted { user_id: String, note_id: Uuid },
}

impl NoteEvent {
    pub fn user_id(&self) -> &str {
        match self {
            NoteEvent::Created { user_id, .. }
            | NoteEvent::Updated { user_id, .. }
            | NoteEvent::Deleted { user_id, .. } => user_id,
        }
    }

    pub fn note_id(&self) -> Uuid {
        match self {
            NoteEvent::Created { note_id, .. }
            | NoteEvent::Updated { note_id, .. }
            | NoteEvent::Deleted { note_id, .. } => *note_id,
        }
    }
}
