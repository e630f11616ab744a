//! Centralized default constants for MediaVault.
//!
//! All crates reference these constants instead of defining their own
//! magic strings and numbers.

// =============================================================================
// NOTES
// =============================================================================

/// Title assigned when a draft is saved without one.
pub const UNTITLED_NOTE: &str = "Untitled Note";

/// Catch-all sidebar category; selecting it shows every note.
pub const ALL_NOTES_CATEGORY: &str = "Notes";

/// Sidebar categories offered to every user, in display order.
pub const SIDEBAR_CATEGORIES: [&str; 4] = ["Notes", "Reminders", "Archive", "Trash"];

// =============================================================================
// EDITOR VALIDATION
// =============================================================================

/// Rejection message for a locked draft without a passkey.
pub const PASSKEY_REQUIRED: &str = "Passkey required: Please set a passkey to lock this note.";

/// Rejection message for an image note carrying a non-image payload.
pub const INVALID_IMAGE_TYPE: &str = "Invalid file type: Please select an image file.";

// =============================================================================
// UNLOCK NEGOTIATION
// =============================================================================

/// Assistant turn appended when the reasoning service grants the override.
pub const UNLOCK_CONFIRMATION: &str = "Identity verified. Unlocking note now...";

/// Assistant turn appended when the reasoning service call fails.
pub const ASSISTANT_FALLBACK: &str =
    "I'm having trouble processing that right now. Please try again.";

/// Delay between the override decision and the gate opening (milliseconds).
pub const UNLOCK_DELAY_MS: u64 = 2000;

// =============================================================================
// INFERENCE
// =============================================================================

/// Default Ollama endpoint.
pub const OLLAMA_URL: &str = "http://localhost:11434";

/// Default generation model (Ollama).
pub const GEN_MODEL: &str = "llama3.1:8b";

/// Transport timeout for generation requests (seconds).
pub const GEN_TIMEOUT_SECS: u64 = 120;

// =============================================================================
// SERVER
// =============================================================================

/// Default HTTP server port.
pub const SERVER_PORT: u16 = 3000;

/// Identity used when the upstream auth proxy supplies none.
pub const GUEST_USER_ID: &str = "guest";

/// Views untouched for this long are discarded (seconds).
pub const VIEW_IDLE_TIMEOUT_SECS: u64 = 1800;

/// Capacity of the note event broadcast channel.
pub const EVENT_BUS_CAPACITY: usize = 256;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_notes_category_is_first_sidebar_entry() {
        assert_eq!(SIDEBAR_CATEGORIES[0], ALL_NOTES_CATEGORY);
    }

    #[test]
    fn test_unlock_delay_is_two_seconds() {
        assert_eq!(UNLOCK_DELAY_MS, 2000);
    }
}
