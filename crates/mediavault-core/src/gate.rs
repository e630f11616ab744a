//! Access control gate for passkey-protected notes.
//!
//! The gate lives with one rendered view of a note. Unlocking it never
//! touches storage: the stored `is_locked` flag stays set and a fresh view
//! starts locked again.
//!
//! Passkeys are compared verbatim (case-sensitive, no normalization) and
//! failed attempts are neither counted nor throttled.

use tracing::debug;

use crate::models::Note;

/// Whether protected content must be withheld for `note` in a view whose
/// session-unlock flag is `session_unlocked`.
pub fn effective_lock_state(note: &Note, session_unlocked: bool) -> bool {
    note.is_locked && !session_unlocked
}

/// Per-view gate state: the session override and the passkey entry prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessGate {
    session_unlocked: bool,
    /// `Some` while the passkey prompt is open, holding the typed input.
    entry: Option<String>,
}

impl AccessGate {
    /// A fresh gate: not session-unlocked, prompt closed.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_session_unlocked(&self) -> bool {
        self.session_unlocked
    }

    /// Effective lock state of `note` in this view.
    pub fn is_locked(&self, note: &Note) -> bool {
        effective_lock_state(note, self.session_unlocked)
    }

    /// Current passkey input, if the prompt is open.
    pub fn entry(&self) -> Option<&str> {
        self.entry.as_deref()
    }

    /// Open the passkey prompt with empty input.
    pub fn begin_entry(&mut self) {
        self.entry = Some(String::new());
    }

    /// Replace the typed input, opening the prompt if needed.
    pub fn set_entry(&mut self, input: impl Into<String>) {
        self.entry = Some(input.into());
    }

    /// Close the prompt without attempting.
    pub fn cancel_entry(&mut self) {
        self.entry = None;
    }

    /// Attempt an unlock with whatever is typed into the prompt.
    pub fn submit_entry(&mut self, note: &Note) -> bool {
        let candidate = self.entry.clone().unwrap_or_default();
        self.attempt_unlock(&candidate, note)
    }

    /// Compare `candidate` with the stored passkey by exact equality.
    ///
    /// On success the view is session-unlocked and the prompt closes. On
    /// failure any typed input is cleared; nothing else changes. A locked
    /// note without a passkey never matches; the editor refuses to store
    /// such a note in the first place.
    pub fn attempt_unlock(&mut self, candidate: &str, note: &Note) -> bool {
        let matched = note.passkey.as_deref() == Some(candidate);
        debug!(
            subsystem = "gate",
            note_id = %note.id,
            success = matched,
            "Passkey attempt"
        );
        if matched {
            self.session_unlocked = true;
            self.entry = None;
        } else if let Some(entry) = self.entry.as_mut() {
            entry.clear();
        }
        matched
    }

    /// Session override granted by the negotiation flow.
    pub fn unlock_session(&mut self) {
        self.session_unlocked = true;
        self.entry = None;
    }

    /// Re-engage the gate for this view.
    pub fn relock(&mut self) {
        self.session_unlocked = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MediaType;
    use chrono::Utc;
    use uuid::Uuid;

    fn note(is_locked: bool, passkey: Option<&str>) -> Note {
        let now = Utc::now();
        Note {
            id: Uuid::now_v7(),
            user_id: "alice".to_string(),
            title: "Diary".to_string(),
            content: "secret".to_string(),
            media_type: MediaType::Text,
            media_url: None,
            category: "Notes".to_string(),
            is_locked,
            passkey: passkey.map(str::to_string),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_unlocked_note_is_never_gated() {
        let n = note(false, None);
        assert!(!effective_lock_state(&n, false));
        assert!(!effective_lock_state(&n, true));
    }

    #[test]
    fn test_locked_note_is_gated_without_session_unlock() {
        let n = note(true, Some("abc"));
        assert!(effective_lock_state(&n, false));
        assert!(!effective_lock_state(&n, true));
    }

    #[test]
    fn test_attempt_unlock_exact_match_only() {
        let n = note(true, Some("abc"));

        let mut gate = AccessGate::new();
        assert!(!gate.attempt_unlock("ABC", &n));
        assert!(!gate.attempt_unlock("", &n));
        assert!(!gate.attempt_unlock("abc ", &n));
        assert!(gate.is_locked(&n));

        assert!(gate.attempt_unlock("abc", &n));
        assert!(!gate.is_locked(&n));
    }

    #[test]
    fn test_relock_restores_gate() {
        let n = note(true, Some("abc"));
        let mut gate = AccessGate::new();
        assert!(gate.attempt_unlock("abc", &n));
        assert!(!gate.is_locked(&n));

        gate.relock();
        assert!(gate.is_locked(&n));
        // stored flag untouched
        assert!(n.is_locked);
    }

    #[test]
    fn test_failed_attempt_clears_input_and_keeps_prompt_open() {
        let n = note(true, Some("abc"));
        let mut gate = AccessGate::new();
        gate.begin_entry();
        gate.set_entry("wrong");

        assert!(!gate.submit_entry(&n));
        assert_eq!(gate.entry(), Some(""));
        assert!(!gate.is_session_unlocked());
    }

    #[test]
    fn test_successful_entry_closes_prompt() {
        let n = note(true, Some("abc"));
        let mut gate = AccessGate::new();
        gate.set_entry("abc");

        assert!(gate.submit_entry(&n));
        assert_eq!(gate.entry(), None);
        assert!(gate.is_session_unlocked());
    }

    #[test]
    fn test_repeated_failures_are_not_limited() {
        let n = note(true, Some("abc"));
        let mut gate = AccessGate::new();
        for _ in 0..100 {
            assert!(!gate.attempt_unlock("nope", &n));
        }
        assert!(gate.attempt_unlock("abc", &n));
    }

    #[test]
    fn test_inconsistent_note_uses_strict_equality() {
        let missing = note(true, None);
        let mut gate = AccessGate::new();
        assert!(!gate.attempt_unlock("", &missing));

        let empty = note(true, Some(""));
        assert!(gate.attempt_unlock("", &empty));
    }

    #[test]
    fn test_cancel_entry_closes_prompt() {
        let mut gate = AccessGate::new();
        gate.begin_entry();
        assert_eq!(gate.entry(), Some(""));
        gate.cancel_entry();
        assert_eq!(gate.entry(), None);
    }

    #[test]
    fn test_unlock_session_override() {
        let n = note(true, Some("abc"));
        let mut gate = AccessGate::new();
        gate.unlock_session();
        assert!(!gate.is_locked(&n));
    }
}
