//! Dashboard filtering by search text and sidebar category.

use serde::Deserialize;

use crate::defaults;
use crate::models::Note;

/// Search text plus active category.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NoteFilter {
    /// Case-insensitive substring matched against title and content.
    #[serde(default, rename = "q")]
    pub query: Option<String>,
    /// Active sidebar category; `Notes` (or none) shows everything.
    #[serde(default)]
    pub category: Option<String>,
}

impl NoteFilter {
    pub fn new(query: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
            category: Some(category.into()),
        }
    }

    pub fn matches(&self, note: &Note) -> bool {
        self.matches_query(note) && self.matches_category(note)
    }

    fn matches_query(&self, note: &Note) -> bool {
        match self.query.as_deref() {
            None | Some("") => true,
            Some(q) => {
                let q = q.to_lowercase();
                note.title.to_lowercase().contains(&q) || note.content.to_lowercase().contains(&q)
            }
        }
    }

    fn matches_category(&self, note: &Note) -> bool {
        match self.category.as_deref() {
            None => true,
            Some(c) => c == defaults::ALL_NOTES_CATEGORY || note.category == c,
        }
    }

    /// Keep matching notes, preserving order.
    pub fn apply(&self, notes: Vec<Note>) -> Vec<Note> {
        notes.into_iter().filter(|n| self.matches(n)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MediaType;
    use chrono::Utc;
    use uuid::Uuid;

    fn note(title: &str, content: &str, category: &str) -> Note {
        let now = Utc::now();
        Note {
            id: Uuid::now_v7(),
            user_id: "alice".to_string(),
            title: title.to_string(),
            content: content.to_string(),
            media_type: MediaType::Text,
            media_url: None,
            category: category.to_string(),
            is_locked: false,
            passkey: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_query_matches_title_or_content_case_insensitively() {
        let filter = NoteFilter::new("MILK", "Notes");
        assert!(filter.matches(&note("Groceries", "buy milk", "Notes")));
        assert!(filter.matches(&note("Milkshake recipe", "", "Reminders")));
        assert!(!filter.matches(&note("Groceries", "eggs", "Notes")));
    }

    #[test]
    fn test_notes_category_shows_everything() {
        let filter = NoteFilter::new("", "Notes");
        assert!(filter.matches(&note("a", "", "Archive")));
        assert!(filter.matches(&note("b", "", "Trash")));
    }

    #[test]
    fn test_other_category_is_exact() {
        let filter = NoteFilter::new("", "Archive");
        assert!(filter.matches(&note("a", "", "Archive")));
        assert!(!filter.matches(&note("b", "", "archive")));
        assert!(!filter.matches(&note("c", "", "Notes")));
    }

    #[test]
    fn test_default_filter_keeps_all() {
        let notes = vec![note("a", "", "Trash"), note("b", "", "Reminders")];
        assert_eq!(NoteFilter::default().apply(notes).len(), 2);
    }
}
