//! # mediavault-core
//!
//! Core types, traits, and abstractions for MediaVault.
//!
//! This crate provides the note model, the per-view access gate, the unlock
//! negotiation dialog and the editor rules. Persistence and the reasoning
//! service are reached only through the traits in [`traits`].

pub mod defaults;
pub mod editor;
pub mod error;
pub mod events;
pub mod filter;
pub mod gate;
pub mod models;
pub mod negotiation;
pub mod traits;
pub mod view;

// Re-export commonly used types at crate root
pub use editor::{
    delete_detached, save_draft, save_draft_detached, update_detached, update_note,
    validate_draft, validate_note, PendingWrite,
};
pub use error::{Error, Result};
pub use events::EventBus;
pub use filter::NoteFilter;
pub use gate::{effective_lock_state, AccessGate};
pub use models::*;
pub use negotiation::{NegotiationSession, NegotiationState, TurnOutcome};
pub use traits::*;
pub use view::{DialogSnapshot, NoteView};
