//! Unlock negotiation dialog.
//!
//! A chat-style exchange with the reasoning service that may grant a
//! passkey-less override for one view. The session only ever knows the note
//! title; each request carries the title and the latest user message.
//!
//! ```text
//! Idle ──begin_turn──▶ AwaitingResponse ──complete_turn──▶ Idle
//!                                       └─(should_unlock)─▶ Unlocking ──finish_unlock──▶ Closed
//! ```
//!
//! Service failures never escape: they become [`defaults::ASSISTANT_FALLBACK`]
//! in the transcript and the dialog stays usable.

use serde::Serialize;
use tracing::{debug, warn};

use crate::defaults;
use crate::error::{Error, Result};
use crate::models::{ChatTurn, UnlockDecision, UnlockRequest};
use crate::traits::UnlockAssistant;

/// Dialog state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NegotiationState {
    /// Waiting for the user; input enabled.
    Idle,
    /// One request in flight; input disabled.
    AwaitingResponse,
    /// Override granted; the gate opens after the unlock delay.
    Unlocking,
    /// Dialog dismissed; the transcript is discarded with the session.
    Closed,
}

/// Result of completing a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnOutcome {
    /// Conversation continues.
    Continue,
    /// The service failed; the fallback turn was appended.
    Failed,
    /// The override was granted.
    Unlock,
}

/// One open negotiation dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NegotiationSession {
    note_title: String,
    transcript: Vec<ChatTurn>,
    state: NegotiationState,
}

impl NegotiationSession {
    /// Open a dialog bound to `note_title`.
    pub fn open(note_title: impl Into<String>) -> Self {
        Self {
            note_title: note_title.into(),
            transcript: Vec::new(),
            state: NegotiationState::Idle,
        }
    }

    pub fn note_title(&self) -> &str {
        &self.note_title
    }

    pub fn transcript(&self) -> &[ChatTurn] {
        &self.transcript
    }

    pub fn state(&self) -> NegotiationState {
        self.state
    }

    /// Whether new input is accepted.
    pub fn accepts_input(&self) -> bool {
        self.state == NegotiationState::Idle
    }

    /// Introductory text shown before the first turn. Not part of the
    /// transcript and never sent to the service.
    pub fn greeting(&self) -> String {
        format!(
            "Hi! I'm the Vault Assistant. I noticed you're trying to access \"{}\" but forgot \
             your passkey. Tell me why you need access or what you remember about this note.",
            self.note_title
        )
    }

    /// Append the user's message and produce the request for the service.
    ///
    /// Rejects whitespace-only messages and any submit while not idle; the
    /// transcript is left untouched in both cases.
    pub fn begin_turn(&mut self, message: impl Into<String>) -> Result<UnlockRequest> {
        let message = message.into();
        match self.state {
            NegotiationState::Idle => {}
            NegotiationState::AwaitingResponse => {
                return Err(Error::Conflict(
                    "The assistant is still replying to the previous message".to_string(),
                ))
            }
            NegotiationState::Unlocking | NegotiationState::Closed => {
                return Err(Error::Conflict(
                    "The assistant dialog is no longer accepting messages".to_string(),
                ))
            }
        }
        if message.trim().is_empty() {
            return Err(Error::InvalidInput("Message is empty".to_string()));
        }

        self.transcript.push(ChatTurn::user(message.clone()));
        self.state = NegotiationState::AwaitingResponse;
        Ok(UnlockRequest {
            note_title: self.note_title.clone(),
            user_message: message,
        })
    }

    /// Record the service's answer (or failure) for the pending turn.
    ///
    /// Calling this outside `AwaitingResponse` is a no-op returning
    /// [`TurnOutcome::Continue`]; late answers for a dismissed dialog land
    /// here and are dropped.
    pub fn complete_turn(&mut self, result: Result<UnlockDecision>) -> TurnOutcome {
        if self.state != NegotiationState::AwaitingResponse {
            debug!(
                subsystem = "negotiation",
                state = ?self.state,
                "Dropping response for a turn that is no longer pending"
            );
            return TurnOutcome::Continue;
        }

        match result {
            Ok(decision) => {
                self.transcript.push(ChatTurn::assistant(decision.reply));
                if decision.should_unlock {
                    self.transcript
                        .push(ChatTurn::assistant(defaults::UNLOCK_CONFIRMATION));
                    self.state = NegotiationState::Unlocking;
                    TurnOutcome::Unlock
                } else {
                    self.state = NegotiationState::Idle;
                    TurnOutcome::Continue
                }
            }
            Err(e) => {
                warn!(
                    subsystem = "negotiation",
                    error = %e,
                    "Reasoning service failed, falling back to conversational message"
                );
                self.transcript
                    .push(ChatTurn::assistant(defaults::ASSISTANT_FALLBACK));
                self.state = NegotiationState::Idle;
                TurnOutcome::Failed
            }
        }
    }

    /// Leave `Unlocking` once the gate has been opened.
    pub fn finish_unlock(&mut self) {
        if self.state == NegotiationState::Unlocking {
            self.state = NegotiationState::Closed;
        }
    }

    /// Dismiss the dialog from any state.
    pub fn close(&mut self) {
        self.state = NegotiationState::Closed;
    }

    /// Run one full turn against `assistant` for a session owned by a single
    /// caller. Shared sessions go through [`crate::view::NoteView`], which
    /// does not hold its lock across the call.
    pub async fn exchange(
        &mut self,
        assistant: &dyn UnlockAssistant,
        message: impl Into<String>,
    ) -> Result<TurnOutcome> {
        let request = self.begin_turn(message)?;
        let result = assistant.decide(&request).await;
        Ok(self.complete_turn(result))
    }
}
