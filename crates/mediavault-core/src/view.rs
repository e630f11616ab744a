//! A rendered note instance: gate plus optional negotiation dialog.
//!
//! Everything here is ephemeral. Dropping the view (or opening a new one)
//! loses the session unlock and the transcript, exactly like reloading the
//! page would.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::defaults;
use crate::error::{Error, Result};
use crate::gate::AccessGate;
use crate::models::{ChatTurn, Note, RenderedNote};
use crate::negotiation::{NegotiationSession, NegotiationState, TurnOutcome};
use crate::traits::UnlockAssistant;

/// Serializable state of the assistant dialog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DialogSnapshot {
    pub note_title: String,
    pub greeting: String,
    pub state: NegotiationState,
    pub transcript: Vec<ChatTurn>,
    /// Outcome of the turn that produced this snapshot, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<TurnOutcome>,
}

impl DialogSnapshot {
    fn of(session: &NegotiationSession, outcome: Option<TurnOutcome>) -> Self {
        Self {
            note_title: session.note_title().to_string(),
            greeting: session.greeting(),
            state: session.state(),
            transcript: session.transcript().to_vec(),
            outcome,
        }
    }

    /// Snapshot for a dialog that is not (or no longer) open.
    pub fn closed(note_title: &str) -> Self {
        Self::of(&closed_session(note_title), None)
    }
}

fn closed_session(note_title: &str) -> NegotiationSession {
    let mut session = NegotiationSession::open(note_title);
    session.close();
    session
}

struct Dialog {
    /// Distinguishes this dialog from later ones in the same view.
    epoch: u64,
    session: NegotiationSession,
}

struct ViewState {
    note: Note,
    gate: AccessGate,
    dialog: Option<Dialog>,
    next_epoch: u64,
}

impl ViewState {
    fn render(&self) -> RenderedNote {
        RenderedNote::of(&self.note, self.gate.is_session_unlocked())
    }
}

/// One rendered note, shareable across tasks.
///
/// The lock is never held across the reasoning-service call; the dialog's
/// `AwaitingResponse` state is what keeps a second request out.
#[derive(Clone)]
pub struct NoteView {
    id: Uuid,
    inner: Arc<Mutex<ViewState>>,
    assistant: Arc<dyn UnlockAssistant>,
    unlock_delay: Duration,
}

impl NoteView {
    /// Open a view over `note` with the default unlock delay.
    pub fn new(note: Note, assistant: Arc<dyn UnlockAssistant>) -> Self {
        Self::with_unlock_delay(
            note,
            assistant,
            Duration::from_millis(defaults::UNLOCK_DELAY_MS),
        )
    }

    pub fn with_unlock_delay(
        note: Note,
        assistant: Arc<dyn UnlockAssistant>,
        unlock_delay: Duration,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            inner: Arc::new(Mutex::new(ViewState {
                note,
                gate: AccessGate::new(),
                dialog: None,
                next_epoch: 0,
            })),
            assistant,
            unlock_delay,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub async fn note_id(&self) -> Uuid {
        self.inner.lock().await.note.id
    }

    pub async fn owner(&self) -> String {
        self.inner.lock().await.note.user_id.clone()
    }

    /// Swap in a newer copy of the note, keeping gate and dialog state.
    ///
    /// An open dialog keeps the title it was opened with.
    pub async fn refresh(&self, note: Note) -> Result<()> {
        let mut state = self.inner.lock().await;
        if note.id != state.note.id {
            return Err(Error::InvalidInput(format!(
                "View {} shows note {}, not {}",
                self.id, state.note.id, note.id
            )));
        }
        state.note = note;
        Ok(())
    }

    /// Render according to the gate.
    pub async fn render(&self) -> RenderedNote {
        self.inner.lock().await.render()
    }

    pub async fn is_locked(&self) -> bool {
        let state = self.inner.lock().await;
        state.gate.is_locked(&state.note)
    }

    /// Passkey attempt; returns whether it matched and the new rendering.
    pub async fn attempt_unlock(&self, candidate: &str) -> (bool, RenderedNote) {
        let mut state = self.inner.lock().await;
        let state = &mut *state;
        let matched = state.gate.attempt_unlock(candidate, &state.note);
        (matched, state.render())
    }

    /// Re-engage the gate without touching storage.
    pub async fn relock(&self) -> RenderedNote {
        let mut state = self.inner.lock().await;
        state.gate.relock();
        state.render()
    }

    /// Open the assistant dialog, or return the one already open.
    pub async fn open_assistant(&self) -> DialogSnapshot {
        let mut state = self.inner.lock().await;
        if let Some(dialog) = state.dialog.as_ref() {
            return DialogSnapshot::of(&dialog.session, None);
        }
        let epoch = state.next_epoch;
        state.next_epoch += 1;
        let session = NegotiationSession::open(state.note.title.clone());
        let snapshot = DialogSnapshot::of(&session, None);
        state.dialog = Some(Dialog { epoch, session });
        debug!(
            subsystem = "negotiation",
            view_id = %self.id,
            note_id = %state.note.id,
            "Assistant dialog opened"
        );
        snapshot
    }

    /// Current dialog, or a closed snapshot when none is open.
    pub async fn assistant(&self) -> DialogSnapshot {
        let state = self.inner.lock().await;
        match state.dialog.as_ref() {
            Some(dialog) => DialogSnapshot::of(&dialog.session, None),
            None => DialogSnapshot::closed(&state.note.title),
        }
    }

    /// Dismiss the dialog and discard its transcript.
    ///
    /// A reply still in flight will be dropped when it arrives. An override
    /// that was already granted still opens the gate after the delay.
    pub async fn close_assistant(&self) -> DialogSnapshot {
        let mut state = self.inner.lock().await;
        state.dialog = None;
        DialogSnapshot::closed(&state.note.title)
    }

    /// Run one negotiation turn.
    pub async fn send_assistant_message(
        &self,
        message: impl Into<String>,
    ) -> Result<DialogSnapshot> {
        let (request, epoch) = {
            let mut state = self.inner.lock().await;
            let dialog = state
                .dialog
                .as_mut()
                .ok_or_else(|| Error::NotFound("No assistant dialog is open".to_string()))?;
            (dialog.session.begin_turn(message)?, dialog.epoch)
        };

        let start = Instant::now();
        let result = self.assistant.decide(&request).await;
        debug!(
            subsystem = "negotiation",
            component = self.assistant.name(),
            view_id = %self.id,
            prompt_len = request.user_message.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            success = result.is_ok(),
            "Reasoning service answered"
        );

        let mut state = self.inner.lock().await;
        let note_title = state.note.title.clone();
        let Some(dialog) = state.dialog.as_mut().filter(|d| d.epoch == epoch) else {
            debug!(
                subsystem = "negotiation",
                view_id = %self.id,
                "Dialog closed while awaiting the reply, dropping it"
            );
            return Ok(DialogSnapshot::closed(&note_title));
        };

        let outcome = dialog.session.complete_turn(result);
        let snapshot = DialogSnapshot::of(&dialog.session, Some(outcome));
        drop(state);

        if outcome == TurnOutcome::Unlock {
            self.schedule_unlock(epoch);
        }
        Ok(snapshot)
    }

    fn schedule_unlock(&self, epoch: u64) {
        let inner = Arc::clone(&self.inner);
        let delay = self.unlock_delay;
        let view_id = self.id;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let mut state = inner.lock().await;
            state.gate.unlock_session();
            if state.dialog.as_ref().is_some_and(|d| d.epoch == epoch) {
                if let Some(dialog) = state.dialog.as_mut() {
                    dialog.session.finish_unlock();
                }
                state.dialog = None;
            }
            info!(
                subsystem = "negotiation",
                view_id = %view_id,
                note_id = %state.note.id,
                "Assistant override applied to view"
            );
        });
    }
}
