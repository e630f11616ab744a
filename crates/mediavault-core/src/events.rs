//! Event bus for live note queries.
//!
//! Repositories emit a [`NoteEvent`] after every successful write. Consumers
//! (dashboards on other devices, tests) subscribe independently and filter by
//! owner, which gives the continuously updated per-user view of a collection.

use tokio::sync::broadcast;

use crate::models::NoteEvent;

/// Broadcast-based event bus.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<NoteEvent>,
}

impl EventBus {
    /// Create a new event bus with the given buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Emit an event to all subscribers. Dropped silently when nobody listens.
    pub fn emit(&self, event: NoteEvent) {
        tracing::debug!(
            subsystem = "db",
            note_id = %event.note_id(),
            subscriber_count = self.tx.receiver_count(),
            "EventBus emit"
        );
        let _ = self.tx.send(event);
    }

    /// Subscribe to receive events. Each subscriber gets its own stream.
    pub fn subscribe(&self) -> broadcast::Receiver<NoteEvent> {
        self.tx.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(crate::defaults::EVENT_BUS_CAPACITY)
    }
}
