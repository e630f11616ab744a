//! Shared application state and the open-view registry.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

use mediavault_core::{
    defaults, Error, Identity, Note, NoteEvent, NoteRepository, NoteView, Result,
    UnlockAssistant,
};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn NoteRepository>,
    pub assistant: Arc<dyn UnlockAssistant>,
    pub views: Arc<ViewRegistry>,
    pub unlock_delay: Duration,
}

impl AppState {
    /// Build the state with the default view idle timeout.
    /// Must be called inside a Tokio runtime.
    pub fn new(
        repo: Arc<dyn NoteRepository>,
        assistant: Arc<dyn UnlockAssistant>,
        unlock_delay: Duration,
    ) -> Self {
        Self::with_view_idle_timeout(
            repo,
            assistant,
            unlock_delay,
            Duration::from_secs(defaults::VIEW_IDLE_TIMEOUT_SECS),
        )
    }

    /// Build the state, keep open views in sync with the repository and
    /// sweep views idle for longer than `view_idle_timeout`.
    pub fn with_view_idle_timeout(
        repo: Arc<dyn NoteRepository>,
        assistant: Arc<dyn UnlockAssistant>,
        unlock_delay: Duration,
        view_idle_timeout: Duration,
    ) -> Self {
        let views = Arc::new(ViewRegistry::new(view_idle_timeout));
        views.spawn_listener(Arc::clone(&repo));
        views.spawn_sweeper();
        Self {
            repo,
            assistant,
            views,
            unlock_delay,
        }
    }

    /// Open a fresh view over `note` with this server's assistant and delay.
    pub async fn open_view(&self, note: Note) -> NoteView {
        let owner = note.user_id.clone();
        let note_id = note.id;
        let view = NoteView::with_unlock_delay(note, Arc::clone(&self.assistant), self.unlock_delay);
        self.views.insert(view.clone(), owner, note_id).await;
        view
    }
}

struct Entry {
    view: NoteView,
    owner: String,
    note_id: Uuid,
    last_touched: Instant,
}

/// Views currently open, keyed by view id.
///
/// Views hold no storage state of their own; a note update is pushed into
/// every view showing it and a delete discards them. Views nobody has
/// touched within the idle timeout are dropped, along with their dialog.
pub struct ViewRegistry {
    entries: RwLock<HashMap<Uuid, Entry>>,
    idle_timeout: Duration,
}

impl Default for ViewRegistry {
    fn default() -> Self {
        Self::new(Duration::from_secs(defaults::VIEW_IDLE_TIMEOUT_SECS))
    }
}

impl ViewRegistry {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            idle_timeout,
        }
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    /// Register `view`, which shows note `note_id` owned by `owner`.
    pub async fn insert(&self, view: NoteView, owner: String, note_id: Uuid) {
        self.entries.write().await.insert(
            view.id(),
            Entry {
                view,
                owner,
                note_id,
                last_touched: Instant::now(),
            },
        );
    }

    /// Look up a view owned by `identity` and mark it as used. Views of
    /// other owners are reported as missing.
    pub async fn get(&self, view_id: Uuid, identity: &Identity) -> Result<NoteView> {
        let mut entries = self.entries.write().await;
        match entries.get_mut(&view_id) {
            Some(entry) if entry.owner == identity.user_id => {
                entry.last_touched = Instant::now();
                Ok(entry.view.clone())
            }
            _ => Err(view_not_found(view_id)),
        }
    }

    /// Discard a view owned by `identity`.
    pub async fn remove(&self, view_id: Uuid, identity: &Identity) -> Result<()> {
        let mut entries = self.entries.write().await;
        match entries.get(&view_id) {
            Some(entry) if entry.owner == identity.user_id => {
                entries.remove(&view_id);
                Ok(())
            }
            _ => Err(view_not_found(view_id)),
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Drop every view idle for longer than the timeout; returns how many.
    pub async fn evict_idle(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| now.duration_since(entry.last_touched) <= self.idle_timeout);
        let evicted = before - entries.len();
        if evicted > 0 {
            debug!(
                subsystem = "api",
                component = "views",
                evicted,
                remaining = entries.len(),
                "Evicted idle views"
            );
        }
        evicted
    }

    async fn views_of(&self, note_id: Uuid) -> Vec<NoteView> {
        self.entries
            .read()
            .await
            .values()
            .filter(|entry| entry.note_id == note_id)
            .map(|entry| entry.view.clone())
            .collect()
    }

    /// Apply one repository change to the open views.
    pub async fn apply_event(&self, event: &NoteEvent, repo: &dyn NoteRepository) -> Result<()> {
        match event {
            NoteEvent::Created { .. } => Ok(()),
            NoteEvent::Updated { user_id, note_id } => {
                let views = self.views_of(*note_id).await;
                if views.is_empty() {
                    return Ok(());
                }
                let note = repo.fetch(user_id, *note_id).await?;
                for view in &views {
                    view.refresh(note.clone()).await?;
                }
                debug!(
                    subsystem = "api",
                    component = "views",
                    note_id = %note_id,
                    views = views.len(),
                    "Refreshed open views"
                );
                Ok(())
            }
            NoteEvent::Deleted { note_id, .. } => {
                let mut entries = self.entries.write().await;
                let before = entries.len();
                entries.retain(|_, entry| entry.note_id != *note_id);
                let discarded = before - entries.len();
                if discarded > 0 {
                    debug!(
                        subsystem = "api",
                        component = "views",
                        note_id = %note_id,
                        views = discarded,
                        "Discarded views of deleted note"
                    );
                }
                Ok(())
            }
        }
    }

    /// Follow the repository's change feed until it closes.
    pub fn spawn_listener(self: &Arc<Self>, repo: Arc<dyn NoteRepository>) -> JoinHandle<()> {
        let registry = Arc::clone(self);
        let mut rx = repo.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => {
                        if let Err(e) = registry.apply_event(&event, repo.as_ref()).await {
                            warn!(
                                subsystem = "api",
                                component = "views",
                                note_id = %event.note_id(),
                                error = %e,
                                "Failed to sync views with note change"
                            );
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(
                            subsystem = "api",
                            component = "views",
                            skipped,
                            "View sync lagged behind note changes"
                        );
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    /// Periodically evict idle views. Stops once the registry is only
    /// referenced by the sweeper itself.
    pub fn spawn_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let registry = Arc::downgrade(self);
        let period = (self.idle_timeout / 4).max(Duration::from_secs(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                let Some(registry) = registry.upgrade() else {
                    break;
                };
                registry.evict_idle().await;
            }
        })
    }
}

fn view_not_found(view_id: Uuid) -> Error {
    Error::NotFound(format!("View {} not found", view_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediavault_core::{NewNote, NotePatch};
    use mediavault_db::memory::MemoryNoteRepository;
    use mediavault_inference::{LlmUnlockAssistant, MockGenerationBackend};

    fn assistant() -> Arc<dyn UnlockAssistant> {
        Arc::new(LlmUnlockAssistant::new(MockGenerationBackend::new()))
    }

    fn locked(title: &str) -> NewNote {
        NewNote {
            title: title.to_string(),
            content: "secret".to_string(),
            media_type: Default::default(),
            media_url: None,
            category: "Notes".to_string(),
            is_locked: true,
            passkey: Some("1234".to_string()),
        }
    }

    async fn register(registry: &ViewRegistry, note: &Note) -> NoteView {
        let view = NoteView::new(note.clone(), assistant());
        registry
            .insert(view.clone(), note.user_id.clone(), note.id)
            .await;
        view
    }

    #[tokio::test]
    async fn test_get_hides_views_of_other_owners() {
        let repo = MemoryNoteRepository::new();
        let note = repo.insert("alice", locked("Diary")).await.unwrap();
        let registry = ViewRegistry::default();
        let view = register(&registry, &note).await;

        assert!(registry.get(view.id(), &Identity::user("alice")).await.is_ok());
        let err = registry
            .get(view.id(), &Identity::user("bob"))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, Error::NotFound(_)));
        assert!(registry.remove(view.id(), &Identity::user("bob")).await.is_err());
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_update_event_refreshes_and_keeps_unlock() {
        let repo = MemoryNoteRepository::new();
        let note = repo.insert("alice", locked("Diary")).await.unwrap();
        let registry = ViewRegistry::default();
        let view = register(&registry, &note).await;
        assert!(view.attempt_unlock("1234").await.0);

        repo.update(
            "alice",
            note.id,
            NotePatch {
                title: Some("Journal".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        registry
            .apply_event(
                &NoteEvent::Updated {
                    user_id: "alice".to_string(),
                    note_id: note.id,
                },
                &repo,
            )
            .await
            .unwrap();

        match view.render().await {
            mediavault_core::RenderedNote::Open { note, .. } => assert_eq!(note.title, "Journal"),
            other => panic!("expected open rendering, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_delete_event_discards_views() {
        let repo = MemoryNoteRepository::new();
        let note = repo.insert("alice", locked("Diary")).await.unwrap();
        let other = repo.insert("alice", locked("Other")).await.unwrap();
        let registry = ViewRegistry::default();
        register(&registry, &note).await;
        register(&registry, &note).await;
        register(&registry, &other).await;

        registry
            .apply_event(
                &NoteEvent::Deleted {
                    user_id: "alice".to_string(),
                    note_id: note.id,
                },
                &repo,
            )
            .await
            .unwrap();
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_views_are_evicted_and_touched_views_kept() {
        let repo = MemoryNoteRepository::new();
        let note = repo.insert("alice", locked("Diary")).await.unwrap();
        let registry = ViewRegistry::new(Duration::from_secs(60));
        let alice = Identity::user("alice");
        let abandoned = register(&registry, &note).await;
        let active = register(&registry, &note).await;

        tokio::time::advance(Duration::from_secs(45)).await;
        registry.get(active.id(), &alice).await.unwrap();
        tokio::time::advance(Duration::from_secs(30)).await;

        assert_eq!(registry.evict_idle().await, 1);
        assert!(registry.get(abandoned.id(), &alice).await.is_err());
        assert!(registry.get(active.id(), &alice).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_evicts_in_background() {
        let repo = MemoryNoteRepository::new();
        let note = repo.insert("alice", locked("Diary")).await.unwrap();
        let registry = Arc::new(ViewRegistry::new(Duration::from_secs(60)));
        register(&registry, &note).await;
        registry.spawn_sweeper();

        tokio::time::sleep(Duration::from_secs(200)).await;
        assert!(registry.is_empty().await);
    }
}
