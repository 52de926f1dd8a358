//! Dashboard session: the single owner of the content store.
//!
//! Background work (fetches, searches) runs in spawned tokio tasks that never
//! touch the store. Each task reports back through a [`DashboardEvent`] on a
//! bounded channel, and [`Dashboard::handle_event`] applies it. Completions are
//! therefore applied one at a time, in arrival order, by one writer.
//!
//! ```text
//! load() ──spawn──▶ provider.fetch ──FetchCompleted──▶ handle_event ──▶ store
//! search() ─spawn─▶ search::run ────SearchCompleted──▶ handle_event ──▶ store
//! ```

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::mpsc;

use crate::content::ContentItem;
use crate::fetch::{ContentProvider, ContentSource, FetchError, FetchRequest};
use crate::preferences::Preferences;
use crate::search::{self, SearchOutcome, DEFAULT_SEARCH_LATENCY};
use crate::store::{ContentStore, StoreError};

/// Capacity of the completion channel.
const EVENT_CHANNEL_CAPACITY: usize = 32;

// ============================================================================
// Events
// ============================================================================

/// Which background task an event came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    Fetch(ContentSource),
    Search { generation: u64 },
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fetch(source) => write!(f, "{} fetch", source),
            Self::Search { generation } => write!(f, "search #{}", generation),
        }
    }
}

/// Messages from background tasks to the session.
#[derive(Debug)]
pub enum DashboardEvent {
    FetchCompleted {
        source: ContentSource,
        result: Result<Vec<ContentItem>, FetchError>,
    },
    SearchCompleted(SearchOutcome),
    /// A task panicked instead of completing. The message is the panic payload.
    TaskPanicked { task: TaskKind, error: String },
}

/// Run a future, turning a panic into `Err(message)`.
async fn catch_task_panic<F, T>(future: F) -> Result<T, String>
where
    F: std::future::Future<Output = T>,
{
    AssertUnwindSafe(future)
        .catch_unwind()
        .await
        .map_err(|panic| {
            if let Some(s) = panic.downcast_ref::<&'static str>() {
                s.to_string()
            } else if let Some(s) = panic.downcast_ref::<String>() {
                s.clone()
            } else {
                "Unknown panic".to_string()
            }
        })
}

// ============================================================================
// Dashboard
// ============================================================================

pub struct Dashboard {
    store: ContentStore,
    provider: Arc<dyn ContentProvider>,
    search_latency: Duration,

    event_tx: mpsc::Sender<DashboardEvent>,
    event_rx: mpsc::Receiver<DashboardEvent>,

    /// Spawned tasks whose completion event has not been handled yet.
    outstanding: usize,
}

impl Dashboard {
    pub fn new(provider: Arc<dyn ContentProvider>) -> Self {
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            store: ContentStore::new(),
            provider,
            search_latency: DEFAULT_SEARCH_LATENCY,
            event_tx,
            event_rx,
            outstanding: 0,
        }
    }

    pub fn with_search_latency(mut self, latency: Duration) -> Self {
        self.search_latency = latency;
        self
    }

    pub fn store(&self) -> &ContentStore {
        &self.store
    }

    /// True when every spawned task has reported back.
    pub fn is_idle(&self) -> bool {
        self.outstanding == 0
    }

    // ========================================================================
    // Fetching
    // ========================================================================

    /// Start the three fetchers. The news fetch uses the saved categories.
    pub fn load(&mut self, prefs: &Preferences) {
        tracing::info!(
            categories = ?prefs.categories,
            "Loading dashboard content"
        );
        self.spawn_fetch(FetchRequest::News {
            categories: prefs.categories.clone(),
        });
        self.spawn_fetch(FetchRequest::Movies);
        self.spawn_fetch(FetchRequest::Social);
    }

    /// Mark `request`'s source pending and run it in the background.
    ///
    /// Fetches are fire-and-forget: nothing fences them, and overlapping
    /// fetches of one source each append their batch.
    pub fn spawn_fetch(&mut self, request: FetchRequest) {
        let source = request.source();
        self.store.begin_fetch(source);
        self.outstanding += 1;

        let provider = Arc::clone(&self.provider);
        let tx = self.event_tx.clone();

        tokio::spawn(async move {
            let event = match catch_task_panic(provider.fetch(&request)).await {
                Ok(result) => DashboardEvent::FetchCompleted { source, result },
                Err(panic_msg) => {
                    tracing::error!(
                        task = "fetch",
                        source = %source,
                        error = %panic_msg,
                        "Background task panicked"
                    );
                    DashboardEvent::TaskPanicked {
                        task: TaskKind::Fetch(source),
                        error: panic_msg,
                    }
                }
            };

            if let Err(e) = tx.send(event).await {
                tracing::warn!(
                    error = %e,
                    event = "FetchCompleted",
                    "Channel send failed (receiver dropped)"
                );
            }
        });
    }

    // ========================================================================
    // User Actions
    // ========================================================================

    /// Run a search with the session's latency.
    ///
    /// A blank query clears the search instead. See [`Dashboard::search_with_latency`].
    pub fn search(&mut self, query: &str) -> Result<(), StoreError> {
        self.search_with_latency(query, self.search_latency)
    }

    /// Run a search that commits after `latency`.
    ///
    /// The query is recorded and the results are filtered right away; only the
    /// commit waits. Earlier searches still in flight are not cancelled, their
    /// results are discarded on arrival.
    pub fn search_with_latency(
        &mut self,
        query: &str,
        latency: Duration,
    ) -> Result<(), StoreError> {
        if query.trim().is_empty() {
            self.store.clear_search();
            return Ok(());
        }

        let request = self.store.begin_search(query)?;
        self.store.set_search_query(query);
        let generation = request.generation;
        self.outstanding += 1;

        let tx = self.event_tx.clone();
        tokio::spawn(async move {
            let event = match catch_task_panic(search::run(request, latency)).await {
                Ok(outcome) => DashboardEvent::SearchCompleted(outcome),
                Err(panic_msg) => {
                    tracing::error!(
                        task = "search",
                        generation,
                        error = %panic_msg,
                        "Background task panicked"
                    );
                    DashboardEvent::TaskPanicked {
                        task: TaskKind::Search { generation },
                        error: panic_msg,
                    }
                }
            };

            if let Err(e) = tx.send(event).await {
                tracing::warn!(
                    error = %e,
                    event = "SearchCompleted",
                    "Channel send failed (receiver dropped)"
                );
            }
        });

        Ok(())
    }

    pub fn clear_search(&mut self) {
        self.store.clear_search();
    }

    pub fn toggle_favorite(&mut self, id: &str) -> bool {
        self.store.toggle_favorite(id)
    }

    pub fn reorder(&mut self, source: isize, dest: isize) -> Result<(), StoreError> {
        self.store.reorder(source, dest)
    }

    // ========================================================================
    // Event Handling
    // ========================================================================

    /// Apply one completion to the store.
    pub fn handle_event(&mut self, event: DashboardEvent) {
        self.outstanding = self.outstanding.saturating_sub(1);

        match event {
            DashboardEvent::FetchCompleted { source, result } => {
                self.store.complete_fetch(source, result);
            }
            DashboardEvent::SearchCompleted(outcome) => {
                self.store.complete_search(outcome);
            }
            DashboardEvent::TaskPanicked { task, error } => {
                tracing::error!(task = %task, error = %error, "Background task panicked");
                // A panicked fetch must not leave its source pending forever
                if let TaskKind::Fetch(source) = task {
                    self.store.complete_fetch(
                        source,
                        Err(FetchError::Unavailable(format!("Internal error in {} task", task))),
                    );
                }
            }
        }
    }

    /// Wait for the next completion. Never returns `None` while the session
    /// is alive, since it holds a sender itself.
    pub async fn next_event(&mut self) -> Option<DashboardEvent> {
        self.event_rx.recv().await
    }

    /// Handle completions until every spawned task has reported back.
    pub async fn run_until_idle(&mut self) {
        while !self.is_idle() {
            match self.event_rx.recv().await {
                Some(event) => self.handle_event(event),
                None => break,
            }
        }
        tracing::debug!(
            feed = self.store.feed().len(),
            trending = self.store.trending().len(),
            "Dashboard idle"
        );
    }
}

// ============================================================================
// Tests
// ============================================================================
