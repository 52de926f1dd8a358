//! End-to-end dashboard sessions: preferences from SQLite drive the fetch,
//! fetched content flows into the store, and user actions compose on top.
//!
//! Each test uses its own in-memory database and a paused tokio clock, so
//! simulated latencies cost no wall time.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use dashfeed::config::Config;
use dashfeed::content::ContentItem;
use dashfeed::dashboard::Dashboard;
use dashfeed::fetch::{ContentProvider, ContentSource, FetchError, FetchRequest, MockProvider};
use dashfeed::preferences::{PreferenceManager, PreferencesUpdate};
use dashfeed::storage::Database;
use dashfeed::store::Section;
use pretty_assertions::assert_eq;

async fn test_db() -> Database {
    Database::open(":memory:").await.unwrap()
}

fn ids(items: &[ContentItem]) -> Vec<&str> {
    items.iter().map(|i| i.id.as_str()).collect()
}

/// Mock provider that records every request it receives.
struct RecordingProvider {
    inner: MockProvider,
    seen: Mutex<Vec<FetchRequest>>,
}

#[async_trait]
impl ContentProvider for RecordingProvider {
    async fn fetch(&self, request: &FetchRequest) -> Result<Vec<ContentItem>, FetchError> {
        self.seen.lock().unwrap().push(request.clone());
        self.inner.fetch(request).await
    }
}

// ============================================================================
// Preferences → Fetch
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_saved_categories_reach_news_fetch() {
    let db = test_db().await;
    let config = Config::default();
    let mut prefs = PreferenceManager::load(&config, &db).await.unwrap();
    prefs
        .save(&db, PreferencesUpdate::categories(["science", "music"]))
        .await
        .unwrap();

    // A fresh session sees the saved categories
    let prefs = PreferenceManager::load(&config, &db).await.unwrap();
    let provider = Arc::new(RecordingProvider {
        inner: MockProvider::new(),
        seen: Mutex::new(Vec::new()),
    });
    let mut dash = Dashboard::new(provider.clone());
    dash.load(prefs.preferences());
    dash.run_until_idle().await;

    let seen = provider.seen.lock().unwrap().clone();
    let expected: BTreeSet<String> = ["music", "science"].iter().map(|s| s.to_string()).collect();
    assert!(seen.contains(&FetchRequest::News { categories: expected }));
    assert!(seen.contains(&FetchRequest::Movies));
    assert!(seen.contains(&FetchRequest::Social));
    assert_eq!(seen.len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_saving_preferences_does_not_refetch() {
    let db = test_db().await;
    let config = Config::default();
    let mut prefs = PreferenceManager::load(&config, &db).await.unwrap();

    let mut dash = Dashboard::new(Arc::new(MockProvider::new()));
    dash.load(prefs.preferences());
    dash.run_until_idle().await;
    let before = dash.store().snapshot();

    prefs
        .save(&db, PreferencesUpdate::language("de"))
        .await
        .unwrap();

    assert!(dash.is_idle());
    assert_eq!(dash.store().snapshot(), before);
}

// ============================================================================
// Full Session
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_full_session() {
    let db = test_db().await;
    let prefs = PreferenceManager::load(&Config::default(), &db).await.unwrap();
    let mut dash = Dashboard::new(Arc::new(MockProvider::new()));

    dash.load(prefs.preferences());
    dash.run_until_idle().await;
    assert_eq!(ids(dash.store().feed()), vec!["5", "1", "2"]);
    assert_eq!(ids(dash.store().trending()), vec!["3", "4"]);

    // Favorite one feed item and one trending item
    assert!(dash.toggle_favorite("2"));
    assert!(dash.toggle_favorite("4"));
    assert_eq!(ids(dash.store().favorites()), vec!["2", "4"]);

    // Move "2" to the front; favorites follow feed order
    dash.reorder(2, 0).unwrap();
    assert_eq!(ids(dash.store().feed()), vec!["2", "5", "1"]);
    assert!(dash.toggle_favorite("5"));
    assert_eq!(ids(dash.store().favorites()), vec!["2", "5", "4"]);

    // Search sees the favorite flags as they were at issue time
    dash.search("tech").unwrap();
    dash.run_until_idle().await;
    assert_eq!(ids(dash.store().section(Section::Search)), vec!["5", "1"]);
    assert!(dash.store().search_results()[0].is_favorite);

    // Unfavoriting updates the search copy too
    dash.toggle_favorite("5");
    assert!(!dash.store().search_results()[0].is_favorite);
    assert_eq!(ids(dash.store().favorites()), vec!["2", "4"]);

    dash.search("").unwrap();
    assert!(dash.store().search_results().is_empty());
    assert_eq!(dash.store().search_query(), "");
}

#[tokio::test(start_paused = true)]
async fn test_refetch_appends_duplicates() {
    let mut dash = Dashboard::new(Arc::new(MockProvider::new()));

    dash.spawn_fetch(FetchRequest::Movies);
    dash.spawn_fetch(FetchRequest::Movies);
    dash.run_until_idle().await;

    assert_eq!(ids(dash.store().trending()), vec!["3", "4", "3", "4"]);

    // Both copies flip together
    dash.toggle_favorite("3");
    assert_eq!(ids(dash.store().favorites()), vec!["3", "3"]);
}

#[tokio::test(start_paused = true)]
async fn test_all_sources_failing_leaves_state_empty() {
    let provider = ContentSource::ALL
        .iter()
        .fold(MockProvider::new(), |p, &source| p.failing(source, format!("{} down", source)));
    let mut dash = Dashboard::new(Arc::new(provider));

    dash.load(&Default::default());
    dash.run_until_idle().await;

    assert!(dash.store().feed().is_empty());
    assert!(dash.store().trending().is_empty());
    assert_eq!(dash.store().error(), Some("news down"));
    assert_eq!(
        dash.store().status(ContentSource::Social).error(),
        Some("social down")
    );
    assert!(!dash.store().loading());
}

#[tokio::test(start_paused = true)]
async fn test_search_during_load_sees_partial_content() {
    let provider = MockProvider::new()
        .with_latency(ContentSource::Social, Duration::from_millis(10))
        .with_latency(ContentSource::News, Duration::from_millis(5_000))
        .with_latency(ContentSource::Movies, Duration::from_millis(5_000));
    let mut dash =
        Dashboard::new(Arc::new(provider)).with_search_latency(Duration::from_millis(50));

    dash.load(&Default::default());

    // Let social land, then search before news arrives
    match dash.next_event().await {
        Some(event) => dash.handle_event(event),
        None => panic!("channel closed"),
    }
    assert_eq!(ids(dash.store().feed()), vec!["5"]);

    dash.search("tech").unwrap();
    dash.run_until_idle().await;

    assert_eq!(ids(dash.store().feed()), vec!["5", "1", "2"]);
    assert_eq!(ids(dash.store().search_results()), vec!["5"]);
}
