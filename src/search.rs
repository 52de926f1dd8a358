//! Search over the feed and trending collections.
//!
//! A search is split in three steps so that the store stays the only writer:
//!
//! 1. [`ContentStore::begin_search`](crate::store::ContentStore::begin_search)
//!    issues a generation, snapshots `feed ++ trending`, and filters it
//! 2. [`run`] waits out the simulated latency off the store
//! 3. [`ContentStore::complete_search`](crate::store::ContentStore::complete_search)
//!    commits the results only if no newer search was issued meanwhile
//!
//! Filtering happens at issue time, so items appended after the call never
//! show up in that call's results.

use std::time::Duration;

use crate::content::ContentItem;

/// Default simulated search latency.
pub const DEFAULT_SEARCH_LATENCY: Duration = Duration::from_millis(300);

/// An issued search, carrying its already-filtered snapshot.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub generation: u64,
    pub query: String,
    pub results: Vec<ContentItem>,
}

/// A search whose latency has elapsed, ready to be committed.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub generation: u64,
    pub query: String,
    pub results: Vec<ContentItem>,
}

/// Filter `items` to those whose title or description contains `query`,
/// case-insensitively. Order is preserved.
pub fn filter_items<'a, I>(items: I, query: &str) -> Vec<ContentItem>
where
    I: IntoIterator<Item = &'a ContentItem>,
{
    let needle = query.to_lowercase();
    items
        .into_iter()
        .filter(|item| item.matches_lowercase(&needle))
        .cloned()
        .collect()
}

/// Wait out the simulated latency, then hand back the outcome for commit.
pub async fn run(request: SearchRequest, latency: Duration) -> SearchOutcome {
    tracing::debug!(
        query = %request.query,
        generation = request.generation,
        matches = request.results.len(),
        "Search in flight"
    );
    tokio::time::sleep(latency).await;

    SearchOutcome {
        generation: request.generation,
        query: request.query,
        results: request.results,
    }
}
