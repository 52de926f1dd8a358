//! Canonical in-memory content state.
//!
//! [`ContentStore`] owns the four collections the dashboard renders and is
//! the only place they change. Callers read through borrowed slices and
//! mutate through named operations; there is no setter for `favorites`,
//! which is always recomputed from `feed` and `trending`.

use serde::Serialize;
use thiserror::Error;

use crate::content::ContentItem;
use crate::fetch::{ContentSource, FetchError};
use crate::search::{self, SearchOutcome, SearchRequest};

/// Maximum allowed search query length, in characters.
pub const MAX_SEARCH_QUERY_LENGTH: usize = 256;

// ============================================================================
// Error Types
// ============================================================================

/// Programming errors raised synchronously by store operations.
///
/// The store is left untouched whenever one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A reorder index fell outside the feed.
    #[error("Index {index} out of range for feed of length {len}")]
    IndexOutOfRange { index: isize, len: usize },

    #[error("Search query too long ({len} chars, max {max})")]
    QueryTooLong { len: usize, max: usize },
}

// ============================================================================
// Fetch Status
// ============================================================================

/// Lifecycle of the most recent fetch for one source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "error", rename_all = "lowercase")]
pub enum FetchStatus {
    #[default]
    Idle,
    Pending,
    Failed(String),
}

impl FetchStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failed(message) => Some(message),
            _ => None,
        }
    }
}

// ============================================================================
// Sections
// ============================================================================

/// Which collection a view is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Section {
    #[default]
    Feed,
    Trending,
    Favorites,
    Search,
}

impl Section {
    /// Parse a section name (case-insensitive).
    pub fn from_str_name(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "feed" => Some(Self::Feed),
            "trending" => Some(Self::Trending),
            "favorites" => Some(Self::Favorites),
            "search" => Some(Self::Search),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Feed => "feed",
            Self::Trending => "trending",
            Self::Favorites => "favorites",
            Self::Search => "search",
        }
    }
}

// ============================================================================
// Snapshot
// ============================================================================

/// Owned, serializable copy of the read surface.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentSnapshot {
    pub feed: Vec<ContentItem>,
    pub trending: Vec<ContentItem>,
    pub favorites: Vec<ContentItem>,
    pub search_results: Vec<ContentItem>,
    pub loading: bool,
    pub error: Option<String>,
    pub search_query: String,
    pub news: FetchStatus,
    pub movies: FetchStatus,
    pub social: FetchStatus,
}

// ============================================================================
// Favorites Derivation
// ============================================================================

/// Every favorited item of `feed` followed by every favorited item of `trending`.
///
/// Pure and order-preserving; search results never contribute.
pub fn compute_favorites(feed: &[ContentItem], trending: &[ContentItem]) -> Vec<ContentItem> {
    feed.iter()
        .chain(trending.iter())
        .filter(|item| item.is_favorite)
        .cloned()
        .collect()
}

// ============================================================================
// Content Store
// ============================================================================

/// Single source of truth for dashboard content.
#[derive(Debug, Default)]
pub struct ContentStore {
    feed: Vec<ContentItem>,
    trending: Vec<ContentItem>,
    favorites: Vec<ContentItem>,
    search_results: Vec<ContentItem>,

    news: FetchStatus,
    movies: FetchStatus,
    social: FetchStatus,

    search_query: String,

    /// Incremented each time a search is issued or cleared. A completion is
    /// committed only when it carries the current value, so a slow early search
    /// can never overwrite the results of a later one.
    search_generation: u64,
}

impl ContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Read Surface
    // ========================================================================

    pub fn feed(&self) -> &[ContentItem] {
        &self.feed
    }

    pub fn trending(&self) -> &[ContentItem] {
        &self.trending
    }

    pub fn favorites(&self) -> &[ContentItem] {
        &self.favorites
    }

    pub fn search_results(&self) -> &[ContentItem] {
        &self.search_results
    }

    pub fn search_query(&self) -> &str {
        &self.search_query
    }

    /// True while a news fetch is in flight.
    ///
    /// Movies and social have their own status, see [`ContentStore::status`].
    pub fn loading(&self) -> bool {
        self.news.is_pending()
    }

    /// Last news fetch failure, cleared when the next news fetch starts.
    pub fn error(&self) -> Option<&str> {
        self.news.error()
    }

    pub fn status(&self, source: ContentSource) -> &FetchStatus {
        match source {
            ContentSource::News => &self.news,
            ContentSource::Movies => &self.movies,
            ContentSource::Social => &self.social,
        }
    }

    /// True while any source has a fetch in flight.
    pub fn any_pending(&self) -> bool {
        ContentSource::ALL
            .iter()
            .any(|&source| self.status(source).is_pending())
    }

    pub fn search_generation(&self) -> u64 {
        self.search_generation
    }

    pub fn section(&self, section: Section) -> &[ContentItem] {
        match section {
            Section::Feed => &self.feed,
            Section::Trending => &self.trending,
            Section::Favorites => &self.favorites,
            Section::Search => &self.search_results,
        }
    }

    pub fn snapshot(&self) -> ContentSnapshot {
        ContentSnapshot {
            feed: self.feed.clone(),
            trending: self.trending.clone(),
            favorites: self.favorites.clone(),
            search_results: self.search_results.clone(),
            loading: self.loading(),
            error: self.error().map(str::to_string),
            search_query: self.search_query.clone(),
            news: self.news.clone(),
            movies: self.movies.clone(),
            social: self.social.clone(),
        }
    }

    // ========================================================================
    // Ingestion
    // ========================================================================

    /// Append a batch to the end of `feed`. Duplicate ids are kept.
    pub fn append_to_feed(&mut self, items: Vec<ContentItem>) {
        tracing::debug!(
            count = items.len(),
            total = self.feed.len() + items.len(),
            "Appending to feed"
        );
        self.feed.extend(items);
        self.refresh_favorites();
    }

    /// Append a batch to the end of `trending`. Duplicate ids are kept.
    pub fn append_to_trending(&mut self, items: Vec<ContentItem>) {
        tracing::debug!(
            count = items.len(),
            total = self.trending.len() + items.len(),
            "Appending to trending"
        );
        self.trending.extend(items);
        self.refresh_favorites();
    }

    /// Mark a fetch as started: status goes to pending and its error is cleared.
    pub fn begin_fetch(&mut self, source: ContentSource) {
        tracing::debug!(source = %source, "Fetch pending");
        *self.status_mut(source) = FetchStatus::Pending;
    }

    /// Apply a finished fetch.
    ///
    /// Fulfilled batches from news and social join `feed`; movies join
    /// `trending`. A rejection records the message and leaves every
    /// collection as it was.
    pub fn complete_fetch(
        &mut self,
        source: ContentSource,
        result: Result<Vec<ContentItem>, FetchError>,
    ) {
        match result {
            Ok(items) => {
                tracing::debug!(source = %source, count = items.len(), "Fetch fulfilled");
                *self.status_mut(source) = FetchStatus::Idle;
                match source {
                    ContentSource::News | ContentSource::Social => self.append_to_feed(items),
                    ContentSource::Movies => self.append_to_trending(items),
                }
            }
            Err(e) => {
                tracing::warn!(source = %source, error = %e, "Fetch rejected");
                *self.status_mut(source) = FetchStatus::Failed(e.to_string());
            }
        }
    }

    fn status_mut(&mut self, source: ContentSource) -> &mut FetchStatus {
        match source {
            ContentSource::News => &mut self.news,
            ContentSource::Movies => &mut self.movies,
            ContentSource::Social => &mut self.social,
        }
    }

    // ========================================================================
    // User Actions
    // ========================================================================

    /// Flip `is_favorite` on every copy of `id` in feed, trending, and search
    /// results, then recompute favorites.
    ///
    /// Returns false when the id is not tracked anywhere; that is a stale click,
    /// not an error.
    pub fn toggle_favorite(&mut self, id: &str) -> bool {
        let mut flipped = 0usize;
        for item in self
            .feed
            .iter_mut()
            .chain(self.trending.iter_mut())
            .chain(self.search_results.iter_mut())
            .filter(|item| item.id == id)
        {
            item.is_favorite = !item.is_favorite;
            flipped += 1;
        }

        if flipped == 0 {
            tracing::debug!(id = %id, "Ignoring favorite toggle for unknown id");
            return false;
        }

        self.refresh_favorites();
        tracing::debug!(
            id = %id,
            copies = flipped,
            favorites = self.favorites.len(),
            "Favorite toggled"
        );
        true
    }

    /// Move the feed item at `source` so that it ends up at `dest`.
    ///
    /// The item is removed first and `dest` is measured against the shortened
    /// feed, so both indices must lie in `0..len`. Anything else is rejected
    /// and the feed is left unchanged.
    pub fn reorder(&mut self, source: isize, dest: isize) -> Result<(), StoreError> {
        let len = self.feed.len();
        let from = self.checked_index(source)?;
        let to = self.checked_index(dest)?;

        let item = self.feed.remove(from);
        self.feed.insert(to, item);
        self.refresh_favorites();

        tracing::debug!(from, to, len, "Feed reordered");
        Ok(())
    }

    fn checked_index(&self, index: isize) -> Result<usize, StoreError> {
        let len = self.feed.len();
        usize::try_from(index)
            .ok()
            .filter(|&i| i < len)
            .ok_or(StoreError::IndexOutOfRange { index, len })
    }

    // ========================================================================
    // Search
    // ========================================================================

    /// Overwrite the committed query verbatim. No trimming.
    pub fn set_search_query(&mut self, query: impl Into<String>) {
        self.search_query = query.into();
    }

    /// Replace search results wholesale.
    pub fn set_search_results(&mut self, results: Vec<ContentItem>) {
        self.search_results = results;
    }

    /// Empty the results and the query, and fence off any search still in flight.
    pub fn clear_search(&mut self) {
        self.search_results.clear();
        self.search_query.clear();
        self.search_generation = self.search_generation.wrapping_add(1);
        tracing::debug!(generation = self.search_generation, "Search cleared");
    }

    /// Issue a search: take a new generation and filter a snapshot of
    /// `feed ++ trending` as it stands right now.
    pub fn begin_search(&mut self, query: &str) -> Result<SearchRequest, StoreError> {
        let len = query.chars().count();
        if len > MAX_SEARCH_QUERY_LENGTH {
            return Err(StoreError::QueryTooLong {
                len,
                max: MAX_SEARCH_QUERY_LENGTH,
            });
        }

        self.search_generation = self.search_generation.wrapping_add(1);
        let results = search::filter_items(self.feed.iter().chain(self.trending.iter()), query);

        tracing::debug!(
            query = %query,
            generation = self.search_generation,
            matches = results.len(),
            "Search issued"
        );

        Ok(SearchRequest {
            generation: self.search_generation,
            query: query.to_string(),
            results,
        })
    }

    /// Commit a finished search if it is still the latest one issued.
    ///
    /// Returns false when the outcome was stale and discarded.
    pub fn complete_search(&mut self, outcome: SearchOutcome) -> bool {
        if outcome.generation != self.search_generation {
            tracing::debug!(
                expected = self.search_generation,
                got = outcome.generation,
                query = %outcome.query,
                "Ignoring stale search result (generation mismatch)"
            );
            return false;
        }

        tracing::debug!(query = %outcome.query, count = outcome.results.len(), "Search completed");
        self.set_search_results(outcome.results);
        true
    }

    // ========================================================================
    // Derived State
    // ========================================================================

    fn refresh_favorites(&mut self) {
        self.favorites = compute_favorites(&self.feed, &self.trending);
    }
}

// ============================================================================
// Tests
// ============================================================================
