//! Content ingestion from upstream providers.
//!
//! Three independent sources feed the dashboard:
//!
//! - **news**: parameterized by the user's preferred categories, lands in `feed`
//! - **movies**: lands in `trending`
//! - **social**: lands in `feed` alongside news
//!
//! Each fetch is a single request returning a batch of [`ContentItem`]s or a
//! [`FetchError`]. Batches are appended in completion order, so providers may
//! resolve in any order without coordinating with each other.
//!
//! # Providers
//!
//! - [`MockProvider`] - fixed payloads with per-source simulated latency
//! - [`HttpProvider`] - JSON endpoints over HTTP with retry and size limits

mod http;
mod mock;

use std::collections::BTreeSet;
use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

use crate::content::ContentItem;

pub use http::{EndpointError, HttpEndpoints, HttpProvider};
pub use mock::MockProvider;

// ============================================================================
// Sources and Requests
// ============================================================================

/// Upstream source of a content batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ContentSource {
    News,
    Movies,
    Social,
}

impl ContentSource {
    pub const ALL: [ContentSource; 3] = [Self::News, Self::Movies, Self::Social];

    pub fn name(self) -> &'static str {
        match self {
            Self::News => "news",
            Self::Movies => "movies",
            Self::Social => "social",
        }
    }
}

impl fmt::Display for ContentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single fetch to run against a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchRequest {
    /// Categories are a filter hint for the provider; the store never filters by them.
    News { categories: BTreeSet<String> },
    Movies,
    Social,
}

impl FetchRequest {
    pub fn news<I, S>(categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::News {
            categories: categories.into_iter().map(Into::into).collect(),
        }
    }

    pub fn source(&self) -> ContentSource {
        match self {
            Self::News { .. } => ContentSource::News,
            Self::Movies => ContentSource::Movies,
            Self::Social => ContentSource::Social,
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Errors that can occur while fetching a content batch.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request exceeded the configured timeout
    #[error("Request timed out")]
    Timeout,
    /// Server returned 429 Too Many Requests after max retries
    #[error("Rate limited after {0} retries")]
    RateLimited(u32),
    /// Response body exceeded the size limit
    #[error("Response too large")]
    ResponseTooLarge,
    /// Body was not a JSON array of content items
    #[error("Invalid content payload: {0}")]
    Decode(String),
    /// Provider is unreachable or refused the request
    #[error("{0}")]
    Unavailable(String),
}

// ============================================================================
// Provider Capability
// ============================================================================

/// Source of content batches.
///
/// Implementations must be cheap to share across spawned tasks; the dashboard
/// holds one behind an `Arc` and calls it concurrently for all three sources.
#[async_trait]
pub trait ContentProvider: Send + Sync {
    /// Fetch one batch for the given request.
    async fn fetch(&self, request: &FetchRequest) -> Result<Vec<ContentItem>, FetchError>;
}
