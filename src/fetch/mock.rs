use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use super::{ContentProvider, ContentSource, FetchError, FetchRequest};
use crate::content::{ContentItem, ContentType};

/// Default simulated latencies per source.
pub const NEWS_LATENCY: Duration = Duration::from_millis(1000);
pub const MOVIES_LATENCY: Duration = Duration::from_millis(800);
pub const SOCIAL_LATENCY: Duration = Duration::from_millis(600);

/// Canned provider: fixed payloads after a fixed per-source delay.
///
/// Payloads can be overridden per source, and any source can be forced to
/// fail with a message, which is how tests drive the rejected path.
#[derive(Debug, Clone)]
pub struct MockProvider {
    news: SourceScript,
    movies: SourceScript,
    social: SourceScript,
}

#[derive(Debug, Clone)]
struct SourceScript {
    latency: Duration,
    outcome: Outcome,
}

#[derive(Debug, Clone)]
enum Outcome {
    Default,
    Items(Vec<ContentItem>),
    Fail(String),
}

impl Default for MockProvider {
    fn default() -> Self {
        Self {
            news: SourceScript::new(NEWS_LATENCY),
            movies: SourceScript::new(MOVIES_LATENCY),
            social: SourceScript::new(SOCIAL_LATENCY),
        }
    }
}

impl SourceScript {
    fn new(latency: Duration) -> Self {
        Self {
            latency,
            outcome: Outcome::Default,
        }
    }
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the simulated latency for one source.
    pub fn with_latency(mut self, source: ContentSource, latency: Duration) -> Self {
        self.script_mut(source).latency = latency;
        self
    }

    /// Replace the canned payload for one source.
    pub fn with_items(mut self, source: ContentSource, items: Vec<ContentItem>) -> Self {
        self.script_mut(source).outcome = Outcome::Items(items);
        self
    }

    /// Make one source reject with the given message.
    pub fn failing(mut self, source: ContentSource, message: impl Into<String>) -> Self {
        self.script_mut(source).outcome = Outcome::Fail(message.into());
        self
    }

    fn script(&self, source: ContentSource) -> &SourceScript {
        match source {
            ContentSource::News => &self.news,
            ContentSource::Movies => &self.movies,
            ContentSource::Social => &self.social,
        }
    }

    fn script_mut(&mut self, source: ContentSource) -> &mut SourceScript {
        match source {
            ContentSource::News => &mut self.news,
            ContentSource::Movies => &mut self.movies,
            ContentSource::Social => &mut self.social,
        }
    }
}

#[async_trait]
impl ContentProvider for MockProvider {
    async fn fetch(&self, request: &FetchRequest) -> Result<Vec<ContentItem>, FetchError> {
        let source = request.source();
        let script = self.script(source);

        tracing::debug!(
            source = %source,
            latency_ms = script.latency.as_millis() as u64,
            "Mock fetch started"
        );
        tokio::time::sleep(script.latency).await;

        match &script.outcome {
            Outcome::Default => Ok(default_payload(source)),
            Outcome::Items(items) => Ok(items.clone()),
            Outcome::Fail(message) => Err(FetchError::Unavailable(message.clone())),
        }
    }
}

/// Canned items for each source. News items are stamped with the fetch time.
pub fn default_payload(source: ContentSource) -> Vec<ContentItem> {
    match source {
        ContentSource::News => {
            let now = Utc::now().to_rfc3339();
            vec![
                ContentItem::new(
                    "1",
                    "Tech Innovation Breakthrough",
                    "Latest developments in artificial intelligence and machine learning",
                    "technology",
                    ContentType::News,
                )
                .with_image("https://images.unsplash.com/photo-1518709268805-4e9042af2176?w=400")
                .with_published_at(now.clone()),
                ContentItem::new(
                    "2",
                    "Sports Championship Finals",
                    "Exciting match between top teams in the league",
                    "sports",
                    ContentType::News,
                )
                .with_image("https://images.unsplash.com/photo-1461896836934-ffe607ba8211?w=400")
                .with_published_at(now),
            ]
        }
        ContentSource::Movies => vec![
            ContentItem::new(
                "3",
                "The Matrix Resurrections",
                "Neo must choose between reality and the Matrix once again",
                "action",
                ContentType::Movie,
            )
            .with_image("https://images.unsplash.com/photo-1489599510919-5e6b6c8c1adb?w=400"),
            ContentItem::new(
                "4",
                "Dune: Part Two",
                "Paul Atreides unites with Chani and the Fremen",
                "sci-fi",
                ContentType::Movie,
            )
            .with_image("https://images.unsplash.com/photo-1518709268805-4e9042af2176?w=400"),
        ],
        ContentSource::Social => vec![ContentItem::new(
            "5",
            "Trending: #TechTalk",
            "Join the conversation about emerging technologies",
            "technology",
            ContentType::Social,
        )
        .with_image("https://images.unsplash.com/photo-1611224923853-80b023f02d71?w=400")],
    }
}
