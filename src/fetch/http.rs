use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use thiserror::Error;
use url::Url;

use super::{ContentProvider, ContentSource, FetchError, FetchRequest};
use crate::content::ContentItem;

const MAX_RETRIES: u32 = 3;
const MAX_PAYLOAD_SIZE: usize = 10 * 1024 * 1024; // 10MB
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_RETRY_BASE: Duration = Duration::from_secs(1);

/// Errors raised while building endpoint URLs from configuration.
#[derive(Debug, Error)]
pub enum EndpointError {
    #[error("Invalid endpoint URL for {endpoint}: {error}")]
    InvalidUrl {
        endpoint: ContentSource,
        error: url::ParseError,
    },
    #[error("Unsupported scheme for {endpoint}: {scheme} (only http/https allowed)")]
    UnsupportedScheme {
        endpoint: ContentSource,
        scheme: String,
    },
}

/// One JSON endpoint per source. Each must return an array of content items.
#[derive(Debug, Clone)]
pub struct HttpEndpoints {
    pub news: Url,
    pub movies: Url,
    pub social: Url,
}

impl HttpEndpoints {
    /// Parse and validate the three endpoint URLs.
    pub fn parse(news: &str, movies: &str, social: &str) -> Result<Self, EndpointError> {
        Ok(Self {
            news: parse_endpoint(ContentSource::News, news)?,
            movies: parse_endpoint(ContentSource::Movies, movies)?,
            social: parse_endpoint(ContentSource::Social, social)?,
        })
    }

    fn get(&self, source: ContentSource) -> &Url {
        match source {
            ContentSource::News => &self.news,
            ContentSource::Movies => &self.movies,
            ContentSource::Social => &self.social,
        }
    }
}

fn parse_endpoint(endpoint: ContentSource, raw: &str) -> Result<Url, EndpointError> {
    let url = Url::parse(raw).map_err(|error| EndpointError::InvalidUrl { endpoint, error })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(EndpointError::UnsupportedScheme {
            endpoint,
            scheme: scheme.to_owned(),
        }),
    }
}

/// Provider backed by JSON-over-HTTP endpoints.
///
/// # Behavior
///
/// - News requests carry the categories as a comma-separated `categories` query parameter
/// - Each attempt is bounded by the request timeout (30 seconds by default)
/// - HTTP 429 and 5xx responses are retried with exponential backoff, up to 3 retries
/// - Other non-2xx responses fail immediately
/// - Response bodies are limited to 10MB
#[derive(Debug, Clone)]
pub struct HttpProvider {
    client: reqwest::Client,
    endpoints: HttpEndpoints,
    timeout: Duration,
    retry_base: Duration,
}

impl HttpProvider {
    pub fn new(client: reqwest::Client, endpoints: HttpEndpoints) -> Self {
        Self {
            client,
            endpoints,
            timeout: DEFAULT_TIMEOUT,
            retry_base: DEFAULT_RETRY_BASE,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Base delay for backoff; attempt `n` waits `base * 2^n`.
    pub fn with_retry_base(mut self, retry_base: Duration) -> Self {
        self.retry_base = retry_base;
        self
    }

    fn request_url(&self, request: &FetchRequest) -> Url {
        let mut url = self.endpoints.get(request.source()).clone();
        if let FetchRequest::News { categories } = request {
            if !categories.is_empty() {
                let joined = categories.iter().map(String::as_str).collect::<Vec<_>>().join(",");
                url.query_pairs_mut().append_pair("categories", &joined);
            }
        }
        url
    }
}

#[async_trait]
impl ContentProvider for HttpProvider {
    async fn fetch(&self, request: &FetchRequest) -> Result<Vec<ContentItem>, FetchError> {
        let source = request.source();
        let url = self.request_url(request);
        let mut retry_count = 0;

        let bytes = loop {
            let response = tokio::time::timeout(self.timeout, self.client.get(url.clone()).send())
                .await
                .map_err(|_| FetchError::Timeout)?
                .map_err(FetchError::Network)?;

            let status = response.status();
            let retryable =
                status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error();

            if retryable {
                if retry_count >= MAX_RETRIES {
                    return Err(if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        FetchError::RateLimited(MAX_RETRIES)
                    } else {
                        FetchError::HttpStatus(status.as_u16())
                    });
                }

                let delay = self.retry_base * 2u32.pow(retry_count);
                tracing::warn!(
                    source = %source,
                    url = %url,
                    status = %status,
                    retry = retry_count,
                    delay_ms = delay.as_millis() as u64,
                    "Provider request failed, retrying after delay"
                );

                tokio::time::sleep(delay).await;
                retry_count += 1;
                continue;
            }

            if !status.is_success() {
                return Err(FetchError::HttpStatus(status.as_u16()));
            }

            break read_limited_bytes(response, MAX_PAYLOAD_SIZE).await?;
        };

        let items: Vec<ContentItem> =
            serde_json::from_slice(&bytes).map_err(|e| FetchError::Decode(e.to_string()))?;

        tracing::debug!(source = %source, count = items.len(), "Provider fetch complete");
        Ok(items)
    }
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(FetchError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}
