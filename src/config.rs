//! Configuration file parser for ~/.config/dashfeed/config.toml.
//!
//! The config file is optional; a missing file yields `Config::default()`.
//! Unknown keys are accepted by serde and logged as a warning so typos are visible.
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::fetch::ContentSource;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Which content provider backs the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Canned payloads with simulated latency.
    #[default]
    Mock,
    /// JSON endpoints given by `news_url`, `movies_url`, `social_url`.
    Http,
}

/// Top-level application configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub provider: ProviderKind,

    /// Endpoint for news batches (HTTP provider only).
    pub news_url: Option<String>,
    /// Endpoint for movie batches (HTTP provider only).
    pub movies_url: Option<String>,
    /// Endpoint for social batches (HTTP provider only).
    pub social_url: Option<String>,

    /// Simulated latencies for the mock provider.
    pub news_latency_ms: u64,
    pub movies_latency_ms: u64,
    pub social_latency_ms: u64,

    /// Simulated latency between issuing a search and committing its results.
    pub search_latency_ms: u64,

    /// Per-attempt timeout for HTTP provider requests.
    pub request_timeout_secs: u64,

    /// Categories used until the user saves their own.
    pub default_categories: Vec<String>,

    /// Language used until the user saves their own.
    pub default_language: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Mock,
            news_url: None,
            movies_url: None,
            social_url: None,
            news_latency_ms: 1000,
            movies_latency_ms: 800,
            social_latency_ms: 600,
            search_latency_ms: 300,
            request_timeout_secs: 30,
            default_categories: vec![
                "technology".to_string(),
                "sports".to_string(),
                "entertainment".to_string(),
            ],
            default_language: "en".to_string(),
        }
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 11] = [
        "provider",
        "news_url",
        "movies_url",
        "social_url",
        "news_latency_ms",
        "movies_latency_ms",
        "social_latency_ms",
        "search_latency_ms",
        "request_timeout_secs",
        "default_categories",
        "default_language",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // File deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        tracing::info!(
            path = %path.display(),
            provider = ?config.provider,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Simulated mock-provider latency for one source.
    pub fn latency(&self, source: ContentSource) -> Duration {
        Duration::from_millis(match source {
            ContentSource::News => self.news_latency_ms,
            ContentSource::Movies => self.movies_latency_ms,
            ContentSource::Social => self.social_latency_ms,
        })
    }

    pub fn search_latency(&self) -> Duration {
        Duration::from_millis(self.search_latency_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(name: &str, content: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(name);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, content).unwrap();
        path
    }

    fn cleanup(path: &Path) {
        if let Some(dir) = path.parent() {
            std::fs::remove_dir_all(dir).ok();
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.provider, ProviderKind::Mock);
        assert_eq!(config.latency(ContentSource::News), Duration::from_millis(1000));
        assert_eq!(config.latency(ContentSource::Movies), Duration::from_millis(800));
        assert_eq!(config.latency(ContentSource::Social), Duration::from_millis(600));
        assert_eq!(config.search_latency(), Duration::from_millis(300));
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(
            config.default_categories,
            vec!["technology", "sports", "entertainment"]
        );
        assert_eq!(config.default_language, "en");
        assert!(config.news_url.is_none());
    }

    #[test]
    fn test_missing_file_returns_default() {
        let path = Path::new("/tmp/dashfeed_test_nonexistent_config.toml");
        let config = Config::load(path).unwrap();
        assert_eq!(config.provider, ProviderKind::Mock);
    }

    #[test]
    fn test_empty_and_whitespace_files_return_default() {
        let path = write_config("dashfeed_config_test_empty", "   \n  \n  ");
        let config = Config::load(&path).unwrap();
        assert_eq!(config.default_language, "en");
        cleanup(&path);
    }

    #[test]
    fn test_partial_config_uses_defaults_for_missing() {
        let path = write_config("dashfeed_config_test_partial", "search_latency_ms = 50\n");
        let config = Config::load(&path).unwrap();
        assert_eq!(config.search_latency_ms, 50);
        assert_eq!(config.news_latency_ms, 1000);
        assert_eq!(config.provider, ProviderKind::Mock);
        cleanup(&path);
    }

    #[test]
    fn test_full_config() {
        let content = r#"
provider = "http"
news_url = "https://api.example.com/news"
movies_url = "https://api.example.com/movies"
social_url = "https://api.example.com/social"
news_latency_ms = 10
movies_latency_ms = 20
social_latency_ms = 30
search_latency_ms = 5
request_timeout_secs = 8
default_categories = ["music"]
default_language = "de"
"#;
        let path = write_config("dashfeed_config_test_full", content);

        let config = Config::load(&path).unwrap();
        assert_eq!(config.provider, ProviderKind::Http);
        assert_eq!(config.news_url.as_deref(), Some("https://api.example.com/news"));
        assert_eq!(config.latency(ContentSource::Social), Duration::from_millis(30));
        assert_eq!(config.request_timeout(), Duration::from_secs(8));
        assert_eq!(config.default_categories, vec!["music"]);
        assert_eq!(config.default_language, "de");

        cleanup(&path);
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let path = write_config("dashfeed_config_test_invalid", "this is not [valid toml");

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().contains("Invalid TOML"));

        cleanup(&path);
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let path = write_config("dashfeed_config_test_provider", "provider = \"carrier-pigeon\"\n");
        assert!(matches!(Config::load(&path), Err(ConfigError::Parse(_))));
        cleanup(&path);
    }

    #[test]
    fn test_unknown_keys_accepted() {
        let path = write_config(
            "dashfeed_config_test_unknown",
            "default_language = \"fr\"\ndark_mode = true\n",
        );
        let config = Config::load(&path).unwrap();
        assert_eq!(config.default_language, "fr");
        cleanup(&path);
    }

    #[test]
    fn test_wrong_type_returns_error() {
        let path = write_config("dashfeed_config_test_wrongtype", "news_latency_ms = \"slow\"\n");
        assert!(Config::load(&path).is_err());
        cleanup(&path);
    }

    #[test]
    fn test_too_large_file_rejected() {
        let path = write_config("dashfeed_config_test_too_large", &"a".repeat(1_048_577));

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::TooLarge(_)));
        assert!(err.to_string().contains("too large"));

        cleanup(&path);
    }
}
