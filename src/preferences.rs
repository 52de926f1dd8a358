//! User preferences: config.toml defaults overlaid with saved settings.
//!
//! Config values serve as defaults; rows in the `user_preferences` table
//! override them. Saves always go to the database, never to the config file.
//! Saving does not re-trigger any fetch; new categories apply at the next load.
use std::collections::BTreeSet;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::storage::Database;

const KEY_PREFIX: &str = "content.";
const CATEGORIES_KEY: &str = "content.categories";
const LANGUAGE_KEY: &str = "content.language";

// ============================================================================
// Preferences Record
// ============================================================================

/// Persisted per-user settings consumed by the news fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    pub categories: BTreeSet<String>,
    pub language: String,
}

impl Default for Preferences {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl Preferences {
    pub fn from_config(config: &Config) -> Self {
        Self {
            categories: config.default_categories.iter().cloned().collect(),
            language: config.default_language.clone(),
        }
    }

    /// Merge a partial update over this record. Absent fields are kept.
    pub fn merged(&self, update: PreferencesUpdate) -> Self {
        Self {
            categories: update.categories.unwrap_or_else(|| self.categories.clone()),
            language: update.language.unwrap_or_else(|| self.language.clone()),
        }
    }
}

/// Partial update from a settings save.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreferencesUpdate {
    pub categories: Option<BTreeSet<String>>,
    pub language: Option<String>,
}

impl PreferencesUpdate {
    pub fn categories<I, S>(categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            categories: Some(categories.into_iter().map(Into::into).collect()),
            language: None,
        }
    }

    pub fn language(language: impl Into<String>) -> Self {
        Self {
            categories: None,
            language: Some(language.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_none() && self.language.is_none()
    }
}

// ============================================================================
// PreferenceManager
// ============================================================================

/// Loads, holds, and saves the current [`Preferences`].
pub struct PreferenceManager {
    prefs: Preferences,
}

impl PreferenceManager {
    /// Load preferences by layering saved values over config defaults.
    ///
    /// A saved category list that fails to decode is logged and ignored, so
    /// a corrupted row never blocks startup. Unrecognized `content.` keys are
    /// skipped.
    pub async fn load(config: &Config, db: &Database) -> Result<Self> {
        let mut prefs = Preferences::from_config(config);

        for (key, value) in db.get_preferences_by_prefix(KEY_PREFIX).await? {
            match key.as_str() {
                CATEGORIES_KEY => match serde_json::from_str::<BTreeSet<String>>(&value) {
                    Ok(categories) => prefs.categories = categories,
                    Err(e) => {
                        tracing::warn!(
                            key = CATEGORIES_KEY,
                            error = %e,
                            "Ignoring unreadable saved categories"
                        );
                    }
                },
                LANGUAGE_KEY => prefs.language = value,
                _ => tracing::debug!(key = %key, "Ignoring unknown saved preference"),
            }
        }

        tracing::debug!(
            categories = ?prefs.categories,
            language = %prefs.language,
            "Preferences loaded"
        );
        Ok(Self { prefs })
    }

    /// Create from config only (no DB). Fallback for when DB load fails.
    pub fn from_config(config: &Config) -> Self {
        Self {
            prefs: Preferences::from_config(config),
        }
    }

    pub fn preferences(&self) -> &Preferences {
        &self.prefs
    }

    /// Merge `update` into the current preferences and persist the result.
    ///
    /// The in-memory record changes only after the write succeeds.
    pub async fn save(&mut self, db: &Database, update: PreferencesUpdate) -> Result<&Preferences> {
        if update.is_empty() {
            return Ok(&self.prefs);
        }

        let merged = self.prefs.merged(update);
        anyhow::ensure!(
            !merged.language.trim().is_empty(),
            "Language must not be empty"
        );

        let categories =
            serde_json::to_string(&merged.categories).context("Failed to encode categories")?;
        db.set_preferences(&[
            (CATEGORIES_KEY, categories),
            (LANGUAGE_KEY, merged.language.clone()),
        ])
        .await
        .context("Failed to save preferences")?;

        tracing::info!(
            categories = ?merged.categories,
            language = %merged.language,
            "Preferences saved"
        );
        self.prefs = merged;
        Ok(&self.prefs)
    }

    /// Drop saved overrides and fall back to config defaults.
    ///
    /// Both keys are removed in one transaction; on failure nothing changes.
    pub async fn reset(&mut self, config: &Config, db: &Database) -> Result<()> {
        db.delete_preferences(&[CATEGORIES_KEY, LANGUAGE_KEY])
            .await
            .context("Failed to reset preferences")?;
        self.prefs = Preferences::from_config(config);
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_db() -> Database {
        Database::open(":memory:").await.unwrap()
    }

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_load_defaults_from_config() {
        let db = test_db().await;
        let pm = PreferenceManager::load(&Config::default(), &db).await.unwrap();

        assert_eq!(
            pm.preferences().categories,
            set(&["entertainment", "sports", "technology"])
        );
        assert_eq!(pm.preferences().language, "en");
    }

    #[tokio::test]
    async fn test_db_overrides_config() {
        let db = test_db().await;
        db.set_preference(CATEGORIES_KEY, r#"["music"]"#).await.unwrap();
        db.set_preference(LANGUAGE_KEY, "fr").await.unwrap();

        let pm = PreferenceManager::load(&Config::default(), &db).await.unwrap();
        assert_eq!(pm.preferences().categories, set(&["music"]));
        assert_eq!(pm.preferences().language, "fr");
    }

    #[tokio::test]
    async fn test_corrupt_categories_fall_back_to_default() {
        let db = test_db().await;
        db.set_preference(CATEGORIES_KEY, "not json").await.unwrap();

        let pm = PreferenceManager::load(&Config::default(), &db).await.unwrap();
        assert_eq!(pm.preferences().categories.len(), 3);
    }

    #[tokio::test]
    async fn test_load_skips_unknown_content_keys() {
        let db = test_db().await;
        db.set_preference("content.layout", "grid").await.unwrap();
        db.set_preference("contentX.language", "fr").await.unwrap();
        db.set_preference(LANGUAGE_KEY, "it").await.unwrap();

        let pm = PreferenceManager::load(&Config::default(), &db).await.unwrap();
        assert_eq!(pm.preferences().language, "it");
        assert_eq!(pm.preferences().categories.len(), 3);
    }

    #[tokio::test]
    async fn test_partial_save_keeps_other_fields() {
        let db = test_db().await;
        let mut pm = PreferenceManager::load(&Config::default(), &db).await.unwrap();

        pm.save(&db, PreferencesUpdate::categories(["science"]))
            .await
            .unwrap();

        assert_eq!(pm.preferences().categories, set(&["science"]));
        assert_eq!(pm.preferences().language, "en");
    }

    #[tokio::test]
    async fn test_save_survives_reload() {
        let db = test_db().await;
        let mut pm = PreferenceManager::load(&Config::default(), &db).await.unwrap();
        pm.save(&db, PreferencesUpdate::language("ja")).await.unwrap();

        let reloaded = PreferenceManager::load(&Config::default(), &db).await.unwrap();
        assert_eq!(reloaded.preferences(), pm.preferences());
    }

    #[tokio::test]
    async fn test_empty_language_rejected_and_state_unchanged() {
        let db = test_db().await;
        let mut pm = PreferenceManager::load(&Config::default(), &db).await.unwrap();

        assert!(pm.save(&db, PreferencesUpdate::language("  ")).await.is_err());
        assert_eq!(pm.preferences().language, "en");
        assert_eq!(db.get_preference(LANGUAGE_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_reset_restores_config_defaults() {
        let db = test_db().await;
        let config = Config::default();
        let mut pm = PreferenceManager::load(&config, &db).await.unwrap();
        pm.save(&db, PreferencesUpdate::categories(["music"])).await.unwrap();
        pm.save(&db, PreferencesUpdate::language("pt")).await.unwrap();

        pm.reset(&config, &db).await.unwrap();

        assert_eq!(pm.preferences(), &Preferences::from_config(&config));
        assert!(db.get_preferences_by_prefix(KEY_PREFIX).await.unwrap().is_empty());
        let reloaded = PreferenceManager::load(&config, &db).await.unwrap();
        assert_eq!(reloaded.preferences(), &Preferences::from_config(&config));
    }

    #[test]
    fn test_merged_with_empty_update_is_identity() {
        let prefs = Preferences::default();
        assert_eq!(prefs.merged(PreferencesUpdate::default()), prefs);
    }

    #[test]
    fn test_from_config_dedups_categories() {
        let mut config = Config::default();
        config.default_categories = vec!["a".into(), "a".into(), "b".into()];
        assert_eq!(Preferences::from_config(&config).categories, set(&["a", "b"]));
    }
}
