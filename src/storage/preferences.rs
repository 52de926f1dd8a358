use anyhow::Result;

use super::schema::Database;

impl Database {
    // ========================================================================
    // User Preferences Operations
    // ========================================================================

    /// Get a single preference value by key.
    ///
    /// Keys use dotted convention: `content.categories`, `content.language`.
    #[cfg(test)]
    pub async fn get_preference(&self, key: &str) -> Result<Option<String>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT value FROM user_preferences WHERE key = ?")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(value,)| value))
    }

    /// Set a preference value (UPSERT).
    #[cfg(test)]
    pub async fn set_preference(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO user_preferences (key, value, updated_at)
            VALUES (?, ?, datetime('now'))
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
        "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Write several preferences in one transaction, so a settings save
    /// is never observed half-applied.
    pub async fn set_preferences(&self, entries: &[(&str, String)]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for (key, value) in entries {
            sqlx::query(
                r#"
                INSERT INTO user_preferences (key, value, updated_at)
                VALUES (?, ?, datetime('now'))
                ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
            )
            .bind(*key)
            .bind(value.as_str())
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        Ok(())
    }

    /// Remove several preferences in one transaction. Returns the number of rows deleted.
    pub async fn delete_preferences(&self, keys: &[&str]) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        let mut deleted = 0;
        for key in keys {
            let result = sqlx::query("DELETE FROM user_preferences WHERE key = ?")
                .bind(*key)
                .execute(&mut *tx)
                .await?;
            deleted += result.rows_affected();
        }
        tx.commit().await?;

        Ok(deleted)
    }

    /// Get all preferences whose key starts with `prefix`, ordered by key.
    pub async fn get_preferences_by_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>> {
        // Escape LIKE wildcards so "content_" does not match "contentX"
        let escaped = prefix
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        let pattern = format!("{}%", escaped);
        let rows: Vec<(String, String)> = sqlx::query_as(
            "SELECT key, value FROM user_preferences WHERE key LIKE ? ESCAPE '\\' ORDER BY key",
        )
        .bind(&pattern)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
