use super::schema::Database;
use super::types::{CacheEntry, CacheError};

impl Database {
    /// Point lookup of the cache row for a given `slug_url`.
    pub async fn fetch_cache(&self, slug_url: &str) -> Result<Option<CacheEntry>, CacheError> {
        let row = sqlx::query_as::<_, CacheEntry>(
            "SELECT slug_url, last_seen_id, etag, last_modified FROM cache WHERE slug_url = ?",
        )
        .bind(slug_url)
        .fetch_optional(&self.pool)
        .await
        .map_err(CacheError::from_sqlx)?;

        Ok(row)
    }

    /// Upsert the conditional-GET validators for a `slug_url`, leaving
    /// `last_seen_id` untouched if the row already exists.
    pub async fn update_cache_validators(
        &self,
        slug_url: &str,
        etag: Option<&str>,
        last_modified: Option<&str>,
    ) -> Result<(), CacheError> {
        sqlx::query("INSERT OR IGNORE INTO cache (slug_url) VALUES (?)")
            .bind(slug_url)
            .execute(&self.pool)
            .await
            .map_err(CacheError::from_sqlx)?;

        sqlx::query("UPDATE cache SET etag = ?, last_modified = ? WHERE slug_url = ?")
            .bind(etag)
            .bind(last_modified)
            .bind(slug_url)
            .execute(&self.pool)
            .await
            .map_err(CacheError::from_sqlx)?;

        Ok(())
    }

    /// Upsert the newest-seen entry id for a `slug_url`, leaving the
    /// validators untouched if the row already exists.
    pub async fn update_cache_last_seen(
        &self,
        slug_url: &str,
        last_seen_id: &str,
    ) -> Result<(), CacheError> {
        sqlx::query("INSERT OR IGNORE INTO cache (slug_url) VALUES (?)")
            .bind(slug_url)
            .execute(&self.pool)
            .await
            .map_err(CacheError::from_sqlx)?;

        sqlx::query("UPDATE cache SET last_seen_id = ? WHERE slug_url = ?")
            .bind(last_seen_id)
            .bind(slug_url)
            .execute(&self.pool)
            .await
            .map_err(CacheError::from_sqlx)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fetch_cache_missing_row_returns_none() {
        let db = Database::open(":memory:").await.unwrap();
        let entry = db.fetch_cache("a|https://example.com/feed").await.unwrap();
        assert!(entry.is_none());
    }

    #[tokio::test]
    async fn update_validators_then_fetch_roundtrips() {
        let db = Database::open(":memory:").await.unwrap();
        let key = "a|https://example.com/feed";
        db.update_cache_validators(key, Some("\"etag-1\""), Some("Mon, 01 Jan 2024 00:00:00 GMT"))
            .await
            .unwrap();

        let entry = db.fetch_cache(key).await.unwrap().unwrap();
        assert_eq!(entry.etag.as_deref(), Some("\"etag-1\""));
        assert_eq!(
            entry.last_modified.as_deref(),
            Some("Mon, 01 Jan 2024 00:00:00 GMT")
        );
        assert!(entry.last_seen_id.is_none());
    }

    #[tokio::test]
    async fn update_last_seen_does_not_clobber_validators() {
        let db = Database::open(":memory:").await.unwrap();
        let key = "a|https://example.com/feed";
        db.update_cache_validators(key, Some("\"etag-1\""), None)
            .await
            .unwrap();
        db.update_cache_last_seen(key, "entry-42").await.unwrap();

        let entry = db.fetch_cache(key).await.unwrap().unwrap();
        assert_eq!(entry.etag.as_deref(), Some("\"etag-1\""));
        assert_eq!(entry.last_seen_id.as_deref(), Some("entry-42"));
    }

    #[tokio::test]
    async fn reset_clears_existing_rows() {
        let dir = std::env::temp_dir().join("rss_aggregator_cache_reset_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("cache.db");
        let path_str = path.to_str().unwrap();

        let db = Database::open(path_str).await.unwrap();
        db.update_cache_validators("a|url", Some("etag"), None)
            .await
            .unwrap();
        drop(db);

        let db = Database::reset(path_str).await.unwrap();
        let entry = db.fetch_cache("a|url").await.unwrap();
        assert!(entry.is_none());

        std::fs::remove_dir_all(&dir).ok();
    }
}
