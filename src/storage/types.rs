use thiserror::Error;

/// Errors that can occur while talking to the cache store.
///
/// The pipeline treats every variant as non-fatal: a cache failure degrades
/// that one `slug_url` back to an uncached fetch/parse for the run, it never
/// aborts the run.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Another instance has the database locked.
    #[error("Another instance appears to be using the cache database")]
    InstanceLocked,

    /// Migration failed.
    #[error("Cache schema migration failed: {0}")]
    Migration(String),

    /// Generic database error.
    #[error("Cache database error: {0}")]
    Other(#[from] sqlx::Error),
}

impl CacheError {
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        let error_string = err.to_string().to_lowercase();

        if error_string.contains("database is locked")
            || error_string.contains("database table is locked")
            || error_string.contains("sqlite_busy")
            || error_string.contains("sqlite_locked")
            || error_string.contains("unable to open database file")
        {
            return CacheError::InstanceLocked;
        }

        CacheError::Other(err)
    }
}

/// One row of the conditional-GET cache, keyed by `slug_url`.
///
/// `etag`/`last_modified` feed the `If-None-Match`/`If-Modified-Since`
/// request headers; `last_seen_id` lets the parser stop as soon as it
/// reaches an entry it has already emitted.
#[derive(Debug, Clone, Default, sqlx::FromRow)]
pub struct CacheEntry {
    pub slug_url: String,
    pub last_seen_id: Option<String>,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
}
