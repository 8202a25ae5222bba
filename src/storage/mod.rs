//! Persistent conditional-GET cache.
//!
//! A single SQLite table (`cache`) keyed by `slug_url` (the group slug
//! concatenated with the source URL) storing the ETag/Last-Modified
//! validators from the last 200 response and the id of the newest entry
//! seen on the last successful parse.

mod cache;
mod schema;
mod types;

pub use schema::Database;
pub use types::{CacheEntry, CacheError};
