//! Fetching and parsing of RSS/Atom feed sources.
//!
//! - [`fetcher`] — concurrent conditional-GET HTTP client
//! - [`parser`] — feed-rs-based parsing, keyword filtering, cache advancement
//! - [`types`] — the shared feed/entry shapes that flow into the writer

mod fetcher;
mod parser;
mod types;

pub use fetcher::{fetch_all, FetchError, FetchOutcome, FetchTask};
pub use parser::{parse_and_filter, FilteredFeed, ParseError};
pub use types::{Entry, EntryLink, Enclosure, FeedMetadata, FeedType, ParsedFeed, Tag};
