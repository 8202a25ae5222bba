//! Feed-shaped data that flows from the parser through the aggregator to the
//! writer. Deliberately tolerant: every field but `title` is optional,
//! mirroring how little a real-world RSS/Atom source is guaranteed to fill in.

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedType {
    Rss,
    Atom,
}

/// Metadata describing the feed as a whole, used to populate the root
/// `<feed>`/channel-level fields of the rendered output.
#[derive(Debug, Clone)]
pub struct FeedMetadata {
    pub encoding: String,
    pub title: String,
    pub id: String,
    pub updated: DateTime<Utc>,
    pub author: String,
}

#[derive(Debug, Clone)]
pub struct EntryLink {
    pub href: String,
    pub rel: Option<String>,
    pub media_type: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Enclosure {
    pub href: String,
    pub media_type: Option<String>,
    pub length: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct Tag {
    pub scheme: Option<String>,
    pub label: Option<String>,
    pub term: String,
}

#[derive(Debug, Clone)]
pub struct Entry {
    pub id: Option<String>,
    pub title: Option<String>,
    pub published: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
    /// Raw `<published>`/`<pubDate>` text as it appeared in the source
    /// document, kept alongside `published` so the writer's tolerant
    /// RFC-3339 coercion has something to retry against when feed-rs itself
    /// failed to parse the timestamp (e.g. the non-standard `UT` zone).
    pub published_raw: Option<String>,
    /// Raw `<updated>` text, same rationale as `published_raw`.
    pub updated_raw: Option<String>,
    pub summary: Option<String>,
    /// MIME type of `summary`: `text/plain`, `text/html`, or `application/xhtml+xml`.
    pub summary_type: Option<String>,
    pub author: Option<String>,
    pub links: Vec<EntryLink>,
    pub enclosures: Vec<Enclosure>,
    pub tags: Vec<Tag>,
}

impl Entry {
    /// The entry's primary (non-enclosure) link, if any.
    pub fn primary_link(&self) -> Option<&EntryLink> {
        self.links.iter().find(|l| l.rel.as_deref() != Some("enclosure"))
    }

    /// Identity used for last-seen-id comparisons and cache advancement:
    /// the entry's own id if present, else its primary link's href.
    pub fn identity(&self) -> Option<&str> {
        self.id
            .as_deref()
            .or_else(|| self.primary_link().map(|l| l.href.as_str()))
    }
}

/// The full product of parsing one URL: feed-level metadata plus whatever
/// entries survived keyword filtering and the last-seen-id cutoff.
#[derive(Debug, Clone)]
pub struct ParsedFeed {
    pub feed_type: FeedType,
    pub metadata: FeedMetadata,
    pub entries: Vec<Entry>,
}

impl ParsedFeed {
    /// The degraded feed substituted for a URL whose body fetched
    /// successfully but failed to parse: an empty, defaulted contribution
    /// rather than no contribution at all, so the URL still participates in
    /// the aggregator's "first successful URL" metadata selection.
    pub fn empty_for(url: &url::Url) -> Self {
        ParsedFeed {
            feed_type: FeedType::Atom,
            metadata: FeedMetadata {
                encoding: "utf-8".to_string(),
                title: "Latest Updates".to_string(),
                id: url.to_string(),
                updated: Utc::now(),
                author: "Anonymous".to_string(),
            },
            entries: Vec::new(),
        }
    }
}
