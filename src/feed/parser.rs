//! Parses one fetched feed body into a [`ParsedFeed`], applying the
//! match/exclude keyword filter and the last-seen-id cutoff along the way.

use super::types::{EntryLink, Enclosure, Entry, FeedMetadata, FeedType, ParsedFeed, Tag};
use crate::config::FeedGroup;
use chrono::Utc;
use feed_rs::model::{self, Feed as RawFeed};
use quick_xml::events::Event as XmlEvent;
use quick_xml::Reader;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("feed body could not be parsed as RSS or Atom: {0}")]
    Malformed(#[from] feed_rs::parser::ParseFeedError),
}

/// Result of parsing and filtering one URL against its group's keyword
/// rules and the cache's last-seen-id cutoff.
pub struct FilteredFeed {
    pub feed: ParsedFeed,
    /// New `last_seen_id` to persist to the cache, if caching is enabled and
    /// at least one entry was kept.
    pub advance_to: Option<String>,
}

/// Parse raw feed bytes and filter the resulting entries for `group`.
///
/// `caching` gates both the last-seen-id cutoff and whether an advance value
/// is computed at all. `last_seen_id` is the cache's current value for this
/// `slug_url`, or `None` if there is none yet.
pub fn parse_and_filter(
    bytes: &[u8],
    group: &FeedGroup,
    caching: bool,
    last_seen_id: Option<&str>,
) -> Result<FilteredFeed, ParseError> {
    let raw = feed_rs::parser::parse(bytes)?;
    let feed_type = classify(&raw);
    let metadata = extract_metadata(&raw, feed_type);
    let raw_dates = extract_raw_dates(bytes);

    let mut kept = Vec::new();
    for (idx, raw_entry) in raw.entries.into_iter().enumerate() {
        let dates = raw_dates.get(idx).cloned().unwrap_or_default();
        let entry = convert_entry(raw_entry, dates);

        if caching {
            if let (Some(seen), Some(identity)) = (last_seen_id, entry.identity()) {
                if identity == seen {
                    break;
                }
            }
        }

        if passes_keywords(&entry, group) {
            kept.push(entry);
        }
    }

    let advance_to = if caching {
        kept.first().and_then(|e| e.identity().map(str::to_string))
    } else {
        None
    };

    Ok(FilteredFeed {
        feed: ParsedFeed {
            feed_type,
            metadata,
            entries: kept,
        },
        advance_to,
    })
}

fn classify(feed: &RawFeed) -> FeedType {
    match feed.feed_type {
        model::FeedType::RSS0 | model::FeedType::RSS1 | model::FeedType::RSS2 => FeedType::Rss,
        model::FeedType::Atom | model::FeedType::JSON => FeedType::Atom,
    }
}

fn extract_metadata(feed: &RawFeed, feed_type: FeedType) -> FeedMetadata {
    let title = feed
        .title
        .as_ref()
        .map(|t| t.content.clone())
        .unwrap_or_else(|| "Latest Updates".to_string());

    let id = if feed.id.trim().is_empty() {
        feed.links
            .first()
            .map(|l| l.href.clone())
            .unwrap_or_default()
    } else {
        feed.id.clone()
    };

    let updated = feed.updated.unwrap_or_else(Utc::now);

    let author = feed
        .authors
        .first()
        .map(|p| p.name.clone())
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| "Anonymous".to_string());

    let _ = feed_type; // encoding is not surfaced by feed-rs; default applies uniformly
    FeedMetadata {
        encoding: "utf-8".to_string(),
        title,
        id,
        updated,
        author,
    }
}

/// Raw, unparsed `<published>`/`<updated>`-equivalent text captured for one
/// entry, independent of feed-rs's own date parsing.
#[derive(Debug, Clone, Default)]
struct RawEntryDates {
    published: Option<String>,
    updated: Option<String>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum DateField {
    Published,
    Updated,
}

/// Scan `bytes` for the raw text of each entry's published/updated date
/// element, in document order.
///
/// feed-rs discards the source string entirely when it fails to parse a
/// date (e.g. the non-standard `UT` zone abbreviation), leaving nothing for
/// the writer's tolerant RFC-3339 coercion to retry against. This walks the
/// document independently of feed-rs's own parse so that text survives even
/// when feed-rs's own attempt did not.
fn extract_raw_dates(bytes: &[u8]) -> Vec<RawEntryDates> {
    let mut reader = Reader::from_reader(bytes);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut out = Vec::new();
    let mut in_entry = false;
    let mut current = RawEntryDates::default();
    let mut capturing: Option<DateField> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(XmlEvent::Start(e)) => match local_name(e.name()).as_str() {
                "entry" | "item" => {
                    in_entry = true;
                    current = RawEntryDates::default();
                }
                "published" | "pubDate" if in_entry => capturing = Some(DateField::Published),
                "updated" if in_entry => capturing = Some(DateField::Updated),
                _ => {}
            },
            Ok(XmlEvent::Text(t)) => {
                if let Some(field) = capturing {
                    if let Ok(text) = t.unescape() {
                        let text = text.trim();
                        if !text.is_empty() {
                            match field {
                                DateField::Published => current.published = Some(text.to_string()),
                                DateField::Updated => current.updated = Some(text.to_string()),
                            }
                        }
                    }
                }
            }
            Ok(XmlEvent::End(e)) => {
                let name = local_name(e.name());
                if matches!(name.as_str(), "published" | "pubDate" | "updated") {
                    capturing = None;
                }
                if in_entry && matches!(name.as_str(), "entry" | "item") {
                    in_entry = false;
                    out.push(std::mem::take(&mut current));
                }
            }
            Ok(XmlEvent::Eof) => break,
            Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    out
}

fn local_name(name: quick_xml::name::QName) -> String {
    let raw = String::from_utf8_lossy(name.as_ref());
    match raw.rsplit_once(':') {
        Some((_, local)) => local.to_string(),
        None => raw.to_string(),
    }
}

fn convert_entry(raw: model::Entry, dates: RawEntryDates) -> Entry {
    let id = if raw.id.trim().is_empty() {
        None
    } else {
        Some(raw.id)
    };

    let title = raw.title.map(|t| t.content);

    let (summary, summary_type) = raw
        .summary
        .map(|t| (Some(t.content), Some(t.content_type.to_string())))
        .or_else(|| {
            raw.content
                .and_then(|c| c.body)
                .map(|body| (Some(body), Some("text/html".to_string())))
        })
        .unwrap_or((None, None));

    let author = raw
        .authors
        .first()
        .map(|p| p.name.clone())
        .filter(|n| !n.trim().is_empty());

    let links: Vec<EntryLink> = raw
        .links
        .iter()
        .filter(|l| l.rel.as_deref() != Some("enclosure"))
        .map(|l| EntryLink {
            href: l.href.clone(),
            rel: l.rel.clone(),
            media_type: l.media_type.clone(),
        })
        .collect();

    let enclosures: Vec<Enclosure> = raw
        .links
        .iter()
        .filter(|l| l.rel.as_deref() == Some("enclosure"))
        .map(|l| Enclosure {
            href: l.href.clone(),
            media_type: l.media_type.clone(),
            length: l.length,
        })
        .collect();

    let tags: Vec<Tag> = raw
        .categories
        .into_iter()
        .map(|c| Tag {
            scheme: c.scheme,
            label: c.label,
            term: c.term,
        })
        .collect();

    Entry {
        id,
        title,
        published: raw.published,
        updated: raw.updated,
        published_raw: dates.published,
        updated_raw: dates.updated,
        summary,
        summary_type,
        author,
        links,
        enclosures,
        tags,
    }
}

/// Lowercased textual projection of an entry, used for keyword matching.
fn projection(entry: &Entry) -> String {
    let mut parts = Vec::new();
    if let Some(t) = &entry.title {
        parts.push(t.as_str());
    }
    if let Some(s) = &entry.summary {
        parts.push(s.as_str());
    }
    if let Some(a) = &entry.author {
        parts.push(a.as_str());
    }
    for link in &entry.links {
        parts.push(link.href.as_str());
    }
    parts.join(" ").to_lowercase()
}

fn passes_keywords(entry: &Entry, group: &FeedGroup) -> bool {
    let text = projection(entry);

    let matches = group.match_keywords.is_empty()
        || group.match_keywords.iter().any(|kw| text.contains(kw));
    if !matches {
        return false;
    }

    !group.exclude.iter().any(|kw| text.contains(kw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn group(match_kw: &[&str], exclude_kw: &[&str]) -> FeedGroup {
        FeedGroup {
            name: "Test".into(),
            slug: "test".into(),
            urls: vec![url::Url::parse("https://example.com/feed.xml").unwrap()],
            match_keywords: match_kw.iter().map(|s| s.to_string()).collect(),
            exclude: exclude_kw.iter().map(|s| s.to_string()).collect(),
        }
    }

    const ATOM_FEED: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Example Feed</title>
  <id>urn:uuid:60a76c80-d399-11d9-b93C-0003939e0af6</id>
  <updated>2024-01-01T00:00:00Z</updated>
  <entry>
    <title>x-new release</title>
    <id>urn:uuid:1225c695-cfb8-4ebb-aaaa-80da344efa6a</id>
    <updated>2024-01-03T00:00:00Z</updated>
    <link href="https://example.com/a"/>
    <summary>about the x release</summary>
  </entry>
  <entry>
    <title>y-old</title>
    <id>urn:uuid:1225c695-cfb8-4ebb-aaaa-80da344efa6b</id>
    <updated>2024-01-02T00:00:00Z</updated>
    <link href="https://example.com/b"/>
  </entry>
</feed>"#;

    #[test]
    fn filters_by_match_keyword() {
        let g = group(&["x-new"], &[]);
        let result = parse_and_filter(ATOM_FEED.as_bytes(), &g, false, None).unwrap();
        assert_eq!(result.feed.entries.len(), 1);
        assert_eq!(result.feed.entries[0].title.as_deref(), Some("x-new release"));
    }

    #[test]
    fn excludes_override_match() {
        let g = group(&[], &["old"]);
        let result = parse_and_filter(ATOM_FEED.as_bytes(), &g, false, None).unwrap();
        assert_eq!(result.feed.entries.len(), 1);
        assert_eq!(result.feed.entries[0].title.as_deref(), Some("x-new release"));
    }

    #[test]
    fn empty_match_keeps_everything_not_excluded() {
        let g = group(&[], &[]);
        let result = parse_and_filter(ATOM_FEED.as_bytes(), &g, false, None).unwrap();
        assert_eq!(result.feed.entries.len(), 2);
    }

    #[test]
    fn stops_at_last_seen_id_when_caching() {
        let g = group(&[], &[]);
        let seen = "urn:uuid:1225c695-cfb8-4ebb-aaaa-80da344efa6b";
        let result = parse_and_filter(ATOM_FEED.as_bytes(), &g, true, Some(seen)).unwrap();
        assert_eq!(result.feed.entries.len(), 1);
        assert_eq!(result.feed.entries[0].title.as_deref(), Some("x-new release"));
    }

    #[test]
    fn advances_cache_to_newest_kept_entry() {
        let g = group(&[], &[]);
        let result = parse_and_filter(ATOM_FEED.as_bytes(), &g, true, None).unwrap();
        assert_eq!(
            result.advance_to.as_deref(),
            Some("urn:uuid:1225c695-cfb8-4ebb-aaaa-80da344efa6a")
        );
    }

    #[test]
    fn no_advance_when_caching_disabled() {
        let g = group(&[], &[]);
        let result = parse_and_filter(ATOM_FEED.as_bytes(), &g, false, None).unwrap();
        assert!(result.advance_to.is_none());
    }

    #[test]
    fn metadata_defaults_apply() {
        let minimal = r#"<?xml version="1.0"?><rss version="2.0"><channel></channel></rss>"#;
        let g = group(&[], &[]);
        let result = parse_and_filter(minimal.as_bytes(), &g, false, None).unwrap();
        assert_eq!(result.feed.metadata.title, "Latest Updates");
        assert_eq!(result.feed.metadata.author, "Anonymous");
        assert_eq!(result.feed.metadata.encoding, "utf-8");
    }

    #[test]
    fn malformed_body_is_an_error() {
        let g = group(&[], &[]);
        let result = parse_and_filter(b"<not valid xml", &g, false, None);
        assert!(result.is_err());
    }

    #[test]
    fn captures_raw_published_text_independent_of_feed_rs_parsing() {
        let feed = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Example Feed</title>
  <id>urn:uuid:60a76c80-d399-11d9-b93C-0003939e0af6</id>
  <updated>2024-01-01T00:00:00Z</updated>
  <entry>
    <title>non-standard date</title>
    <id>urn:uuid:1225c695-cfb8-4ebb-aaaa-80da344efa6c</id>
    <published>Mon, 01 Jan 2024 12:00:00 UT</published>
    <updated>2024-01-01T12:00:00Z</updated>
    <link href="https://example.com/c"/>
  </entry>
</feed>"#;
        let g = group(&[], &[]);
        let result = parse_and_filter(feed.as_bytes(), &g, false, None).unwrap();
        assert_eq!(result.feed.entries.len(), 1);
        assert_eq!(
            result.feed.entries[0].published_raw.as_deref(),
            Some("Mon, 01 Jan 2024 12:00:00 UT")
        );
    }
}
