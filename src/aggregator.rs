//! Joins per-URL parse results into one aggregate per feed group.

use crate::config::FeedGroup;
use crate::feed::{Entry, FeedMetadata, FeedType, ParsedFeed};

/// The entries and metadata destined for one group's output file.
pub struct GroupAggregate<'a> {
    pub group: &'a FeedGroup,
    pub feed_type: FeedType,
    pub metadata: FeedMetadata,
    pub entries: Vec<Entry>,
}

/// One parsed URL's contribution to a group, in group-declared URL order.
pub struct UrlContribution<'a> {
    pub group: &'a FeedGroup,
    pub feed: Option<ParsedFeed>,
}

/// Join per-URL parse results into one [`GroupAggregate`] per group,
/// preserving group-declaration order and, within a group, the URL order
/// entries were declared in.
///
/// `feed_type`/`metadata` are taken from the first URL in the group that
/// produced a non-empty `ParsedFeed`. A group none of whose URLs produced
/// anything has no aggregate at all — the caller is responsible for
/// deciding whether that still warrants a write (see the writer's
/// cache/merge behavior).
pub fn aggregate<'a>(
    groups: &'a [FeedGroup],
    contributions: Vec<UrlContribution<'a>>,
) -> Vec<GroupAggregate<'a>> {
    groups
        .iter()
        .filter_map(|group| {
            let mut feeds: Vec<ParsedFeed> = contributions
                .iter()
                .filter(|c| std::ptr::eq(c.group, group))
                .filter_map(|c| c.feed.clone())
                .collect();

            let first_non_empty = feeds.iter().position(|f| !f.entries.is_empty());
            let (feed_type, metadata) = match first_non_empty {
                Some(idx) => (feeds[idx].feed_type, feeds[idx].metadata.clone()),
                None => (feeds.first()?.feed_type, feeds.first()?.metadata.clone()),
            };

            let entries: Vec<Entry> = feeds
                .drain(..)
                .flat_map(|f| f.entries.into_iter())
                .collect();

            Some(GroupAggregate {
                group,
                feed_type,
                metadata,
                entries,
            })
        })
        .collect()
}
