//! Orchestrates one full fetch → parse → aggregate → write pass over a
//! configured list of feed groups, against a shared conditional-GET cache.
//!
//! Fetching stays on the async, cooperative tier (see [`crate::feed`]);
//! parsing is CPU-bound and is handed off to `tokio`'s blocking thread pool
//! per URL so a slow parse never stalls the runtime driving the remaining
//! fetches. Writing is likewise independent per group and runs concurrently.

use crate::aggregator::{aggregate, UrlContribution};
use crate::config::FeedGroup;
use crate::feed::{fetch_all, parse_and_filter, FetchOutcome, ParsedFeed};
use crate::storage::Database;
use crate::writer::{render_and_write, RenderMode};
use std::path::Path;

/// Per-run knobs threaded through fetch, parse, and write.
#[derive(Debug, Clone, Copy)]
pub struct PipelineOptions {
    /// Enables conditional GETs, the last-seen-id cutoff, and cross-run
    /// output merging.
    pub caching: bool,
    /// Emit full `<feed>` documents instead of the entries-only default.
    pub full_document: bool,
}

/// Run one complete pipeline pass: fetch every configured URL, parse and
/// filter the ones that returned a body, aggregate by group, and write one
/// output file per group that produced anything. Per-URL failures are
/// logged and degrade only that URL's contribution; the run always
/// completes.
pub async fn run_once(
    groups: &[FeedGroup],
    client: &reqwest::Client,
    cache: &Database,
    options: PipelineOptions,
    output_dir: &Path,
) {
    tracing::info!(groups = groups.len(), caching = options.caching, "pipeline run starting");

    let fetch_tasks = fetch_all(client, groups, options.caching, cache).await;
    tracing::info!(urls = fetch_tasks.len(), "fetch stage complete");

    let mut contributions = Vec::with_capacity(fetch_tasks.len());
    for task in fetch_tasks {
        let feed = match task.outcome {
            FetchOutcome::Fetched { body, .. } => {
                parse_one(task.group, task.url, body, options.caching, cache).await
            }
            FetchOutcome::NotModified => None,
            FetchOutcome::Failed(_) => None,
        };
        contributions.push(UrlContribution {
            group: task.group,
            feed,
        });
    }
    tracing::info!("parse stage complete");

    let aggregates = aggregate(groups, contributions);
    tracing::info!(groups_with_output = aggregates.len(), "aggregate stage complete");

    if let Err(e) = tokio::fs::create_dir_all(output_dir).await {
        tracing::error!(dir = %output_dir.display(), error = %e, "failed to create output directory, aborting writes");
        return;
    }

    let mode = if options.full_document {
        RenderMode::FullDocument
    } else {
        RenderMode::EntriesOnly
    };

    let writes = aggregates
        .iter()
        .map(|group_aggregate| render_and_write(output_dir, group_aggregate, mode, options.caching));
    futures::future::join_all(writes).await;

    tracing::info!("pipeline run complete");
}

/// Parse one 200-OK fetch body for `group`/`url`, looking up and advancing
/// the cache's `last_seen_id` around the CPU-bound parse. A parse failure
/// degrades to an empty, defaulted [`ParsedFeed`] rather than dropping the
/// URL's contribution entirely (see [`ParsedFeed::empty_for`]).
async fn parse_one(
    group: &FeedGroup,
    url: &url::Url,
    body: Vec<u8>,
    caching: bool,
    cache: &Database,
) -> Option<ParsedFeed> {
    let slug_url = group.slug_url(url);
    let last_seen_id = if caching {
        cache
            .fetch_cache(&slug_url)
            .await
            .unwrap_or(None)
            .and_then(|entry| entry.last_seen_id)
    } else {
        None
    };

    let group_owned = group.clone();
    let parse_result = tokio::task::spawn_blocking(move || {
        parse_and_filter(&body, &group_owned, caching, last_seen_id.as_deref())
    })
    .await;

    match parse_result {
        Ok(Ok(filtered)) => {
            if caching {
                if let Some(advance_to) = &filtered.advance_to {
                    if let Err(e) = cache.update_cache_last_seen(&slug_url, advance_to).await {
                        tracing::warn!(slug_url = %slug_url, error = %e, "failed to persist last_seen_id");
                    }
                }
            }
            Some(filtered.feed)
        }
        Ok(Err(e)) => {
            tracing::error!(url = %url, error = %e, "feed body could not be parsed");
            Some(ParsedFeed::empty_for(url))
        }
        Err(e) => {
            tracing::error!(url = %url, error = %e, "parse task failed to complete");
            Some(ParsedFeed::empty_for(url))
        }
    }
}
