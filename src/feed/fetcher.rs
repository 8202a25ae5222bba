//! Concurrent conditional-GET fetcher.
//!
//! Issues one HTTP GET per `(group, url)` pair, attaching `If-None-Match`/
//! `If-Modified-Since` request headers when caching is enabled and a cache
//! entry exists. There is no retry policy: one attempt per URL per run, a
//! failure only degrades that URL's contribution for this run.

use crate::config::FeedGroup;
use crate::storage::CacheEntry;
use futures::stream::{self, StreamExt};
use std::time::Duration;
use thiserror::Error;

/// Response bodies are streamed under this ceiling to bound memory use
/// against a misbehaving or hostile origin.
const MAX_FEED_SIZE: usize = 10 * 1024 * 1024;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Fetch tier concurrency: how many in-flight requests are allowed across
/// all configured URLs at once.
const MAX_CONCURRENT_FETCHES: usize = 16;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("request timed out")]
    Timeout,
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    #[error("response too large (over {MAX_FEED_SIZE} bytes)")]
    ResponseTooLarge,
    #[error("incomplete response: expected {expected} bytes, received {received}")]
    IncompleteResponse { expected: u64, received: usize },
}

/// Outcome of fetching one `(group, url)` pair.
pub enum FetchOutcome {
    /// 200 OK; body plus the validators to persist.
    Fetched {
        body: Vec<u8>,
        etag: Option<String>,
        last_modified: Option<String>,
    },
    /// 304 Not Modified; the group's prior cached state stands for this URL.
    NotModified,
    /// Any other non-2xx status, transport error, or size/timeout violation.
    Failed(FetchError),
}

pub struct FetchTask<'a> {
    pub group: &'a FeedGroup,
    pub url: &'a url::Url,
    pub outcome: FetchOutcome,
}

/// Fetch every `(group, url)` pair across `groups`, overlapping network
/// waits up to [`MAX_CONCURRENT_FETCHES`] at a time. Results are yielded in
/// the same `(group, url)` declaration order they were enqueued in —
/// `buffered` (not `buffer_unordered`) preserves that order while still
/// letting up to [`MAX_CONCURRENT_FETCHES`] requests race concurrently, so
/// the aggregator can rely on completion order matching config order.
pub async fn fetch_all<'a>(
    client: &reqwest::Client,
    groups: &'a [FeedGroup],
    caching: bool,
    cache: &crate::storage::Database,
) -> Vec<FetchTask<'a>> {
    let pairs: Vec<(&FeedGroup, &url::Url)> = groups
        .iter()
        .flat_map(|g| g.urls.iter().map(move |u| (g, u)))
        .collect();

    stream::iter(pairs)
        .map(|(group, url)| async move {
            let slug_url = group.slug_url(url);
            let cached = if caching {
                cache.fetch_cache(&slug_url).await.unwrap_or(None)
            } else {
                None
            };

            let outcome = fetch_one(client, url, cached.as_ref()).await;

            if let FetchOutcome::Fetched {
                etag,
                last_modified,
                ..
            } = &outcome
            {
                if caching {
                    if let Err(e) = cache
                        .update_cache_validators(&slug_url, etag.as_deref(), last_modified.as_deref())
                        .await
                    {
                        tracing::warn!(slug_url = %slug_url, error = %e, "failed to persist cache validators");
                    }
                }
            }

            FetchTask { group, url, outcome }
        })
        .buffered(MAX_CONCURRENT_FETCHES)
        .collect()
        .await
}

async fn fetch_one(
    client: &reqwest::Client,
    url: &url::Url,
    cached: Option<&CacheEntry>,
) -> FetchOutcome {
    let mut request = client.get(url.clone());
    if let Some(entry) = cached {
        if let Some(etag) = &entry.etag {
            request = request.header(reqwest::header::IF_NONE_MATCH, etag);
        }
        if let Some(last_modified) = &entry.last_modified {
            request = request.header(reqwest::header::IF_MODIFIED_SINCE, last_modified);
        }
    }

    let response = match tokio::time::timeout(REQUEST_TIMEOUT, request.send()).await {
        Ok(Ok(resp)) => resp,
        Ok(Err(e)) => {
            tracing::error!(url = %url, error = %e, "fetch transport error");
            return FetchOutcome::Failed(FetchError::Network(e));
        }
        Err(_) => {
            tracing::error!(url = %url, "fetch timed out");
            return FetchOutcome::Failed(FetchError::Timeout);
        }
    };

    if response.status() == reqwest::StatusCode::NOT_MODIFIED {
        return FetchOutcome::NotModified;
    }

    if response.status() == reqwest::StatusCode::NOT_FOUND {
        tracing::error!(url = %url, status = 404, "fetch returned not found");
        return FetchOutcome::Failed(FetchError::HttpStatus(404));
    }

    if !response.status().is_success() {
        let status = response.status().as_u16();
        tracing::error!(url = %url, status = status, "fetch returned error status");
        return FetchOutcome::Failed(FetchError::HttpStatus(status));
    }

    let etag = response
        .headers()
        .get(reqwest::header::ETAG)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let last_modified = response
        .headers()
        .get(reqwest::header::LAST_MODIFIED)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    match read_limited_bytes(response, MAX_FEED_SIZE).await {
        Ok(body) => FetchOutcome::Fetched {
            body,
            etag,
            last_modified,
        },
        Err(e) => {
            tracing::error!(url = %url, error = %e, "fetch body read failed");
            FetchOutcome::Failed(e)
        }
    }
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    let expected_length = response.content_length();

    if let Some(len) = expected_length {
        if len as usize > limit {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(FetchError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    if let Some(expected) = expected_length {
        if (bytes.len() as u64) < expected {
            return Err(FetchError::IncompleteResponse {
                expected,
                received: bytes.len(),
            });
        }
    }

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;
    use std::collections::HashSet;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const VALID_RSS: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
    <item><guid>1</guid><title>Test</title></item>
</channel></rss>"#;

    fn group_for(url: &str) -> FeedGroup {
        FeedGroup {
            name: "Test".into(),
            slug: "test".into(),
            urls: vec![url::Url::parse(url).unwrap()],
            match_keywords: HashSet::new(),
            exclude: HashSet::new(),
        }
    }

    #[tokio::test]
    async fn fetch_success_returns_body_and_validators() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(VALID_RSS)
                    .insert_header("ETag", "\"abc\"")
                    .insert_header("Content-Type", "application/xml"),
            )
            .mount(&mock_server)
            .await;

        let groups = vec![group_for(&format!("{}/feed", mock_server.uri()))];
        let db = Database::open(":memory:").await.unwrap();
        let client = reqwest::Client::new();

        let results = fetch_all(&client, &groups, false, &db).await;
        assert_eq!(results.len(), 1);
        match &results[0].outcome {
            FetchOutcome::Fetched { body, etag, .. } => {
                assert!(!body.is_empty());
                assert_eq!(etag.as_deref(), Some("\"abc\""));
            }
            _ => panic!("expected Fetched"),
        }
    }

    #[tokio::test]
    async fn fetch_404_is_failed_without_retry() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&mock_server)
            .await;

        let groups = vec![group_for(&format!("{}/feed", mock_server.uri()))];
        let db = Database::open(":memory:").await.unwrap();
        let client = reqwest::Client::new();

        let results = fetch_all(&client, &groups, false, &db).await;
        match &results[0].outcome {
            FetchOutcome::Failed(FetchError::HttpStatus(404)) => {}
            _ => panic!("expected HttpStatus(404) failure"),
        }
    }

    #[tokio::test]
    async fn fetch_304_is_not_modified() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(304))
            .mount(&mock_server)
            .await;

        let groups = vec![group_for(&format!("{}/feed", mock_server.uri()))];
        let db = Database::open(":memory:").await.unwrap();
        db.update_cache_validators(&groups[0].slug_url(&groups[0].urls[0]), Some("\"abc\""), None)
            .await
            .unwrap();
        let client = reqwest::Client::new();

        let results = fetch_all(&client, &groups, true, &db).await;
        assert!(matches!(results[0].outcome, FetchOutcome::NotModified));
    }

    #[tokio::test]
    async fn fetch_all_preserves_declared_url_order_even_when_a_later_url_responds_first() {
        use wiremock::matchers::path;

        let mock_server = MockServer::start().await;
        // The first-declared URL responds slowly; the second responds instantly.
        // If results were returned in completion order, the fast one would
        // appear first — but §4.4/§5 require group-declaration order.
        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("slow")
                    .set_delay(Duration::from_millis(150)),
            )
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/fast"))
            .respond_with(ResponseTemplate::new(200).set_body_string("fast"))
            .mount(&mock_server)
            .await;

        let group = FeedGroup {
            name: "Test".into(),
            slug: "test".into(),
            urls: vec![
                url::Url::parse(&format!("{}/slow", mock_server.uri())).unwrap(),
                url::Url::parse(&format!("{}/fast", mock_server.uri())).unwrap(),
            ],
            match_keywords: HashSet::new(),
            exclude: HashSet::new(),
        };
        let groups = vec![group];
        let db = Database::open(":memory:").await.unwrap();
        let client = reqwest::Client::new();

        let results = fetch_all(&client, &groups, false, &db).await;
        assert_eq!(results.len(), 2);
        assert!(results[0].url.as_str().ends_with("/slow"));
        assert!(results[1].url.as_str().ends_with("/fast"));
    }
}
