//! Feed group configuration, loaded from a YAML document.
//!
//! The document is a top-level sequence of group records. A record missing
//! `name`, `slug`, or `urls`, or containing a URL this binary refuses to
//! fetch, is dropped with a logged error rather than failing the whole load —
//! one bad group should not prevent the rest of the config from running.

use crate::util::validate_url;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid YAML in config file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_norway::Error,
    },
}

/// Raw record as it appears in the YAML document, before URL validation.
#[derive(Debug, Clone, Deserialize)]
struct RawFeedGroup {
    name: String,
    slug: String,
    #[serde(default)]
    urls: Vec<String>,
    #[serde(default, rename = "match")]
    match_keywords: HashSet<String>,
    #[serde(default)]
    exclude: HashSet<String>,
}

/// One group of feed sources aggregated into a single output document.
#[derive(Debug, Clone)]
pub struct FeedGroup {
    pub name: String,
    pub slug: String,
    pub urls: Vec<url::Url>,
    pub match_keywords: HashSet<String>,
    pub exclude: HashSet<String>,
}

impl FeedGroup {
    /// `slug_url` key used to address the cache store for a given source URL
    /// within this group.
    pub fn slug_url(&self, source: &url::Url) -> String {
        format!("{}{}", self.slug, source)
    }

    fn from_raw(raw: RawFeedGroup) -> Option<Self> {
        if raw.name.trim().is_empty() {
            tracing::error!("dropping feed group with empty name");
            return None;
        }
        if raw.slug.trim().is_empty() {
            tracing::error!(name = %raw.name, "dropping feed group with empty slug");
            return None;
        }
        if raw.urls.is_empty() {
            tracing::error!(slug = %raw.slug, "dropping feed group with no urls");
            return None;
        }

        let mut urls = Vec::with_capacity(raw.urls.len());
        for u in &raw.urls {
            match validate_url(u) {
                Ok(parsed) => urls.push(parsed),
                Err(e) => {
                    tracing::error!(slug = %raw.slug, url = %u, error = %e, "dropping invalid url from feed group");
                }
            }
        }
        if urls.is_empty() {
            tracing::error!(slug = %raw.slug, "dropping feed group: no urls survived validation");
            return None;
        }

        Some(FeedGroup {
            name: raw.name,
            slug: raw.slug,
            urls,
            match_keywords: lowercased(raw.match_keywords),
            exclude: lowercased(raw.exclude),
        })
    }
}

fn lowercased(set: HashSet<String>) -> HashSet<String> {
    set.into_iter().map(|s| s.to_lowercase()).collect()
}

/// Load the group list from a YAML document at `path`.
///
/// A missing or unreadable file, or a document that isn't valid YAML, is a
/// fatal `ConfigError` — the caller exits with status 1. Individual
/// malformed records within an otherwise-valid document are dropped (see
/// [`FeedGroup::from_raw`]).
pub fn load_groups(path: &Path) -> Result<Vec<FeedGroup>, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.display().to_string(),
        source: e,
    })?;

    let raw: Vec<RawFeedGroup> =
        serde_norway::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            source: e,
        })?;

    let groups: Vec<FeedGroup> = raw.into_iter().filter_map(FeedGroup::from_raw).collect();
    tracing::info!(path = %path.display(), groups = groups.len(), "loaded feed group configuration");
    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_valid_groups() {
        let dir = std::env::temp_dir().join("rss_aggregator_config_test_valid");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("rss_config.yaml");
        std::fs::write(
            &path,
            r#"
- name: Rust Blogs
  slug: rust
  urls:
    - https://blog.rust-lang.org/feed.xml
  match:
    - release
  exclude:
    - survey
"#,
        )
        .unwrap();

        let groups = load_groups(&path).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].slug, "rust");
        assert_eq!(groups[0].urls.len(), 1);
        assert!(groups[0].match_keywords.contains("release"));
        assert!(groups[0].exclude.contains("survey"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn drops_group_missing_urls() {
        let dir = std::env::temp_dir().join("rss_aggregator_config_test_no_urls");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("rss_config.yaml");
        std::fs::write(
            &path,
            r#"
- name: Empty
  slug: empty
  urls: []
- name: Good
  slug: good
  urls:
    - https://example.com/feed.xml
"#,
        )
        .unwrap();

        let groups = load_groups(&path).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].slug, "good");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn drops_invalid_url_but_keeps_rest() {
        let dir = std::env::temp_dir().join("rss_aggregator_config_test_bad_url");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("rss_config.yaml");
        std::fs::write(
            &path,
            r#"
- name: Mixed
  slug: mixed
  urls:
    - file:///etc/passwd
    - https://example.com/feed.xml
"#,
        )
        .unwrap();

        let groups = load_groups(&path).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].urls.len(), 1);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_file_is_fatal() {
        let path = Path::new("/tmp/rss_aggregator_test_nonexistent_config.yaml");
        let result = load_groups(path);
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn invalid_yaml_is_fatal() {
        let dir = std::env::temp_dir().join("rss_aggregator_config_test_invalid_yaml");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("rss_config.yaml");
        std::fs::write(&path, "not: valid: yaml: [").unwrap();

        let result = load_groups(&path);
        assert!(matches!(result, Err(ConfigError::Parse { .. })));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn slug_url_concatenates_slug_and_url() {
        let group = FeedGroup {
            name: "n".into(),
            slug: "s".into(),
            urls: vec![url::Url::parse("https://example.com/feed.xml").unwrap()],
            match_keywords: HashSet::new(),
            exclude: HashSet::new(),
        };
        assert_eq!(
            group.slug_url(&group.urls[0]),
            "shttps://example.com/feed.xml"
        );
    }
}
