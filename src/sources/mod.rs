//! Source catalog and URL discovery.
//!
//! Each configured content source has a [`SourceSpec`] entry: what kind of
//! content it yields, how hard to pace requests against it, and how its URL
//! set is discovered. Explicit URL overrides from the per-source profile
//! (`HARVESTER_<SOURCE>_URLS`) take precedence over discovery entirely.
//!
//! Discovery failure is a hard error for an invocation: with no URL set
//! there is nothing to do.

mod aman;
mod books;
mod codeforces;
mod hackernews;

use reqwest::Client;
use thiserror::Error;
use tracing::{info, instrument};

use crate::content::ContentType;

/// Result type for discovery operations.
pub type Result<T> = std::result::Result<T, DiscoveryError>;

/// A configured content source.
#[derive(Debug, Clone, Copy)]
pub struct SourceSpec {
    /// Source name, also the dispatch key for extraction.
    pub name: &'static str,
    /// Content type this source yields.
    pub content_type: ContentType,
    /// Default inter-request delay against this source (ms).
    pub default_delay_ms: u64,
}

/// The built-in source catalog.
pub const SOURCES: [SourceSpec; 5] = [
    SourceSpec {
        name: "codeforces",
        content_type: ContentType::Problem,
        default_delay_ms: 3000,
    },
    SourceSpec {
        name: "codeforces-editorials",
        content_type: ContentType::Tutorial,
        default_delay_ms: 3000,
    },
    SourceSpec {
        name: "aman",
        content_type: ContentType::Article,
        default_delay_ms: 2000,
    },
    SourceSpec {
        name: "fourminutebooks",
        content_type: ContentType::Book,
        default_delay_ms: 5000,
    },
    SourceSpec {
        name: "hackernews",
        content_type: ContentType::Article,
        default_delay_ms: 2000,
    },
];

/// Looks up a source by name.
#[must_use]
pub fn find_source(name: &str) -> Option<&'static SourceSpec> {
    SOURCES.iter().find(|spec| spec.name == name)
}

/// Errors that can occur during URL discovery.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// Index/API request failed.
    #[error("discovery request failed for {url}: {source}")]
    Http {
        /// The index or API URL.
        url: String,
        /// Underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The index/API responded but its payload was unusable.
    #[error("discovery response unusable for {source_name}: {message}")]
    Api {
        /// Source being discovered.
        source_name: String,
        /// What was wrong with the payload.
        message: String,
    },

    /// Discovery produced no URLs (or the source has no discovery at all).
    #[error("no urls available for source '{source_name}': {message}")]
    NoUrls {
        /// Source being discovered.
        source_name: String,
        /// How to supply URLs for this source.
        message: String,
    },
}

impl DiscoveryError {
    pub(crate) fn http(url: &str, source: reqwest::Error) -> Self {
        Self::Http {
            url: url.to_string(),
            source,
        }
    }

    pub(crate) fn api(source_name: &str, message: impl Into<String>) -> Self {
        Self::Api {
            source_name: source_name.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn no_urls(source_name: &str, message: impl Into<String>) -> Self {
        Self::NoUrls {
            source_name: source_name.to_string(),
            message: message.into(),
        }
    }
}

/// Discovers the URL set for a source, capped at `limit` when given.
///
/// # Errors
///
/// Returns [`DiscoveryError`] when the source's index cannot be fetched,
/// parses to nothing, or the source has no discovery mechanism.
#[instrument(skip(http), fields(source = spec.name))]
pub async fn discover_urls(
    spec: &SourceSpec,
    http: &Client,
    limit: Option<usize>,
) -> Result<Vec<String>> {
    let mut urls = match spec.name {
        "codeforces" => codeforces::discover_problems(http).await?,
        "aman" => aman::discover_articles(http).await?,
        "fourminutebooks" => books::discover_summaries(http).await?,
        "hackernews" => hackernews::discover_stories(http).await?,
        "codeforces-editorials" => {
            return Err(DiscoveryError::no_urls(
                spec.name,
                "editorial pages have no index; set HARVESTER_CODEFORCES_EDITORIALS_URLS",
            ));
        }
        other => {
            return Err(DiscoveryError::no_urls(other, "unknown source"));
        }
    };

    if let Some(limit) = limit {
        urls.truncate(limit);
    }
    if urls.is_empty() {
        return Err(DiscoveryError::no_urls(spec.name, "discovery found nothing"));
    }

    info!(count = urls.len(), "discovered urls");
    Ok(urls)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_lookup() {
        let spec = find_source("codeforces").unwrap();
        assert_eq!(spec.content_type, ContentType::Problem);
        assert_eq!(spec.default_delay_ms, 3000);

        assert!(find_source("nope").is_none());
    }

    #[test]
    fn test_catalog_names_are_unique() {
        let mut names: Vec<_> = SOURCES.iter().map(|s| s.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), SOURCES.len());
    }

    #[tokio::test]
    async fn test_editorials_require_explicit_urls() {
        let spec = find_source("codeforces-editorials").unwrap();
        let err = discover_urls(spec, &Client::new(), None).await.unwrap_err();
        assert!(matches!(err, DiscoveryError::NoUrls { .. }));
        assert!(err.to_string().contains("HARVESTER_CODEFORCES_EDITORIALS_URLS"));
    }
}
