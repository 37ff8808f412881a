//! Book summary index discovery.
//!
//! The summaries index links each book as `https://.../{slug}-summary/`;
//! discovery pattern-matches those hrefs, deduplicates, and caps the batch.

use std::sync::LazyLock;

use regex::Regex;
use reqwest::Client;
use tracing::debug;

use super::{DiscoveryError, Result};

const SUMMARIES_INDEX: &str = "https://fourminutebooks.com/book-summaries/";

/// Book summary links on the index page.
#[allow(clippy::expect_used)]
static SUMMARY_LINK_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"href="(https://fourminutebooks\.com/[^"/]+-summary/)""#)
        .expect("summary link regex is valid")
});

/// Books processed per discovery.
const BATCH_SIZE: usize = 5;

/// Discovers book summary URLs from the index page.
pub(super) async fn discover_summaries(http: &Client) -> Result<Vec<String>> {
    discover_summaries_at(http, SUMMARIES_INDEX).await
}

pub(super) async fn discover_summaries_at(http: &Client, index_url: &str) -> Result<Vec<String>> {
    let html = http
        .get(index_url)
        .send()
        .await
        .map_err(|e| DiscoveryError::http(index_url, e))?
        .text()
        .await
        .map_err(|e| DiscoveryError::http(index_url, e))?;

    let mut urls: Vec<String> = Vec::new();
    for captures in SUMMARY_LINK_PATTERN.captures_iter(&html) {
        let url = captures[1].to_string();
        if !urls.contains(&url) {
            urls.push(url);
        }
        if urls.len() == BATCH_SIZE {
            break;
        }
    }

    debug!(count = urls.len(), "collected book summary links");
    Ok(urls)
}
