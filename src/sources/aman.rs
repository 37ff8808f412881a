//! Primer index discovery for the article source.
//!
//! The primer index page links every article; discovery collects the links
//! under the primer path, resolved to absolute URLs and deduplicated in
//! first-seen order.

use reqwest::Client;
use scraper::Html;
use tracing::debug;
use url::Url;

use crate::extract::dom::selector;

use super::{DiscoveryError, Result};

const PRIMER_INDEX: &str = "https://aman.ai/primers/ai/";

/// Path marker identifying primer article links.
const PRIMER_PATH: &str = "/primers/";

/// Discovers article URLs from the primer index page.
pub(super) async fn discover_articles(http: &Client) -> Result<Vec<String>> {
    discover_articles_at(http, PRIMER_INDEX).await
}

pub(super) async fn discover_articles_at(http: &Client, index_url: &str) -> Result<Vec<String>> {
    let html = http
        .get(index_url)
        .send()
        .await
        .map_err(|e| DiscoveryError::http(index_url, e))?
        .text()
        .await
        .map_err(|e| DiscoveryError::http(index_url, e))?;

    let base = Url::parse(index_url)
        .map_err(|e| DiscoveryError::api("aman", format!("bad index url: {e}")))?;

    let document = Html::parse_document(&html);
    let link_sel = selector("a[href]");

    let mut urls: Vec<String> = Vec::new();
    for link in document.select(&link_sel) {
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        let Ok(resolved) = base.join(href) else {
            continue;
        };
        let url = resolved.to_string();
        // Keep article links only; skip the index itself.
        if url.contains(PRIMER_PATH) && url != base.as_str() && !urls.contains(&url) {
            urls.push(url);
        }
    }

    debug!(count = urls.len(), "collected primer links");
    Ok(urls)
}
