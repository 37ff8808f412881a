//! Hacker News story discovery via the Firebase API.
//!
//! The top-stories endpoint returns up to 500 story ids; each id is fetched
//! individually and kept when it is a real story with an outbound link and
//! enough points to suggest substance. Discovery takes a deterministic
//! prefix of the qualifying stories so repeated invocations resume the same
//! front-of-list window.

use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{DiscoveryError, Result};

const API_BASE: &str = "https://hacker-news.firebaseio.com/v0";

/// How many top-story ids to examine per discovery.
const ID_WINDOW: usize = 200;

/// Minimum score for a story to qualify.
const MIN_SCORE: i64 = 100;

/// Default number of stories per discovery.
const DEFAULT_BATCH: usize = 50;

/// A Hacker News item. Dead or deleted items come back as `null` and are
/// deserialized as `None` at the call site.
#[derive(Debug, Deserialize)]
struct Story {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    score: i64,
    #[serde(rename = "type", default)]
    kind: Option<String>,
}

impl Story {
    fn qualifies(&self) -> bool {
        self.kind.as_deref() == Some("story")
            && self.score > MIN_SCORE
            && self.url.as_deref().is_some_and(|url| !url.is_empty())
    }
}

pub(super) async fn discover_stories(http: &Client) -> Result<Vec<String>> {
    discover_stories_at(http, API_BASE).await
}

pub(super) async fn discover_stories_at(http: &Client, api_base: &str) -> Result<Vec<String>> {
    let index_url = format!("{api_base}/topstories.json");
    let ids: Vec<i64> = http
        .get(&index_url)
        .send()
        .await
        .map_err(|error| DiscoveryError::http(&index_url, error))?
        .json()
        .await
        .map_err(|error| DiscoveryError::http(&index_url, error))?;
    debug!(ids = ids.len(), "fetched top story ids");

    let mut urls = Vec::new();
    for id in ids.into_iter().take(ID_WINDOW) {
        if urls.len() >= DEFAULT_BATCH {
            break;
        }
        let item_url = format!("{api_base}/item/{id}.json");
        let story: Option<Story> = http
            .get(&item_url)
            .send()
            .await
            .map_err(|error| DiscoveryError::http(&item_url, error))?
            .json()
            .await
            .map_err(|error| DiscoveryError::http(&item_url, error))?;

        if let Some(story) = story
            && story.qualifies()
            && let Some(url) = story.url
        {
            debug!(id, %url, "story qualifies");
            urls.push(url);
        }
    }

    Ok(urls)
}
