//! Client for the remote rendering backend, with retry and fallback.
//!
//! The rendering backend fetches a target page (optionally executing
//! JavaScript) and returns markdown and/or HTML. Two variants are supported
//! via configuration: a local instance (no credential) and a hosted instance
//! (bearer API key). When neither is usable the client falls back to a
//! direct fetch with tag stripping - reduced fidelity, no script execution.
//!
//! All retry/backoff decisions live here; callers only ever see a final
//! [`ScrapeResult`].

use std::collections::HashMap;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::config::{BackendConfig, SourceProfile};

use super::classify::{ErrorKind, classify};
use super::error::ScrapeError;
use super::retry::{RetryDecision, RetryPolicy};

/// Bounded timeout for a single scrape attempt.
const ATTEMPT_TIMEOUT_SECS: u64 = 60;

/// Timeout forwarded to the rendering backend for page loads (ms).
const RENDER_TIMEOUT_MS: u64 = 30_000;

/// Character cap applied to fallback tag-stripped text.
const FALLBACK_TEXT_CAP: usize = 15_000;

/// Size of the content sample handed to the classifier.
const CONTENT_SAMPLE_LEN: usize = 4000;

/// Browser User-Agent used by the direct-fetch fallback.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Outcome of a scrape after the retry loop has run to completion.
///
/// Transient, not persisted. `retries` counts the extra attempts beyond the
/// first.
#[derive(Debug, Clone)]
pub struct ScrapeResult {
    /// Whether usable content was obtained.
    pub success: bool,
    /// Markdown rendering of the page, when the backend produced one.
    pub markdown: Option<String>,
    /// Raw HTML of the page.
    pub html: Option<String>,
    /// Error message for failed scrapes.
    pub error: Option<String>,
    /// Classified failure kind for failed scrapes.
    pub error_kind: Option<ErrorKind>,
    /// Number of retries performed.
    pub retries: u32,
}

impl ScrapeResult {
    fn success(markdown: Option<String>, html: Option<String>, retries: u32) -> Self {
        Self {
            success: true,
            markdown,
            html,
            error: None,
            error_kind: None,
            retries,
        }
    }

    fn failure(error: impl Into<String>, kind: ErrorKind, retries: u32) -> Self {
        Self {
            success: false,
            markdown: None,
            html: None,
            error: Some(error.into()),
            error_kind: Some(kind),
            retries,
        }
    }

    /// Preferred textual content: markdown first, HTML otherwise.
    #[must_use]
    pub fn content(&self) -> Option<&str> {
        self.markdown.as_deref().or(self.html.as_deref())
    }
}

/// Request body for the rendering backend's scrape endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RenderRequest<'a> {
    url: &'a str,
    formats: [&'static str; 2],
    only_main_content: bool,
    timeout: u64,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    headers: HashMap<String, String>,
}

/// Response body from the rendering backend.
#[derive(Debug, Deserialize)]
struct RenderResponse {
    #[serde(default)]
    data: Option<RenderData>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RenderData {
    #[serde(default)]
    markdown: Option<String>,
    #[serde(default)]
    html: Option<String>,
}

/// Scrape client wrapping the rendering backend with retry/backoff.
#[derive(Debug, Clone)]
pub struct ScrapeClient {
    http: Client,
    backend: BackendConfig,
    policy: RetryPolicy,
}

impl ScrapeClient {
    /// Creates a client for the given backend with the given retry policy.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new(backend: BackendConfig, policy: RetryPolicy) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(ATTEMPT_TIMEOUT_SECS))
            .build()
            .expect("failed to build HTTP client with static configuration");
        Self {
            http,
            backend,
            policy,
        }
    }

    /// Scrapes a URL, retrying transient failures with exponential backoff.
    ///
    /// CAPTCHA/BLOCKED results are returned immediately without retry; the
    /// caller is expected to pause the owning job and stop the run.
    #[instrument(skip(self, profile), fields(url = %url))]
    pub async fn scrape_with_retry(&self, url: &str, profile: &SourceProfile) -> ScrapeResult {
        let mut attempt: u32 = 1;

        loop {
            let outcome = if self.backend.is_usable() {
                self.render_once(url, profile).await
            } else {
                self.direct_fetch(url, profile).await
            };

            match outcome {
                Ok((markdown, html)) => {
                    // A 200-status response can still be a disguised
                    // verification page; sample the body before trusting it.
                    let sample = sample_of(markdown.as_deref().or(html.as_deref()));
                    if classify("", Some(200), sample) == ErrorKind::Captcha {
                        warn!(url, "challenge page detected in scrape content");
                        return ScrapeResult::failure(
                            "captcha/verification page detected",
                            ErrorKind::Captcha,
                            attempt - 1,
                        );
                    }
                    return ScrapeResult::success(markdown, html, attempt - 1);
                }
                Err(error) => {
                    let kind = error.kind();
                    match self.policy.should_retry(kind, attempt, error.retry_after()) {
                        RetryDecision::Retry {
                            delay,
                            attempt: next,
                        } => {
                            warn!(
                                url,
                                %kind,
                                attempt,
                                delay_ms = delay.as_millis(),
                                "scrape attempt failed; retrying"
                            );
                            tokio::time::sleep(delay).await;
                            attempt = next;
                        }
                        RetryDecision::DoNotRetry { reason } => {
                            warn!(url, %kind, %reason, "scrape failed");
                            return ScrapeResult::failure(error.to_string(), kind, attempt - 1);
                        }
                    }
                }
            }
        }
    }

    /// Single attempt against the rendering backend.
    async fn render_once(
        &self,
        url: &str,
        profile: &SourceProfile,
    ) -> Result<(Option<String>, Option<String>), ScrapeError> {
        let endpoint = format!("{}/v1/scrape", self.backend.url.trim_end_matches('/'));

        let mut headers = profile.headers.clone();
        if let Some(cookies) = &profile.cookies {
            headers.insert("Cookie".to_string(), cookies.clone());
        }

        let body = RenderRequest {
            url,
            formats: ["markdown", "html"],
            only_main_content: true,
            timeout: RENDER_TIMEOUT_MS,
            headers,
        };

        let mut request = self.http.post(&endpoint).json(&body);
        if let Some(key) = &self.backend.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ScrapeError::from_reqwest(url, e))?;

        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string);

        if !response.status().is_success() {
            return Err(ScrapeError::http_status(url, status, retry_after));
        }

        let parsed: RenderResponse = response
            .json()
            .await
            .map_err(|e| ScrapeError::from_reqwest(url, e))?;

        if let Some(message) = parsed.error {
            return Err(ScrapeError::backend(url, message, status));
        }

        let data = parsed.data.unwrap_or(RenderData {
            markdown: None,
            html: None,
        });
        debug!(
            url,
            markdown_len = data.markdown.as_deref().map_or(0, str::len),
            html_len = data.html.as_deref().map_or(0, str::len),
            "rendered page"
        );
        Ok((data.markdown, data.html))
    }

    /// Direct-fetch fallback: plain GET plus tag stripping.
    async fn direct_fetch(
        &self,
        url: &str,
        profile: &SourceProfile,
    ) -> Result<(Option<String>, Option<String>), ScrapeError> {
        let mut request = self.http.get(url).header("User-Agent", BROWSER_USER_AGENT);
        for (name, value) in &profile.headers {
            request = request.header(name, value);
        }
        if let Some(cookies) = &profile.cookies {
            request = request.header("Cookie", cookies);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ScrapeError::from_reqwest(url, e))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            // 403 classifies as BLOCKED; other failures follow the taxonomy.
            return Err(ScrapeError::http_status(url, status, None));
        }

        let html = response
            .text()
            .await
            .map_err(|e| ScrapeError::from_reqwest(url, e))?;

        let text = strip_tags(&html);
        Ok((Some(text), Some(html)))
    }
}

/// Returns a bounded prefix of the content for classification heuristics.
fn sample_of(content: Option<&str>) -> &str {
    let content = content.unwrap_or("");
    let end = content
        .char_indices()
        .nth(CONTENT_SAMPLE_LEN)
        .map_or(content.len(), |(i, _)| i);
    &content[..end]
}

/// Strips scripts, styles, and tags from HTML, collapsing whitespace.
///
/// Reduced-fidelity text extraction for the fallback path; the DOM-based
/// extractors are not involved here.
fn strip_tags(html: &str) -> String {
    #[allow(clippy::expect_used)]
    let patterns = [
        regex::Regex::new(r"(?is)<script[^>]*>.*?</script>").expect("static regex"),
        regex::Regex::new(r"(?is)<style[^>]*>.*?</style>").expect("static regex"),
        regex::Regex::new(r"<[^>]+>").expect("static regex"),
    ];

    let mut text = html.to_string();
    for pattern in &patterns {
        text = pattern.replace_all(&text, " ").into_owned();
    }

    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.chars().take(FALLBACK_TEXT_CAP).collect()
}
