//! Text-generation collaborator for unstructured page content.
//!
//! Sends scraped text to a local generation endpoint and asks for a
//! structured JSON rendition (title, summary, body, key points, tags, read
//! time). Model output is unreliable, so parsing goes through a salvage
//! ladder: direct JSON parse, then brace extraction with trailing-comma
//! cleanup, and finally a deterministic truncated-raw-text fallback.
//!
//! This step never errors the pipeline: any failure path lands on the
//! fallback.

use std::sync::LazyLock;

use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, instrument, warn};

use crate::config::TextGenConfig;

/// Input cap forwarded to the model.
const PROMPT_CONTENT_CAP: usize = 6000;

/// Fallback caps mirroring the structured output shape.
const FALLBACK_TITLE_CAP: usize = 100;
const FALLBACK_SUMMARY_CAP: usize = 300;
const FALLBACK_BODY_CAP: usize = 3000;

/// Default read time when the model omits one (minutes).
const DEFAULT_READ_TIME: i64 = 5;

/// First JSON object in a blob of model text, tolerating one nesting level.
#[allow(clippy::expect_used)]
static JSON_OBJECT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\{[^{}]*(?:\{[^{}]*\}[^{}]*)*\}").expect("JSON object regex is valid")
});

/// Trailing commas before a closing brace/bracket.
#[allow(clippy::expect_used)]
static TRAILING_COMMA_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",\s*([}\]])").expect("trailing comma regex is valid"));

/// Structured content produced by the collaborator (or its fallback).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedContent {
    /// Display title.
    pub title: String,
    /// Short summary.
    pub summary: String,
    /// Full body text.
    pub body: String,
    /// Bullet takeaways.
    pub key_points: Vec<String>,
    /// Topic tags.
    pub tags: Vec<String>,
    /// Estimated read time in minutes.
    pub read_time_minutes: i64,
}

/// Wire request for the generation endpoint.
#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
    options: serde_json::Value,
}

/// Wire response; the model text lives in `response`.
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

/// Partially parsed model output; every field is optional and defaulted.
#[derive(Debug, Deserialize)]
struct LooseContent {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    key_points: Option<Vec<String>>,
    #[serde(default)]
    tags: Option<Vec<String>>,
    #[serde(default)]
    read_time_minutes: Option<i64>,
}

/// Client for the text-generation collaborator.
#[derive(Debug, Clone)]
pub struct TextGenClient {
    http: Client,
    config: TextGenConfig,
}

impl TextGenClient {
    /// Creates a client for the configured endpoint.
    #[must_use]
    pub fn new(config: TextGenConfig) -> Self {
        Self {
            http: Client::new(),
            config,
        }
    }

    /// Turns raw page content into structured content.
    ///
    /// `hint` labels the kind of content (e.g. "book") and seeds the
    /// fallback tag. Infallible: any endpoint or parse failure yields the
    /// truncated-raw fallback.
    #[instrument(skip(self, content), fields(model = %self.config.model, hint))]
    pub async fn parse_content(&self, content: &str, hint: &str) -> GeneratedContent {
        match self.generate(content).await {
            Ok(text) => match salvage_json(&text) {
                Some(loose) => finalize(loose, content, hint),
                None => {
                    warn!("no JSON recoverable from model output; using fallback");
                    fallback(content, hint)
                }
            },
            Err(error) => {
                warn!(%error, "text generation failed; using fallback");
                fallback(content, hint)
            }
        }
    }

    async fn generate(&self, content: &str) -> Result<String, reqwest::Error> {
        let clipped: String = content.chars().take(PROMPT_CONTENT_CAP).collect();
        let prompt = format!(
            "Extract the following information from this article and return ONLY valid JSON:\n\n\
             ARTICLE:\n{clipped}\n\n\
             Return this exact JSON structure (no other text, no markdown, just JSON):\n\
             {{\n\
               \"title\": \"article title here\",\n\
               \"summary\": \"brief 2-3 sentence summary\",\n\
               \"body\": \"full article text with key details\",\n\
               \"key_points\": [\"point 1\", \"point 2\", \"point 3\"],\n\
               \"tags\": [\"tag1\", \"tag2\", \"tag3\"],\n\
               \"read_time_minutes\": 5\n\
             }}"
        );

        let request = GenerateRequest {
            model: &self.config.model,
            prompt,
            stream: false,
            options: json!({"temperature": 0.1, "num_predict": 2000}),
        };

        let response: GenerateResponse = self
            .http
            .post(&self.config.url)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        debug!(
            preview = %response.response.chars().take(200).collect::<String>(),
            "model responded"
        );
        Ok(response.response)
    }
}

/// Salvage ladder: direct parse, then brace extraction + comma cleanup.
fn salvage_json(text: &str) -> Option<LooseContent> {
    if let Ok(loose) = serde_json::from_str::<LooseContent>(text) {
        return Some(loose);
    }

    let candidate = JSON_OBJECT_PATTERN.find(text)?.as_str();
    let flattened = candidate.replace('\n', " ");
    let cleaned = TRAILING_COMMA_PATTERN.replace_all(&flattened, "$1");
    serde_json::from_str(&cleaned).ok()
}

/// Fills missing fields from the raw content, as the fallback does.
fn finalize(loose: LooseContent, content: &str, hint: &str) -> GeneratedContent {
    GeneratedContent {
        title: loose
            .title
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "Content Title".to_string()),
        summary: loose
            .summary
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| content.chars().take(200).collect()),
        body: loose
            .body
            .filter(|b| !b.is_empty())
            .unwrap_or_else(|| content.chars().take(2000).collect()),
        key_points: loose
            .key_points
            .filter(|points| !points.is_empty())
            .unwrap_or_else(|| vec!["See full content".to_string()]),
        tags: loose
            .tags
            .filter(|tags| !tags.is_empty())
            .unwrap_or_else(|| vec![hint.to_string()]),
        read_time_minutes: loose.read_time_minutes.unwrap_or(DEFAULT_READ_TIME),
    }
}

/// Deterministic rendition of the raw content when generation is unusable.
fn fallback(content: &str, hint: &str) -> GeneratedContent {
    let first_line = content.lines().next().unwrap_or("").trim();
    let title: String = if first_line.is_empty() {
        "Content Title".to_string()
    } else {
        first_line.chars().take(FALLBACK_TITLE_CAP).collect()
    };

    GeneratedContent {
        title,
        summary: content.chars().take(FALLBACK_SUMMARY_CAP).collect(),
        body: content.chars().take(FALLBACK_BODY_CAP).collect(),
        key_points: vec!["See full content".to_string()],
        tags: vec![hint.to_string()],
        read_time_minutes: DEFAULT_READ_TIME,
    }
}
