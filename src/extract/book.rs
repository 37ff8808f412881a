//! Extractor for book summary pages.
//!
//! Book summary pages are free-form prose, so structure comes from the
//! text-generation collaborator rather than the DOM. The page markdown is
//! handed to [`TextGenClient::parse_content`]; title and author are pulled
//! from the leading heading when it follows the "Title by Author" shape.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde_json::json;
use tracing::debug;

use crate::content::{ContentDraft, ContentType};
use crate::textgen::TextGenClient;

use super::{ExtractError, Extractor, PageContent, Result};

/// Minimum usable page text length; anything shorter is boilerplate.
const MIN_CONTENT_LEN: usize = 200;

/// "# Title by Author" heading shape.
#[allow(clippy::expect_used)]
static TITLE_BY_AUTHOR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#\s+(.+?)\s+by\s+(.+)").expect("title regex is valid"));

/// Looser "by Author" attribution line.
#[allow(clippy::expect_used)]
static BY_AUTHOR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"by\s+([^\n]+)").expect("author regex is valid"));

/// Extractor for book summary pages.
#[derive(Debug, Clone)]
pub struct BookSummaryExtractor {
    textgen: TextGenClient,
}

impl BookSummaryExtractor {
    /// Creates a book extractor over the given collaborator.
    #[must_use]
    pub fn new(textgen: TextGenClient) -> Self {
        Self { textgen }
    }
}

#[async_trait]
impl Extractor for BookSummaryExtractor {
    fn name(&self) -> &'static str {
        "book-summary"
    }

    fn content_type(&self) -> ContentType {
        ContentType::Book
    }

    async fn extract(&self, page: PageContent<'_>, source_url: &str) -> Result<Vec<ContentDraft>> {
        let content = page.markdown_or_default();
        if content.len() < MIN_CONTENT_LEN {
            return Err(ExtractError::empty_content(source_url));
        }

        let (title, author) = title_and_author(content);
        debug!(%title, %author, "identified book");

        let generated = self.textgen.parse_content(content, "book").await;

        let mut draft = ContentDraft::new(
            ContentType::Book,
            format!("{title} by {author}"),
            generated.body,
            source_url,
        );
        draft.summary = generated.summary;
        draft.key_points = generated.key_points;
        draft.tags = generated.tags;
        draft.read_time_minutes = generated.read_time_minutes;
        draft.author = Some(author.clone());
        draft.raw_payload = Some(json!({
            "title": title,
            "author": author,
            "url": source_url,
        }));

        Ok(vec![draft])
    }
}

/// Pulls the book title and author out of the page heading.
fn title_and_author(content: &str) -> (String, String) {
    if let Some(captures) = TITLE_BY_AUTHOR_PATTERN.captures(content) {
        let title = captures[1].replace(" Summary", "").trim().to_string();
        let author = captures[2].trim().to_string();
        return (title, author);
    }
    if let Some(captures) = BY_AUTHOR_PATTERN.captures(content) {
        return ("Book Summary".to_string(), captures[1].trim().to_string());
    }
    ("Book Summary".to_string(), "Unknown".to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::TextGenConfig;

    fn extractor_with_dead_endpoint() -> BookSummaryExtractor {
        // An unroutable endpoint forces the textgen fallback path, which is
        // deterministic and needs no server.
        BookSummaryExtractor::new(TextGenClient::new(TextGenConfig {
            url: "http://127.0.0.1:1/api/generate".to_string(),
            model: "test-model".to_string(),
        }))
    }

    #[test]
    fn test_title_and_author_from_heading() {
        let (title, author) =
            title_and_author("# Atomic Habits Summary by James Clear\n\nThe book...");
        assert_eq!(title, "Atomic Habits");
        assert_eq!(author, "James Clear");
    }

    #[test]
    fn test_title_and_author_loose_attribution() {
        let (title, author) = title_and_author("A summary written by Jane Doe\nmore text");
        assert_eq!(title, "Book Summary");
        assert_eq!(author, "Jane Doe");
    }

    #[test]
    fn test_title_and_author_absent() {
        let (title, author) = title_and_author("no attribution anywhere");
        assert_eq!(title, "Book Summary");
        assert_eq!(author, "Unknown");
    }

    #[tokio::test]
    async fn test_short_content_is_an_error() {
        let extractor = extractor_with_dead_endpoint();
        let page = PageContent::new(Some("too short"), None);
        let err = extractor
            .extract(page, "https://fourminutebooks.com/x-summary/")
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::EmptyContent { .. }));
    }

    #[tokio::test]
    async fn test_draft_shape_with_fallback_generation() {
        let content = format!(
            "# Deep Work Summary by Cal Newport\n\n{}",
            "Focus is the new superpower. ".repeat(20)
        );
        let extractor = extractor_with_dead_endpoint();
        let page = PageContent::new(Some(&content), None);
        let drafts = extractor
            .extract(page, "https://fourminutebooks.com/deep-work-summary/")
            .await
            .unwrap();

        assert_eq!(drafts.len(), 1);
        let draft = &drafts[0];
        assert_eq!(draft.title, "Deep Work by Cal Newport");
        assert_eq!(draft.author.as_deref(), Some("Cal Newport"));
        assert_eq!(draft.content_type, ContentType::Book);
        assert!(!draft.body.is_empty());
        assert_eq!(draft.raw_payload.as_ref().unwrap()["author"], "Cal Newport");
    }
}
