//! Extractor for linked news stories.
//!
//! Stories point at arbitrary third-party sites, so there is no stable DOM
//! shape to walk. The rendered markdown goes to the text-generation
//! collaborator, which supplies title, summary, and body structure.

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use crate::content::{ContentDraft, ContentType};
use crate::textgen::TextGenClient;

use super::{ExtractError, Extractor, PageContent, Result};

/// Minimum usable page text length; anything shorter is a stub or a
/// paywall remnant.
const MIN_CONTENT_LEN: usize = 100;

/// Extractor for externally linked news stories.
#[derive(Debug, Clone)]
pub struct NewsStoryExtractor {
    textgen: TextGenClient,
}

impl NewsStoryExtractor {
    /// Creates a news extractor over the given collaborator.
    #[must_use]
    pub fn new(textgen: TextGenClient) -> Self {
        Self { textgen }
    }
}

#[async_trait]
impl Extractor for NewsStoryExtractor {
    fn name(&self) -> &'static str {
        "news-story"
    }

    fn content_type(&self) -> ContentType {
        ContentType::Article
    }

    async fn extract(&self, page: PageContent<'_>, source_url: &str) -> Result<Vec<ContentDraft>> {
        let content = page.markdown_or_default();
        if content.len() < MIN_CONTENT_LEN {
            return Err(ExtractError::empty_content(source_url));
        }

        let generated = self.textgen.parse_content(content, "tech").await;
        debug!(title = %generated.title, "structured news story");

        let mut draft = ContentDraft::new(
            ContentType::Article,
            generated.title.clone(),
            generated.body,
            source_url,
        );
        draft.summary = generated.summary;
        draft.key_points = generated.key_points;
        draft.tags = generated.tags;
        draft.read_time_minutes = generated.read_time_minutes;
        draft.raw_payload = Some(json!({
            "title": generated.title,
            "url": source_url,
        }));

        Ok(vec![draft])
    }
}
