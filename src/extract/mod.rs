//! Source-specific content extractors.
//!
//! Each source's pages are turned into [`ContentDraft`]s by an extractor
//! implementing the [`Extractor`] trait. Extractors are registered per
//! source name in an [`ExtractorRegistry`] and dispatched by the pipeline.
//!
//! # Architecture
//!
//! - [`Extractor`] - Async trait that individual extractors implement
//! - [`ExtractorRegistry`] - Source-name keyed collection
//! - [`ProblemExtractor`] - Competitive-programming problem statements
//! - [`ArticleSectionExtractor`] - Long-form articles split into H3 sections
//! - [`TutorialExtractor`] - Per-problem editorial sections
//! - [`BookSummaryExtractor`] - Book summaries via the text-generation collaborator
//! - [`NewsStoryExtractor`] - Linked news stories via the text-generation collaborator
//!
//! A failed extraction marks that URL failed; it never aborts the run.

pub mod dom;

mod article;
mod book;
mod news;
mod problem;
mod tutorial;

pub use article::ArticleSectionExtractor;
pub use book::BookSummaryExtractor;
pub use news::NewsStoryExtractor;
pub use problem::ProblemExtractor;
pub use tutorial::TutorialExtractor;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::content::{ContentDraft, ContentType};
use crate::textgen::TextGenClient;

/// Result type for extraction operations.
pub type Result<T> = std::result::Result<T, ExtractError>;

/// Errors that can occur during extraction.
#[derive(Debug, Clone, Error)]
pub enum ExtractError {
    /// A structurally mandatory region is absent from the page.
    #[error("required region '.{region}' not found: {url}")]
    MissingRegion {
        /// Page URL.
        url: String,
        /// Class of the missing container.
        region: String,
    },

    /// The page yielded no text worth extracting.
    #[error("page content too short to extract: {url}")]
    EmptyContent {
        /// Page URL.
        url: String,
    },

    /// The page parsed but produced no entities.
    #[error("no extractable entities found: {url}")]
    NoEntities {
        /// Page URL.
        url: String,
    },
}

impl ExtractError {
    /// Creates a `MissingRegion` error.
    #[must_use]
    pub fn missing_region(url: &str, region: &str) -> Self {
        Self::MissingRegion {
            url: url.to_string(),
            region: region.to_string(),
        }
    }

    /// Creates an `EmptyContent` error.
    #[must_use]
    pub fn empty_content(url: &str) -> Self {
        Self::EmptyContent {
            url: url.to_string(),
        }
    }

    /// Creates a `NoEntities` error.
    #[must_use]
    pub fn no_entities(url: &str) -> Self {
        Self::NoEntities {
            url: url.to_string(),
        }
    }
}

/// Scraped page content handed to an extractor.
///
/// Extractors pick whichever rendering they need: DOM-based extractors use
/// the HTML, the book extractor prefers markdown.
#[derive(Debug, Clone, Copy, Default)]
pub struct PageContent<'a> {
    /// Markdown rendering, when the backend produced one.
    pub markdown: Option<&'a str>,
    /// Raw HTML of the page.
    pub html: Option<&'a str>,
}

impl<'a> PageContent<'a> {
    /// Builds page content from optional renderings.
    #[must_use]
    pub fn new(markdown: Option<&'a str>, html: Option<&'a str>) -> Self {
        Self { markdown, html }
    }

    /// The HTML rendering, falling back to markdown, then empty.
    #[must_use]
    pub fn html_or_default(&self) -> &'a str {
        self.html.or(self.markdown).unwrap_or("")
    }

    /// The markdown rendering, falling back to HTML, then empty.
    #[must_use]
    pub fn markdown_or_default(&self) -> &'a str {
        self.markdown.or(self.html).unwrap_or("")
    }
}

/// Trait that all extractors must implement.
///
/// # Object Safety
///
/// Uses `async_trait` to support dynamic dispatch via `Arc<dyn Extractor>`;
/// Rust 2024 native async traits are not object-safe, so `async_trait` is
/// required for the registry pattern.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Short identifier used in logs (e.g. "problem", "article-section").
    fn name(&self) -> &'static str;

    /// The content type this extractor produces.
    fn content_type(&self) -> ContentType;

    /// Extracts zero or more drafts from a scraped page.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError`] when the page lacks the structures this
    /// extractor requires.
    async fn extract(&self, page: PageContent<'_>, source_url: &str) -> Result<Vec<ContentDraft>>;
}

/// Source-name keyed extractor collection.
#[derive(Clone, Default)]
pub struct ExtractorRegistry {
    by_source: HashMap<String, Arc<dyn Extractor>>,
}

impl ExtractorRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an extractor for a source name, replacing any previous one.
    pub fn register(&mut self, source_name: &str, extractor: Arc<dyn Extractor>) {
        self.by_source.insert(source_name.to_string(), extractor);
    }

    /// Looks up the extractor for a source.
    #[must_use]
    pub fn get(&self, source_name: &str) -> Option<Arc<dyn Extractor>> {
        self.by_source.get(source_name).cloned()
    }
}

impl std::fmt::Debug for ExtractorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractorRegistry")
            .field("sources", &self.by_source.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Builds the registry covering the default source catalog.
#[must_use]
pub fn build_extractor_registry(textgen: TextGenClient) -> ExtractorRegistry {
    let mut registry = ExtractorRegistry::new();
    registry.register("codeforces", Arc::new(ProblemExtractor::new()));
    registry.register("codeforces-editorials", Arc::new(TutorialExtractor::new()));
    registry.register("aman", Arc::new(ArticleSectionExtractor::new()));
    registry.register(
        "fourminutebooks",
        Arc::new(BookSummaryExtractor::new(textgen.clone())),
    );
    registry.register("hackernews", Arc::new(NewsStoryExtractor::new(textgen)));
    registry
}
