//! Extractor for long-form articles split into H3 sections.
//!
//! Walks the `article` element (falling back to `body`) in document order,
//! tracking H2 headings as chapters and H3 headings as section boundaries.
//! Content nodes accumulate under the current H3; each H3 transition emits
//! one section. Anything before the first H3 belongs to no section and is
//! dropped.

use async_trait::async_trait;
use scraper::{ElementRef, Html};
use serde_json::json;
use tracing::debug;

use crate::content::{ContentDraft, ContentType, MIN_READ_TIME_MINUTES};

use super::dom::{element_text, render_text, section_metrics, selector, slugify, truncate_chars};
use super::{ExtractError, Extractor, PageContent, Result};

/// Reading speed used for the read-time estimate (words per minute).
const WORDS_PER_MINUTE: usize = 200;

/// Character cap for section summaries.
const SUMMARY_CAP: usize = 300;

/// Tags captured as content under the current section.
const CONTENT_TAGS: [&str; 7] = ["p", "ul", "ol", "pre", "blockquote", "table", "figure"];

/// One H3-bounded section of an article.
#[derive(Debug, Clone)]
struct ArticleSection {
    chapter: String,
    title: String,
    html: String,
}

/// Accumulator for the document-order walk.
#[derive(Debug, Default)]
struct SectionWalk {
    current_h2: String,
    current_h3: String,
    content: Vec<String>,
    sections: Vec<ArticleSection>,
}

impl SectionWalk {
    fn flush(&mut self) {
        if !self.current_h3.is_empty() && !self.content.is_empty() {
            self.sections.push(ArticleSection {
                chapter: self.current_h2.clone(),
                title: self.current_h3.clone(),
                html: self.content.join("\n"),
            });
        }
        self.content.clear();
    }

    fn visit(&mut self, element: ElementRef<'_>) {
        for child in element.child_elements() {
            match child.value().name() {
                "h2" => {
                    self.flush();
                    self.current_h2 = element_text(child);
                    self.current_h3.clear();
                }
                "h3" => {
                    self.flush();
                    self.current_h3 = element_text(child);
                }
                "h4" | "h5" | "h6" => {
                    if !self.current_h3.is_empty() {
                        self.content.push(child.html());
                    }
                }
                name if CONTENT_TAGS.contains(&name) => {
                    if !self.current_h3.is_empty() {
                        self.content.push(child.html());
                    }
                }
                // Containers are transparent: recurse to keep document order.
                "div" | "section" | "main" => self.visit(child),
                _ => {}
            }
        }
    }
}

/// Extractor for H3-sectioned articles.
#[derive(Debug, Clone, Default)]
pub struct ArticleSectionExtractor;

impl ArticleSectionExtractor {
    /// Creates a new article section extractor.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Extractor for ArticleSectionExtractor {
    fn name(&self) -> &'static str {
        "article-section"
    }

    fn content_type(&self) -> ContentType {
        ContentType::Article
    }

    async fn extract(&self, page: PageContent<'_>, source_url: &str) -> Result<Vec<ContentDraft>> {
        let html = page.html_or_default();
        let doc = Html::parse_document(html);

        let article_sel = selector("article");
        let body_sel = selector("body");
        let root = doc
            .select(&article_sel)
            .next()
            .or_else(|| doc.select(&body_sel).next())
            .ok_or_else(|| ExtractError::empty_content(source_url))?;

        let mut walk = SectionWalk::default();
        walk.visit(root);
        walk.flush();

        if walk.sections.is_empty() {
            return Err(ExtractError::no_entities(source_url));
        }
        debug!(sections = walk.sections.len(), "segmented article");

        let mut used_slugs: Vec<String> = Vec::new();
        let drafts = walk
            .sections
            .into_iter()
            .map(|section| {
                let slug = unique_slug(&section.title, &mut used_slugs);
                section_to_draft(&section, source_url, &slug)
            })
            .collect();
        Ok(drafts)
    }
}

/// Slug for the section anchor, disambiguated on repeated titles.
fn unique_slug(title: &str, used: &mut Vec<String>) -> String {
    let base = slugify(title);
    let mut slug = base.clone();
    let mut n = 2;
    while used.contains(&slug) {
        slug = format!("{base}-{n}");
        n += 1;
    }
    used.push(slug.clone());
    slug
}

fn section_to_draft(section: &ArticleSection, source_url: &str, slug: &str) -> ContentDraft {
    let text = render_text(&section.html);
    let metrics = section_metrics(&section.html);

    let mut draft = ContentDraft::new(
        ContentType::Article,
        section.title.clone(),
        text.clone(),
        format!("{source_url}#{slug}"),
    );
    draft.summary = truncate_chars(&text, SUMMARY_CAP);
    draft.read_time_minutes =
        MIN_READ_TIME_MINUTES.max((metrics.word_count / WORDS_PER_MINUTE) as i64);
    draft.raw_payload = Some(json!({
        "chapter": section.chapter,
        "html": section.html,
        "word_count": metrics.word_count,
        "has_code": metrics.has_code,
        "has_math": metrics.has_math,
        "has_images": metrics.has_images,
    }));
    draft
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const ARTICLE_HTML: &str = r#"<html><body><article>
        <h2>Transformers</h2>
        <p>Intro text outside any section.</p>
        <h3>Self-Attention</h3>
        <p>Attention scores compare every token pair.</p>
        <pre><code>q @ k.T</code></pre>
        <h3>Positional Encoding</h3>
        <p>Sinusoidal encodings inject order information.</p>
        <ul><li>absolute</li><li>relative</li></ul>
    </article></body></html>"#;

    #[tokio::test]
    async fn test_two_headings_yield_two_sections() {
        let extractor = ArticleSectionExtractor::new();
        let page = PageContent::new(None, Some(ARTICLE_HTML));
        let drafts = extractor
            .extract(page, "https://aman.ai/primers/ai/transformers")
            .await
            .unwrap();

        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[0].title, "Self-Attention");
        assert_eq!(drafts[1].title, "Positional Encoding");
        assert!(drafts[0].body.contains("every token pair"));
        assert!(drafts[1].body.contains("order information"));
        // Intro content before the first H3 is dropped.
        assert!(!drafts[0].body.contains("Intro text"));
    }

    #[tokio::test]
    async fn test_sections_get_anchored_source_urls() {
        let extractor = ArticleSectionExtractor::new();
        let page = PageContent::new(None, Some(ARTICLE_HTML));
        let drafts = extractor
            .extract(page, "https://aman.ai/primers/ai/transformers")
            .await
            .unwrap();

        assert_eq!(
            drafts[0].source_url,
            "https://aman.ai/primers/ai/transformers#self-attention"
        );
        assert_eq!(
            drafts[1].source_url,
            "https://aman.ai/primers/ai/transformers#positional-encoding"
        );
    }

    #[tokio::test]
    async fn test_chapter_and_metrics_in_payload() {
        let extractor = ArticleSectionExtractor::new();
        let page = PageContent::new(None, Some(ARTICLE_HTML));
        let drafts = extractor
            .extract(page, "https://aman.ai/primers/ai/transformers")
            .await
            .unwrap();

        let payload = drafts[0].raw_payload.as_ref().unwrap();
        assert_eq!(payload["chapter"], "Transformers");
        assert_eq!(payload["has_code"], true);
        assert_eq!(drafts[1].raw_payload.as_ref().unwrap()["has_code"], false);
    }

    #[tokio::test]
    async fn test_nested_containers_are_transparent() {
        let html = r#"<article><div class="wrapper">
            <h3>Wrapped</h3>
            <div><p>Content nested inside divs.</p></div>
        </div></article>"#;
        let extractor = ArticleSectionExtractor::new();
        let drafts = extractor
            .extract(PageContent::new(None, Some(html)), "https://example.com/a")
            .await
            .unwrap();
        assert_eq!(drafts.len(), 1);
        assert!(drafts[0].body.contains("nested inside divs"));
    }

    #[tokio::test]
    async fn test_repeated_titles_disambiguated() {
        let html = r#"<article>
            <h3>Summary</h3><p>First summary text.</p>
            <h3>Summary</h3><p>Second summary text.</p>
        </article>"#;
        let extractor = ArticleSectionExtractor::new();
        let drafts = extractor
            .extract(PageContent::new(None, Some(html)), "https://example.com/a")
            .await
            .unwrap();
        assert_eq!(drafts[0].source_url, "https://example.com/a#summary");
        assert_eq!(drafts[1].source_url, "https://example.com/a#summary-2");
    }

    #[tokio::test]
    async fn test_no_sections_is_an_error() {
        let html = "<article><h2>Only Chapters</h2><p>No h3 here.</p></article>";
        let extractor = ArticleSectionExtractor::new();
        let err = extractor
            .extract(PageContent::new(None, Some(html)), "https://example.com/a")
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::NoEntities { .. }));
    }

    #[tokio::test]
    async fn test_falls_back_to_body_without_article_element() {
        let html = "<html><body><h3>Loose Section</h3><p>Body-level content.</p></body></html>";
        let extractor = ArticleSectionExtractor::new();
        let drafts = extractor
            .extract(PageContent::new(None, Some(html)), "https://example.com/a")
            .await
            .unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].title, "Loose Section");
    }
}
