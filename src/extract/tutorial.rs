//! Extractor for per-problem editorial (tutorial) sections.
//!
//! Editorial pages announce each problem's write-up with an H3 heading that
//! links to the problem. The write-up body is everything following that H3
//! until the next H3, usually inside a spoiler container.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use scraper::{ElementRef, Html};
use serde_json::json;
use tracing::debug;

use crate::content::{ContentDraft, ContentType, MIN_READ_TIME_MINUTES};

use super::dom::{element_text, render_text, selector, truncate_chars};
use super::{ExtractError, Extractor, PageContent, Result};

/// Pattern pulling the problem index out of a problem link.
#[allow(clippy::expect_used)]
static PROBLEM_INDEX_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/problem/([A-Z]\d?)").expect("problem index regex is valid")
});

/// Character cap for tutorial summaries.
const SUMMARY_CAP: usize = 300;

/// Maximum number of step-list items promoted to key points.
const MAX_KEY_POINTS: usize = 6;

/// Extractor for editorial pages.
#[derive(Debug, Clone, Default)]
pub struct TutorialExtractor;

impl TutorialExtractor {
    /// Creates a new tutorial extractor.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Extractor for TutorialExtractor {
    fn name(&self) -> &'static str {
        "tutorial"
    }

    fn content_type(&self) -> ContentType {
        ContentType::Tutorial
    }

    async fn extract(&self, page: PageContent<'_>, source_url: &str) -> Result<Vec<ContentDraft>> {
        let html = page.html_or_default();
        let doc = Html::parse_document(html);

        let h3_sel = selector("h3");
        let link_sel = selector("a[href]");

        let mut drafts = Vec::new();
        for h3 in doc.select(&h3_sel) {
            let Some(index) = h3.select(&link_sel).find_map(|a| {
                a.value()
                    .attr("href")
                    .and_then(|href| problem_index(href))
            }) else {
                continue;
            };

            let body_html = section_after(h3);
            if body_html.is_empty() {
                continue;
            }

            drafts.push(tutorial_draft(&index, h3, &body_html, source_url));
        }

        if drafts.is_empty() {
            return Err(ExtractError::no_entities(source_url));
        }
        debug!(tutorials = drafts.len(), "extracted editorial sections");
        Ok(drafts)
    }
}

/// Extracts a problem index like "A" or "C1" from a problem link href.
fn problem_index(href: &str) -> Option<String> {
    PROBLEM_INDEX_PATTERN
        .captures(href)
        .map(|captures| captures[1].to_string())
}

/// HTML of the sibling elements following an H3, up to the next H3.
fn section_after(h3: ElementRef<'_>) -> String {
    let mut parts = Vec::new();
    for sibling in h3.next_siblings() {
        let Some(element) = ElementRef::wrap(sibling) else {
            continue;
        };
        if element.value().name() == "h3" {
            break;
        }
        parts.push(element.html());
    }
    parts.join("\n")
}

fn tutorial_draft(
    index: &str,
    h3: ElementRef<'_>,
    body_html: &str,
    source_url: &str,
) -> ContentDraft {
    let heading = element_text(h3);
    let title = if heading.is_empty() {
        format!("Problem {index} Editorial")
    } else {
        heading
    };
    let text = render_text(body_html);

    let mut draft = ContentDraft::new(
        ContentType::Tutorial,
        title,
        text.clone(),
        format!("{source_url}#problem-{}", index.to_lowercase()),
    );
    draft.summary = truncate_chars(&text, SUMMARY_CAP);
    draft.key_points = step_list(body_html);
    draft.read_time_minutes = MIN_READ_TIME_MINUTES;
    draft.raw_payload = Some(json!({
        "problem_index": index,
        "html": body_html,
    }));
    draft
}

/// Promotes an embedded step list (ol/ul items) to key points, when present.
fn step_list(body_html: &str) -> Vec<String> {
    let fragment = Html::parse_fragment(body_html);
    let li_sel = selector("ol li, ul li");
    fragment
        .select(&li_sel)
        .map(element_text)
        .filter(|item| !item.is_empty())
        .take(MAX_KEY_POINTS)
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const EDITORIAL_HTML: &str = r#"<html><body>
    <div class="spoiler-content">
        <h3><a href="/contest/2068/problem/A">2068A - Even Split</a></h3>
        <p>Check the parity of the total weight.</p>
        <ol><li>Read the input.</li><li>Answer YES when w is even and above two.</li></ol>
        <h3><a href="/contest/2068/problem/B">2068B - Harder One</a></h3>
        <p>Use a greedy sweep from the left.</p>
    </div>
    <h3>Unrelated heading without a problem link</h3>
    <p>Ignored content.</p>
    </body></html>"#;

    #[tokio::test]
    async fn test_extracts_per_problem_sections() {
        let extractor = TutorialExtractor::new();
        let page = PageContent::new(None, Some(EDITORIAL_HTML));
        let drafts = extractor
            .extract(page, "https://codeforces.com/blog/entry/1234")
            .await
            .unwrap();

        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[0].title, "2068A - Even Split");
        assert!(drafts[0].body.contains("parity of the total weight"));
        // Section ends at the next h3.
        assert!(!drafts[0].body.contains("greedy sweep"));
        assert!(drafts[1].body.contains("greedy sweep"));
    }

    #[tokio::test]
    async fn test_anchors_carry_problem_index() {
        let extractor = TutorialExtractor::new();
        let page = PageContent::new(None, Some(EDITORIAL_HTML));
        let drafts = extractor
            .extract(page, "https://codeforces.com/blog/entry/1234")
            .await
            .unwrap();

        assert_eq!(
            drafts[0].source_url,
            "https://codeforces.com/blog/entry/1234#problem-a"
        );
        assert_eq!(drafts[0].raw_payload.as_ref().unwrap()["problem_index"], "A");
    }

    #[tokio::test]
    async fn test_step_lists_become_key_points() {
        let extractor = TutorialExtractor::new();
        let page = PageContent::new(None, Some(EDITORIAL_HTML));
        let drafts = extractor
            .extract(page, "https://codeforces.com/blog/entry/1234")
            .await
            .unwrap();

        assert_eq!(drafts[0].key_points.len(), 2);
        assert!(drafts[0].key_points[0].contains("Read the input"));
        assert!(drafts[1].key_points.is_empty());
    }

    #[tokio::test]
    async fn test_page_without_problem_headings_is_an_error() {
        let html = "<html><body><h3>General notes</h3><p>text</p></body></html>";
        let extractor = TutorialExtractor::new();
        let err = extractor
            .extract(PageContent::new(None, Some(html)), "https://example.com/t")
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::NoEntities { .. }));
    }

    #[test]
    fn test_problem_index_pattern() {
        assert_eq!(problem_index("/contest/2068/problem/A").unwrap(), "A");
        assert_eq!(problem_index("/contest/2068/problem/C1").unwrap(), "C1");
        assert!(problem_index("/contest/2068/standings").is_none());
    }
}
