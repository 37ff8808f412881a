//! DOM helpers shared by the extractors.
//!
//! Everything here goes through a real HTML parser. Class-bounded regions in
//! particular must be cut out as full subtrees so that nested containers with
//! the same class do not truncate the region.

use scraper::{ElementRef, Html, Selector};

/// Maximum slug length used in section anchors.
const SLUG_MAX_LEN: usize = 50;

/// Parses a static CSS selector.
///
/// # Panics
///
/// Panics if the selector is malformed; callers only pass literals.
#[must_use]
#[allow(clippy::expect_used)]
pub fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector")
}

/// Returns the outer HTML of the first element carrying the given class.
///
/// The subtree is complete even when same-class containers nest inside it.
#[must_use]
pub fn balanced_region(html: &str, class: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let sel = Selector::parse(&format!(".{class}")).ok()?;
    document.select(&sel).next().map(|element| element.html())
}

/// Collapsed whitespace text of an element.
#[must_use]
pub fn element_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

/// Text of a `<pre>` block with line structure preserved.
///
/// Some sources wrap each line of preformatted sample data in its own
/// element; joining child-element texts with newlines recovers the lines.
#[must_use]
pub fn pre_text(pre: ElementRef<'_>) -> String {
    let line_elements: Vec<String> = pre
        .child_elements()
        .map(|child| child.text().collect::<String>().trim().to_string())
        .filter(|line| !line.is_empty())
        .collect();

    if line_elements.is_empty() {
        pre.text().collect::<String>().trim().to_string()
    } else {
        line_elements.join("\n")
    }
}

/// Block-aware text rendering of an HTML fragment.
///
/// Top-level block elements become paragraphs separated by blank lines;
/// inline markup is flattened with collapsed whitespace.
#[must_use]
pub fn render_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let blocks: Vec<String> = fragment
        .root_element()
        .child_elements()
        .map(|child| collapse_whitespace(&child.text().collect::<String>()))
        .filter(|text| !text.is_empty())
        .collect();

    if blocks.is_empty() {
        collapse_whitespace(&fragment.root_element().text().collect::<String>())
    } else {
        blocks.join("\n\n")
    }
}

/// Collapses all whitespace runs to single spaces and trims.
#[must_use]
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncates to at most `max` characters on a char boundary.
#[must_use]
pub fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Content-shape metrics for a section's HTML.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionMetrics {
    /// Word count of the rendered text.
    pub word_count: usize,
    /// Contains code blocks.
    pub has_code: bool,
    /// Contains math markup.
    pub has_math: bool,
    /// Contains images.
    pub has_images: bool,
}

/// Computes metrics over a section's raw HTML.
#[must_use]
pub fn section_metrics(html: &str) -> SectionMetrics {
    SectionMetrics {
        word_count: render_text(html).split_whitespace().count(),
        has_code: html.contains("<pre") || html.contains("<code"),
        has_math: html.contains("MathJax") || html.contains("\\(") || html.contains("$$"),
        has_images: html.contains("<img"),
    }
}

/// Anchor slug for a section title: lowercase, alphanumeric and hyphens only.
#[must_use]
pub fn slugify(title: &str) -> String {
    let cleaned: String = title
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace() || *c == '-')
        .collect();
    let slug = cleaned.split_whitespace().collect::<Vec<_>>().join("-");
    truncate_chars(&slug, SLUG_MAX_LEN)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_balanced_region_simple() {
        let html = r#"<html><body><div class="statement"><p>Hello</p></div></body></html>"#;
        let region = balanced_region(html, "statement").unwrap();
        assert!(region.contains(r#"class="statement""#));
        assert!(region.contains("<p>Hello</p>"));
    }

    #[test]
    fn test_balanced_region_nested_same_class() {
        // Three levels of same-class nesting; the region must span all of
        // them plus trailing content of the outermost container.
        let html = r#"<div class="box">
            <div class="box">
                <div class="box"><p>innermost</p></div>
                <p>middle tail</p>
            </div>
            <p>outer tail</p>
        </div>"#;
        let region = balanced_region(html, "box").unwrap();
        assert!(region.contains("innermost"));
        assert!(region.contains("middle tail"));
        assert!(region.contains("outer tail"));
    }

    #[test]
    fn test_balanced_region_missing_class() {
        assert!(balanced_region("<div><p>x</p></div>", "statement").is_none());
    }

    #[test]
    fn test_balanced_region_picks_first_in_document_order() {
        let html = r#"<div class="s"><p>first</p></div><div class="s"><p>second</p></div>"#;
        let region = balanced_region(html, "s").unwrap();
        assert!(region.contains("first"));
        assert!(!region.contains("second"));
    }

    #[test]
    fn test_pre_text_with_line_elements() {
        let html = "<pre><div>1 2</div><div>3 4</div></pre>";
        let fragment = Html::parse_fragment(html);
        let pre = fragment.select(&selector("pre")).next().unwrap();
        assert_eq!(pre_text(pre), "1 2\n3 4");
    }

    #[test]
    fn test_pre_text_plain() {
        let html = "<pre>8\n</pre>";
        let fragment = Html::parse_fragment(html);
        let pre = fragment.select(&selector("pre")).next().unwrap();
        assert_eq!(pre_text(pre), "8");
    }

    #[test]
    fn test_render_text_blocks() {
        let html = "<p>First  paragraph</p><ul><li>one</li><li>two</li></ul>";
        let text = render_text(html);
        assert!(text.starts_with("First paragraph"));
        assert!(text.contains("\n\n"));
        assert!(text.contains("one"));
    }

    #[test]
    fn test_section_metrics() {
        let html = r#"<p>Some words here</p><pre>code</pre><img src="x.png">"#;
        let metrics = section_metrics(html);
        assert!(metrics.has_code);
        assert!(metrics.has_images);
        assert!(!metrics.has_math);
        assert!(metrics.word_count >= 3);
    }

    #[test]
    fn test_section_metrics_math() {
        let metrics = section_metrics(r"<p>inline \( x^2 \) math</p>");
        assert!(metrics.has_math);
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Attention Is All You Need!"), "attention-is-all-you-need");
        assert_eq!(slugify("  Multi   Space  "), "multi-space");
        assert!(slugify(&"word ".repeat(30)).len() <= SLUG_MAX_LEN);
    }

    #[test]
    fn test_truncate_chars_multibyte() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
    }
}
