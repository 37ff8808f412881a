//! Extractor for competitive-programming problem statements.
//!
//! Problem pages carry a `div.problem-statement` container holding the
//! header (title, limits), the statement prose, input/output specifications,
//! paired sample tests, and an optional note. The container is structurally
//! mandatory; every field inside it is independently optional.

use async_trait::async_trait;
use scraper::Html;
use serde_json::json;
use tracing::debug;

use crate::content::{ContentDraft, ContentType, MIN_READ_TIME_MINUTES};

use super::dom::{
    balanced_region, element_text, pre_text, selector, truncate_chars,
};
use super::{ExtractError, Extractor, PageContent, Result};

/// Class of the mandatory problem container.
const PROBLEM_REGION: &str = "problem-statement";

/// Character caps carried over from the ingestion contract.
const STATEMENT_CAP: usize = 3000;
const SPEC_CAP: usize = 800;
const SAMPLE_CAP: usize = 2000;
const NOTE_CAP: usize = 1000;
const SUMMARY_CAP: usize = 200;

/// Placeholder used when a limit field is absent.
const UNKNOWN: &str = "Unknown";

/// A paired sample input/output block.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SampleTest {
    input: String,
    output: String,
}

/// Fields parsed out of a problem page.
#[derive(Debug, Clone)]
struct ParsedProblem {
    title: String,
    statement: String,
    input_format: String,
    output_format: String,
    samples: Vec<SampleTest>,
    note: String,
    time_limit: String,
    memory_limit: String,
}

/// Extractor for problem-statement pages.
#[derive(Debug, Clone, Default)]
pub struct ProblemExtractor;

impl ProblemExtractor {
    /// Creates a new problem extractor.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Extractor for ProblemExtractor {
    fn name(&self) -> &'static str {
        "problem"
    }

    fn content_type(&self) -> ContentType {
        ContentType::Problem
    }

    async fn extract(&self, page: PageContent<'_>, source_url: &str) -> Result<Vec<ContentDraft>> {
        let html = page.html_or_default();
        let region = balanced_region(html, PROBLEM_REGION)
            .ok_or_else(|| ExtractError::missing_region(source_url, PROBLEM_REGION))?;

        let parsed = parse_problem(&region);
        debug!(
            title = %parsed.title,
            samples = parsed.samples.len(),
            "parsed problem page"
        );

        let mut draft = ContentDraft::new(
            ContentType::Problem,
            parsed.title.clone(),
            format_body(&parsed),
            source_url,
        );
        draft.summary = summarize(&parsed.statement);
        draft.key_points = key_points(&parsed);
        draft.read_time_minutes =
            MIN_READ_TIME_MINUTES.max(MIN_READ_TIME_MINUTES + parsed.samples.len() as i64);
        draft.raw_payload = Some(json!({
            "time_limit": parsed.time_limit,
            "memory_limit": parsed.memory_limit,
            "test_case_count": parsed.samples.len(),
            "samples": parsed.samples.iter()
                .map(|s| json!({"input": s.input, "output": s.output}))
                .collect::<Vec<_>>(),
        }));

        Ok(vec![draft])
    }
}

fn parse_problem(region: &str) -> ParsedProblem {
    let doc = Html::parse_fragment(region);

    let title_sel = selector(".header .title");
    let title_fallback_sel = selector(".title");
    let raw_title = doc
        .select(&title_sel)
        .next()
        .or_else(|| doc.select(&title_fallback_sel).next())
        .map(element_text)
        .unwrap_or_else(|| "Untitled Problem".to_string());
    let title = strip_index_prefix(&raw_title);

    let time_limit = limit_field(&doc, ".time-limit", "time limit per test");
    let memory_limit = limit_field(&doc, ".memory-limit", "memory limit per test");

    let statement = statement_text(&doc);
    let input_format = spec_text(&doc, ".input-specification");
    let output_format = spec_text(&doc, ".output-specification");
    let samples = sample_tests(&doc);
    let note = spec_text_capped(&doc, ".note", NOTE_CAP);

    ParsedProblem {
        title,
        statement,
        input_format,
        output_format,
        samples,
        note,
        time_limit,
        memory_limit,
    }
}

/// Drops a leading problem index like "A. " or "B. " from a title.
fn strip_index_prefix(title: &str) -> String {
    let mut chars = title.chars();
    if let (Some(first), Some('.')) = (chars.next(), chars.next())
        && first.is_ascii_uppercase()
    {
        return chars.as_str().trim_start().to_string();
    }
    title.trim().to_string()
}

/// Reads a limit container, dropping its label prefix.
fn limit_field(doc: &Html, css: &str, label: &str) -> String {
    let sel = selector(css);
    let Some(element) = doc.select(&sel).next() else {
        return UNKNOWN.to_string();
    };
    let text = element_text(element);
    match text.find(label) {
        Some(pos) => {
            let value = text[pos + label.len()..].trim();
            if value.is_empty() {
                UNKNOWN.to_string()
            } else {
                value.to_string()
            }
        }
        None if text.is_empty() => UNKNOWN.to_string(),
        None => text,
    }
}

/// Statement prose: paragraphs of the unclassed child containers, skipping
/// the header, specifications, samples, and note.
fn statement_text(doc: &Html) -> String {
    let Some(root) = doc.root_element().child_elements().next() else {
        return String::new();
    };

    let skip_classes = [
        "header",
        "input-specification",
        "output-specification",
        "sample-tests",
        "note",
        "time-limit",
        "memory-limit",
    ];
    let p_sel = selector("p");

    let mut paragraphs: Vec<String> = Vec::new();
    for child in root.child_elements() {
        let class = child.value().attr("class").unwrap_or("");
        if skip_classes.iter().any(|skip| class.contains(skip)) {
            continue;
        }
        for p in child.select(&p_sel) {
            let text = element_text(p);
            if text.len() > 10 {
                paragraphs.push(text);
            }
        }
    }

    truncate_chars(&paragraphs.join("\n\n"), STATEMENT_CAP)
}

/// Text of a specification container, minus its section title.
fn spec_text(doc: &Html, css: &str) -> String {
    spec_text_capped(doc, css, SPEC_CAP)
}

fn spec_text_capped(doc: &Html, css: &str, cap: usize) -> String {
    let sel = selector(css);
    let Some(element) = doc.select(&sel).next() else {
        return String::new();
    };

    let full = element_text(element);
    let title_sel = selector(".section-title");
    let stripped = match element.select(&title_sel).next().map(element_text) {
        Some(title) if !title.is_empty() => full
            .strip_prefix(title.as_str())
            .map_or(full.clone(), |rest| rest.trim_start().to_string()),
        _ => full,
    };
    truncate_chars(&stripped, cap)
}

/// Paired sample input/output blocks, in document order.
fn sample_tests(doc: &Html) -> Vec<SampleTest> {
    let input_sel = selector(".sample-tests .input pre");
    let output_sel = selector(".sample-tests .output pre");

    let inputs: Vec<String> = doc.select(&input_sel).map(pre_text).collect();
    let outputs: Vec<String> = doc.select(&output_sel).map(pre_text).collect();

    inputs
        .into_iter()
        .zip(outputs)
        .filter(|(input, output)| !input.is_empty() && !output.is_empty())
        .map(|(input, output)| SampleTest {
            input: truncate_chars(&input, SAMPLE_CAP),
            output: truncate_chars(&output, SAMPLE_CAP),
        })
        .collect()
}

/// Renders the markdown body from the parsed fields.
fn format_body(parsed: &ParsedProblem) -> String {
    let statement = if parsed.statement.is_empty() {
        "Problem statement not found"
    } else {
        &parsed.statement
    };
    let mut body = format!("**Problem Statement:**\n\n{statement}\n\n");

    if !parsed.input_format.is_empty() {
        body.push_str(&format!("**Input Format:**\n{}\n\n", parsed.input_format));
    }
    if !parsed.output_format.is_empty() {
        body.push_str(&format!("**Output Format:**\n{}\n\n", parsed.output_format));
    }

    if !parsed.samples.is_empty() {
        body.push_str("**Examples:**\n\n");
        for (idx, sample) in parsed.samples.iter().enumerate() {
            body.push_str(&format!("**Example {}:**\n", idx + 1));
            body.push_str(&format!("Input:\n```\n{}\n```\n", sample.input));
            body.push_str(&format!("Output:\n```\n{}\n```\n\n", sample.output));
        }
    }

    if !parsed.note.is_empty() {
        body.push_str(&format!("**Note:** {}\n\n", parsed.note));
    }

    body.push_str("**Constraints:**\n");
    body.push_str(&format!("- Time Limit: {}\n", parsed.time_limit));
    body.push_str(&format!("- Memory Limit: {}\n", parsed.memory_limit));

    body
}

fn summarize(statement: &str) -> String {
    let mut summary = truncate_chars(statement, SUMMARY_CAP);
    if statement.chars().count() > SUMMARY_CAP {
        summary.push_str("...");
    }
    summary
}

fn key_points(parsed: &ParsedProblem) -> Vec<String> {
    let mut points = vec![
        "Algorithmic challenge".to_string(),
        "Competitive programming".to_string(),
    ];
    if !parsed.samples.is_empty() {
        points.push(format!("{} example(s) provided", parsed.samples.len()));
    }
    if parsed.time_limit != UNKNOWN {
        points.push(format!("Time limit: {}", parsed.time_limit));
    }
    if parsed.memory_limit != UNKNOWN {
        points.push(format!("Memory limit: {}", parsed.memory_limit));
    }
    points
}
