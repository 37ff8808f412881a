//! Codeforces problemset discovery.
//!
//! The problemset API returns the full problem catalog as JSON; problem page
//! URLs are synthesized from `contestId` and `index`. Selection is a
//! deterministic prefix of the catalog so repeated invocations resume the
//! same job instead of chasing a new random sample.

use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{DiscoveryError, Result};

const PROBLEMSET_API: &str = "https://codeforces.com/api/problemset.problems";

/// Default number of problems per discovery.
const DEFAULT_BATCH: usize = 50;

#[derive(Debug, Deserialize)]
struct ProblemsetResponse {
    status: String,
    #[serde(default)]
    result: Option<ProblemsetResult>,
}

#[derive(Debug, Deserialize)]
struct ProblemsetResult {
    problems: Vec<Problem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Problem {
    #[serde(default)]
    contest_id: Option<i64>,
    #[serde(default)]
    index: Option<String>,
}

/// Discovers problem page URLs from the problemset API.
pub(super) async fn discover_problems(http: &Client) -> Result<Vec<String>> {
    discover_problems_at(http, PROBLEMSET_API).await
}

pub(super) async fn discover_problems_at(http: &Client, api_url: &str) -> Result<Vec<String>> {
    let response: ProblemsetResponse = http
        .get(api_url)
        .send()
        .await
        .map_err(|e| DiscoveryError::http(api_url, e))?
        .json()
        .await
        .map_err(|e| DiscoveryError::http(api_url, e))?;

    if response.status != "OK" {
        return Err(DiscoveryError::api(
            "codeforces",
            format!("problemset API status '{}'", response.status),
        ));
    }

    let problems = response
        .result
        .ok_or_else(|| DiscoveryError::api("codeforces", "problemset API result missing"))?
        .problems;
    debug!(catalog = problems.len(), "fetched problemset catalog");

    let urls: Vec<String> = problems
        .into_iter()
        .filter_map(|p| match (p.contest_id, p.index) {
            (Some(contest_id), Some(index)) if !index.is_empty() => Some(format!(
                "https://codeforces.com/problemset/problem/{contest_id}/{index}"
            )),
            _ => None,
        })
        .take(DEFAULT_BATCH)
        .collect();

    Ok(urls)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_discovers_problem_urls() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/problemset.problems"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "OK",
                "result": {"problems": [
                    {"contestId": 4, "index": "A", "name": "Watermelon", "tags": ["math"]},
                    {"contestId": 1, "index": "B", "name": "Spreadsheets", "tags": []},
                    {"name": "No contest id", "tags": []}
                ]}
            })))
            .mount(&server)
            .await;

        let urls = discover_problems_at(
            &Client::new(),
            &format!("{}/api/problemset.problems", server.uri()),
        )
        .await
        .unwrap();

        assert_eq!(
            urls,
            vec![
                "https://codeforces.com/problemset/problem/4/A",
                "https://codeforces.com/problemset/problem/1/B",
            ]
        );
    }

    #[tokio::test]
    async fn test_discovery_truncates_to_batch_size() {
        let problems: Vec<_> = (1..=DEFAULT_BATCH as i64 + 10)
            .map(|n| serde_json::json!({"contestId": n, "index": "A", "name": "P", "tags": []}))
            .collect();
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/problemset.problems"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "OK",
                "result": {"problems": problems}
            })))
            .mount(&server)
            .await;

        let urls = discover_problems_at(
            &Client::new(),
            &format!("{}/api/problemset.problems", server.uri()),
        )
        .await
        .unwrap();

        assert_eq!(urls.len(), DEFAULT_BATCH);
        assert_eq!(urls[0], "https://codeforces.com/problemset/problem/1/A");
    }

    #[tokio::test]
    async fn test_api_failure_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/problemset.problems"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"status": "FAILED"})),
            )
            .mount(&server)
            .await;

        let err = discover_problems_at(
            &Client::new(),
            &format!("{}/api/problemset.problems", server.uri()),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, DiscoveryError::Api { .. }));
        assert!(err.to_string().contains("FAILED"));
    }
}
