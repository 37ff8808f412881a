//! Integration tests for the full scrape/extract/persist pipeline.
//!
//! A wiremock server stands in for the rendering backend; the pipeline runs
//! against a file-backed database so that pause and resume can be exercised
//! across separate invocations, the way separate process runs would.

use std::path::Path;

use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use harvester_core::{
    BackendConfig, BackendMode, Config, ContentRepo, Database, JobStatus, JobStore, Notifier,
    PauseReason, SourcePipeline, SourceProfile, TextGenConfig,
};

const U1: &str = "https://aman.ai/primers/ai/attention";
const U2: &str = "https://aman.ai/primers/ai/transformers";
const U3: &str = "https://aman.ai/primers/ai/tokenizers";

fn article_html(section_title: &str, text: &str) -> String {
    format!(
        "<html><body><article><h2>Primer</h2><h3>{section_title}</h3><p>{text}</p></article></body></html>"
    )
}

fn config_for(server: &MockServer, db_path: &Path) -> Config {
    Config {
        backend: BackendConfig {
            url: server.uri(),
            mode: BackendMode::Local,
            api_key: None,
        },
        db_path: db_path.to_path_buf(),
        max_retries: 2,
        textgen: TextGenConfig::default(),
    }
}

fn profile_with(urls: &[&str]) -> SourceProfile {
    SourceProfile {
        urls: Some(urls.iter().map(ToString::to_string).collect()),
        ..SourceProfile::default()
    }
}

async fn mount_render_ok(server: &MockServer, url: &str, html: String) {
    Mock::given(method("POST"))
        .and(path("/v1/scrape"))
        .and(body_partial_json(json!({ "url": url })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "markdown": null, "html": html }
        })))
        .mount(server)
        .await;
}

async fn mount_render_status(server: &MockServer, url: &str, status: u16) {
    Mock::given(method("POST"))
        .and(path("/v1/scrape"))
        .and(body_partial_json(json!({ "url": url })))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_blocked_url_pauses_and_resume_completes() {
    let server = MockServer::start().await;
    let temp_dir = tempfile::tempdir().unwrap();
    let db_path = temp_dir.path().join("pipeline.db");
    let config = config_for(&server, &db_path);
    let profile = profile_with(&[U1, U2, U3]);

    mount_render_ok(&server, U1, article_html("Attention", "Scores compare tokens.")).await;
    mount_render_status(&server, U2, 403).await;
    mount_render_ok(&server, U3, article_html("Tokenizers", "Subword units.")).await;

    // First invocation: U1 succeeds, U2 is blocked, the job pauses.
    let db = Database::new(&db_path).await.unwrap();
    let pipeline = SourcePipeline::new(db.clone(), &config);
    let summary = pipeline.run("aman", &profile, None).await.unwrap();

    assert_eq!(summary.processed, 1);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.paused_reason, Some(PauseReason::Blocked));
    assert_eq!(summary.status, JobStatus::PausedBlocked);

    let store = JobStore::new(db.clone());
    let job = store.get(summary.job_id).await.unwrap();
    assert_eq!(job.status(), JobStatus::PausedBlocked);
    assert_eq!(job.current_url.as_deref(), Some(U2));
    assert_eq!(job.completed_urls(), vec![U1.to_string()]);

    let notifier = Notifier::new(db.clone());
    let pending = notifier.list_unresolved(Some("aman")).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].error_type(), Some(PauseReason::Blocked));
    assert_eq!(pending[0].url, U2);
    db.close().await;

    // The block clears (operator rotated cookies); U2 now renders.
    server.reset().await;
    mount_render_ok(&server, U1, article_html("Attention", "Scores compare tokens.")).await;
    mount_render_ok(&server, U2, article_html("Transformers", "Stacked attention blocks.")).await;
    mount_render_ok(&server, U3, article_html("Tokenizers", "Subword units.")).await;

    // Second invocation resumes the same job from its checkpoint: U1 is
    // skipped, U2 and U3 are processed.
    let db = Database::new(&db_path).await.unwrap();
    let pipeline = SourcePipeline::new(db.clone(), &config);
    let summary2 = pipeline.run("aman", &profile, None).await.unwrap();

    assert_eq!(summary2.job_id, summary.job_id, "paused job should be reused");
    assert_eq!(summary2.processed, 2);
    assert_eq!(summary2.paused_reason, None);
    assert_eq!(summary2.status, JobStatus::Completed);

    let store = JobStore::new(db.clone());
    let job = store.get(summary2.job_id).await.unwrap();
    assert!(job.is_complete());
    assert_eq!(job.completed_urls().len(), 3);

    let content = ContentRepo::new(db.clone());
    assert_eq!(content.count_for_source("aman").await.unwrap(), 3);
    db.close().await;
}

#[tokio::test]
async fn test_rerun_after_completion_does_not_duplicate_records() {
    let server = MockServer::start().await;
    let temp_dir = tempfile::tempdir().unwrap();
    let db_path = temp_dir.path().join("pipeline.db");
    let config = config_for(&server, &db_path);
    let profile = profile_with(&[U1, U2]);

    mount_render_ok(&server, U1, article_html("Attention", "Scores compare tokens.")).await;
    mount_render_ok(&server, U2, article_html("Transformers", "Stacked attention blocks.")).await;

    let db = Database::new(&db_path).await.unwrap();
    let pipeline = SourcePipeline::new(db.clone(), &config);

    let first = pipeline.run("aman", &profile, None).await.unwrap();
    assert_eq!(first.status, JobStatus::Completed);

    // A completed job is not reused; the rerun scrapes again but the unique
    // source_url constraint keeps the content store deduplicated.
    let second = pipeline.run("aman", &profile, None).await.unwrap();
    assert_ne!(second.job_id, first.job_id);
    assert_eq!(second.status, JobStatus::Completed);

    let content = ContentRepo::new(db.clone());
    assert_eq!(content.count_for_source("aman").await.unwrap(), 2);
    db.close().await;
}

#[tokio::test]
async fn test_disguised_challenge_page_pauses_as_captcha() {
    let server = MockServer::start().await;
    let temp_dir = tempfile::tempdir().unwrap();
    let db_path = temp_dir.path().join("pipeline.db");
    let config = config_for(&server, &db_path);
    let profile = profile_with(&[U1]);

    // HTTP 200, but the body is a verification interstitial.
    mount_render_ok(
        &server,
        U1,
        "<html><body>Verifying you are human. This may take a few seconds.</body></html>"
            .to_string(),
    )
    .await;

    let db = Database::new(&db_path).await.unwrap();
    let pipeline = SourcePipeline::new(db.clone(), &config);
    let summary = pipeline.run("aman", &profile, None).await.unwrap();

    assert_eq!(summary.paused_reason, Some(PauseReason::Captcha));
    assert_eq!(summary.status, JobStatus::PausedCaptcha);
    assert_eq!(summary.processed, 0);

    let notifier = Notifier::new(db.clone());
    let pending = notifier.list_unresolved(Some("aman")).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].error_type(), Some(PauseReason::Captcha));
    db.close().await;
}

#[tokio::test]
async fn test_all_urls_failing_marks_job_failed() {
    let server = MockServer::start().await;
    let temp_dir = tempfile::tempdir().unwrap();
    let db_path = temp_dir.path().join("pipeline.db");
    let config = config_for(&server, &db_path);
    let profile = profile_with(&[U1, U2]);

    // 404 classifies as UNKNOWN: permanent per-URL failure, no pause.
    mount_render_status(&server, U1, 404).await;
    mount_render_status(&server, U2, 404).await;

    let db = Database::new(&db_path).await.unwrap();
    let pipeline = SourcePipeline::new(db.clone(), &config);
    let summary = pipeline.run("aman", &profile, None).await.unwrap();

    assert_eq!(summary.processed, 0);
    assert_eq!(summary.failed, 2);
    assert_eq!(summary.paused_reason, None);
    assert_eq!(summary.status, JobStatus::Failed);

    let store = JobStore::new(db.clone());
    let job = store.get(summary.job_id).await.unwrap();
    assert_eq!(job.failed_urls().len(), 2);
    db.close().await;
}

#[tokio::test]
async fn test_resumed_job_with_soft_failure_is_not_marked_failed() {
    let server = MockServer::start().await;
    let temp_dir = tempfile::tempdir().unwrap();
    let db_path = temp_dir.path().join("pipeline.db");
    let config = config_for(&server, &db_path);
    let profile = profile_with(&[U1, U2]);

    mount_render_ok(&server, U1, article_html("Attention", "Scores compare tokens.")).await;
    mount_render_status(&server, U2, 403).await;

    // First invocation: U1 succeeds, U2 is blocked, the job pauses.
    let db = Database::new(&db_path).await.unwrap();
    let pipeline = SourcePipeline::new(db.clone(), &config);
    let summary = pipeline.run("aman", &profile, None).await.unwrap();
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.status, JobStatus::PausedBlocked);
    db.close().await;

    // The block clears but U2 is gone for good: the resumed invocation
    // processes nothing, yet the job made progress earlier and must not be
    // downgraded to failed.
    server.reset().await;
    mount_render_status(&server, U2, 404).await;

    let db = Database::new(&db_path).await.unwrap();
    let pipeline = SourcePipeline::new(db.clone(), &config);
    let summary2 = pipeline.run("aman", &profile, None).await.unwrap();

    assert_eq!(summary2.job_id, summary.job_id, "paused job should be reused");
    assert_eq!(summary2.processed, 0);
    assert_eq!(summary2.failed, 1);
    assert_eq!(summary2.status, JobStatus::Completed);

    let store = JobStore::new(db.clone());
    let job = store.get(summary2.job_id).await.unwrap();
    assert_eq!(job.status(), JobStatus::Completed);
    assert_eq!(job.failed_urls(), vec![U2.to_string()]);
    db.close().await;
}

#[tokio::test]
async fn test_extraction_failure_is_recorded_not_fatal() {
    let server = MockServer::start().await;
    let temp_dir = tempfile::tempdir().unwrap();
    let db_path = temp_dir.path().join("pipeline.db");
    let config = config_for(&server, &db_path);
    let profile = profile_with(&[U1, U2]);

    // U1 renders fine but has no extractable sections; U2 is a real article.
    mount_render_ok(&server, U1, "<html><body><p>No headings here.</p></body></html>".into())
        .await;
    mount_render_ok(&server, U2, article_html("Transformers", "Stacked attention blocks.")).await;

    let db = Database::new(&db_path).await.unwrap();
    let pipeline = SourcePipeline::new(db.clone(), &config);
    let summary = pipeline.run("aman", &profile, None).await.unwrap();

    assert_eq!(summary.processed, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.status, JobStatus::Completed);
    db.close().await;
}

#[tokio::test]
async fn test_limit_truncates_explicit_url_set() {
    let server = MockServer::start().await;
    let temp_dir = tempfile::tempdir().unwrap();
    let db_path = temp_dir.path().join("pipeline.db");
    let config = config_for(&server, &db_path);
    let profile = profile_with(&[U1, U2, U3]);

    mount_render_ok(&server, U1, article_html("Attention", "Scores compare tokens.")).await;

    let db = Database::new(&db_path).await.unwrap();
    let pipeline = SourcePipeline::new(db.clone(), &config);
    let summary = pipeline.run("aman", &profile, Some(1)).await.unwrap();

    assert_eq!(summary.processed, 1);
    assert_eq!(summary.status, JobStatus::Completed);

    let store = JobStore::new(db.clone());
    let job = store.get(summary.job_id).await.unwrap();
    assert_eq!(job.urls(), vec![U1.to_string()]);
    db.close().await;
}

#[tokio::test]
async fn test_unknown_source_is_rejected() {
    let server = MockServer::start().await;
    let temp_dir = tempfile::tempdir().unwrap();
    let db_path = temp_dir.path().join("pipeline.db");
    let config = config_for(&server, &db_path);

    let db = Database::new(&db_path).await.unwrap();
    let pipeline = SourcePipeline::new(db.clone(), &config);
    let result = pipeline
        .run("not-a-source", &SourceProfile::default(), None)
        .await;

    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("unknown source"));
    db.close().await;
}
