//! Job orchestration: one invocation processes one source, end to end.
//!
//! The pipeline walks a job's URL set strictly sequentially: skip anything
//! already ingested, pace the request, scrape with retry, extract, persist,
//! checkpoint. CAPTCHA/BLOCKED outcomes pause the job (notifying the
//! operator) and end the invocation; per-URL failures are recorded and the
//! walk continues. A later invocation of the same source picks the job back
//! up from its checkpoint.

use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::config::{Config, SourceProfile};
use crate::content::{ContentError, ContentRepo};
use crate::db::Database;
use crate::extract::{ExtractorRegistry, PageContent, build_extractor_registry};
use crate::job::{JobError, JobStatus, JobStore, PauseReason, ScrapeJob};
use crate::notify::{Notifier, NotifyError};
use crate::scrape::{ErrorKind, RetryPolicy, ScrapeClient};
use crate::sources::{DiscoveryError, SourceSpec, find_source};
use crate::textgen::TextGenClient;

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors that abort a pipeline invocation.
///
/// Per-URL scrape and extraction failures are not errors at this level;
/// they are recorded on the job and the run continues.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The requested source is not in the catalog.
    #[error("unknown source '{0}'")]
    UnknownSource(String),

    /// No extractor is registered for the source.
    #[error("no extractor registered for source '{0}'")]
    NoExtractor(String),

    /// URL discovery failed; there is nothing to process.
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    /// Job store failure.
    #[error(transparent)]
    Job(#[from] JobError),

    /// Content repository failure.
    #[error(transparent)]
    Content(#[from] ContentError),

    /// Notification failure.
    #[error(transparent)]
    Notify(#[from] NotifyError),
}

/// Enforces a fixed minimum delay between consecutive requests.
///
/// Single-mutex pacing is enough: the orchestrator is strictly sequential,
/// the mutex only guards against future concurrent reuse.
#[derive(Debug)]
pub struct Pacer {
    delay: Duration,
    last: Mutex<Option<Instant>>,
}

impl Pacer {
    /// Creates a pacer with the given inter-request delay.
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            last: Mutex::new(None),
        }
    }

    /// Waits until the delay since the previous request has elapsed.
    ///
    /// The first call never waits.
    pub async fn pace(&self) {
        if self.delay.is_zero() {
            return;
        }
        let mut last = self.last.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.delay {
                tokio::time::sleep(self.delay - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

/// Outcome of one pipeline invocation, printed by the CLI as JSON.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    /// Source that was processed.
    pub source_name: String,
    /// Job backing this run.
    pub job_id: i64,
    /// URLs successfully ingested this invocation.
    pub processed: u64,
    /// URLs that failed permanently this invocation.
    pub failed: u64,
    /// Set when the run ended in a pause.
    pub paused_reason: Option<PauseReason>,
    /// Final job status after this invocation.
    pub status: JobStatus,
}

/// The per-source scrape/extract/persist pipeline.
#[derive(Debug, Clone)]
pub struct SourcePipeline {
    jobs: JobStore,
    content: ContentRepo,
    notifier: Notifier,
    scraper: ScrapeClient,
    registry: ExtractorRegistry,
    http: Client,
}

impl SourcePipeline {
    /// Wires the pipeline over a database and configuration.
    #[must_use]
    pub fn new(db: Database, config: &Config) -> Self {
        let policy = RetryPolicy::with_max_attempts(config.max_retries);
        let scraper = ScrapeClient::new(config.backend.clone(), policy);
        let registry = build_extractor_registry(TextGenClient::new(config.textgen.clone()));

        Self {
            jobs: JobStore::new(db.clone()),
            content: ContentRepo::new(db.clone()),
            notifier: Notifier::new(db),
            scraper,
            registry,
            http: Client::new(),
        }
    }

    /// Runs one invocation for a source.
    ///
    /// The URL set comes from the profile's explicit override when present,
    /// otherwise from discovery. A resumed job keeps its own URL set.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] for unknown sources, discovery failures,
    /// and persistence failures. Scrape/extract failures of individual URLs
    /// are recorded on the job instead.
    #[instrument(skip(self, profile), fields(source = %source_name))]
    pub async fn run(
        &self,
        source_name: &str,
        profile: &SourceProfile,
        limit: Option<usize>,
    ) -> Result<RunSummary> {
        let spec = find_source(source_name)
            .ok_or_else(|| PipelineError::UnknownSource(source_name.to_string()))?;
        let extractor = self
            .registry
            .get(source_name)
            .ok_or_else(|| PipelineError::NoExtractor(source_name.to_string()))?;

        let urls = match &profile.urls {
            Some(explicit) => {
                let mut urls = explicit.clone();
                if let Some(limit) = limit {
                    urls.truncate(limit);
                }
                urls
            }
            None => crate::sources::discover_urls(spec, &self.http, limit).await?,
        };

        let mut job = self.jobs.get_or_create(source_name, &urls).await?;
        if matches!(
            job.status(),
            JobStatus::PausedCaptcha | JobStatus::PausedBlocked
        ) {
            job = self.jobs.resume(job.id).await?;
        }

        let pacer = Pacer::new(profile.delay);
        let completed = job.completed_urls();
        let planned = job.urls();
        info!(
            job_id = job.id,
            planned = planned.len(),
            completed = completed.len(),
            "starting run"
        );

        let mut processed: u64 = 0;
        let mut failed: u64 = 0;

        for url in &planned {
            if completed.contains(url) {
                continue;
            }

            // The content table is authoritative for skips; the checkpoint
            // list is only an optimization. Checkpoint the skip so the job
            // can still complete.
            if self.content.exists(url).await? {
                debug!(url, "already ingested; checkpointing skip");
                self.jobs.update_progress(job.id, url).await?;
                continue;
            }

            self.jobs.set_current_url(job.id, url).await?;
            pacer.pace().await;

            let result = self.scraper.scrape_with_retry(url, profile).await;
            if !result.success {
                let kind = result.error_kind.unwrap_or(ErrorKind::Unknown);
                if kind.is_pause() {
                    let reason = match kind {
                        ErrorKind::Captcha => PauseReason::Captcha,
                        _ => PauseReason::Blocked,
                    };
                    self.pause_job(&job, spec, url, reason).await?;
                    return Ok(RunSummary {
                        source_name: source_name.to_string(),
                        job_id: job.id,
                        processed,
                        failed,
                        paused_reason: Some(reason),
                        status: reason.paused_status(),
                    });
                }

                warn!(url, %kind, error = result.error.as_deref().unwrap_or(""), "url failed permanently");
                self.jobs.record_failed_url(job.id, url).await?;
                failed += 1;
                continue;
            }

            let page = PageContent::new(result.markdown.as_deref(), result.html.as_deref());
            let drafts = match extractor.extract(page, url).await {
                Ok(drafts) => drafts,
                Err(error) => {
                    warn!(url, %error, "extraction failed");
                    self.jobs.record_failed_url(job.id, url).await?;
                    failed += 1;
                    continue;
                }
            };

            for draft in &drafts {
                match self.content.insert(source_name, draft).await {
                    Ok(id) => debug!(url, record_id = id, "inserted content record"),
                    Err(error) if error.is_duplicate() => {
                        debug!(url = %draft.source_url, "duplicate record; treating as ingested");
                    }
                    Err(error) => return Err(error.into()),
                }
            }

            self.jobs.update_progress(job.id, url).await?;
            processed += 1;
            info!(url, entities = drafts.len(), "processed url");
        }

        // A job is failed only when every planned URL failed permanently,
        // counting earlier invocations. A job with any successful URL keeps
        // its checkpoint status even when this invocation produced nothing.
        let mut final_job = self.jobs.get(job.id).await?;
        let failed_urls = final_job.failed_urls();
        if !planned.is_empty() && planned.iter().all(|url| failed_urls.contains(url)) {
            self.jobs.mark_failed(job.id).await?;
            final_job = self.jobs.get(job.id).await?;
        }

        info!(
            job_id = job.id,
            processed,
            failed,
            status = %final_job.status(),
            "run finished"
        );
        Ok(RunSummary {
            source_name: source_name.to_string(),
            job_id: job.id,
            processed,
            failed,
            paused_reason: None,
            status: final_job.status(),
        })
    }

    async fn pause_job(
        &self,
        job: &ScrapeJob,
        spec: &SourceSpec,
        url: &str,
        reason: PauseReason,
    ) -> Result<()> {
        warn!(job_id = job.id, url, %reason, "pausing job");
        self.jobs.pause(job.id, reason, url).await?;
        self.notifier
            .notify_pause(spec.name, url, reason, &remediation_message(reason, spec, url))
            .await?;
        Ok(())
    }
}

/// Operator-facing message recorded with a pause notification.
fn remediation_message(reason: PauseReason, spec: &SourceSpec, url: &str) -> String {
    match reason {
        PauseReason::Captcha => format!(
            "CAPTCHA challenge at {url}. Solve the challenge in a browser, refresh the \
             {source} cookies (HARVESTER_{env}_COOKIES), then re-run the source to resume.",
            source = spec.name,
            env = env_fragment(spec.name),
        ),
        PauseReason::Blocked => format!(
            "Access blocked at {url}. Rotate cookies/headers for {source} \
             (HARVESTER_{env}_COOKIES) or wait before re-running to resume.",
            source = spec.name,
            env = env_fragment(spec.name),
        ),
    }
}

fn env_fragment(source_name: &str) -> String {
    source_name.to_uppercase().replace('-', "_")
}
