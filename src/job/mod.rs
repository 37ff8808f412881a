//! Durable scrape job persistence with checkpointed progress.
//!
//! A [`ScrapeJob`] tracks one run over a source's URL set. Progress is
//! checkpointed after every URL so that an interrupted or paused run can be
//! resumed without repeating work. Jobs move through
//! running → paused`_*`/completed/failed; paused jobs are picked up again by
//! [`JobStore::get_or_create`] on the next invocation.
//!
//! The store assumes a single writer per source (the orchestrator); progress
//! updates are plain read-modify-write over the JSON checkpoint columns.

mod error;
mod record;

pub use error::{JobDbErrorKind, JobError};
pub use record::{JobStatus, PauseReason, ScrapeJob};

use sqlx::Row;
use tracing::{debug, info, instrument};

use crate::db::Database;

/// Result type for job store operations.
pub type Result<T> = std::result::Result<T, JobError>;

/// Returns `Ok(())` if at least one row was affected; otherwise [`JobError::JobNotFound`].
fn check_affected(id: i64, rows_affected: u64) -> Result<()> {
    if rows_affected == 0 {
        Err(JobError::JobNotFound(id))
    } else {
        Ok(())
    }
}

/// `SQLite`-backed store for scrape jobs.
#[derive(Debug, Clone)]
pub struct JobStore {
    db: Database,
}

impl JobStore {
    /// Creates a new job store over the given database connection.
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Returns the most recent resumable job for a source, or creates one.
    ///
    /// A job counts as resumable while it is `running` or paused; completed
    /// and failed jobs are never reused, so a finished source starts a fresh
    /// job on the next invocation. The URL set of a reused job is left
    /// untouched, preserving its checkpoint.
    ///
    /// # Errors
    ///
    /// Returns [`JobError::Database`] if a query fails.
    #[instrument(skip(self, urls), fields(source = %source_name, url_count = urls.len()))]
    pub async fn get_or_create(&self, source_name: &str, urls: &[String]) -> Result<ScrapeJob> {
        let existing = sqlx::query_as::<_, ScrapeJob>(
            r"SELECT * FROM scrape_jobs
              WHERE source_name = ?
                AND status IN ('running', 'paused_captcha', 'paused_blocked')
              ORDER BY created_at DESC, id DESC
              LIMIT 1",
        )
        .bind(source_name)
        .fetch_optional(self.db.pool())
        .await?;

        if let Some(job) = existing {
            info!(
                job_id = job.id,
                status = %job.status(),
                completed = job.completed_urls().len(),
                "reusing existing job"
            );
            return Ok(job);
        }

        let id: i64 = sqlx::query(
            r"INSERT INTO scrape_jobs (source_name, urls, status)
              VALUES (?, ?, 'running')
              RETURNING id",
        )
        .bind(source_name)
        .bind(ScrapeJob::serialize_urls(urls))
        .fetch_one(self.db.pool())
        .await?
        .get("id");

        info!(job_id = id, "created new job");
        self.get(id).await
    }

    /// Fetches a job by id.
    ///
    /// # Errors
    ///
    /// Returns [`JobError::JobNotFound`] if no job exists with the given id.
    pub async fn get(&self, id: i64) -> Result<ScrapeJob> {
        sqlx::query_as::<_, ScrapeJob>("SELECT * FROM scrape_jobs WHERE id = ?")
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?
            .ok_or(JobError::JobNotFound(id))
    }

    /// Records the URL currently being processed.
    ///
    /// # Errors
    ///
    /// Returns [`JobError::JobNotFound`] if no job exists with the given id.
    #[instrument(skip(self))]
    pub async fn set_current_url(&self, id: i64, url: &str) -> Result<()> {
        let result = sqlx::query(
            r"UPDATE scrape_jobs
              SET current_url = ?, updated_at = datetime('now')
              WHERE id = ?",
        )
        .bind(url)
        .bind(id)
        .execute(self.db.pool())
        .await?;

        check_affected(id, result.rows_affected())
    }

    /// Checkpoints a successfully processed URL.
    ///
    /// Appends the URL to the completed list (idempotently) and transitions
    /// the job to `completed` once every planned URL is accounted for.
    /// Returns the updated job.
    ///
    /// # Errors
    ///
    /// Returns [`JobError::JobNotFound`] if no job exists with the given id.
    #[instrument(skip(self))]
    pub async fn update_progress(&self, id: i64, url: &str) -> Result<ScrapeJob> {
        let job = self.get(id).await?;

        let mut completed = job.completed_urls();
        if !completed.iter().any(|u| u == url) {
            completed.push(url.to_string());
        }

        let done = completed.len() >= job.urls().len();
        let status = if done {
            JobStatus::Completed
        } else {
            JobStatus::Running
        };

        let result = sqlx::query(
            r"UPDATE scrape_jobs
              SET completed_urls = ?,
                  status = ?,
                  pause_reason = NULL,
                  current_url = NULL,
                  updated_at = datetime('now')
              WHERE id = ?",
        )
        .bind(ScrapeJob::serialize_urls(&completed))
        .bind(status.as_str())
        .bind(id)
        .execute(self.db.pool())
        .await?;
        check_affected(id, result.rows_affected())?;

        if done {
            info!(job_id = id, total = completed.len(), "job completed");
        } else {
            debug!(job_id = id, completed = completed.len(), "checkpointed progress");
        }
        self.get(id).await
    }

    /// Records a URL that exhausted retries and was abandoned.
    ///
    /// The URL also joins the completed list so the job can still reach the
    /// `completed` status; the failed list preserves the distinction for
    /// reporting.
    ///
    /// # Errors
    ///
    /// Returns [`JobError::JobNotFound`] if no job exists with the given id.
    #[instrument(skip(self))]
    pub async fn record_failed_url(&self, id: i64, url: &str) -> Result<ScrapeJob> {
        let job = self.get(id).await?;

        let mut failed = job.failed_urls();
        if !failed.iter().any(|u| u == url) {
            failed.push(url.to_string());
        }

        let result = sqlx::query(
            r"UPDATE scrape_jobs
              SET failed_urls = ?, updated_at = datetime('now')
              WHERE id = ?",
        )
        .bind(ScrapeJob::serialize_urls(&failed))
        .bind(id)
        .execute(self.db.pool())
        .await?;
        check_affected(id, result.rows_affected())?;

        self.update_progress(id, url).await
    }

    /// Pauses a job on a CAPTCHA/BLOCKED condition, recording the URL that
    /// triggered it so a resumed run restarts there.
    ///
    /// # Errors
    ///
    /// Returns [`JobError::JobNotFound`] if no job exists with the given id.
    #[instrument(skip(self), fields(reason = %reason))]
    pub async fn pause(&self, id: i64, reason: PauseReason, current_url: &str) -> Result<()> {
        let result = sqlx::query(
            r"UPDATE scrape_jobs
              SET status = ?,
                  pause_reason = ?,
                  current_url = ?,
                  updated_at = datetime('now')
              WHERE id = ?",
        )
        .bind(reason.paused_status().as_str())
        .bind(reason.as_str())
        .bind(current_url)
        .bind(id)
        .execute(self.db.pool())
        .await?;

        info!(job_id = id, %reason, url = current_url, "job paused");
        check_affected(id, result.rows_affected())
    }

    /// Returns a paused job to `running`, clearing the pause reason.
    ///
    /// The checkpoint lists and `current_url` are preserved so processing
    /// picks up where the pause happened.
    ///
    /// # Errors
    ///
    /// Returns [`JobError::JobNotFound`] if no job exists with the given id.
    #[instrument(skip(self))]
    pub async fn resume(&self, id: i64) -> Result<ScrapeJob> {
        let result = sqlx::query(
            r"UPDATE scrape_jobs
              SET status = 'running',
                  pause_reason = NULL,
                  updated_at = datetime('now')
              WHERE id = ?",
        )
        .bind(id)
        .execute(self.db.pool())
        .await?;
        check_affected(id, result.rows_affected())?;

        info!(job_id = id, "job resumed");
        self.get(id).await
    }

    /// Marks a job as terminally failed.
    ///
    /// # Errors
    ///
    /// Returns [`JobError::JobNotFound`] if no job exists with the given id.
    #[instrument(skip(self))]
    pub async fn mark_failed(&self, id: i64) -> Result<()> {
        let result = sqlx::query(
            r"UPDATE scrape_jobs
              SET status = 'failed', updated_at = datetime('now')
              WHERE id = ?",
        )
        .bind(id)
        .execute(self.db.pool())
        .await?;

        info!(job_id = id, "job marked failed");
        check_affected(id, result.rows_affected())
    }
}
