//! Scrape job record types and status definitions.

use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Lifecycle status of a scrape job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Actively processing URLs.
    Running,
    /// Suspended after a CAPTCHA/verification page; resumable.
    PausedCaptcha,
    /// Suspended after an access-denied response; resumable.
    PausedBlocked,
    /// All URLs in the job's set have been processed.
    Completed,
    /// Run ended with no progress and unrecoverable failures remaining.
    Failed,
}

impl JobStatus {
    /// Returns the database string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::PausedCaptcha => "paused_captcha",
            Self::PausedBlocked => "paused_blocked",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Whether a job in this status can be picked up by a new run.
    #[must_use]
    pub fn is_resumable(&self) -> bool {
        matches!(self, Self::Running | Self::PausedCaptcha | Self::PausedBlocked)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(Self::Running),
            "paused_captcha" => Ok(Self::PausedCaptcha),
            "paused_blocked" => Ok(Self::PausedBlocked),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("invalid job status: {s}")),
        }
    }
}

/// Why a job was paused. Mirrors the classifier's pause-class kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PauseReason {
    /// A CAPTCHA or verification challenge was encountered.
    Captcha,
    /// The source denied access (403 or equivalent).
    Blocked,
}

impl PauseReason {
    /// Returns the database string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Captcha => "CAPTCHA",
            Self::Blocked => "BLOCKED",
        }
    }

    /// The paused status corresponding to this reason.
    #[must_use]
    pub fn paused_status(&self) -> JobStatus {
        match self {
            Self::Captcha => JobStatus::PausedCaptcha,
            Self::Blocked => JobStatus::PausedBlocked,
        }
    }
}

impl fmt::Display for PauseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PauseReason {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CAPTCHA" => Ok(Self::Captcha),
            "BLOCKED" => Ok(Self::Blocked),
            _ => Err(format!("invalid pause reason: {s}")),
        }
    }
}

/// A durable scrape job row: one per source run, with checkpoint lists.
///
/// The URL set and checkpoint lists are stored as JSON arrays in text
/// columns and parsed on access.
#[derive(Debug, Clone, FromRow)]
pub struct ScrapeJob {
    /// Unique identifier.
    pub id: i64,
    /// Name of the content source this job belongs to.
    pub source_name: String,
    /// Planned URL set as a JSON array (stable order).
    #[sqlx(rename = "urls")]
    pub urls_json: String,
    /// URL being processed when the job last checkpointed or paused.
    pub current_url: Option<String>,
    /// Successfully processed URLs as a JSON array.
    #[sqlx(rename = "completed_urls")]
    pub completed_json: String,
    /// Permanently failed URLs as a JSON array.
    #[sqlx(rename = "failed_urls")]
    pub failed_json: String,
    /// Current lifecycle status (stored as text, parsed via `status()`).
    #[sqlx(rename = "status")]
    pub status_str: String,
    /// Pause reason when status is a paused state.
    #[sqlx(rename = "pause_reason")]
    pub pause_reason_str: Option<String>,
    /// When the job was created.
    pub created_at: String,
    /// When the job was last updated.
    pub updated_at: String,
}

impl ScrapeJob {
    /// Returns the parsed status enum.
    ///
    /// Falls back to `Running` if the status string is invalid.
    #[must_use]
    pub fn status(&self) -> JobStatus {
        self.status_str.parse().unwrap_or(JobStatus::Running)
    }

    /// Returns the parsed pause reason, if any.
    #[must_use]
    pub fn pause_reason(&self) -> Option<PauseReason> {
        self.pause_reason_str.as_deref().and_then(|s| s.parse().ok())
    }

    /// Planned URL set in stable order.
    #[must_use]
    pub fn urls(&self) -> Vec<String> {
        parse_url_list(&self.urls_json)
    }

    /// URLs already processed successfully.
    #[must_use]
    pub fn completed_urls(&self) -> Vec<String> {
        parse_url_list(&self.completed_json)
    }

    /// URLs that exhausted retries and were abandoned.
    #[must_use]
    pub fn failed_urls(&self) -> Vec<String> {
        parse_url_list(&self.failed_json)
    }

    /// Whether every planned URL has been completed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.completed_urls().len() >= self.urls().len()
    }

    /// Planned URLs not yet completed, preserving the planned order.
    #[must_use]
    pub fn remaining_urls(&self) -> Vec<String> {
        let completed = self.completed_urls();
        self.urls()
            .into_iter()
            .filter(|url| !completed.contains(url))
            .collect()
    }

    /// Serializes a URL list to its JSON column representation.
    #[must_use]
    pub fn serialize_urls(urls: &[String]) -> String {
        serde_json::to_string(urls).unwrap_or_else(|_| "[]".to_string())
    }
}

impl fmt::Display for ScrapeJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ScrapeJob {{ id: {}, source: {}, status: {}, progress: {}/{} }}",
            self.id,
            self.source_name,
            self.status(),
            self.completed_urls().len(),
            self.urls().len()
        )
    }
}

/// Parses a JSON array column, tolerating invalid content as empty.
fn parse_url_list(json: &str) -> Vec<String> {
    serde_json::from_str(json).unwrap_or_default()
}
