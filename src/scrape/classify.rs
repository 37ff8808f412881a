//! Failure classification for scrape attempts.
//!
//! Deterministic mapping from `(message, http status, content sample)` to the
//! closed [`ErrorKind`] taxonomy. Content heuristics run **before** status
//! codes: anti-bot services routinely serve a disguised verification page
//! with HTTP 200, so a successful-looking response can still be a challenge.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Body markers that identify a challenge/verification page.
const CHALLENGE_MARKERS: [&str; 4] = [
    "verifying you are human",
    "security check",
    "captcha",
    "challenge",
];

/// Closed taxonomy of classified scrape failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Interactive challenge page; requires a human to solve it.
    Captcha,
    /// IP or session blocked (403, explicit block message).
    Blocked,
    /// Server rate limiting (429); retried with backoff.
    RateLimited,
    /// Transport failure or 5xx; retried with backoff.
    NetworkError,
    /// Anything unclassified; not retried.
    Unknown,
}

impl ErrorKind {
    /// Returns the wire/database string representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Captcha => "CAPTCHA",
            Self::Blocked => "BLOCKED",
            Self::RateLimited => "RATE_LIMITED",
            Self::NetworkError => "NETWORK_ERROR",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Whether another attempt may succeed without human intervention.
    #[must_use]
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::RateLimited | Self::NetworkError)
    }

    /// Whether this failure must pause the owning job.
    ///
    /// CAPTCHA and BLOCKED are terminal for the run: retrying only digs the
    /// IP reputation hole deeper, so the job is parked for remediation.
    #[must_use]
    pub fn is_pause(self) -> bool {
        matches!(self, Self::Captcha | Self::Blocked)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Classifies a scrape failure.
///
/// Precedence:
/// 1. content sample contains a challenge marker -> [`ErrorKind::Captcha`]
/// 2. message mentions captcha/challenge -> [`ErrorKind::Captcha`]
/// 3. message mentions blocked/forbidden, or status 403 -> [`ErrorKind::Blocked`]
/// 4. message mentions rate limiting, or status 429 -> [`ErrorKind::RateLimited`]
/// 5. status >= 500 -> [`ErrorKind::NetworkError`]
/// 6. otherwise [`ErrorKind::Unknown`]
#[must_use]
pub fn classify(message: &str, http_status: Option<u16>, content_sample: &str) -> ErrorKind {
    let message = message.to_lowercase();
    let content = content_sample.to_lowercase();

    if CHALLENGE_MARKERS.iter().any(|m| content.contains(m)) {
        return ErrorKind::Captcha;
    }

    if message.contains("captcha") || message.contains("challenge") {
        return ErrorKind::Captcha;
    }

    if message.contains("blocked") || message.contains("forbidden") || http_status == Some(403) {
        return ErrorKind::Blocked;
    }

    if message.contains("rate limit") || message.contains("too many") || http_status == Some(429) {
        return ErrorKind::RateLimited;
    }

    if http_status.is_some_and(|status| status >= 500) {
        return ErrorKind::NetworkError;
    }

    ErrorKind::Unknown
}
