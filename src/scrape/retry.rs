//! Retry policy with deterministic exponential backoff.
//!
//! Transient scrape failures ([`ErrorKind::RateLimited`],
//! [`ErrorKind::NetworkError`]) are retried with
//! `delay(n) = min(base * 2^(n-1), max)`. The schedule is deterministic so
//! that backoff behavior is exactly reproducible: 1s, 2s, 4s, 8s, ...,
//! capped at 60s. CAPTCHA/BLOCKED are never retried here; they pause the
//! owning job instead.

use std::time::{Duration, SystemTime};

use tracing::debug;

use super::ErrorKind;

/// Default maximum attempts (including the initial attempt).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Base delay for the first retry (1 second).
const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);

/// Maximum delay cap (60 seconds).
const DEFAULT_MAX_DELAY: Duration = Duration::from_millis(60_000);

/// Decision on whether to retry a failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the specified delay.
    Retry {
        /// How long to wait before retrying.
        delay: Duration,
        /// Which attempt number this will be (1-indexed, so first retry is attempt 2).
        attempt: u32,
    },

    /// Do not retry.
    DoNotRetry {
        /// Human-readable reason why retry is not attempted.
        reason: String,
    },
}

/// Configuration for retry behavior with exponential backoff.
///
/// # Default Values
///
/// - `max_attempts`: 5
/// - `base_delay`: 1 second
/// - `max_delay`: 60 seconds
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the initial attempt).
    max_attempts: u32,

    /// Base delay for the first retry.
    base_delay: Duration,

    /// Maximum delay cap.
    max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with a custom attempt ceiling, using default delays.
    #[must_use]
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    /// Returns the maximum number of attempts configured.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Determines whether to retry a failed attempt.
    ///
    /// # Arguments
    ///
    /// * `kind` - Classified failure kind
    /// * `attempt` - The attempt number that just failed (1-indexed)
    /// * `retry_after` - Raw Retry-After header value, honored when larger
    ///   than the computed backoff
    #[must_use]
    pub fn should_retry(
        &self,
        kind: ErrorKind,
        attempt: u32,
        retry_after: Option<&str>,
    ) -> RetryDecision {
        if kind.is_pause() {
            return RetryDecision::DoNotRetry {
                reason: format!("{kind} requires human intervention"),
            };
        }

        if !kind.is_retryable() {
            return RetryDecision::DoNotRetry {
                reason: format!("{kind} is not retryable"),
            };
        }

        if attempt >= self.max_attempts {
            debug!(attempt, max = self.max_attempts, "max attempts reached");
            return RetryDecision::DoNotRetry {
                reason: format!("max attempts ({}) exhausted", self.max_attempts),
            };
        }

        let mut delay = self.backoff_delay(attempt);
        if let Some(hinted) = retry_after.and_then(parse_retry_after)
            && hinted > delay
        {
            delay = hinted.min(self.max_delay);
        }

        debug!(
            attempt,
            next_attempt = attempt + 1,
            delay_ms = delay.as_millis(),
            "will retry"
        );

        RetryDecision::Retry {
            delay,
            attempt: attempt + 1,
        }
    }

    /// Calculates the backoff delay for a retry attempt.
    ///
    /// Formula: `min(base_delay * 2^(attempt - 1), max_delay)`.
    #[must_use]
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        let delay = self.base_delay.saturating_mul(1_u32 << exponent);
        delay.min(self.max_delay)
    }
}

/// Parses a Retry-After header value: either delta-seconds or an HTTP-date.
#[must_use]
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    let value = value.trim();

    if let Ok(seconds) = value.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }

    let when = httpdate::parse_http_date(value).ok()?;
    when.duration_since(SystemTime::now()).ok()
}
