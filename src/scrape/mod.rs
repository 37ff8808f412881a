//! Scrape client, retry policy, and failure classification.
//!
//! This module owns everything between the orchestrator and the network:
//! - [`ScrapeClient`] - wraps the remote rendering backend (or a direct-fetch
//!   fallback) and drives the retry loop
//! - [`RetryPolicy`] - deterministic exponential backoff for transient errors
//! - [`ErrorKind`] - the closed failure taxonomy driving retry/pause decisions
//!
//! Transient failures (rate limits, 5xx, transport errors) are retried here
//! and never surface to the orchestrator. CAPTCHA/BLOCKED results return
//! immediately so the caller can pause the owning job.

mod classify;
mod client;
mod error;
mod retry;

pub use classify::{ErrorKind, classify};
pub use client::{BROWSER_USER_AGENT, ScrapeClient, ScrapeResult};
pub use error::ScrapeError;
pub use retry::{RetryDecision, RetryPolicy, parse_retry_after};
