//! Error types for the scrape module.

use thiserror::Error;

use super::ErrorKind;
use super::classify;

/// Errors that can occur during a single scrape attempt.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Transport-level error (DNS, connection refused, TLS, etc.)
    #[error("network error scraping {url}: {source}")]
    Network {
        /// The target URL.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// The attempt exceeded the bounded per-attempt timeout.
    #[error("timeout scraping {url}")]
    Timeout {
        /// The target URL.
        url: String,
    },

    /// The rendering backend (or fallback fetch) returned an error status.
    #[error("HTTP {status} scraping {url}")]
    HttpStatus {
        /// The target URL.
        url: String,
        /// The HTTP status code.
        status: u16,
        /// The Retry-After header value, if present (for 429 responses).
        retry_after: Option<String>,
    },

    /// The rendering backend responded 200 but reported a scrape failure.
    #[error("backend error scraping {url}: {message}")]
    Backend {
        /// The target URL.
        url: String,
        /// The backend's error message.
        message: String,
        /// The HTTP status of the backend response.
        status: u16,
    },
}

impl ScrapeError {
    /// Creates a network error from a reqwest error, mapping timeouts to
    /// [`ScrapeError::Timeout`].
    pub fn from_reqwest(url: impl Into<String>, source: reqwest::Error) -> Self {
        let url = url.into();
        if source.is_timeout() {
            Self::Timeout { url }
        } else {
            Self::Network { url, source }
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16, retry_after: Option<String>) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
            retry_after,
        }
    }

    /// Creates a backend-reported error.
    pub fn backend(url: impl Into<String>, message: impl Into<String>, status: u16) -> Self {
        Self::Backend {
            url: url.into(),
            message: message.into(),
            status,
        }
    }

    /// Classifies this error into the failure taxonomy.
    ///
    /// Per-attempt timeouts count as network errors and follow the retry
    /// policy.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Network { .. } | Self::Timeout { .. } => ErrorKind::NetworkError,
            Self::HttpStatus { status, .. } => classify("", Some(*status), ""),
            Self::Backend {
                message, status, ..
            } => classify(message, Some(*status), ""),
        }
    }

    /// Returns the raw Retry-After header value when present.
    #[must_use]
    pub fn retry_after(&self) -> Option<&str> {
        match self {
            Self::HttpStatus { retry_after, .. } => retry_after.as_deref(),
            _ => None,
        }
    }
}
