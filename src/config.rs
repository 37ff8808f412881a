//! Environment configuration for the harvesting pipeline.
//!
//! All runtime knobs come from environment variables, resolved once into an
//! explicit [`Config`] value that is passed through the call graph. Nothing
//! here is memoized at module level; a fresh `Config::from_env()` reflects
//! the current environment (tests rely on this).
//!
//! Per-source overrides use the pattern `HARVESTER_<SOURCE>_<KNOB>` where
//! `<SOURCE>` is the source name uppercased with `-` replaced by `_`
//! (e.g. `HARVESTER_CODEFORCES_COOKIES`).

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

/// Default rendering-backend URL (local, no credential required).
const DEFAULT_BACKEND_URL: &str = "http://localhost:3002";

/// Default retry ceiling for scrape attempts.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Default inter-request delay applied when a source has no specific one.
const DEFAULT_DELAY_MS: u64 = 2000;

/// Default local text-generation endpoint.
const DEFAULT_TEXTGEN_URL: &str = "http://localhost:11434/api/generate";

/// Default text-generation model name.
const DEFAULT_TEXTGEN_MODEL: &str = "openbmb/minicpm-o2.6:latest";

/// Which rendering-backend variant is configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendMode {
    /// Self-hosted backend; no API key required.
    Local,
    /// Hosted backend; requests carry a bearer API key.
    Hosted,
}

/// Rendering-backend configuration.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Base URL of the backend (the client appends `/v1/scrape`).
    pub url: String,
    /// Local or hosted variant.
    pub mode: BackendMode,
    /// API key for the hosted variant.
    pub api_key: Option<String>,
}

impl BackendConfig {
    /// Whether the backend can actually be called.
    ///
    /// Hosted mode without a key is unusable; callers fall back to direct
    /// fetch (reduced fidelity, no script execution).
    #[must_use]
    pub fn is_usable(&self) -> bool {
        match self.mode {
            BackendMode::Local => true,
            BackendMode::Hosted => self.api_key.is_some(),
        }
    }
}

/// Text-generation collaborator configuration.
#[derive(Debug, Clone)]
pub struct TextGenConfig {
    /// Generation endpoint URL.
    pub url: String,
    /// Model identifier sent with each request.
    pub model: String,
}

impl Default for TextGenConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_TEXTGEN_URL.to_string(),
            model: DEFAULT_TEXTGEN_MODEL.to_string(),
        }
    }
}

/// Per-source session context: cookies, headers, pacing, url overrides.
///
/// Constructed once per invocation and passed through explicitly instead of
/// being cached in module state.
#[derive(Debug, Clone, Default)]
pub struct SourceProfile {
    /// Cookie header value forwarded to the rendering backend.
    pub cookies: Option<String>,
    /// Extra request headers forwarded to the rendering backend.
    pub headers: HashMap<String, String>,
    /// Fixed inter-request delay for this source.
    pub delay: Duration,
    /// Explicit url set; when present, discovery is skipped entirely.
    pub urls: Option<Vec<String>>,
}

/// Resolved environment configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Rendering-backend settings.
    pub backend: BackendConfig,
    /// SQLite database path.
    pub db_path: PathBuf,
    /// Retry ceiling for scrape attempts.
    pub max_retries: u32,
    /// Text-generation collaborator settings.
    pub textgen: TextGenConfig,
}

impl Config {
    /// Reads configuration from the environment.
    #[must_use]
    pub fn from_env() -> Self {
        let url =
            std::env::var("HARVESTER_BACKEND_URL").unwrap_or_else(|_| DEFAULT_BACKEND_URL.into());
        let mode = match std::env::var("HARVESTER_BACKEND_MODE").as_deref() {
            Ok("hosted") => BackendMode::Hosted,
            _ => BackendMode::Local,
        };
        let api_key = std::env::var("HARVESTER_API_KEY").ok().filter(|k| !k.is_empty());

        if mode == BackendMode::Hosted && api_key.is_none() {
            warn!("HARVESTER_BACKEND_MODE=hosted but no HARVESTER_API_KEY; direct fetch fallback will be used");
        }

        let db_path = std::env::var("HARVESTER_DB")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("harvester.db"));

        let max_retries = std::env::var("HARVESTER_MAX_RETRIES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_MAX_RETRIES);

        let textgen = TextGenConfig {
            url: std::env::var("HARVESTER_TEXTGEN_URL")
                .unwrap_or_else(|_| DEFAULT_TEXTGEN_URL.into()),
            model: std::env::var("HARVESTER_TEXTGEN_MODEL")
                .unwrap_or_else(|_| DEFAULT_TEXTGEN_MODEL.into()),
        };

        Self {
            backend: BackendConfig { url, mode, api_key },
            db_path,
            max_retries,
            textgen,
        }
    }

    /// Resolves the session profile for a source.
    ///
    /// `default_delay_ms` comes from the source catalog (2-5s depending on
    /// how aggressively the target rate-limits) and can be overridden via
    /// `HARVESTER_<SOURCE>_DELAY_MS`.
    #[must_use]
    pub fn source_profile(&self, source: &str, default_delay_ms: u64) -> SourceProfile {
        let key = |suffix: &str| format!("HARVESTER_{}_{suffix}", env_name(source));

        let cookies = std::env::var(key("COOKIES")).ok().filter(|c| !c.is_empty());

        let headers = std::env::var(key("HEADERS"))
            .ok()
            .and_then(|raw| match serde_json::from_str::<HashMap<String, String>>(&raw) {
                Ok(map) => Some(map),
                Err(error) => {
                    warn!(%source, %error, "ignoring malformed header override (expected JSON object)");
                    None
                }
            })
            .unwrap_or_default();

        let delay_ms = std::env::var(key("DELAY_MS"))
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(if default_delay_ms == 0 {
                DEFAULT_DELAY_MS
            } else {
                default_delay_ms
            });

        let urls = std::env::var(key("URLS")).ok().map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|u| !u.is_empty())
                .map(ToString::to_string)
                .collect()
        });

        SourceProfile {
            cookies,
            headers,
            delay: Duration::from_millis(delay_ms),
            urls,
        }
    }
}

/// Maps a source name to its environment-variable segment.
fn env_name(source: &str) -> String {
    source.to_uppercase().replace('-', "_")
}
