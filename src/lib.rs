//! Harvester Core Library
//!
//! This library provides the core functionality for the harvester tool,
//! which acquires content from curated web sources, survives CAPTCHA and
//! blocking interruptions via durable checkpointed jobs, and persists
//! extracted entities into a local content store.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`db`] - Database connection and schema management
//! - [`job`] - Scrape job persistence, checkpointing, and pause/resume
//! - [`scrape`] - Rendering-backend client with retry and error classification
//! - [`extract`] - Source-specific entity extraction from scraped pages
//! - [`content`] - Content record persistence with duplicate detection
//! - [`notify`] - Operator notifications for paused jobs
//! - [`sources`] - Source catalog and URL discovery
//! - [`textgen`] - Text-generation collaborator for unstructured content
//! - [`pipeline`] - Per-source orchestration tying the above together

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod content;
pub mod db;
pub mod extract;
pub mod job;
pub mod notify;
pub mod pipeline;
pub mod scrape;
pub mod sources;
pub mod textgen;

// Re-export commonly used types
pub use config::{
    BackendConfig, BackendMode, Config, DEFAULT_MAX_RETRIES, SourceProfile, TextGenConfig,
};
pub use content::{
    ContentDraft, ContentError, ContentRecord, ContentRepo, ContentType, MIN_READ_TIME_MINUTES,
};
pub use db::{Database, DbError};
pub use extract::{
    ExtractError, Extractor, ExtractorRegistry, PageContent, build_extractor_registry,
};
pub use job::{JobDbErrorKind, JobError, JobStatus, JobStore, PauseReason, ScrapeJob};
pub use notify::{Notification, Notifier, NotifyError};
pub use pipeline::{Pacer, PipelineError, RunSummary, SourcePipeline};
pub use scrape::{
    BROWSER_USER_AGENT, ErrorKind, RetryDecision, RetryPolicy, ScrapeClient, ScrapeError,
    ScrapeResult, classify, parse_retry_after,
};
pub use sources::{DiscoveryError, SOURCES, SourceSpec, discover_urls, find_source};
pub use textgen::{GeneratedContent, TextGenClient};
