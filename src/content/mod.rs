//! Persistence for extracted content records.
//!
//! Every successfully extracted entity lands here as a [`ContentRecord`].
//! The `source_url` column carries a UNIQUE constraint; inserting a
//! duplicate surfaces as [`ContentError::Duplicate`], which the orchestrator
//! treats as success. That constraint is the idempotency backstop for
//! resumed runs.

use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Row};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::db::Database;

/// Result type for content repository operations.
pub type Result<T> = std::result::Result<T, ContentError>;

/// Category of an extracted content record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    /// Competitive programming problem statement.
    Problem,
    /// Article or article section.
    Article,
    /// Book summary.
    Book,
    /// Editorial/tutorial text attached to a problem.
    Tutorial,
}

impl ContentType {
    /// Returns the database string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Problem => "problem",
            Self::Article => "article",
            Self::Book => "book",
            Self::Tutorial => "tutorial",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ContentType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "problem" => Ok(Self::Problem),
            "article" => Ok(Self::Article),
            "book" => Ok(Self::Book),
            "tutorial" => Ok(Self::Tutorial),
            _ => Err(format!("invalid content type: {s}")),
        }
    }
}

/// Minimum read time reported for any record (minutes).
pub const MIN_READ_TIME_MINUTES: i64 = 5;

/// An extracted entity ready for insertion.
///
/// Produced by the extractors; becomes a [`ContentRecord`] row on insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentDraft {
    /// Category of the content.
    pub content_type: ContentType,
    /// Display title.
    pub title: String,
    /// Short summary suitable for listings.
    pub summary: String,
    /// Full body, markdown-formatted.
    pub body: String,
    /// Bullet takeaways, when the source yields them.
    pub key_points: Vec<String>,
    /// Topic tags.
    pub tags: Vec<String>,
    /// Estimated read time in minutes (floor of [`MIN_READ_TIME_MINUTES`]).
    pub read_time_minutes: i64,
    /// Canonical URL this content was extracted from. Unique per record.
    pub source_url: String,
    /// Author attribution, when known.
    pub author: Option<String>,
    /// Source-specific structured payload (e.g. parsed samples), as JSON.
    pub raw_payload: Option<serde_json::Value>,
}

impl ContentDraft {
    /// Creates a draft with the required fields and empty optionals.
    #[must_use]
    pub fn new(
        content_type: ContentType,
        title: impl Into<String>,
        body: impl Into<String>,
        source_url: impl Into<String>,
    ) -> Self {
        Self {
            content_type,
            title: title.into(),
            summary: String::new(),
            body: body.into(),
            key_points: Vec::new(),
            tags: Vec::new(),
            read_time_minutes: MIN_READ_TIME_MINUTES,
            source_url: source_url.into(),
            author: None,
            raw_payload: None,
        }
    }
}

/// A persisted content record row.
#[derive(Debug, Clone, FromRow)]
pub struct ContentRecord {
    /// Unique identifier.
    pub id: i64,
    /// Category (stored as text, parsed via `content_type()`).
    #[sqlx(rename = "content_type")]
    pub content_type_str: String,
    /// Display title.
    pub title: String,
    /// Short summary suitable for listings.
    pub summary: String,
    /// Full body, markdown-formatted.
    pub body: String,
    /// Bullet takeaways as a JSON array.
    #[sqlx(rename = "key_points")]
    pub key_points_json: String,
    /// Topic tags as a JSON array.
    #[sqlx(rename = "tags")]
    pub tags_json: String,
    /// Estimated read time in minutes.
    pub read_time_minutes: i64,
    /// Name of the source this record came from.
    pub source_name: String,
    /// Canonical URL this content was extracted from.
    pub source_url: String,
    /// Author attribution, when known.
    pub author: Option<String>,
    /// Source-specific structured payload as JSON text.
    pub raw_payload: Option<String>,
    /// When the record was created.
    pub created_at: String,
}

impl ContentRecord {
    /// Returns the parsed content type.
    ///
    /// Falls back to `Article` if the stored string is invalid.
    #[must_use]
    pub fn content_type(&self) -> ContentType {
        self.content_type_str.parse().unwrap_or(ContentType::Article)
    }

    /// Parses the key points JSON array.
    #[must_use]
    pub fn key_points(&self) -> Vec<String> {
        serde_json::from_str(&self.key_points_json).unwrap_or_default()
    }

    /// Parses the tags JSON array.
    #[must_use]
    pub fn tags(&self) -> Vec<String> {
        serde_json::from_str(&self.tags_json).unwrap_or_default()
    }
}

/// Errors that can occur during content repository operations.
#[derive(Debug, Clone, Error)]
pub enum ContentError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// A record with the same `source_url` already exists.
    #[error("content already recorded for url: {source_url}")]
    Duplicate {
        /// The conflicting source URL.
        source_url: String,
    },
}

impl ContentError {
    /// Whether this error is the benign duplicate-insert case.
    #[must_use]
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate { .. })
    }
}

/// `SQLite`-backed repository for content records.
#[derive(Debug, Clone)]
pub struct ContentRepo {
    db: Database,
}

impl ContentRepo {
    /// Creates a new repository over the given database connection.
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Inserts a draft, returning the new record id.
    ///
    /// # Errors
    ///
    /// Returns [`ContentError::Duplicate`] when a record with the same
    /// `source_url` already exists, [`ContentError::Database`] otherwise.
    #[instrument(skip(self, draft), fields(source_url = %draft.source_url, content_type = %draft.content_type))]
    pub async fn insert(&self, source_name: &str, draft: &ContentDraft) -> Result<i64> {
        let key_points = serde_json::to_string(&draft.key_points)
            .map_err(|e| ContentError::Database(e.to_string()))?;
        let tags = serde_json::to_string(&draft.tags)
            .map_err(|e| ContentError::Database(e.to_string()))?;
        let raw_payload = draft
            .raw_payload
            .as_ref()
            .map(serde_json::Value::to_string);
        let read_time = draft.read_time_minutes.max(MIN_READ_TIME_MINUTES);

        let result = sqlx::query(
            r"INSERT INTO content_records (
                content_type,
                title,
                summary,
                body,
                key_points,
                tags,
                read_time_minutes,
                source_name,
                source_url,
                author,
                raw_payload
              )
              VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
              RETURNING id",
        )
        .bind(draft.content_type.as_str())
        .bind(&draft.title)
        .bind(&draft.summary)
        .bind(&draft.body)
        .bind(key_points)
        .bind(tags)
        .bind(read_time)
        .bind(source_name)
        .bind(&draft.source_url)
        .bind(&draft.author)
        .bind(raw_payload)
        .fetch_one(self.db.pool())
        .await
        .map_err(|e| classify_insert_error(e, &draft.source_url))?;

        let id: i64 = result.get("id");
        debug!(id, "inserted content record");
        Ok(id)
    }

    /// Returns true when a record already exists for the given URL.
    ///
    /// # Errors
    ///
    /// Returns [`ContentError::Database`] if the query fails.
    pub async fn exists(&self, source_url: &str) -> Result<bool> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM content_records WHERE source_url = ?")
                .bind(source_url)
                .fetch_one(self.db.pool())
                .await
                .map_err(|e| ContentError::Database(e.to_string()))?;
        Ok(count > 0)
    }

    /// Fetches a record by its source URL, if present.
    ///
    /// # Errors
    ///
    /// Returns [`ContentError::Database`] if the query fails.
    pub async fn get_by_source_url(&self, source_url: &str) -> Result<Option<ContentRecord>> {
        sqlx::query_as::<_, ContentRecord>("SELECT * FROM content_records WHERE source_url = ?")
            .bind(source_url)
            .fetch_optional(self.db.pool())
            .await
            .map_err(|e| ContentError::Database(e.to_string()))
    }

    /// Counts records belonging to a source.
    ///
    /// # Errors
    ///
    /// Returns [`ContentError::Database`] if the query fails.
    pub async fn count_for_source(&self, source_name: &str) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM content_records WHERE source_name = ?")
            .bind(source_name)
            .fetch_one(self.db.pool())
            .await
            .map_err(|e| ContentError::Database(e.to_string()))
    }
}

/// Maps a unique-constraint failure on insert to [`ContentError::Duplicate`].
fn classify_insert_error(error: sqlx::Error, source_url: &str) -> ContentError {
    if let sqlx::Error::Database(db_err) = &error
        && db_err.is_unique_violation()
    {
        return ContentError::Duplicate {
            source_url: source_url.to_string(),
        };
    }
    ContentError::Database(error.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    async fn repo() -> ContentRepo {
        let db = Database::new_in_memory().await.unwrap();
        ContentRepo::new(db)
    }

    fn sample_draft(url: &str) -> ContentDraft {
        let mut draft = ContentDraft::new(
            ContentType::Problem,
            "A. Watermelon",
            "## Problem\n\nSplit the watermelon.",
            url,
        );
        draft.summary = "Split a watermelon into even parts.".to_string();
        draft.tags = vec!["math".to_string()];
        draft.key_points = vec!["parity".to_string()];
        draft.read_time_minutes = 7;
        draft
    }

    #[tokio::test]
    async fn test_insert_and_fetch_roundtrip() {
        let repo = repo().await;
        let draft = sample_draft("https://codeforces.com/problemset/problem/4/A");
        let id = repo.insert("codeforces", &draft).await.unwrap();
        assert!(id > 0);

        let record = repo
            .get_by_source_url(&draft.source_url)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.content_type(), ContentType::Problem);
        assert_eq!(record.title, "A. Watermelon");
        assert_eq!(record.tags(), vec!["math"]);
        assert_eq!(record.key_points(), vec!["parity"]);
        assert_eq!(record.read_time_minutes, 7);
        assert_eq!(record.source_name, "codeforces");
    }

    #[tokio::test]
    async fn test_duplicate_source_url_is_classified() {
        let repo = repo().await;
        let draft = sample_draft("https://codeforces.com/problemset/problem/4/A");
        repo.insert("codeforces", &draft).await.unwrap();

        let err = repo.insert("codeforces", &draft).await.unwrap_err();
        assert!(err.is_duplicate());
        assert!(err.to_string().contains("already recorded"));
    }

    #[tokio::test]
    async fn test_exists() {
        let repo = repo().await;
        let url = "https://codeforces.com/problemset/problem/4/A";
        assert!(!repo.exists(url).await.unwrap());

        repo.insert("codeforces", &sample_draft(url)).await.unwrap();
        assert!(repo.exists(url).await.unwrap());
    }

    #[tokio::test]
    async fn test_read_time_floor_applied() {
        let repo = repo().await;
        let mut draft = sample_draft("https://example.com/short");
        draft.read_time_minutes = 1;
        repo.insert("aman", &draft).await.unwrap();

        let record = repo
            .get_by_source_url("https://example.com/short")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.read_time_minutes, MIN_READ_TIME_MINUTES);
    }

    #[tokio::test]
    async fn test_count_for_source() {
        let repo = repo().await;
        repo.insert("aman", &sample_draft("https://example.com/1"))
            .await
            .unwrap();
        repo.insert("aman", &sample_draft("https://example.com/2"))
            .await
            .unwrap();
        repo.insert("codeforces", &sample_draft("https://example.com/3"))
            .await
            .unwrap();

        assert_eq!(repo.count_for_source("aman").await.unwrap(), 2);
        assert_eq!(repo.count_for_source("codeforces").await.unwrap(), 1);
        assert_eq!(repo.count_for_source("missing").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_raw_payload_persisted_as_json() {
        let repo = repo().await;
        let mut draft = sample_draft("https://example.com/payload");
        draft.raw_payload = Some(serde_json::json!({"samples": [{"input": "8", "output": "YES"}]}));
        repo.insert("codeforces", &draft).await.unwrap();

        let record = repo
            .get_by_source_url("https://example.com/payload")
            .await
            .unwrap()
            .unwrap();
        let payload: serde_json::Value =
            serde_json::from_str(record.raw_payload.as_deref().unwrap()).unwrap();
        assert_eq!(payload["samples"][0]["output"], "YES");
    }
}
