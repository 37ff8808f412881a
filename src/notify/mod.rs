//! Operator notifications for paused scrape jobs.
//!
//! When a run hits a CAPTCHA or gets blocked, the orchestrator records a
//! notification alongside the pause. Notifications are resolved out of band,
//! once the operator has remediated (solved the challenge, rotated cookies)
//! and re-runs the source.

use sqlx::{FromRow, Row};
use thiserror::Error;
use tracing::{info, instrument};

use crate::db::Database;
use crate::job::PauseReason;

/// Result type for notification operations.
pub type Result<T> = std::result::Result<T, NotifyError>;

/// Errors that can occur during notification operations.
#[derive(Debug, Clone, Error)]
pub enum NotifyError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// Notification not found.
    #[error("notification not found: id {0}")]
    NotFound(i64),
}

impl From<sqlx::Error> for NotifyError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err.to_string())
    }
}

/// A persisted notification row.
#[derive(Debug, Clone, FromRow)]
pub struct Notification {
    /// Unique identifier.
    pub id: i64,
    /// Source whose job paused.
    pub source_name: String,
    /// URL that triggered the pause.
    pub url: String,
    /// Error classification (`CAPTCHA` or `BLOCKED`).
    #[sqlx(rename = "error_type")]
    pub error_type_str: String,
    /// Human-readable description for the operator.
    pub message: String,
    /// 0 while pending operator action, 1 once handled.
    pub resolved: i64,
    /// When the notification was created.
    pub created_at: String,
}

impl Notification {
    /// Returns the parsed error classification, if valid.
    #[must_use]
    pub fn error_type(&self) -> Option<PauseReason> {
        self.error_type_str.parse().ok()
    }

    /// Whether the operator has handled this notification.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.resolved != 0
    }
}

/// Dispatcher that records pause notifications for operators.
#[derive(Debug, Clone)]
pub struct Notifier {
    db: Database,
}

impl Notifier {
    /// Creates a new notifier over the given database connection.
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Records a notification for a paused job. Returns the new id.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Database`] if the insert fails.
    #[instrument(skip(self, message), fields(source = %source_name, %reason))]
    pub async fn notify_pause(
        &self,
        source_name: &str,
        url: &str,
        reason: PauseReason,
        message: &str,
    ) -> Result<i64> {
        let id: i64 = sqlx::query(
            r"INSERT INTO notifications (source_name, url, error_type, message)
              VALUES (?, ?, ?, ?)
              RETURNING id",
        )
        .bind(source_name)
        .bind(url)
        .bind(reason.as_str())
        .bind(message)
        .fetch_one(self.db.pool())
        .await?
        .get("id");

        info!(notification_id = id, url, "recorded pause notification");
        Ok(id)
    }

    /// Lists unresolved notifications, newest first, optionally filtered by source.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Database`] if the query fails.
    pub async fn list_unresolved(&self, source_name: Option<&str>) -> Result<Vec<Notification>> {
        let notifications = match source_name {
            Some(source) => {
                sqlx::query_as::<_, Notification>(
                    r"SELECT * FROM notifications
                      WHERE resolved = 0 AND source_name = ?
                      ORDER BY created_at DESC, id DESC",
                )
                .bind(source)
                .fetch_all(self.db.pool())
                .await?
            }
            None => {
                sqlx::query_as::<_, Notification>(
                    r"SELECT * FROM notifications
                      WHERE resolved = 0
                      ORDER BY created_at DESC, id DESC",
                )
                .fetch_all(self.db.pool())
                .await?
            }
        };
        Ok(notifications)
    }

    /// Marks a notification as handled.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::NotFound`] if no notification exists with the
    /// given id.
    #[instrument(skip(self))]
    pub async fn resolve(&self, id: i64) -> Result<()> {
        let result = sqlx::query("UPDATE notifications SET resolved = 1 WHERE id = ?")
            .bind(id)
            .execute(self.db.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(NotifyError::NotFound(id));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    async fn notifier() -> Notifier {
        let db = Database::new_in_memory().await.unwrap();
        Notifier::new(db)
    }

    #[tokio::test]
    async fn test_notify_pause_and_list() {
        let notifier = notifier().await;
        let id = notifier
            .notify_pause(
                "codeforces",
                "https://codeforces.com/problemset/problem/4/A",
                PauseReason::Captcha,
                "verification page encountered",
            )
            .await
            .unwrap();
        assert!(id > 0);

        let unresolved = notifier.list_unresolved(None).await.unwrap();
        assert_eq!(unresolved.len(), 1);
        let notification = &unresolved[0];
        assert_eq!(notification.error_type(), Some(PauseReason::Captcha));
        assert!(!notification.is_resolved());
        assert!(notification.message.contains("verification"));
    }

    #[tokio::test]
    async fn test_list_filters_by_source() {
        let notifier = notifier().await;
        notifier
            .notify_pause("codeforces", "https://a", PauseReason::Blocked, "403")
            .await
            .unwrap();
        notifier
            .notify_pause("aman", "https://b", PauseReason::Captcha, "challenge")
            .await
            .unwrap();

        let codeforces = notifier.list_unresolved(Some("codeforces")).await.unwrap();
        assert_eq!(codeforces.len(), 1);
        assert_eq!(codeforces[0].url, "https://a");

        let all = notifier.list_unresolved(None).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_resolve_removes_from_unresolved() {
        let notifier = notifier().await;
        let id = notifier
            .notify_pause("aman", "https://b", PauseReason::Blocked, "403")
            .await
            .unwrap();

        notifier.resolve(id).await.unwrap();
        assert!(notifier.list_unresolved(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_resolve_missing_returns_not_found() {
        let notifier = notifier().await;
        let err = notifier.resolve(999).await.unwrap_err();
        assert!(matches!(err, NotifyError::NotFound(999)));
    }
}
