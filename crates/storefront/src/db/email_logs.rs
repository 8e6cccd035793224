//! Notification outcome log.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

use raze_core::EmailLogId;

use super::RepositoryError;

const COLUMNS: &str = "id, recipient, email_type, status, resend, error, sent_at";

/// Outcome of one notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailStatus {
    Sent,
    Failed,
    Skipped,
}

impl EmailStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }

    /// Parse a status filter.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "sent" => Some(Self::Sent),
            "failed" => Some(Self::Failed),
            "skipped" => Some(Self::Skipped),
            _ => None,
        }
    }
}

/// One logged notification.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct EmailLog {
    pub id: EmailLogId,
    pub recipient: String,
    pub email_type: String,
    pub status: String,
    pub resend: bool,
    pub error: Option<String>,
    pub sent_at: DateTime<Utc>,
}

/// Counts by outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct EmailLogSummary {
    pub total: i64,
    pub sent: i64,
    pub failed: i64,
    pub skipped: i64,
}

/// Repository for `email_logs`.
pub struct EmailLogRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> EmailLogRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Log an outcome.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn record(
        &self,
        recipient: &str,
        email_type: &str,
        status: EmailStatus,
        resend: bool,
        error: Option<&str>,
    ) -> Result<EmailLogId, RepositoryError> {
        let id = sqlx::query_scalar(
            "INSERT INTO email_logs (recipient, email_type, status, resend, error) \
             VALUES ($1, $2, $3, $4, $5) RETURNING id",
        )
        .bind(recipient)
        .bind(email_type)
        .bind(status.as_str())
        .bind(resend)
        .bind(error)
        .fetch_one(self.pool)
        .await?;

        Ok(id)
    }

    /// One entry per recipient of a single send.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn record_many(
        &self,
        recipients: &[String],
        email_type: &str,
        status: EmailStatus,
    ) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO email_logs (recipient, email_type, status, resend) \
             SELECT recipient, $2, $3, FALSE FROM UNNEST($1::text[]) AS r(recipient)",
        )
        .bind(recipients)
        .bind(email_type)
        .bind(status.as_str())
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Newest entries, optionally with one status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        status: Option<EmailStatus>,
        limit: i64,
    ) -> Result<Vec<EmailLog>, RepositoryError> {
        let rows = sqlx::query_as::<_, EmailLog>(&format!(
            "SELECT {COLUMNS} FROM email_logs \
             WHERE $1::text IS NULL OR status = $1 \
             ORDER BY sent_at DESC, id DESC LIMIT $2"
        ))
        .bind(status.map(EmailStatus::as_str))
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    /// Entries for one address, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn for_recipient(
        &self,
        recipient: &str,
        limit: i64,
    ) -> Result<Vec<EmailLog>, RepositoryError> {
        let rows = sqlx::query_as::<_, EmailLog>(&format!(
            "SELECT {COLUMNS} FROM email_logs WHERE lower(recipient) = lower($1) \
             ORDER BY sent_at DESC, id DESC LIMIT $2"
        ))
        .bind(recipient)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    /// Counts over the whole log.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn summary(&self) -> Result<EmailLogSummary, RepositoryError> {
        let summary = sqlx::query_as::<_, EmailLogSummary>(
            "SELECT COUNT(*) AS total, \
                    COUNT(*) FILTER (WHERE status = 'sent') AS sent, \
                    COUNT(*) FILTER (WHERE status = 'failed') AS failed, \
                    COUNT(*) FILTER (WHERE status = 'skipped') AS skipped \
             FROM email_logs",
        )
        .fetch_one(self.pool)
        .await?;

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_filter_parse() {
        assert_eq!(EmailStatus::parse("failed"), Some(EmailStatus::Failed));
        assert_eq!(EmailStatus::parse("bounced"), None);
        assert_eq!(EmailStatus::Skipped.as_str(), "skipped");
    }
}
