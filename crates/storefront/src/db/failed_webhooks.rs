//! Notifications that could not be delivered.
//!
//! A failure stored with a dedupe key stays open until an admin resolves
//! it; another failure under the same key updates that row instead of
//! adding one.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

use raze_core::FailedWebhookId;

use super::RepositoryError;

const COLUMNS: &str =
    "id, webhook_name, url, payload, error, retry_count, dedupe_key, resolved, created_at";

/// A notification that exhausted its retries.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct FailedWebhook {
    pub id: FailedWebhookId,
    pub webhook_name: String,
    pub url: String,
    pub payload: serde_json::Value,
    pub error: String,
    pub retry_count: i32,
    pub dedupe_key: Option<String>,
    pub resolved: bool,
    pub created_at: DateTime<Utc>,
}

/// A failed delivery to store.
#[derive(Debug, Clone, Copy)]
pub struct NewFailure<'a> {
    pub webhook_name: &'a str,
    pub url: &'a str,
    pub payload: &'a serde_json::Value,
    pub error: &'a str,
    pub retry_count: i32,
    pub dedupe_key: Option<&'a str>,
}

/// Repository for `failed_webhooks`.
pub struct FailedWebhookRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> FailedWebhookRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store a failed delivery, folding it into an open failure with the
    /// same dedupe key.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn record(&self, failure: &NewFailure<'_>) -> Result<FailedWebhookId, RepositoryError> {
        let id = sqlx::query_scalar(
            "INSERT INTO failed_webhooks \
                 (webhook_name, url, payload, error, retry_count, dedupe_key) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (dedupe_key) WHERE NOT resolved AND dedupe_key IS NOT NULL \
             DO UPDATE SET error = EXCLUDED.error, payload = EXCLUDED.payload, \
                 retry_count = failed_webhooks.retry_count + EXCLUDED.retry_count \
             RETURNING id",
        )
        .bind(failure.webhook_name)
        .bind(failure.url)
        .bind(failure.payload)
        .bind(failure.error)
        .bind(failure.retry_count)
        .bind(failure.dedupe_key)
        .fetch_one(self.pool)
        .await?;

        Ok(id)
    }

    /// Dedupe keys of open failures starting with `prefix`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn open_keys(&self, prefix: &str) -> Result<HashSet<String>, RepositoryError> {
        let keys: Vec<String> = sqlx::query_scalar(
            "SELECT dedupe_key FROM failed_webhooks \
             WHERE NOT resolved AND dedupe_key IS NOT NULL AND starts_with(dedupe_key, $1)",
        )
        .bind(prefix)
        .fetch_all(self.pool)
        .await?;

        Ok(keys.into_iter().collect())
    }

    /// Unresolved failures, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn unresolved(&self, limit: i64) -> Result<Vec<FailedWebhook>, RepositoryError> {
        let rows = sqlx::query_as::<_, FailedWebhook>(&format!(
            "SELECT {COLUMNS} FROM failed_webhooks WHERE NOT resolved \
             ORDER BY created_at DESC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    /// Close a failure so its key may be tried again.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if there is no open failure with
    /// this id.
    pub async fn resolve(&self, id: FailedWebhookId) -> Result<FailedWebhook, RepositoryError> {
        sqlx::query_as::<_, FailedWebhook>(&format!(
            "UPDATE failed_webhooks SET resolved = TRUE WHERE id = $1 AND NOT resolved \
             RETURNING {COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }
}
