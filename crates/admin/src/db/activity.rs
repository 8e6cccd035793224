//! Admin activity log.

use serde_json::Value;
use sqlx::PgPool;

use raze_core::Email;

use super::RepositoryError;
use crate::models::activity::{Action, ActivityEntry};

/// Repository for `admin.activity_log`.
pub struct ActivityRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ActivityRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Append an entry.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn record(
        &self,
        admin: &Email,
        action: Action,
        target: Option<&str>,
        details: &Value,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO admin.activity_log (admin_email, action, target, details) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(admin.as_str())
        .bind(action.as_str())
        .bind(target)
        .bind(details)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Most recent entries.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn recent(&self, limit: i64) -> Result<Vec<ActivityEntry>, RepositoryError> {
        let rows = sqlx::query_as::<_, ActivityEntry>(
            "SELECT id, admin_email, action, target, details, created_at \
             FROM admin.activity_log ORDER BY created_at DESC, id DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }
}
