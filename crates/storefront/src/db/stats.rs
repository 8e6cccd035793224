//! Cross-table counts for the public counter and the admin dashboard.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

use super::RepositoryError;

/// Signup counts shown on the landing page.
#[derive(Debug, Clone, Copy, Default, Serialize, sqlx::FromRow)]
pub struct SignupCounts {
    pub total_signups: i64,
    pub total_waitlist: i64,
    pub total_giveaway_entries: i64,
    pub signups_today: i64,
    pub waitlist_today: i64,
    pub giveaway_today: i64,
}

/// Accounts per gymnastics discipline.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct DisciplineCount {
    pub discipline: String,
    pub count: i64,
}

/// Repository for aggregate counts.
pub struct StatsRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> StatsRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Totals plus counts since `today` (start of the current UTC day).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn signup_counts(&self, today: DateTime<Utc>) -> Result<SignupCounts, RepositoryError> {
        let counts = sqlx::query_as::<_, SignupCounts>(
            "SELECT \
                 (SELECT COUNT(*) FROM users) AS total_signups, \
                 (SELECT COUNT(*) FROM waitlist) AS total_waitlist, \
                 (SELECT COUNT(*) FROM email_subscriptions WHERE source = 'giveaway_popup') \
                     AS total_giveaway_entries, \
                 (SELECT COUNT(*) FROM users WHERE created_at >= $1) AS signups_today, \
                 (SELECT COUNT(*) FROM waitlist WHERE created_at >= $1) AS waitlist_today, \
                 (SELECT COUNT(*) FROM email_subscriptions \
                     WHERE source = 'giveaway_popup' AND created_at >= $1) AS giveaway_today",
        )
        .bind(today)
        .fetch_one(self.pool)
        .await?;

        Ok(counts)
    }

    /// Accounts created since `since` (all time when `None`).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn user_count(&self, since: Option<DateTime<Utc>>) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar(
            "SELECT COUNT(*) FROM users WHERE $1::timestamptz IS NULL OR created_at >= $1",
        )
        .bind(since)
        .fetch_one(self.pool)
        .await?;
        Ok(count)
    }

    /// Accounts grouped by discipline; accounts without one are `unspecified`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn disciplines(&self) -> Result<Vec<DisciplineCount>, RepositoryError> {
        let rows = sqlx::query_as::<_, DisciplineCount>(
            "SELECT COALESCE(NULLIF(gymnastics_type, ''), 'unspecified') AS discipline, \
                 COUNT(*) AS count \
             FROM users GROUP BY 1 ORDER BY count DESC, discipline ASC",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Creation times of accounts since `since`, for daily rollups.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn signup_times(&self, since: DateTime<Utc>) -> Result<Vec<DateTime<Utc>>, RepositoryError> {
        let rows = sqlx::query_scalar("SELECT created_at FROM users WHERE created_at >= $1")
            .bind(since)
            .fetch_all(self.pool)
            .await?;
        Ok(rows)
    }

    /// Creation times of orders since `since`, for daily rollups.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn order_times(&self, since: DateTime<Utc>) -> Result<Vec<DateTime<Utc>>, RepositoryError> {
        let rows = sqlx::query_scalar("SELECT created_at FROM orders WHERE created_at >= $1")
            .bind(since)
            .fetch_all(self.pool)
            .await?;
        Ok(rows)
    }
}
