//! Email subscription repository.
//!
//! Subscriptions are unique per (email, source), and notify-me signups
//! additionally per product. The unique index backs that up so a double
//! submit resolves to the existing row.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use raze_core::{Email, SubscriptionId, SubscriptionSource};

use super::RepositoryError;
use crate::models::subscription::{NewSubscription, Subscription};

const COLUMNS: &str = "id, email, name, source, drop_name, product_id, product_name, size, \
     entry_id, email_subscribed, created_at";

/// Subscriber count for one source.
#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
pub struct SourceCount {
    pub source: SubscriptionSource,
    pub count: i64,
}

/// Repository for `email_subscriptions`.
pub struct SubscriptionRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> SubscriptionRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Find the subscription matching the dedupe key.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find(
        &self,
        email: &Email,
        source: SubscriptionSource,
        product_id: Option<i32>,
    ) -> Result<Option<Subscription>, RepositoryError> {
        let row = sqlx::query_as::<_, Subscription>(&format!(
            "SELECT {COLUMNS} FROM email_subscriptions \
             WHERE lower(email) = $1 AND source = $2 \
               AND COALESCE(product_id, 0) = COALESCE($3, 0)"
        ))
        .bind(email.as_str())
        .bind(source)
        .bind(product_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row)
    }

    /// Insert a subscription.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if a matching subscription exists.
    pub async fn create(&self, new: &NewSubscription<'_>) -> Result<Subscription, RepositoryError> {
        let row = sqlx::query_as::<_, Subscription>(&format!(
            "INSERT INTO email_subscriptions \
                 (email, name, source, drop_name, product_id, product_name, size, entry_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {COLUMNS}"
        ))
        .bind(new.email.as_str())
        .bind(new.name)
        .bind(new.source)
        .bind(new.drop_name)
        .bind(new.product_id)
        .bind(new.product_name)
        .bind(new.size)
        .bind(new.entry_id)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::on_unique(e, "Already subscribed"))?;

        Ok(row)
    }

    /// All subscriptions for an address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn for_email(&self, email: &Email) -> Result<Vec<Subscription>, RepositoryError> {
        let rows = sqlx::query_as::<_, Subscription>(&format!(
            "SELECT {COLUMNS} FROM email_subscriptions WHERE lower(email) = $1 \
             ORDER BY created_at"
        ))
        .bind(email.as_str())
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    /// Opt every subscription for the address out.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn unsubscribe(&self, email: &str) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            "UPDATE email_subscriptions SET email_subscribed = FALSE \
             WHERE lower(email) = lower($1) AND email_subscribed",
        )
        .bind(email)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Page through subscriptions, newest first, optionally for one source.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        source: Option<SubscriptionSource>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Subscription>, RepositoryError> {
        let rows = sqlx::query_as::<_, Subscription>(&format!(
            "SELECT {COLUMNS} FROM email_subscriptions \
             WHERE $1::subscription_source IS NULL OR source = $1 \
             ORDER BY created_at DESC OFFSET $2 LIMIT $3"
        ))
        .bind(source)
        .bind(offset)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    /// Count per source, optionally only rows created since `since`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_by_source(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<SourceCount>, RepositoryError> {
        let rows = sqlx::query_as::<_, SourceCount>(
            "SELECT source, COUNT(*) AS count FROM email_subscriptions \
             WHERE $1::timestamptz IS NULL OR created_at >= $1 \
             GROUP BY source ORDER BY source",
        )
        .bind(since)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    /// Number of subscriptions, optionally for one source and since a time.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(
        &self,
        source: Option<SubscriptionSource>,
        since: Option<DateTime<Utc>>,
    ) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar(
            "SELECT COUNT(*) FROM email_subscriptions \
             WHERE ($1::subscription_source IS NULL OR source = $1) \
               AND ($2::timestamptz IS NULL OR created_at >= $2)",
        )
        .bind(source)
        .bind(since)
        .fetch_one(self.pool)
        .await?;

        Ok(count)
    }

    /// Pick a random giveaway entrant who is still subscribed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn random_giveaway_entrant(&self) -> Result<Option<Subscription>, RepositoryError> {
        let row = sqlx::query_as::<_, Subscription>(&format!(
            "SELECT {COLUMNS} FROM email_subscriptions \
             WHERE source = 'giveaway_popup' AND email_subscribed \
             ORDER BY random() LIMIT 1"
        ))
        .fetch_optional(self.pool)
        .await?;

        Ok(row)
    }

    /// Subscriptions whose email or name contains `query`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn search(
        &self,
        query: &str,
        limit: i64,
    ) -> Result<Vec<Subscription>, RepositoryError> {
        let pattern = format!("%{}%", query.trim().to_lowercase());
        let rows = sqlx::query_as::<_, Subscription>(&format!(
            "SELECT {COLUMNS} FROM email_subscriptions \
             WHERE lower(email) LIKE $1 OR lower(COALESCE(name, '')) LIKE $1 \
             ORDER BY created_at DESC LIMIT $2"
        ))
        .bind(pattern)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    /// Delete a subscription.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if it doesn't exist.
    pub async fn delete(&self, id: SubscriptionId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM email_subscriptions WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
