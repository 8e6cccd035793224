//! Waitlist repository.
//!
//! Joining is check-then-insert; the unique index on
//! `(lower(email), product_id, variant)` turns a concurrent duplicate
//! insert into `RepositoryError::Conflict` so the caller can fall back to
//! the entry that won. New entries are counted and positioned under a
//! transaction-scoped advisory lock, and size merges lock the entry row.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use raze_core::waitlist::SizeSelections;
use raze_core::{Email, WaitlistEntryId};

use super::{RepositoryError, to_json};
use crate::models::waitlist::{NewWaitlistEntry, WaitlistEntry};

/// Advisory lock key serializing new waitlist entries.
const JOIN_LOCK_KEY: i64 = 0x5241_5a45_5741_4954;

/// Result of [`WaitlistRepository::create`].
#[derive(Debug, Clone)]
pub enum JoinOutcome {
    /// Inserted at the end of the list.
    Joined(WaitlistEntry),
    /// The list already holds `limit` entries.
    Full,
}

const COLUMNS: &str = "id, email, name, product_id, product_name, variant, sizes, image, \
     access_code, position, has_purchased, email_subscribed, created_at, updated_at";

/// Repository for `waitlist`.
pub struct WaitlistRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> WaitlistRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Find the entry for (email, product, variant).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find(
        &self,
        email: &Email,
        product_id: i32,
        variant: &str,
    ) -> Result<Option<WaitlistEntry>, RepositoryError> {
        let row = sqlx::query_as::<_, WaitlistEntry>(&format!(
            "SELECT {COLUMNS} FROM waitlist \
             WHERE lower(email) = $1 AND product_id = $2 AND variant = $3"
        ))
        .bind(email.as_str())
        .bind(product_id)
        .bind(variant)
        .fetch_optional(self.pool)
        .await?;

        Ok(row)
    }

    /// Insert an entry at the end of the list unless it already holds
    /// `limit` entries.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the entry already exists.
    pub async fn create(
        &self,
        new: &NewWaitlistEntry<'_>,
        limit: i64,
    ) -> Result<JoinOutcome, RepositoryError> {
        let sizes = to_json(new.sizes, "sizes")?;
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(JOIN_LOCK_KEY)
            .execute(&mut *tx)
            .await?;

        let (taken, last_position): (i64, i32) =
            sqlx::query_as("SELECT COUNT(*), COALESCE(MAX(position), 0) FROM waitlist")
                .fetch_one(&mut *tx)
                .await?;
        if taken >= limit {
            tx.rollback().await?;
            return Ok(JoinOutcome::Full);
        }

        let row = sqlx::query_as::<_, WaitlistEntry>(&format!(
            "INSERT INTO waitlist \
                 (email, name, product_id, product_name, variant, sizes, image, access_code, position) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {COLUMNS}"
        ))
        .bind(new.email.as_str())
        .bind(new.name)
        .bind(new.product_id)
        .bind(new.product_name)
        .bind(new.variant)
        .bind(sizes)
        .bind(new.image)
        .bind(new.access_code)
        .bind(last_position + 1)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::on_unique(e, "Already on the waitlist"))?;

        tx.commit().await?;
        Ok(JoinOutcome::Joined(row))
    }

    /// Add sizes to an entry. Position is kept.
    ///
    /// The row is locked while the stored sizes are merged with `additions`,
    /// so concurrent additions all survive.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the entry doesn't exist.
    pub async fn merge_sizes(
        &self,
        id: WaitlistEntryId,
        additions: &SizeSelections,
        image: Option<&str>,
    ) -> Result<WaitlistEntry, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, WaitlistEntry>(&format!(
            "SELECT {COLUMNS} FROM waitlist WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        let sizes = to_json(&current.sizes.merge(additions), "sizes")?;
        let row = sqlx::query_as::<_, WaitlistEntry>(&format!(
            "UPDATE waitlist SET sizes = $2, image = COALESCE($3, image), updated_at = NOW() \
             WHERE id = $1 RETURNING {COLUMNS}"
        ))
        .bind(id)
        .bind(sizes)
        .bind(image)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(row)
    }

    /// Look up an entry by its access code.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn by_access_code(&self, code: &str) -> Result<Option<WaitlistEntry>, RepositoryError> {
        let row = sqlx::query_as::<_, WaitlistEntry>(&format!(
            "SELECT {COLUMNS} FROM waitlist WHERE access_code = $1"
        ))
        .bind(code)
        .fetch_optional(self.pool)
        .await?;

        Ok(row)
    }

    /// The most recently updated entry for an address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn latest_for_email(&self, email: &str) -> Result<Option<WaitlistEntry>, RepositoryError> {
        let row = sqlx::query_as::<_, WaitlistEntry>(&format!(
            "SELECT {COLUMNS} FROM waitlist WHERE lower(email) = lower($1) \
             ORDER BY updated_at DESC, id DESC LIMIT 1"
        ))
        .bind(email)
        .fetch_optional(self.pool)
        .await?;

        Ok(row)
    }

    /// Number of entries, optionally only those created since `since`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self, since: Option<DateTime<Utc>>) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar(
            "SELECT COUNT(*) FROM waitlist WHERE $1::timestamptz IS NULL OR created_at >= $1",
        )
        .bind(since)
        .fetch_one(self.pool)
        .await?;

        Ok(count)
    }

    /// Entries in list order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, offset: i64, limit: i64) -> Result<Vec<WaitlistEntry>, RepositoryError> {
        let rows = sqlx::query_as::<_, WaitlistEntry>(&format!(
            "SELECT {COLUMNS} FROM waitlist ORDER BY position, id OFFSET $1 LIMIT $2"
        ))
        .bind(offset)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    /// Opt the address out of waitlist notifications.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn unsubscribe(&self, email: &str) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            "UPDATE waitlist SET email_subscribed = FALSE, updated_at = NOW() \
             WHERE lower(email) = lower($1) AND email_subscribed",
        )
        .bind(email)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
