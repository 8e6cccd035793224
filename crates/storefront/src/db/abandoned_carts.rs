//! Abandoned cart repository.
//!
//! There is at most one open (unrecovered) cart per address; saving it
//! again replaces the items and restarts the reminder sequence.

use sqlx::{PgConnection, PgPool};

use raze_core::abandoned_cart::ReminderStep;
use raze_core::cart::CartLine;
use raze_core::{AbandonedCartId, Email, Money, UserId};

use super::{RepositoryError, to_json};
use crate::models::abandoned_cart::AbandonedCart;

const COLUMNS: &str = "id, email, user_id, cart_items, cart_total, abandoned_at, email_1_sent, \
     email_2_sent, email_3_sent, recovered, recovered_at, created_at";

/// Repository for `abandoned_carts`.
pub struct AbandonedCartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AbandonedCartRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Save the open cart for an address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the upsert fails.
    pub async fn save(
        &self,
        email: &Email,
        user_id: Option<UserId>,
        items: &[CartLine],
        total: Money,
    ) -> Result<AbandonedCart, RepositoryError> {
        let items = to_json(&items, "cart items")?;
        let row = sqlx::query_as::<_, AbandonedCart>(&format!(
            "INSERT INTO abandoned_carts (email, user_id, cart_items, cart_total) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (lower(email)) WHERE NOT recovered DO UPDATE SET \
                 user_id = COALESCE(EXCLUDED.user_id, abandoned_carts.user_id), \
                 cart_items = EXCLUDED.cart_items, \
                 cart_total = EXCLUDED.cart_total, \
                 abandoned_at = NOW(), \
                 email_1_sent = FALSE, email_2_sent = FALSE, email_3_sent = FALSE \
             RETURNING {COLUMNS}"
        ))
        .bind(email.as_str())
        .bind(user_id)
        .bind(items)
        .bind(total)
        .fetch_one(self.pool)
        .await?;

        Ok(row)
    }

    /// Mark the open cart for an address as recovered.
    ///
    /// Returns the number of carts updated.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn mark_recovered(&self, email: &Email) -> Result<u64, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        mark_recovered_on(&mut conn, email.as_str()).await
    }

    /// Carts that may still need a reminder, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn pending_reminders(&self) -> Result<Vec<AbandonedCart>, RepositoryError> {
        let rows = sqlx::query_as::<_, AbandonedCart>(&format!(
            "SELECT {COLUMNS} FROM abandoned_carts \
             WHERE NOT recovered AND NOT email_3_sent \
             ORDER BY abandoned_at"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    /// Record that a reminder went out.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn mark_sent(
        &self,
        id: AbandonedCartId,
        step: ReminderStep,
    ) -> Result<(), RepositoryError> {
        let column = match step {
            ReminderStep::First => "email_1_sent",
            ReminderStep::Second => "email_2_sent",
            ReminderStep::Third => "email_3_sent",
        };
        sqlx::query(&format!(
            "UPDATE abandoned_carts SET {column} = TRUE WHERE id = $1"
        ))
        .bind(id)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Page through carts, most recently abandoned first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        include_recovered: bool,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<AbandonedCart>, RepositoryError> {
        let rows = sqlx::query_as::<_, AbandonedCart>(&format!(
            "SELECT {COLUMNS} FROM abandoned_carts \
             WHERE $1 OR NOT recovered \
             ORDER BY abandoned_at DESC OFFSET $2 LIMIT $3"
        ))
        .bind(include_recovered)
        .bind(offset)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }
}

/// Close every open cart for an address.
pub(super) async fn mark_recovered_on(
    conn: &mut PgConnection,
    email: &str,
) -> Result<u64, RepositoryError> {
    let result = sqlx::query(
        "UPDATE abandoned_carts SET recovered = TRUE, recovered_at = NOW() \
         WHERE lower(email) = lower($1) AND NOT recovered",
    )
    .bind(email)
    .execute(conn)
    .await?;

    Ok(result.rows_affected())
}
