//! Giveaway winners.

use sqlx::PgPool;

use super::RepositoryError;
use crate::models::giveaway::{GiveawayWinner, NewGiveawayWinner};

const COLUMNS: &str =
    "id, email, entry_id, prize, winner_name, selected_by, webhook_sent, created_at";

/// Repository for `admin.giveaway_winner`.
pub struct GiveawayRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> GiveawayRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Record a winner.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn record(&self, new: &NewGiveawayWinner<'_>) -> Result<GiveawayWinner, RepositoryError> {
        let row = sqlx::query_as::<_, GiveawayWinner>(&format!(
            "INSERT INTO admin.giveaway_winner \
                 (email, entry_id, prize, winner_name, selected_by, webhook_sent) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {COLUMNS}"
        ))
        .bind(new.email)
        .bind(new.entry_id)
        .bind(new.prize)
        .bind(new.winner_name)
        .bind(new.selected_by)
        .bind(new.webhook_sent)
        .fetch_one(self.pool)
        .await?;
        Ok(row)
    }

    /// Past winners, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, limit: i64) -> Result<Vec<GiveawayWinner>, RepositoryError> {
        let rows = sqlx::query_as::<_, GiveawayWinner>(&format!(
            "SELECT {COLUMNS} FROM admin.giveaway_winner ORDER BY created_at DESC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }
}
