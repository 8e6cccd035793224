//! Promo code repository.

use sqlx::{PgConnection, PgPool};

use raze_core::promo::{PromoRule, normalize_code};

use super::RepositoryError;
use crate::models::promo::PromoCode;

const COLUMNS: &str = "id, code, discount_type, discount_value, min_order, max_uses, \
     current_uses, is_active, expires_at, description, created_at";

/// Repository for `promo_codes`.
pub struct PromoRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PromoRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Look up a code. The input is normalized first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, code: &str) -> Result<Option<PromoCode>, RepositoryError> {
        let row = sqlx::query_as::<_, PromoCode>(&format!(
            "SELECT {COLUMNS} FROM promo_codes WHERE code = $1"
        ))
        .bind(normalize_code(code))
        .fetch_optional(self.pool)
        .await?;

        Ok(row)
    }

    /// Every code, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<PromoCode>, RepositoryError> {
        let rows = sqlx::query_as::<_, PromoCode>(&format!(
            "SELECT {COLUMNS} FROM promo_codes ORDER BY created_at DESC"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    /// Store a new code.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the code already exists.
    pub async fn create(&self, rule: &PromoRule) -> Result<PromoCode, RepositoryError> {
        let row = sqlx::query_as::<_, PromoCode>(&format!(
            "INSERT INTO promo_codes \
                 (code, discount_type, discount_value, min_order, max_uses, current_uses, \
                  is_active, expires_at, description) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {COLUMNS}"
        ))
        .bind(normalize_code(&rule.code))
        .bind(rule.discount_type)
        .bind(rule.discount_value)
        .bind(rule.min_order)
        .bind(rule.max_uses)
        .bind(rule.current_uses)
        .bind(rule.is_active)
        .bind(rule.expires_at)
        .bind(rule.description.as_deref())
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::on_unique(e, "Promo code already exists"))?;

        Ok(row)
    }

    /// Insert a starting code unless it already exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn insert_seed(&self, rule: &PromoRule) -> Result<bool, RepositoryError> {
        match self.create(rule).await {
            Ok(_) => Ok(true),
            Err(RepositoryError::Conflict(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Count one use of a code, unless it is at its limit.
    ///
    /// Returns `false` if the code is missing or used up.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn record_use(&self, code: &str) -> Result<bool, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        record_use_on(&mut conn, code).await
    }

    /// Turn a code on or off.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the code doesn't exist.
    pub async fn set_active(&self, code: &str, active: bool) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE promo_codes SET is_active = $2 WHERE code = $1")
            .bind(normalize_code(code))
            .bind(active)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Delete a code.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the code doesn't exist.
    pub async fn delete(&self, code: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM promo_codes WHERE code = $1")
            .bind(normalize_code(code))
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

/// Count one use of a code while it still has uses left.
pub(super) async fn record_use_on(conn: &mut PgConnection, code: &str) -> Result<bool, RepositoryError> {
    let result = sqlx::query(
        "UPDATE promo_codes SET current_uses = current_uses + 1 \
         WHERE code = $1 \
           AND (max_uses IS NULL OR max_uses <= 0 OR current_uses < max_uses)",
    )
    .bind(normalize_code(code))
    .execute(conn)
    .await?;

    Ok(result.rows_affected() > 0)
}
