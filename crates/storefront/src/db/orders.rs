//! Order repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use raze_core::credits::credits_for_order;
use raze_core::order::transition_effects;
use raze_core::{Money, OrderId, OrderStatus};

use super::{RepositoryError, to_json};
use crate::models::order::{NewOrder, Order, StatusCount};

pub(super) const COLUMNS: &str = "id, order_number, user_id, email, customer_name, items, \
     subtotal, discount, discount_description, promo_code, shipping_cost, total, status, \
     shipping_address, tracking_number, carrier, label_url, notes, estimated_delivery, \
     stripe_session_id, credits_awarded, shipped_at, delivered_at, created_at, updated_at";

/// Validated admin changes to apply to an order.
#[derive(Debug, Clone, Default)]
pub struct OrderChanges<'a> {
    pub status: Option<OrderStatus>,
    pub tracking_number: Option<&'a str>,
    pub carrier: Option<&'a str>,
    pub notes: Option<&'a str>,
    pub estimated_delivery: Option<&'a str>,
}

/// What [`OrderRepository::apply_changes`] did.
#[derive(Debug, Clone)]
pub struct AppliedChanges {
    pub order: Order,
    /// Credits granted to the customer by this change, if any.
    pub credits_awarded: Option<i32>,
}

/// Repository for `orders`.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store a new order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the order number or checkout
    /// session is already used.
    pub async fn create(&self, new: &NewOrder<'_>) -> Result<Order, RepositoryError> {
        let items = to_json(&new.items, "order items")?;
        let shipping = to_json(new.shipping_address, "shipping address")?;

        let row = sqlx::query_as::<_, Order>(&format!(
            "INSERT INTO orders \
                 (order_number, user_id, email, customer_name, items, subtotal, discount, \
                  discount_description, promo_code, shipping_cost, total, status, \
                  shipping_address, stripe_session_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
             RETURNING {COLUMNS}"
        ))
        .bind(new.order_number)
        .bind(new.user_id)
        .bind(new.email)
        .bind(new.customer_name)
        .bind(items)
        .bind(new.subtotal)
        .bind(new.discount)
        .bind(new.discount_description)
        .bind(new.promo_code)
        .bind(new.shipping_cost)
        .bind(new.total)
        .bind(new.status)
        .bind(shipping)
        .bind(new.stripe_session_id)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::on_unique(e, "Order already exists"))?;

        Ok(row)
    }

    /// An order by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, Order>(&format!("SELECT {COLUMNS} FROM orders WHERE id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(row)
    }

    /// An order by its customer-facing number.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn by_number(&self, order_number: &str) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, Order>(&format!(
            "SELECT {COLUMNS} FROM orders WHERE order_number = $1"
        ))
        .bind(order_number)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    /// The order created for a checkout session.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn by_checkout_session(
        &self,
        session_id: &str,
    ) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, Order>(&format!(
            "SELECT {COLUMNS} FROM orders WHERE stripe_session_id = $1"
        ))
        .bind(session_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    /// Orders shipped to an address, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn for_email(&self, email: &str, limit: i64) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, Order>(&format!(
            "SELECT {COLUMNS} FROM orders WHERE lower(email) = lower($1) \
             ORDER BY created_at DESC LIMIT $2"
        ))
        .bind(email)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Page through orders, newest first, with optional filters.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        status: Option<OrderStatus>,
        email: Option<&str>,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, Order>(&format!(
            "SELECT {COLUMNS} FROM orders \
             WHERE ($1::order_status IS NULL OR status = $1) \
               AND ($2::text IS NULL OR lower(email) LIKE '%' || lower($2) || '%') \
             ORDER BY created_at DESC OFFSET $3 LIMIT $4"
        ))
        .bind(status)
        .bind(email)
        .bind(skip)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Order count per status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_by_status(&self) -> Result<Vec<StatusCount>, RepositoryError> {
        let rows = sqlx::query_as::<_, StatusCount>(
            "SELECT status, COUNT(*) AS count FROM orders GROUP BY status ORDER BY status",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Number of orders created since `since` (all time when `None`).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self, since: Option<DateTime<Utc>>) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar(
            "SELECT COUNT(*) FROM orders WHERE $1::timestamptz IS NULL OR created_at >= $1",
        )
        .bind(since)
        .fetch_one(self.pool)
        .await?;
        Ok(count)
    }

    /// Revenue from orders that weren't cancelled.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn revenue(&self, since: Option<DateTime<Utc>>) -> Result<Money, RepositoryError> {
        let revenue: Money = sqlx::query_scalar(
            "SELECT COALESCE(SUM(total), 0) FROM orders \
             WHERE status <> 'cancelled' AND ($1::timestamptz IS NULL OR created_at >= $1)",
        )
        .bind(since)
        .fetch_one(self.pool)
        .await?;
        Ok(revenue.round_cents())
    }

    /// Claim the confirmation notice for an order.
    ///
    /// Returns `true` exactly once per order, so only one caller sends it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn claim_confirmation(&self, id: OrderId) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE orders SET confirmation_sent = TRUE WHERE id = $1 AND NOT confirmation_sent",
        )
        .bind(id)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Store a purchased shipping label and move the order to processing.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order doesn't exist.
    pub async fn record_label(
        &self,
        id: OrderId,
        tracking_number: &str,
        carrier: Option<&str>,
        label_url: &str,
    ) -> Result<Order, RepositoryError> {
        let row = sqlx::query_as::<_, Order>(&format!(
            "UPDATE orders SET tracking_number = $2, carrier = COALESCE($3, carrier), \
                 label_url = $4, status = 'processing', updated_at = NOW() \
             WHERE id = $1 RETURNING {COLUMNS}"
        ))
        .bind(id)
        .bind(tracking_number)
        .bind(carrier)
        .bind(label_url)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;
        Ok(row)
    }

    /// Apply admin changes, setting ship/delivery dates the first time and
    /// awarding loyalty credits once on delivery.
    ///
    /// Credits go to the account registered with the order's email; if
    /// there is none, the order stays eligible for a later award.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order doesn't exist.
    pub async fn apply_changes(
        &self,
        id: OrderId,
        changes: &OrderChanges<'_>,
    ) -> Result<AppliedChanges, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, Order>(&format!(
            "SELECT {COLUMNS} FROM orders WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        let effects = changes.status.map(|next| {
            transition_effects(
                next,
                current.shipped_at.is_some(),
                current.delivered_at.is_some(),
                current.credits_awarded,
            )
        });

        let mut credits_awarded = None;
        if effects.is_some_and(|e| e.award_credits) {
            let credits = credits_for_order(current.total);
            let result = sqlx::query(
                "UPDATE users SET raze_credits = raze_credits + $2, \
                     total_credits_earned = total_credits_earned + $2, updated_at = NOW() \
                 WHERE lower(email) = lower($1)",
            )
            .bind(&current.email)
            .bind(credits)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() > 0 {
                credits_awarded = Some(credits);
            }
        }

        let order = sqlx::query_as::<_, Order>(&format!(
            "UPDATE orders SET \
                 status = COALESCE($2, status), \
                 tracking_number = COALESCE($3, tracking_number), \
                 carrier = COALESCE($4, carrier), \
                 notes = COALESCE($5, notes), \
                 estimated_delivery = COALESCE($6, estimated_delivery), \
                 shipped_at = CASE WHEN $7 THEN NOW() ELSE shipped_at END, \
                 delivered_at = CASE WHEN $8 THEN NOW() ELSE delivered_at END, \
                 credits_awarded = credits_awarded OR $9, \
                 updated_at = NOW() \
             WHERE id = $1 RETURNING {COLUMNS}"
        ))
        .bind(id)
        .bind(changes.status)
        .bind(changes.tracking_number)
        .bind(changes.carrier)
        .bind(changes.notes)
        .bind(changes.estimated_delivery)
        .bind(effects.is_some_and(|e| e.set_shipped_at))
        .bind(effects.is_some_and(|e| e.set_delivered_at))
        .bind(credits_awarded.is_some())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(AppliedChanges {
            order,
            credits_awarded,
        })
    }
}
