//! Visitor sessions, page views and analytics events.
//!
//! Tracking writes happen on the storefront; the rollups at the bottom of
//! this file back the admin analytics endpoints.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::PgPool;

use raze_core::analytics::{ACTIVE_WINDOW_MINUTES, LocationFilter};

use super::RepositoryError;
use crate::models::visitor::{AnalyticsEvent, NewEvent, NewPageView, NewVisit, VisitorSession};

const SESSION_COLUMNS: &str = "id, session_id, user_id, user_email, user_type, ip_address, \
     country, country_code, region, city, latitude, longitude, timezone, device_type, browser, \
     os, screen_resolution, language, referrer, utm_source, utm_medium, utm_campaign, \
     landing_page, current_page, pages_viewed, first_visit, last_activity, session_duration";

/// Headline visitor numbers for a window.
#[derive(Debug, Clone, Copy, Default, Serialize, sqlx::FromRow)]
pub struct VisitorTotals {
    pub total_visitors: i64,
    pub unique_visitors: i64,
    pub registered_users: i64,
    pub guest_visitors: i64,
    pub avg_session_duration: f64,
}

/// Views of one page.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PageCount {
    pub page: String,
    pub views: i64,
}

/// Visitors from one country.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CountryCount {
    pub country: String,
    pub country_code: Option<String>,
    pub visitors: i64,
}

/// Visitors from one referrer.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SourceCount {
    pub source: String,
    pub visitors: i64,
}

/// Visitors from one city.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct LocationCount {
    pub country: String,
    pub country_code: Option<String>,
    pub city: String,
    pub visitors: i64,
    pub registered: i64,
    pub guests: i64,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Funnel event counts for a window.
#[derive(Debug, Clone, Copy, Default, sqlx::FromRow)]
pub struct FunnelCounts {
    pub add_to_cart: i64,
    pub begin_checkout: i64,
    pub purchase: i64,
}

const fn location_clause(filter: LocationFilter) -> &'static str {
    match filter {
        LocationFilter::All => "TRUE",
        LocationFilter::Registered => "user_type = 'registered'",
        LocationFilter::Guest => "user_type = 'guest'",
        LocationFilter::Signup => "user_id IS NOT NULL",
    }
}

/// Start of the "active now" window.
#[must_use]
pub fn active_since(now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::minutes(ACTIVE_WINDOW_MINUTES)
}

/// Repository for visitor analytics tables.
pub struct VisitorRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> VisitorRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create the session, or refresh it if the browser reports it again.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the upsert fails.
    pub async fn upsert_session(&self, visit: &NewVisit<'_>) -> Result<VisitorSession, RepositoryError> {
        let row = sqlx::query_as::<_, VisitorSession>(&format!(
            "INSERT INTO visitor_sessions \
                 (session_id, user_id, user_email, user_type, ip_address, country, country_code, \
                  region, city, latitude, longitude, timezone, device_type, browser, os, \
                  screen_resolution, language, referrer, utm_source, utm_medium, utm_campaign, \
                  landing_page, current_page, pages_viewed) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, \
                     $17, $18, $19, $20, $21, $22, $22, \
                     CASE WHEN $22::text IS NULL THEN '{{}}'::text[] ELSE ARRAY[$22::text] END) \
             ON CONFLICT (session_id) DO UPDATE SET \
                 user_id = COALESCE(EXCLUDED.user_id, visitor_sessions.user_id), \
                 user_email = COALESCE(EXCLUDED.user_email, visitor_sessions.user_email), \
                 user_type = CASE WHEN EXCLUDED.user_type = 'guest' \
                     THEN visitor_sessions.user_type ELSE EXCLUDED.user_type END, \
                 last_activity = NOW(), \
                 session_duration = EXTRACT(EPOCH FROM NOW() - visitor_sessions.first_visit)::bigint \
             RETURNING {SESSION_COLUMNS}"
        ))
        .bind(visit.session_id)
        .bind(visit.user_id)
        .bind(visit.user_email)
        .bind(visit.user_type)
        .bind(visit.ip_address)
        .bind(visit.geo.country.as_deref())
        .bind(visit.geo.country_code.as_deref())
        .bind(visit.geo.region.as_deref())
        .bind(visit.geo.city.as_deref())
        .bind(visit.geo.latitude)
        .bind(visit.geo.longitude)
        .bind(visit.geo.timezone.as_deref().or(visit.timezone))
        .bind(visit.device.device_type)
        .bind(visit.device.browser)
        .bind(visit.device.os)
        .bind(visit.screen_resolution)
        .bind(visit.language)
        .bind(visit.referrer)
        .bind(visit.utm_source)
        .bind(visit.utm_medium)
        .bind(visit.utm_campaign)
        .bind(visit.landing_page)
        .fetch_one(self.pool)
        .await?;

        Ok(row)
    }

    /// Record activity on a session.
    ///
    /// Returns the session duration in seconds, or `None` if the session
    /// is unknown.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn heartbeat(
        &self,
        session_id: &str,
        current_page: Option<&str>,
    ) -> Result<Option<i64>, RepositoryError> {
        let duration = sqlx::query_scalar(
            "UPDATE visitor_sessions SET \
                 last_activity = NOW(), \
                 session_duration = EXTRACT(EPOCH FROM NOW() - first_visit)::bigint, \
                 current_page = COALESCE($2, current_page), \
                 pages_viewed = CASE WHEN $2::text IS NULL OR $2 = ANY(pages_viewed) \
                     THEN pages_viewed ELSE array_append(pages_viewed, $2) END \
             WHERE session_id = $1 \
             RETURNING session_duration",
        )
        .bind(session_id)
        .bind(current_page)
        .fetch_optional(self.pool)
        .await?;

        Ok(duration)
    }

    /// Store a page view.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn record_page_view(&self, view: &NewPageView<'_>) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO page_views (session_id, page_path, page_title, referrer, time_on_page) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(view.session_id)
        .bind(view.page_path)
        .bind(view.page_title)
        .bind(view.referrer)
        .bind(view.time_on_page)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Store a custom event.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn record_event(&self, event: &NewEvent<'_>) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO analytics_events \
                 (session_id, event_type, event_category, event_label, event_value, event_data) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(event.session_id)
        .bind(event.event_type)
        .bind(event.event_category)
        .bind(event.event_label)
        .bind(event.event_value)
        .bind(event.event_data)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    // =========================================================================
    // Rollups
    // =========================================================================

    /// Visitor totals for sessions that started since `since`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn totals(&self, since: DateTime<Utc>) -> Result<VisitorTotals, RepositoryError> {
        let totals = sqlx::query_as::<_, VisitorTotals>(
            "SELECT COUNT(*) AS total_visitors, \
                 COUNT(DISTINCT ip_address) AS unique_visitors, \
                 COUNT(*) FILTER (WHERE user_type = 'registered') AS registered_users, \
                 COUNT(*) FILTER (WHERE user_type = 'guest') AS guest_visitors, \
                 COALESCE(AVG(session_duration), 0)::float8 AS avg_session_duration \
             FROM visitor_sessions WHERE first_visit >= $1",
        )
        .bind(since)
        .fetch_one(self.pool)
        .await?;

        Ok(totals)
    }

    /// Sessions with a heartbeat in the last few minutes.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn active_sessions(&self, now: DateTime<Utc>) -> Result<Vec<VisitorSession>, RepositoryError> {
        let rows = sqlx::query_as::<_, VisitorSession>(&format!(
            "SELECT {SESSION_COLUMNS} FROM visitor_sessions WHERE last_activity >= $1 \
             ORDER BY last_activity DESC"
        ))
        .bind(active_since(now))
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    /// Number of sessions with a heartbeat in the last few minutes.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn active_count(&self, now: DateTime<Utc>) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM visitor_sessions WHERE last_activity >= $1")
            .bind(active_since(now))
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }

    /// Page views since `since`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn page_view_count(&self, since: DateTime<Utc>) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM page_views WHERE created_at >= $1")
            .bind(since)
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }

    /// Most viewed pages.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn top_pages(&self, since: DateTime<Utc>, limit: i64) -> Result<Vec<PageCount>, RepositoryError> {
        let rows = sqlx::query_as::<_, PageCount>(
            "SELECT page_path AS page, COUNT(*) AS views FROM page_views \
             WHERE created_at >= $1 GROUP BY page_path \
             ORDER BY views DESC, page ASC LIMIT $2",
        )
        .bind(since)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Countries with the most visitors.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn top_countries(
        &self,
        since: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<CountryCount>, RepositoryError> {
        let rows = sqlx::query_as::<_, CountryCount>(
            "SELECT COALESCE(country, 'Unknown') AS country, MAX(country_code) AS country_code, \
                 COUNT(*) AS visitors \
             FROM visitor_sessions WHERE first_visit >= $1 \
             GROUP BY COALESCE(country, 'Unknown') \
             ORDER BY visitors DESC, country ASC LIMIT $2",
        )
        .bind(since)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Referrers with the most visitors; sessions without one are `direct`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn traffic_sources(
        &self,
        since: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<SourceCount>, RepositoryError> {
        let rows = sqlx::query_as::<_, SourceCount>(
            "SELECT COALESCE(NULLIF(trim(referrer), ''), 'direct') AS source, COUNT(*) AS visitors \
             FROM visitor_sessions WHERE first_visit >= $1 \
             GROUP BY 1 ORDER BY visitors DESC, source ASC LIMIT $2",
        )
        .bind(since)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Counts of the funnel events.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn funnel_counts(&self, since: DateTime<Utc>) -> Result<FunnelCounts, RepositoryError> {
        let counts = sqlx::query_as::<_, FunnelCounts>(
            "SELECT COUNT(*) FILTER (WHERE event_type = 'add_to_cart') AS add_to_cart, \
                 COUNT(*) FILTER (WHERE event_type = 'begin_checkout') AS begin_checkout, \
                 COUNT(*) FILTER (WHERE event_type = 'purchase') AS purchase \
             FROM analytics_events WHERE created_at >= $1",
        )
        .bind(since)
        .fetch_one(self.pool)
        .await?;
        Ok(counts)
    }

    /// Visitors grouped by city.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn locations(
        &self,
        filter: LocationFilter,
        since: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<LocationCount>, RepositoryError> {
        let rows = sqlx::query_as::<_, LocationCount>(&format!(
            "SELECT COALESCE(country, 'Unknown') AS country, MAX(country_code) AS country_code, \
                 COALESCE(city, 'Unknown') AS city, COUNT(*) AS visitors, \
                 COUNT(*) FILTER (WHERE user_type = 'registered') AS registered, \
                 COUNT(*) FILTER (WHERE user_type = 'guest') AS guests, \
                 AVG(latitude) AS latitude, AVG(longitude) AS longitude \
             FROM visitor_sessions \
             WHERE first_visit >= $1 AND {} \
             GROUP BY COALESCE(country, 'Unknown'), COALESCE(city, 'Unknown') \
             ORDER BY visitors DESC, country ASC, city ASC LIMIT $2",
            location_clause(filter)
        ))
        .bind(since)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Most recent events.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn recent_events(&self, limit: i64) -> Result<Vec<AnalyticsEvent>, RepositoryError> {
        let rows = sqlx::query_as::<_, AnalyticsEvent>(
            "SELECT id, session_id, event_type, event_category, event_label, event_value, \
                 event_data, created_at \
             FROM analytics_events ORDER BY created_at DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Start times of sessions since `since`, for daily rollups.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn visit_times(&self, since: DateTime<Utc>) -> Result<Vec<DateTime<Utc>>, RepositoryError> {
        let rows = sqlx::query_scalar("SELECT first_visit FROM visitor_sessions WHERE first_visit >= $1")
            .bind(since)
            .fetch_all(self.pool)
            .await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_clause_is_static_sql() {
        assert_eq!(location_clause(LocationFilter::All), "TRUE");
        assert_eq!(location_clause(LocationFilter::Signup), "user_id IS NOT NULL");
        assert!(location_clause(LocationFilter::Guest).contains("'guest'"));
    }

    #[test]
    fn test_active_window() {
        let now = Utc::now();
        assert_eq!(now - active_since(now), Duration::minutes(5));
    }
}
