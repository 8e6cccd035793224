//! In-process view of who is on the site right now.
//!
//! A visitor counts as live until five minutes pass without a track or
//! heartbeat call. Entries are per process; the database holds the durable
//! record.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use serde::Serialize;

use raze_core::analytics::ACTIVE_WINDOW_MINUTES;

/// What we know about a live visitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LiveVisitor {
    pub session_id: String,
    pub current_page: Option<String>,
    pub country: Option<String>,
}

/// Visitors seen recently.
#[derive(Clone)]
pub struct LiveVisitors {
    cache: Arc<Cache<String, LiveVisitor>>,
}

impl Default for LiveVisitors {
    fn default() -> Self {
        Self::new()
    }
}

impl LiveVisitors {
    #[must_use]
    pub fn new() -> Self {
        let idle = Duration::from_secs(ACTIVE_WINDOW_MINUTES.unsigned_abs() * 60);
        let cache = Cache::builder()
            .max_capacity(100_000)
            .time_to_idle(idle)
            .build();
        Self {
            cache: Arc::new(cache),
        }
    }

    /// Record activity, replacing anything known about the session.
    pub async fn touch(&self, visitor: LiveVisitor) {
        self.cache.insert(visitor.session_id.clone(), visitor).await;
    }

    /// Refresh a session's idle timer and update its page.
    ///
    /// Returns `false` if the session is not live.
    pub async fn heartbeat(&self, session_id: &str, page: Option<&str>) -> bool {
        let Some(mut visitor) = self.cache.get(session_id).await else {
            return false;
        };
        if let Some(page) = page {
            visitor.current_page = Some(page.to_string());
        }
        self.cache.insert(session_id.to_string(), visitor).await;
        true
    }

    /// Number of live visitors.
    pub async fn count(&self) -> u64 {
        self.cache.run_pending_tasks().await;
        self.cache.entry_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn visitor(id: &str) -> LiveVisitor {
        LiveVisitor {
            session_id: id.to_string(),
            current_page: Some("/".to_string()),
            country: None,
        }
    }

    #[tokio::test]
    async fn test_count_distinct_sessions() {
        let live = LiveVisitors::new();
        live.touch(visitor("a")).await;
        live.touch(visitor("b")).await;
        live.touch(visitor("a")).await;
        assert_eq!(live.count().await, 2);
    }

    #[tokio::test]
    async fn test_heartbeat_unknown_session() {
        let live = LiveVisitors::new();
        assert!(!live.heartbeat("missing", Some("/shop")).await);

        live.touch(visitor("a")).await;
        assert!(live.heartbeat("a", Some("/shop")).await);
    }
}
