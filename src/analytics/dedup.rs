//! In-process dedup cache
//!
//! Enforces "first click per identity per link per window" using the keys
//! produced by [`crate::analytics::metadata`]. Entries expire after the
//! configured window; eviction is left to moka.

use chrono::{DateTime, Utc};
use moka::future::Cache;
use std::time::Duration;

/// Last click observed for a link
#[derive(Debug, Clone, PartialEq)]
pub struct RecentClick {
    pub click_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Clone)]
pub struct DedupCache {
    seen: Cache<String, ()>,
    recent: Cache<String, RecentClick>,
}

impl DedupCache {
    pub fn new(window: Duration, max_entries: u64) -> Self {
        Self {
            seen: Cache::builder()
                .max_capacity(max_entries)
                .time_to_live(window)
                .build(),
            recent: Cache::builder()
                .max_capacity(max_entries)
                .time_to_live(window)
                .build(),
        }
    }

    /// Mark `dedup_key` as seen. Returns `true` only for the first sighting
    /// inside the window.
    pub async fn check_and_mark(&self, dedup_key: &str) -> bool {
        self.seen
            .entry(dedup_key.to_string())
            .or_insert(())
            .await
            .is_fresh()
    }

    pub async fn record_recent(&self, recent_key: &str, click: RecentClick) {
        self.recent.insert(recent_key.to_string(), click).await;
    }

    pub async fn last_click(&self, recent_key: &str) -> Option<RecentClick> {
        self.recent.get(recent_key).await
    }
}
