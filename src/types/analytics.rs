//! Product analytics hooks.
//!
//! The host application forwards these events to whatever analytics
//! backend it uses. The core only needs one call site: every exposure
//! notification the device receives is counted, whether or not a key
//! submission follows.

use std::collections::HashMap;

/// Analytics category for exposure-notification events.
pub const EPI_ANALYTICS_CATEGORY: &str = "epi_analytics";

/// Action recorded when an exposure notification arrives.
pub const NOTIFICATION_RECEIVED_ACTION: &str = "en_notification_received";

/// Interface for product analytics backends.
pub trait AnalyticsSink: Send + Sync {
    /// Record one event.
    fn track_event(&self, category: &str, action: &str);
}

/// No-op analytics implementation.
#[derive(Debug, Default)]
pub struct NoOpAnalytics;

impl AnalyticsSink for NoOpAnalytics {
    fn track_event(&self, _category: &str, _action: &str) {
        // No-op
    }
}

/// In-memory analytics for testing.
#[derive(Debug, Default)]
pub struct RecordingAnalytics {
    /// Event counts keyed by `category:action`.
    pub events: std::sync::Mutex<HashMap<String, u64>>,
}

impl AnalyticsSink for RecordingAnalytics {
    fn track_event(&self, category: &str, action: &str) {
        let key = format!("{}:{}", category, action);
        if let Ok(mut events) = self.events.lock() {
            *events.entry(key).or_insert(0) += 1;
        }
    }
}

impl RecordingAnalytics {
    /// Get the count for an event.
    pub fn get_count(&self, category: &str, action: &str) -> u64 {
        let key = format!("{}:{}", category, action);
        self.events
            .lock()
            .map(|events| events.get(&key).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Count of exposure notifications seen.
    pub fn notifications_received(&self) -> u64 {
        self.get_count(EPI_ANALYTICS_CATEGORY, NOTIFICATION_RECEIVED_ACTION)
    }
}
