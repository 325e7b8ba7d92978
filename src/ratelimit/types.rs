use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Maximum requests granted per key within one window.
    pub limit: u32,
    /// Window length in milliseconds.
    pub window_ms: u64,
    /// Ceiling on distinct keys tracked at once; the least-recently-used
    /// bucket is evicted beyond this.
    pub max_tracked_keys: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            limit: 60,
            window_ms: 60_000,
            max_tracked_keys: 10_000,
        }
    }
}

/// Outcome of consuming one rate-limit unit for a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
    /// Populated only on denial: whole seconds until the window resets.
    pub retry_after_secs: Option<u64>,
}
