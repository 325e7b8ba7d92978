use crate::ratelimit::types::{RateDecision, RateLimitConfig};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

/// Per-client request accounting behind a substitutable seam.
///
/// The orchestrator only depends on this trait, so the in-memory store can be
/// swapped for a distributed backing store without touching the pipeline.
/// `consume` never fails: every call yields a decision.
pub trait RateLimitStore: Send + Sync {
    fn consume(&self, key: &str) -> RateDecision;
}

#[derive(Debug)]
struct Bucket {
    count: u32,
    window_start: DateTime<Utc>,
    last_used: DateTime<Utc>,
}

/// Fixed-window counter store keyed by client identity.
///
/// The read-modify-write on a bucket happens under its DashMap entry guard,
/// so a single key can never be granted more than `limit` approvals within
/// one window no matter how many callers race. Distinct keys land on
/// independent shards and do not contend.
#[derive(Debug)]
pub struct FixedWindowStore {
    config: RateLimitConfig,
    buckets: DashMap<String, Bucket>,
}

impl FixedWindowStore {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            buckets: DashMap::new(),
        }
    }

    pub fn tracked_keys(&self) -> usize {
        self.buckets.len()
    }

    fn window(&self) -> Duration {
        Duration::milliseconds(self.config.window_ms as i64)
    }

    /// Window arithmetic with an injected clock; `consume` drives it with
    /// `Utc::now`, tests drive it directly.
    pub fn consume_at(&self, key: &str, now: DateTime<Utc>) -> RateDecision {
        let limit = self.config.limit;
        let window = self.window();

        let decision = match self.buckets.entry(key.to_string()) {
            Entry::Vacant(slot) => {
                slot.insert(Bucket {
                    count: 1,
                    window_start: now,
                    last_used: now,
                });
                RateDecision {
                    allowed: true,
                    limit,
                    remaining: limit.saturating_sub(1),
                    reset_at: now + window,
                    retry_after_secs: None,
                }
            }
            Entry::Occupied(mut slot) => {
                let bucket = slot.get_mut();
                bucket.last_used = now;

                if now.signed_duration_since(bucket.window_start) >= window {
                    bucket.count = 1;
                    bucket.window_start = now;
                    RateDecision {
                        allowed: true,
                        limit,
                        remaining: limit.saturating_sub(1),
                        reset_at: now + window,
                        retry_after_secs: None,
                    }
                } else {
                    bucket.count += 1;
                    let reset_at = bucket.window_start + window;
                    if bucket.count <= limit {
                        RateDecision {
                            allowed: true,
                            limit,
                            remaining: limit - bucket.count,
                            reset_at,
                            retry_after_secs: None,
                        }
                    } else {
                        let remaining_ms =
                            reset_at.signed_duration_since(now).num_milliseconds().max(0) as u64;
                        RateDecision {
                            allowed: false,
                            limit,
                            remaining: 0,
                            reset_at,
                            retry_after_secs: Some(remaining_ms.div_ceil(1000)),
                        }
                    }
                }
            }
        };

        // Entry guard is released before eviction scans the map.
        self.evict_lru();

        decision
    }

    /// Drop least-recently-used buckets until the tracked-key ceiling holds.
    ///
    /// A client that returns after eviction starts a fresh window, which lets
    /// it shed a denial early by waiting out the eviction. Known limitation
    /// of the in-memory store, accepted for this scope.
    fn evict_lru(&self) {
        while self.buckets.len() > self.config.max_tracked_keys {
            let oldest = self
                .buckets
                .iter()
                .min_by_key(|entry| entry.value().last_used)
                .map(|entry| entry.key().clone());

            match oldest {
                Some(key) => {
                    self.buckets.remove(&key);
                }
                None => break,
            }
        }
    }
}

impl RateLimitStore for FixedWindowStore {
    fn consume(&self, key: &str) -> RateDecision {
        self.consume_at(key, Utc::now())
    }
}
