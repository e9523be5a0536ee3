//! Request quota
//!
//! A governor token bucket in front of every query. The Notion API allows an
//! average of three requests per second per integration.

use governor::clock::DefaultClock;
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as Governor};
use std::num::NonZeroU32;
use std::sync::Arc;

type DirectLimiter = Governor<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>;

/// Sustained rate and burst allowance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    /// Requests per second once the burst is spent
    pub per_second: u32,
    /// Requests allowed back to back
    pub burst: u32,
}

impl Default for RateLimit {
    fn default() -> Self {
        Self::per_second(3)
    }
}

impl RateLimit {
    /// Rate with a burst equal to one second's worth of requests
    ///
    /// Returns `None` for zero, meaning unlimited.
    pub fn from_config(per_second: u32) -> Option<Self> {
        (per_second > 0).then(|| Self::per_second(per_second))
    }

    pub fn per_second(per_second: u32) -> Self {
        Self {
            per_second,
            burst: per_second,
        }
    }

    #[must_use]
    pub fn with_burst(mut self, burst: u32) -> Self {
        self.burst = burst;
        self
    }

    fn quota(self) -> Quota {
        // Zero would be rejected by governor; treat it as one per second
        let rate = NonZeroU32::new(self.per_second).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(self.burst).unwrap_or(NonZeroU32::MIN);
        Quota::per_second(rate).allow_burst(burst)
    }
}

/// Shared token bucket
#[derive(Clone)]
pub struct RateLimiter {
    limit: RateLimit,
    bucket: Arc<DirectLimiter>,
}

impl RateLimiter {
    pub fn new(limit: RateLimit) -> Self {
        Self {
            limit,
            bucket: Arc::new(Governor::direct(limit.quota())),
        }
    }

    pub fn limit(&self) -> RateLimit {
        self.limit
    }

    /// Wait for a token
    pub async fn acquire(&self) {
        self.bucket.until_ready().await;
    }

    /// Take a token if one is available now
    pub fn try_acquire(&self) -> bool {
        self.bucket.check().is_ok()
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("limit", &self.limit)
            .finish_non_exhaustive()
    }
}
