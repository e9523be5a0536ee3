//! Liveness signalling towards the host supervisor
//!
//! Long decode and row loops call [`Liveness::feed`] so a supervising
//! watchdog can tell a slow fetch from a hung one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::trace;

/// Host liveness signal
pub trait Liveness: Send + Sync + std::fmt::Debug {
    /// Tell the host the process is still responsive
    fn feed(&self);
}

/// Liveness sink that ignores every feed
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLiveness;

impl Liveness for NoopLiveness {
    fn feed(&self) {}
}

/// Software watchdog recording the last feed
#[derive(Debug)]
pub struct Watchdog {
    timeout: Duration,
    last_feed: Mutex<Instant>,
    feeds: AtomicU64,
}

impl Watchdog {
    /// Create a watchdog that starves after `timeout` without a feed
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            last_feed: Mutex::new(Instant::now()),
            feeds: AtomicU64::new(0),
        }
    }

    /// Configured starvation timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Number of feeds received so far
    pub fn feed_count(&self) -> u64 {
        self.feeds.load(Ordering::Relaxed)
    }

    /// Time elapsed since the last feed
    pub fn since_last_feed(&self) -> Duration {
        self.last_feed
            .lock()
            .map(|last| last.elapsed())
            .unwrap_or_default()
    }

    /// True when no feed arrived within the timeout
    pub fn is_starved(&self) -> bool {
        self.since_last_feed() > self.timeout
    }
}

impl Liveness for Watchdog {
    fn feed(&self) {
        if let Ok(mut last) = self.last_feed.lock() {
            *last = Instant::now();
        }
        let count = self.feeds.fetch_add(1, Ordering::Relaxed) + 1;
        trace!(count, "watchdog fed");
    }
}
