//! Run statistics shared between the pagination loop, the fetcher and the progress line
//!
//! All counters are lock-free atomics behind `Arc`s, so a `FetchStats` handle is
//! cheap to clone and can be handed to every task of a run. Writers:
//! - the fetcher bumps the request counter
//! - the pagination loop updates messages, elapsed time and the latest rate
//!
//! Readers only take [`StatsSnapshot`]s; a snapshot may be one update behind.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

/// Shared counters for one fetch run
#[derive(Clone, Debug, Default)]
pub struct FetchStats {
    /// Messages in the store
    messages: Arc<AtomicUsize>,
    /// Requests sent to the API
    requests: Arc<AtomicU64>,
    /// Time spent fetching and processing pages (milliseconds, excludes pacing)
    elapsed_ms: Arc<AtomicU64>,
    /// Most recent rate sample, stored as `f64` bits
    latest_rate: Arc<AtomicU64>,
}

/// Point-in-time copy of [`FetchStats`]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StatsSnapshot {
    /// Messages in the store
    pub messages: usize,
    /// Requests sent to the API
    pub requests: u64,
    /// Time spent fetching
    pub elapsed: Duration,
    /// Most recent rate sample in messages per second
    pub rate: f64,
}

impl FetchStats {
    /// Create zeroed counters
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one request sent
    pub fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Publish the current store size
    pub fn set_messages(&self, count: usize) {
        self.messages.store(count, Ordering::Relaxed);
    }

    /// Add time spent on a page
    pub fn add_elapsed(&self, elapsed: Duration) {
        let ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        self.elapsed_ms.fetch_add(ms, Ordering::Relaxed);
    }

    /// Publish the latest rate sample
    pub fn set_rate(&self, rate: f64) {
        self.latest_rate.store(rate.to_bits(), Ordering::Relaxed);
    }

    /// Zero every counter; all clones see the reset
    pub fn reset(&self) {
        self.messages.store(0, Ordering::Relaxed);
        self.requests.store(0, Ordering::Relaxed);
        self.elapsed_ms.store(0, Ordering::Relaxed);
        self.latest_rate.store(0f64.to_bits(), Ordering::Relaxed);
    }

    /// Requests sent so far
    pub fn requests(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    /// Read all counters
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            messages: self.messages.load(Ordering::Relaxed),
            requests: self.requests.load(Ordering::Relaxed),
            elapsed: Duration::from_millis(self.elapsed_ms.load(Ordering::Relaxed)),
            rate: f64::from_bits(self.latest_rate.load(Ordering::Relaxed)),
        }
    }
}
