//! Lock-free counters describing what the pipeline has done so far.

use std::sync::atomic::{AtomicU64, Ordering};

/// Running totals for one stream.  Share it behind an `Arc`.
#[derive(Debug, Default)]
pub struct StreamStats {
    captured: AtomicU64,
    admitted: AtomicU64,
    dispatched: AtomicU64,
    dropped: AtomicU64,
    delivered: AtomicU64,
    failed: AtomicU64,
}

/// Point-in-time copy of [`StreamStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Capture events seen by the controller.
    pub captured: u64,
    /// Events that passed the rate limiter while streaming.
    pub admitted: u64,
    /// Payloads handed to the network.
    pub dispatched: u64,
    /// Payloads discarded because the in-flight cap was reached.
    pub dropped: u64,
    /// Sends answered with a success status.
    pub delivered: u64,
    /// Sends that errored or got a non-success status.
    pub failed: u64,
}

impl StatsSnapshot {
    /// Sends issued but not yet answered.
    pub fn in_flight(&self) -> u64 {
        self.dispatched.saturating_sub(self.delivered + self.failed)
    }
}

impl StreamStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_captured(&self) {
        self.captured.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_admitted(&self) {
        self.admitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dispatched(&self) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            captured: self.captured.load(Ordering::Relaxed),
            admitted: self.admitted.load(Ordering::Relaxed),
            dispatched: self.dispatched.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}
