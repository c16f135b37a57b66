//! Monotonic time source used by the rate limiter.
//!
//! The controller never reads wall-clock time for admission decisions; it
//! asks a [`Clock`] for the elapsed time on a monotonic timeline so that
//! NTP adjustments cannot open or close the gate spuriously.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// A monotonic timeline measured as an offset from an arbitrary origin.
pub trait Clock: Send + Sync {
    fn now(&self) -> Duration;
}

/// [`Clock`] backed by [`std::time::Instant`], anchored at construction.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Hand-driven [`Clock`] for simulations and deterministic tests.
///
/// ```
/// use std::time::Duration;
/// use puppetry_stream::clock::{Clock, ManualClock};
///
/// let clock = ManualClock::new();
/// clock.advance(Duration::from_millis(40));
/// assert_eq!(clock.now(), Duration::from_millis(40));
/// ```
#[derive(Debug, Default)]
pub struct ManualClock {
    nanos: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward by `step`.
    pub fn advance(&self, step: Duration) {
        self.nanos
            .fetch_add(step.as_nanos() as u64, Ordering::SeqCst);
    }

    /// Jump to an absolute offset.  Jumping backwards is allowed.
    pub fn set(&self, at: Duration) {
        self.nanos.store(at.as_nanos() as u64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::SeqCst))
    }
}
