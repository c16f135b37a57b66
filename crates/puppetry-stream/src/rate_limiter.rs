//! [`RateLimiter`] – minimum-interval admission gate.
//!
//! Admits at most one sample per `min_interval`, whatever the capture rate.
//! The only state is the offset of the last admitted sample.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use puppetry_stream::rate_limiter::RateLimiter;
//!
//! let mut limiter = RateLimiter::default(); // 1/30 s
//!
//! assert!(limiter.admit(Duration::from_millis(0)));
//! assert!(!limiter.admit(Duration::from_millis(10)));
//! assert!(limiter.admit(Duration::from_millis(34)));
//! ```

use std::time::Duration;

/// Default spacing between admitted samples: one thirtieth of a second.
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_nanos(1_000_000_000 / 30);

/// Stateful gate that admits at most one timestamp per `min_interval`.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    min_interval: Duration,
    last_admitted: Option<Duration>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_admitted: None,
        }
    }

    /// Decide whether the sample observed at monotonic offset `now` may pass.
    ///
    /// The first call always admits.  Later calls admit iff at least
    /// `min_interval` has elapsed since the last admission, in which case
    /// `now` becomes the new reference.  A `now` earlier than the last
    /// admission is denied without touching state, so the gate recovers on
    /// the next well-ordered call.
    pub fn admit(&mut self, now: Duration) -> bool {
        let open = match self.last_admitted {
            None => true,
            Some(last) => now
                .checked_sub(last)
                .is_some_and(|elapsed| elapsed >= self.min_interval),
        };
        if open {
            self.last_admitted = Some(now);
        }
        open
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Offset of the most recent admission, `None` before the first one.
    pub fn last_admitted(&self) -> Option<Duration> {
        self.last_admitted
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_INTERVAL)
    }
}
