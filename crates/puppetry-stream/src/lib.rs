//! `puppetry-stream` – capture-to-network pose streaming.
//!
//! Receives orientation samples at the tracking source's native rate, keeps
//! the newest one available for display, and relays a rate-limited copy to
//! a remote HTTP endpoint without ever blocking the source.
//!
//! # Modules
//!
//! - [`controller`] – [`StreamController`]: the per-event pipeline and its
//!   [`StreamToggle`] on/off switch.
//! - [`publisher`] – [`LatestPose`] / [`PoseReader`]: latest-value cell for
//!   display consumers, built on a Tokio `watch` channel.
//! - [`rate_limiter`] – [`RateLimiter`]: minimum-interval admission gate
//!   (1/30 s by default).
//! - [`codec`] – JSON wire format of one pose message.
//! - [`transport`] – [`Dispatcher`] trait and the fire-and-forget
//!   [`HttpDispatcher`].
//! - [`clock`] – monotonic [`Clock`] abstraction used for admission.
//! - [`stats`] – [`StreamStats`] counters.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing].

pub mod clock;
pub mod codec;
pub mod controller;
pub mod publisher;
pub mod rate_limiter;
pub mod stats;
pub mod telemetry;
pub mod transport;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use codec::WirePose;
pub use controller::{StreamController, StreamState, StreamToggle};
pub use publisher::{LatestPose, PoseReader, PublishedPose};
pub use rate_limiter::{RateLimiter, DEFAULT_MIN_INTERVAL};
pub use stats::{StatsSnapshot, StreamStats};
pub use telemetry::{init_tracing, TracerProviderGuard};
pub use transport::{Dispatcher, HttpDispatcher, TransportOptions};
