//! [`StreamController`] – per-capture-event orchestration.
//!
//! Every capture event goes through [`StreamController::on_capture`] on the
//! tracking source's thread:
//!
//! 1. **Publish** – the sample replaces the latest value seen by display
//!    readers.  Always, whatever the stream state.
//! 2. **Observe the toggle** – the [`StreamToggle`] is read once; a flip
//!    since the previous event moves the controller between
//!    [`StreamState::Idle`] and [`StreamState::Streaming`].
//! 3. **Gate** – while streaming, the [`RateLimiter`] decides on the
//!    current monotonic time.
//! 4. **Encode + dispatch** – admitted samples are serialized and handed to
//!    the [`Dispatcher`], which returns immediately.
//!
//! Nothing after step 1 can fail the call: `on_capture` returns `()`.
//!
//! # Example
//!
//! ```rust
//! use std::sync::{Arc, Mutex};
//! use std::time::Duration;
//! use puppetry_stream::{Dispatcher, ManualClock, StreamController, StreamStats};
//! use puppetry_types::{PoseSample, Quaternion};
//!
//! #[derive(Default)]
//! struct Collect(Mutex<Vec<Vec<u8>>>);
//! impl Dispatcher for Collect {
//!     fn dispatch(&self, payload: Vec<u8>) {
//!         self.0.lock().unwrap().push(payload);
//!     }
//! }
//!
//! let sink = Arc::new(Collect::default());
//! let clock = Arc::new(ManualClock::new());
//! let mut controller = StreamController::new(
//!     sink.clone(),
//!     clock.clone(),
//!     Arc::new(StreamStats::new()),
//! );
//! let toggle = controller.toggle();
//! let reader = controller.reader();
//!
//! toggle.enable();
//! controller.on_capture(PoseSample::new(0.0, Quaternion::identity()).unwrap());
//! clock.advance(Duration::from_millis(5));
//! controller.on_capture(PoseSample::new(0.005, Quaternion::identity()).unwrap());
//!
//! assert_eq!(reader.update_count(), 2);
//! assert_eq!(sink.0.lock().unwrap().len(), 1); // second event was rate-limited
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use puppetry_types::PoseSample;
use tracing::{debug, info, trace};

use crate::clock::Clock;
use crate::codec;
use crate::publisher::{LatestPose, PoseReader};
use crate::rate_limiter::RateLimiter;
use crate::stats::StreamStats;
use crate::transport::Dispatcher;

// ─────────────────────────────────────────────────────────────────────────────
// Stream state
// ─────────────────────────────────────────────────────────────────────────────

/// Whether admitted samples are being sent to the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Idle,
    Streaming,
}

/// Shared on/off switch for the network path.
///
/// Cloned into the UI layer; the controller reads it once per capture
/// event, so a flip takes effect on the next event.
#[derive(Debug, Clone, Default)]
pub struct StreamToggle(Arc<AtomicBool>);

impl StreamToggle {
    pub fn new(enabled: bool) -> Self {
        Self(Arc::new(AtomicBool::new(enabled)))
    }

    pub fn set(&self, enabled: bool) {
        self.0.store(enabled, Ordering::Release);
    }

    pub fn enable(&self) {
        self.set(true);
    }

    pub fn disable(&self) {
        self.set(false);
    }

    pub fn is_enabled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// StreamController
// ─────────────────────────────────────────────────────────────────────────────

/// Owns the latest-value publisher and the rate limiter for one stream.
pub struct StreamController {
    publisher: LatestPose,
    limiter: RateLimiter,
    toggle: StreamToggle,
    state: StreamState,
    dispatcher: Arc<dyn Dispatcher>,
    clock: Arc<dyn Clock>,
    stats: Arc<StreamStats>,
}

impl StreamController {
    /// Create an idle controller with the default 1/30 s send interval.
    pub fn new(
        dispatcher: Arc<dyn Dispatcher>,
        clock: Arc<dyn Clock>,
        stats: Arc<StreamStats>,
    ) -> Self {
        Self {
            publisher: LatestPose::new(),
            limiter: RateLimiter::default(),
            toggle: StreamToggle::default(),
            state: StreamState::Idle,
            dispatcher,
            clock,
            stats,
        }
    }

    /// Override the minimum spacing between network sends (builder-style).
    pub fn with_min_interval(mut self, min_interval: Duration) -> Self {
        self.limiter = RateLimiter::new(min_interval);
        self
    }

    /// Use an externally created toggle (builder-style).
    pub fn with_toggle(mut self, toggle: StreamToggle) -> Self {
        self.toggle = toggle;
        self
    }

    /// Handle to the streaming switch.
    pub fn toggle(&self) -> StreamToggle {
        self.toggle.clone()
    }

    /// New reader of the latest published sample.
    pub fn reader(&self) -> PoseReader {
        self.publisher.reader()
    }

    /// State as of the last capture event.
    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn stats(&self) -> Arc<StreamStats> {
        Arc::clone(&self.stats)
    }

    /// Process one capture event.
    pub fn on_capture(&mut self, sample: PoseSample) {
        self.stats.record_captured();
        self.publisher.publish(sample);

        if self.observe_toggle() == StreamState::Idle {
            return;
        }

        if !self.limiter.admit(self.clock.now()) {
            trace!(captured_at = sample.captured_at(), "sample rate-limited");
            return;
        }
        self.stats.record_admitted();

        match codec::serialize(&sample) {
            Ok(payload) => self.dispatcher.dispatch(payload),
            Err(e) => debug!(error = %e, "dropping sample that failed to serialize"),
        }
    }

    fn observe_toggle(&mut self) -> StreamState {
        let observed = if self.toggle.is_enabled() {
            StreamState::Streaming
        } else {
            StreamState::Idle
        };
        if observed != self.state {
            info!(from = ?self.state, to = ?observed, "pose stream state changed");
            self.state = observed;
        }
        observed
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::codec::WirePose;
    use crate::transport::tests::{direct_client, spawn_stub_endpoint};
    use crate::transport::{parse_endpoint, HttpDispatcher};
    use puppetry_types::Quaternion;
    use std::sync::Mutex;
    use tokio::runtime::Handle;

    #[derive(Default)]
    struct RecordingDispatcher {
        payloads: Mutex<Vec<Vec<u8>>>,
    }

    impl RecordingDispatcher {
        fn count(&self) -> usize {
            self.payloads.lock().unwrap().len()
        }

        fn decoded(&self) -> Vec<WirePose> {
            self.payloads
                .lock()
                .unwrap()
                .iter()
                .map(|p| codec::deserialize(p).unwrap())
                .collect()
        }
    }

    impl Dispatcher for RecordingDispatcher {
        fn dispatch(&self, payload: Vec<u8>) {
            self.payloads.lock().unwrap().push(payload);
        }
    }

    struct Harness {
        controller: StreamController,
        sink: Arc<RecordingDispatcher>,
        clock: Arc<ManualClock>,
    }

    fn harness() -> Harness {
        let sink = Arc::new(RecordingDispatcher::default());
        let clock = Arc::new(ManualClock::new());
        let controller = StreamController::new(
            sink.clone(),
            clock.clone(),
            Arc::new(StreamStats::new()),
        );
        Harness {
            controller,
            sink,
            clock,
        }
    }

    fn spin_sample(i: u64) -> PoseSample {
        let angle = i as f64 * 0.01;
        let q = Quaternion::from_axis_angle([0.0, 0.0, 1.0], angle).unwrap();
        PoseSample::new(1718000000.0 + i as f64 / 60.0, q).unwrap()
    }

    /// 60 Hz capture period, rounded up so that every second frame clears
    /// the 1/30 s gate.
    const FRAME: Duration = Duration::from_nanos(16_666_667);

    #[test]
    fn publisher_tracks_every_event_while_idle() {
        let mut h = harness();
        let reader = h.controller.reader();
        for i in 0..10 {
            let s = spin_sample(i);
            h.controller.on_capture(s);
            assert_eq!(reader.snapshot(), Some(s));
            assert_eq!(reader.update_count(), i + 1);
            h.clock.advance(FRAME);
        }
        assert_eq!(h.sink.count(), 0);
        assert_eq!(h.controller.state(), StreamState::Idle);
    }

    #[test]
    fn publisher_tracks_every_event_while_streaming() {
        let mut h = harness();
        let reader = h.controller.reader();
        h.controller.toggle().enable();
        for i in 0..10 {
            let s = spin_sample(i);
            h.controller.on_capture(s);
            assert_eq!(reader.snapshot(), Some(s));
            h.clock.advance(Duration::from_millis(1));
        }
        assert_eq!(reader.update_count(), 10);
        assert_eq!(h.sink.count(), 1);
    }

    #[test]
    fn one_second_at_sixty_hertz_sends_about_thirty() {
        let mut h = harness();
        let reader = h.controller.reader();
        h.controller.toggle().enable();

        for i in 0..60 {
            h.controller.on_capture(spin_sample(i));
            h.clock.advance(FRAME);
        }

        assert_eq!(reader.update_count(), 60);
        let sent = h.sink.count();
        assert!((29..=31).contains(&sent), "sent {sent}");
        let stats = h.controller.stats().snapshot();
        assert_eq!(stats.captured, 60);
        assert_eq!(stats.admitted as usize, sent);
    }

    #[test]
    fn state_change_is_observed_on_next_event() {
        let mut h = harness();
        let toggle = h.controller.toggle();

        toggle.enable();
        assert_eq!(h.controller.state(), StreamState::Idle);
        h.controller.on_capture(spin_sample(0));
        assert_eq!(h.controller.state(), StreamState::Streaming);

        toggle.disable();
        assert_eq!(h.controller.state(), StreamState::Streaming);
        h.clock.advance(FRAME);
        h.controller.on_capture(spin_sample(1));
        assert_eq!(h.controller.state(), StreamState::Idle);
    }

    #[test]
    fn disabling_stops_new_sends_but_keeps_issued_ones() {
        let mut h = harness();
        let toggle = h.controller.toggle();
        toggle.enable();

        for i in 0..6 {
            h.controller.on_capture(spin_sample(i));
            h.clock.advance(FRAME);
        }
        let before = h.sink.count();
        assert_eq!(before, 3);

        toggle.disable();
        for i in 6..30 {
            h.controller.on_capture(spin_sample(i));
            h.clock.advance(FRAME);
        }
        assert_eq!(h.sink.count(), before);
        assert_eq!(h.controller.reader().update_count(), 30);
    }

    #[test]
    fn dispatched_payloads_carry_the_admitted_samples() {
        let mut h = harness();
        h.controller.toggle().enable();
        let first = spin_sample(0);
        let skipped = spin_sample(1);
        let third = spin_sample(2);

        h.controller.on_capture(first);
        h.clock.advance(FRAME);
        h.controller.on_capture(skipped);
        h.clock.advance(FRAME);
        h.controller.on_capture(third);

        let sent = h.sink.decoded();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].quaternion, first.orientation());
        assert_eq!(sent[1].quaternion, third.orientation());
    }

    #[test]
    fn custom_interval_and_shared_toggle() {
        let sink = Arc::new(RecordingDispatcher::default());
        let clock = Arc::new(ManualClock::new());
        let toggle = StreamToggle::new(true);
        let mut controller =
            StreamController::new(sink.clone(), clock.clone(), Arc::new(StreamStats::new()))
                .with_min_interval(Duration::from_millis(100))
                .with_toggle(toggle.clone());

        for _ in 0..50 {
            controller.on_capture(spin_sample(0));
            clock.advance(Duration::from_millis(10));
        }
        // Admissions at 0, 100, 200, 300, 400 ms.
        assert_eq!(sink.count(), 5);
        assert!(toggle.is_enabled());
    }

    #[test]
    fn clock_going_backwards_does_not_break_stream() {
        let mut h = harness();
        h.controller.toggle().enable();

        h.clock.set(Duration::from_secs(10));
        h.controller.on_capture(spin_sample(0));
        h.clock.set(Duration::from_secs(9));
        h.controller.on_capture(spin_sample(1));
        h.clock.set(Duration::from_secs(11));
        h.controller.on_capture(spin_sample(2));

        assert_eq!(h.sink.count(), 2);
        assert_eq!(h.controller.reader().update_count(), 3);
    }

    #[test]
    fn capture_from_producer_thread_while_display_reads() {
        let h = harness();
        let reader = h.controller.reader();
        let mut controller = h.controller;
        controller.toggle().enable();
        let clock = h.clock.clone();

        let producer = std::thread::spawn(move || {
            for i in 0..600 {
                controller.on_capture(spin_sample(i));
                clock.advance(FRAME);
            }
            controller
        });

        while !producer.is_finished() {
            if let Some(s) = reader.snapshot() {
                assert!((s.orientation().norm() - 1.0).abs() < 1e-9);
            }
        }
        let controller = producer.join().expect("producer panicked");
        assert_eq!(reader.update_count(), 600);
        assert_eq!(controller.stats().snapshot().admitted as usize, h.sink.count());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn failed_send_does_not_block_the_next_one() {
        let stats = Arc::new(StreamStats::new());
        let dead = HttpDispatcher::with_client(
            parse_endpoint("http://127.0.0.1:1/pose").unwrap(),
            direct_client(),
            Handle::current(),
            None,
            Arc::clone(&stats),
        );
        let clock = Arc::new(ManualClock::new());
        let mut controller =
            StreamController::new(Arc::new(dead), clock.clone(), Arc::clone(&stats));
        controller.toggle().enable();

        controller.on_capture(spin_sample(0));
        clock.advance(Duration::from_millis(50));
        controller.on_capture(spin_sample(1));

        let snap = stats.snapshot();
        assert_eq!(snap.admitted, 2);
        assert_eq!(snap.dispatched, 2);

        for _ in 0..200 {
            if stats.snapshot().failed == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(stats.snapshot().failed, 2);
        assert_eq!(controller.reader().update_count(), 2);
    }

    /// On a current-thread runtime the spawned send cannot start before the
    /// test awaits, so it is still in flight when streaming is switched off.
    #[tokio::test]
    async fn disabling_keeps_in_flight_send_alive() {
        let (endpoint, mut requests) = spawn_stub_endpoint().await;
        let stats = Arc::new(StreamStats::new());
        let dispatcher = HttpDispatcher::with_client(
            parse_endpoint(&endpoint).unwrap(),
            direct_client(),
            Handle::current(),
            None,
            Arc::clone(&stats),
        );
        let clock = Arc::new(ManualClock::new());
        let mut controller =
            StreamController::new(Arc::new(dispatcher), clock.clone(), Arc::clone(&stats));
        let toggle = controller.toggle();

        toggle.enable();
        controller.on_capture(spin_sample(0));
        toggle.disable();
        clock.advance(Duration::from_millis(100));
        controller.on_capture(spin_sample(1));

        let snap = stats.snapshot();
        assert_eq!(snap.dispatched, 1);
        assert_eq!(snap.in_flight(), 1);
        assert_eq!(controller.state(), StreamState::Idle);

        let raw = tokio::time::timeout(Duration::from_secs(5), requests.recv())
            .await
            .expect("issued send must still reach the endpoint")
            .expect("stub alive");
        assert!(raw.starts_with("POST "));

        for _ in 0..200 {
            if stats.snapshot().delivered == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let snap = stats.snapshot();
        assert_eq!(snap.delivered, 1);
        assert_eq!(snap.dispatched, 1);

        // Nothing further was sent after the toggle went off.
        let extra = tokio::time::timeout(Duration::from_millis(100), requests.recv()).await;
        assert!(extra.is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn streams_to_live_endpoint() {
        let (endpoint, mut requests) = spawn_stub_endpoint().await;
        let stats = Arc::new(StreamStats::new());
        let dispatcher = HttpDispatcher::with_client(
            parse_endpoint(&endpoint).unwrap(),
            direct_client(),
            Handle::current(),
            None,
            Arc::clone(&stats),
        );
        let clock = Arc::new(ManualClock::new());
        let mut controller =
            StreamController::new(Arc::new(dispatcher), clock.clone(), Arc::clone(&stats));
        controller.toggle().enable();

        for i in 0..6 {
            controller.on_capture(spin_sample(i));
            clock.advance(FRAME);
        }

        let mut received = 0;
        while received < 3 {
            tokio::time::timeout(Duration::from_secs(5), requests.recv())
                .await
                .expect("request must arrive")
                .expect("stub alive");
            received += 1;
        }
        assert_eq!(stats.snapshot().dispatched, 3);
    }
}
