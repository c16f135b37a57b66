//! Synthetic tracking source.
//!
//! Stands in for a real motion tracker: a dedicated thread produces a pose
//! spinning about one axis at a fixed frame rate and feeds every frame to
//! the [`StreamController`] on that same thread.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use puppetry_stream::StreamController;
use puppetry_types::{PoseSample, Quaternion};
use tracing::{info, warn};

use crate::config::{Config, SpinAxis};

/// Constant-rate rotation about a fixed axis.
#[derive(Debug, Clone, Copy)]
pub struct SpinSource {
    axis: SpinAxis,
    period: Duration,
    frame: Duration,
}

impl SpinSource {
    pub fn new(axis: SpinAxis, period: Duration, frame: Duration) -> Self {
        Self {
            axis,
            period,
            frame,
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(cfg.spin_axis, cfg.spin_period(), cfg.capture_period())
    }

    /// Orientation `elapsed` after the source started.
    pub fn orientation_at(&self, elapsed: Duration) -> Quaternion {
        let turns = (elapsed.as_secs_f64() / self.period.as_secs_f64()).fract();
        Quaternion::from_axis_angle(self.axis.unit(), std::f64::consts::TAU * turns)
            .unwrap_or_default()
    }

    /// Run the source on its own thread until `shutdown` is set.
    ///
    /// The controller is handed back through the join handle.
    pub fn spawn(
        self,
        mut controller: StreamController,
        shutdown: Arc<AtomicBool>,
    ) -> std::io::Result<JoinHandle<StreamController>> {
        thread::Builder::new()
            .name("pose-source".to_string())
            .spawn(move || {
                info!(
                    axis = %self.axis,
                    frame_ms = self.frame.as_secs_f64() * 1000.0,
                    "synthetic pose source running"
                );
                let started = Instant::now();
                let mut next_frame = started;

                while !shutdown.load(Ordering::SeqCst) {
                    match PoseSample::now(self.orientation_at(started.elapsed())) {
                        Ok(sample) => controller.on_capture(sample),
                        Err(e) => warn!(error = %e, "discarding malformed frame"),
                    }

                    next_frame += self.frame;
                    let now = Instant::now();
                    if next_frame > now {
                        thread::sleep(next_frame - now);
                    } else {
                        // Fell behind; resume cadence from here instead of bursting.
                        next_frame = now;
                    }
                }
                info!("synthetic pose source stopped");
                controller
            })
    }
}
