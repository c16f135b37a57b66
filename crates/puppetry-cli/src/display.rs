//! Pose display consumer.
//!
//! Reads the latest-value publisher from its own thread at a modest rate,
//! independently of the capture cadence.  Output is only printed while the
//! live view is switched on (`/watch` in the REPL).

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use colored::Colorize;
use puppetry_stream::PoseReader;

/// Text card for the current pose, or a placeholder before the first one.
pub fn render(reader: &PoseReader) -> String {
    match reader.latest() {
        None => "waiting for first pose…".to_string(),
        Some(p) => format!("pose #{}\n{}", p.sequence, p.sample),
    }
}

/// Start the display thread.
pub fn spawn(
    reader: PoseReader,
    period: Duration,
    live: Arc<AtomicBool>,
    shutdown: Arc<AtomicBool>,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("pose-display".to_string())
        .spawn(move || {
            let mut last_shown = 0;
            while !shutdown.load(Ordering::SeqCst) {
                thread::sleep(period);
                if !live.load(Ordering::Relaxed) {
                    continue;
                }
                let seq = reader.update_count();
                if seq != last_shown {
                    last_shown = seq;
                    println!("\n{}", render(&reader).dimmed());
                }
            }
        })
}
