//! `puppet` – pose streaming console.
//!
//! 1. Loads `~/.puppetry/config.toml`, writing the defaults on first run.
//! 2. Starts a Tokio runtime for the network side only.
//! 3. Runs the synthetic tracking source on its own thread, feeding a
//!    [`StreamController`] per frame.
//! 4. Drops into a REPL whose `/start` and `/stop` flip streaming.
//! 5. Ctrl-C or `/quit` stops the source; in-flight sends get a short grace
//!    period before the runtime is torn down.

mod config;
mod display;
mod repl;
mod source;

use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use colored::Colorize;
use puppetry_stream::{
    HttpDispatcher, MonotonicClock, StreamController, StreamStats, StreamToggle,
};
use tracing::{info, warn};

use crate::config::Config;
use crate::source::SpinSource;

/// Time allowed for in-flight sends to finish at exit.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

fn main() -> ExitCode {
    let _tracing = puppetry_stream::init_tracing("puppet");
    print_banner();

    let cfg = load_config();
    if let Err(e) = cfg.validate() {
        eprintln!("{}: {}", "Invalid configuration".red(), e);
        return ExitCode::FAILURE;
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("puppet-net")
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("{}: {}", "Failed to start network runtime".red(), e);
            return ExitCode::FAILURE;
        }
    };

    let stats = Arc::new(StreamStats::new());
    let dispatcher = match HttpDispatcher::new(
        &cfg.endpoint,
        runtime.handle().clone(),
        cfg.transport_options(),
        Arc::clone(&stats),
    ) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("{}: {}", "Transport error".red(), e);
            return ExitCode::FAILURE;
        }
    };

    let controller = StreamController::new(
        Arc::new(dispatcher),
        Arc::new(MonotonicClock::new()),
        Arc::clone(&stats),
    )
    .with_min_interval(cfg.min_interval())
    .with_toggle(StreamToggle::new(cfg.stream_on_start));

    let session = repl::Session {
        toggle: controller.toggle(),
        reader: controller.reader(),
        stats: Arc::clone(&stats),
        endpoint: cfg.endpoint.clone(),
        live: Arc::new(AtomicBool::new(false)),
    };

    // ── Shutdown ───────────────────────────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_ctrlc = Arc::clone(&shutdown);
    if let Err(e) = ctrlc::set_handler(move || {
        shutdown_ctrlc.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "failed to install Ctrl-C handler");
    }

    // ── Producer + consumer threads ────────────────────────────────────────
    let source = match SpinSource::from_config(&cfg).spawn(controller, Arc::clone(&shutdown)) {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("{}: {}", "Failed to start pose source".red(), e);
            return ExitCode::FAILURE;
        }
    };
    let display = display::spawn(
        session.reader.clone(),
        cfg.display_period(),
        Arc::clone(&session.live),
        Arc::clone(&shutdown),
    );
    if let Err(ref e) = display {
        warn!(error = %e, "live display unavailable");
    }

    println!(
        "  Streaming target {}  ({})",
        cfg.endpoint.bold(),
        if cfg.stream_on_start { "on".green() } else { "off – type /start".dimmed() }
    );
    println!("  Type {} for a list of commands.\n", "/help".bold().cyan());

    repl::run(&session, Arc::clone(&shutdown));

    shutdown.store(true, Ordering::SeqCst);
    if source.join().is_err() {
        warn!("pose source thread panicked");
    }
    if let Ok(handle) = display
        && handle.join().is_err()
    {
        warn!("display thread panicked");
    }

    let s = stats.snapshot();
    info!(
        captured = s.captured,
        dispatched = s.dispatched,
        delivered = s.delivered,
        failed = s.failed,
        dropped = s.dropped,
        "session finished"
    );
    runtime.shutdown_timeout(SHUTDOWN_GRACE);
    ExitCode::SUCCESS
}

/// Load the config, writing defaults on first run.  Errors fall back to the
/// defaults.
fn load_config() -> Config {
    match config::load() {
        Ok(Some(cfg)) => {
            println!(
                "  Config loaded from {}",
                config::config_path().display().to_string().bold()
            );
            cfg
        }
        Ok(None) => {
            let mut cfg = Config::default();
            match config::save(&cfg) {
                Ok(()) => println!(
                    "  {} Default config written to {}",
                    "✓".green().bold(),
                    config::config_path().display().to_string().bold()
                ),
                Err(e) => println!("{}: {}", "Error saving config".red(), e),
            }
            config::apply_env_overrides(&mut cfg);
            cfg
        }
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
            let mut cfg = Config::default();
            config::apply_env_overrides(&mut cfg);
            cfg
        }
    }
}

fn print_banner() {
    println!();
    println!("  {} {}",
        "Puppetry".bold().cyan(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  6DOF pose streamer");
    println!();
}
