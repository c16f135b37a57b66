//! REPL – interactive control of the pose stream.
//!
//! Supported slash-commands:
//!   /start        – begin streaming poses to the endpoint
//!   /stop         – stop streaming (in-flight sends still complete)
//!   /status       – stream state and counters
//!   /pose         – print the latest pose
//!   /watch        – toggle the live pose display
//!   /endpoint     – show where poses are sent
//!   /help         – show this list
//!   /quit | /exit – leave

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use colored::Colorize;
use puppetry_stream::{PoseReader, StreamStats, StreamToggle};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::warn;

use crate::display;

/// A parsed REPL line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Stop,
    Status,
    Pose,
    Watch,
    Endpoint,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

impl Command {
    pub fn parse(line: &str) -> Self {
        match line.trim() {
            "" => Command::Empty,
            "/start" => Command::Start,
            "/stop" => Command::Stop,
            "/status" => Command::Status,
            "/pose" => Command::Pose,
            "/watch" => Command::Watch,
            "/endpoint" => Command::Endpoint,
            "/help" => Command::Help,
            "/quit" | "/exit" => Command::Quit,
            other => Command::Unknown(other.to_string()),
        }
    }
}

/// Handles the REPL needs to act on the running pipeline.
pub struct Session {
    pub toggle: StreamToggle,
    pub reader: PoseReader,
    pub stats: Arc<StreamStats>,
    pub endpoint: String,
    pub live: Arc<AtomicBool>,
}

/// Entry point for the interactive REPL.
///
/// Returns when the user quits, input ends, or `shutdown` is set.
pub fn run(session: &Session, shutdown: Arc<AtomicBool>) {
    let mut editor = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(e) => {
            warn!(error = %e, "line editor unavailable; REPL disabled");
            return;
        }
    };
    let prompt = format!("{} ", "puppet>".bold().cyan());

    while !shutdown.load(Ordering::SeqCst) {
        let line = match editor.readline(&prompt) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("{}: {}", "Read error".red(), e);
                break;
            }
        };
        let _ = editor.add_history_entry(line.as_str());

        match Command::parse(&line) {
            Command::Empty => {}
            Command::Quit => break,
            cmd => execute(session, cmd),
        }
    }
    println!("{}", "Goodbye.".green());
    shutdown.store(true, Ordering::SeqCst);
}

fn execute(session: &Session, cmd: Command) {
    match cmd {
        Command::Start => {
            session.toggle.enable();
            println!("{} streaming to {}", "●".red().bold(), session.endpoint.bold());
        }
        Command::Stop => {
            session.toggle.disable();
            println!("{} streaming stopped", "■".yellow().bold());
        }
        Command::Status => print_status(session),
        Command::Pose => println!("{}", display::render(&session.reader)),
        Command::Watch => {
            let now_live = !session.live.fetch_xor(true, Ordering::Relaxed);
            println!("live display {}", if now_live { "on".green() } else { "off".dimmed() });
        }
        Command::Endpoint => println!("  {}", session.endpoint.bold()),
        Command::Help => print_help(),
        Command::Unknown(other) => println!(
            "{} '{}'. Type {} for available commands.",
            "Unknown command:".red(),
            other.yellow(),
            "/help".bold()
        ),
        Command::Empty | Command::Quit => {}
    }
}

fn print_status(session: &Session) {
    let s = session.stats.snapshot();
    let state = if session.toggle.is_enabled() {
        "streaming".green().bold()
    } else {
        "idle".dimmed()
    };
    println!();
    println!("  State      : {}", state);
    println!("  Endpoint   : {}", session.endpoint);
    println!("  Captured   : {}", s.captured);
    println!("  Admitted   : {}", s.admitted);
    println!("  Dispatched : {}", s.dispatched);
    println!("  Delivered  : {}", s.delivered);
    println!("  Failed     : {}", s.failed);
    println!("  Dropped    : {}", s.dropped);
    println!("  In flight  : {}", s.in_flight());
    println!();
}

fn print_help() {
    println!();
    println!("{}", "Puppetry Commands".bold().underline());
    println!("  {}     – begin streaming poses", "/start".bold().cyan());
    println!("  {}      – stop streaming", "/stop".bold().cyan());
    println!("  {}    – stream state and counters", "/status".bold().cyan());
    println!("  {}      – print the latest pose", "/pose".bold().cyan());
    println!("  {}     – toggle the live pose display", "/watch".bold().cyan());
    println!("  {}  – show the target endpoint", "/endpoint".bold().cyan());
    println!("  {} – exit", "/quit  /exit".bold().cyan());
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use puppetry_stream::LatestPose;

    fn session() -> (Session, LatestPose) {
        let latest = LatestPose::new();
        let session = Session {
            toggle: StreamToggle::default(),
            reader: latest.reader(),
            stats: Arc::new(StreamStats::new()),
            endpoint: "http://127.0.0.1:5001/puppetry/pose".to_string(),
            live: Arc::new(AtomicBool::new(false)),
        };
        (session, latest)
    }

    #[test]
    fn parses_known_commands() {
        assert_eq!(Command::parse("/start"), Command::Start);
        assert_eq!(Command::parse("  /stop  "), Command::Stop);
        assert_eq!(Command::parse("/exit"), Command::Quit);
        assert_eq!(Command::parse("/quit"), Command::Quit);
        assert_eq!(Command::parse(""), Command::Empty);
    }

    #[test]
    fn unknown_command_keeps_text() {
        assert_eq!(
            Command::parse("/record"),
            Command::Unknown("/record".to_string())
        );
    }

    #[test]
    fn start_and_stop_flip_the_toggle() {
        let (session, _latest) = session();
        execute(&session, Command::Start);
        assert!(session.toggle.is_enabled());
        execute(&session, Command::Stop);
        assert!(!session.toggle.is_enabled());
    }

    #[test]
    fn watch_toggles_live_display() {
        let (session, _latest) = session();
        execute(&session, Command::Watch);
        assert!(session.live.load(Ordering::Relaxed));
        execute(&session, Command::Watch);
        assert!(!session.live.load(Ordering::Relaxed));
    }
}
