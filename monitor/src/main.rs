//! Slaintrack Monitor - game log tailer and kill reporter.
//!
//! # Commands
//!
//! - `slaintrack-monitor run`: Watch the configured log and report events
//! - `slaintrack-monitor parse-line <LINE>`: Show how a single line parses
//!
//! # Environment Variables
//!
//! See the [`config`](slaintrack_monitor::config) module for available
//! configuration options.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::signal;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use slaintrack_monitor::config::Config;
use slaintrack_monitor::parser::parse_line;
use slaintrack_monitor::session::Tracker;
use slaintrack_monitor::status::ConnectionState;

/// Slaintrack Monitor - game log tailer and kill reporter.
///
/// Tails a game log file and forwards NPC kills and scheduled-event
/// announcements to the Slaintrack collector.
#[derive(Parser, Debug)]
#[command(name = "slaintrack-monitor")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "\
ENVIRONMENT VARIABLES:
    SLAINTRACK_SERVER_URL             Collector URL (required for 'run')
    SLAINTRACK_API_KEY                Collector API key (required for 'run')
    SLAINTRACK_LOG_PATH               Game log file (required for 'run')
    SLAINTRACK_POLL_INTERVAL_MS       Polling cadence (default: 1000)
    SLAINTRACK_CORRELATION_WINDOW_MS  PVP correlation window (default: 2000)
    SLAINTRACK_EVENT_TIMEZONE         Scheduled-event timezone (default: -05:00)

EXAMPLES:
    # Start the monitor
    export SLAINTRACK_SERVER_URL=https://slaintrack.example.com
    export SLAINTRACK_API_KEY=...
    export SLAINTRACK_LOG_PATH=~/EverQuest/Logs/eqlog_Aaeldar_pq.proj.txt
    slaintrack-monitor run

    # Check how a line is parsed
    slaintrack-monitor parse-line \"You have slain a decaying skeleton.\"
")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

/// CLI subcommands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Watch the configured log and report events until interrupted.
    Run,

    /// Parse a single log line and print the result as JSON.
    ParseLine {
        /// The log line to parse.
        line: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::ParseLine { line } => run_parse_line(&line),
        Command::Run => {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("Failed to create tokio runtime")?;

            runtime.block_on(run_monitor())
        }
    }
}

/// Prints the parse result for one line.
fn run_parse_line(line: &str) -> Result<()> {
    let parsed = parse_line(line);
    let json = serde_json::to_string_pretty(&parsed).context("Failed to serialize result")?;
    println!("{json}");
    Ok(())
}

/// Runs the monitor until Ctrl+C or SIGTERM.
async fn run_monitor() -> Result<()> {
    init_logging();

    info!("Starting Slaintrack Monitor");

    let config = Config::from_env().context("Failed to load configuration")?;

    info!(
        server_url = %config.base_url(),
        log_path = %config.log_path.display(),
        poll_ms = config.poll_interval.as_millis(),
        window_ms = config.correlation_window.as_millis(),
        "Configuration loaded"
    );

    let mut tracker = Tracker::new();
    spawn_console(&tracker);

    let state = tracker.start_watching(config).await;
    if state != ConnectionState::Connected {
        bail!("Failed to start watching: {state}");
    }

    info!("Monitor running. Press Ctrl+C to stop.");
    wait_for_shutdown().await;

    info!("Shutting down...");
    tracker.stop_watching().await;
    info!("Monitor stopped");
    Ok(())
}

/// Prints connection status changes and debug-console messages to stdout.
fn spawn_console(tracker: &Tracker) {
    let mut status_rx = tracker.status().subscribe();
    tokio::spawn(async move {
        while status_rx.changed().await.is_ok() {
            let state = *status_rx.borrow_and_update();
            println!("[status] {state}");
        }
    });

    let mut debug_rx = tracker.debug_log().subscribe();
    tokio::spawn(async move {
        loop {
            match debug_rx.recv().await {
                Ok(msg) => {
                    println!("[{}] {} {}", msg.severity, msg.at.format("%H:%M:%S"), msg.message);
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Debug feed lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });
}

/// Initializes the logging subsystem.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .init();
}

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
