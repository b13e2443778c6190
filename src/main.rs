//! http-log
//!
//! Captures every request sent to one listener and republishes it to a
//! structured log and to any number of websocket viewers.
//!
//! ```text
//!     HTTP client ──▶ capture listener ──▶ Group::publish
//!                                            │
//!                      ┌─────────────────────┼─────────────────────┐
//!                      ▼                     ▼                     ▼
//!                log consumer        ws session (viewer 1)   ws session (viewer N)
//!                (tracing sink)      stream listener         stream listener
//! ```

use std::process::ExitCode;
use clap::Parser;

use http_log::config::Cli;
use http_log::lifecycle::{signals, App, Shutdown};
use http_log::observability::{logging, TracingSink};

#[tokio::main]
async fn main() -> ExitCode {
    let config = match Cli::parse().into_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::from(2);
        }
    };

    logging::init(&config.observability);
    tracing::info!("http-log v{} starting", env!("CARGO_PKG_VERSION"));

    let app = match App::bind(config).await {
        Ok(app) => app,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            return ExitCode::from(1);
        }
    };

    let shutdown = Shutdown::new();
    let running = match app.start(&shutdown, TracingSink) {
        Ok(running) => running,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            return ExitCode::from(1);
        }
    };

    if let Err(e) = signals::wait_for_termination().await {
        tracing::error!(error = %e, "Failed to listen for termination signals");
    }
    shutdown.trigger();

    let summary = running.wait().await;
    for report in &summary.reports {
        if report.is_clean() {
            tracing::info!(listener = report.listener, elapsed_ms = report.elapsed_ms, "Listener stopped");
        } else {
            tracing::warn!(listener = report.listener, outcome = ?report.outcome, "Listener stopped after timeout");
        }
    }
    tracing::info!(records = summary.records_logged, "Shutdown complete");
    ExitCode::SUCCESS
}
