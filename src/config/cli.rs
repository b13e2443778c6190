//! Command-line flags.

use std::path::PathBuf;
use clap::Parser;

use crate::config::loader::{read_config, ConfigError};
use crate::config::schema::HttpLogConfig;
use crate::config::validation::validate_config;

#[derive(Debug, Parser)]
#[command(name = "http-log")]
#[command(about = "Capture HTTP requests and stream them to log and websocket viewers", long_about = None)]
pub struct Cli {
    /// TOML configuration file; flags override its values
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Capture listener address and port
    #[arg(long = "http-bind")]
    pub http_bind: Option<String>,

    /// Websocket listener address and port
    #[arg(long = "ws-bind")]
    pub ws_bind: Option<String>,

    /// Disable log output
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Debug-level log output
    #[arg(short, long)]
    pub verbose: bool,

    /// Enable diagnostic endpoints on the websocket listener
    #[arg(long)]
    pub debug: bool,

    /// Per-listener drain timeout in seconds
    #[arg(long = "shutdown-timeout")]
    pub shutdown_timeout: Option<u64>,

    /// Records buffered per viewer before new ones are dropped
    #[arg(long = "queue-capacity")]
    pub queue_capacity: Option<usize>,
}

impl Cli {
    /// Resolve the final configuration: file (or defaults), then flags, then validation.
    pub fn into_config(self) -> Result<HttpLogConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => read_config(path)?,
            None => HttpLogConfig::default(),
        };

        if let Some(bind) = self.http_bind {
            config.capture.bind_address = bind;
        }
        if let Some(bind) = self.ws_bind {
            config.stream.bind_address = bind;
        }
        if self.quiet {
            config.observability.quiet = true;
        }
        if self.verbose {
            config.observability.verbose = true;
        }
        if self.debug {
            config.observability.debug_endpoints = true;
        }
        if let Some(secs) = self.shutdown_timeout {
            config.shutdown.timeout_secs = secs;
        }
        if let Some(capacity) = self.queue_capacity {
            config.broadcast.queue_capacity = capacity;
        }

        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}
