//! Structured logging.
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - JSON format for production, pretty format for development
//! - `RUST_LOG` overrides the configured level; quiet mode silences everything

use tracing_subscriber::{filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, ObservabilityConfig};

/// Build the filter for the given configuration.
pub fn env_filter(config: &ObservabilityConfig) -> EnvFilter {
    if config.quiet {
        return EnvFilter::default().add_directive(LevelFilter::OFF.into());
    }

    let level = if config.verbose { "debug" } else { config.log_level.as_str() };
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("http_log={level},tower_http={level}").into())
}

/// Initialize the global tracing subscriber.
pub fn init(config: &ObservabilityConfig) {
    let filter = env_filter(config);

    let result = match config.log_format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init(),
    };

    if let Err(e) = result {
        eprintln!("tracing subscriber already installed: {e}");
    }
}
