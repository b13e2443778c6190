//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::multicast::DEFAULT_QUEUE_CAPACITY;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct HttpLogConfig {
    /// Capture listener (any method, any path).
    pub capture: CaptureConfig,

    /// Websocket stream listener.
    pub stream: StreamConfig,

    /// Fan-out settings.
    pub broadcast: BroadcastConfig,

    /// Graceful shutdown settings.
    pub shutdown: ShutdownConfig,

    /// Logging and diagnostics.
    pub observability: ObservabilityConfig,
}

/// Capture listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Bind address (e.g., "0.0.0.0:8080" or ":8080").
    pub bind_address: String,

    /// Maximum concurrent connections.
    pub max_connections: usize,

    /// Largest request body that is captured.
    pub max_body_bytes: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_connections: 10_000,
            max_body_bytes: 16 * 1024 * 1024,
        }
    }
}

/// Stream listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Bind address (e.g., "0.0.0.0:8081" or ":8081").
    pub bind_address: String,

    /// Websocket upgrade path.
    pub path: String,

    /// Maximum concurrent connections.
    pub max_connections: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8081".to_string(),
            path: "/http-debug".to_string(),
            max_connections: 1_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BroadcastConfig {
    /// Records buffered per member before new ones are dropped.
    pub queue_capacity: usize,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// Drain timeout per listener in seconds.
    pub timeout_secs: u64,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self { timeout_secs: 5 }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Disable all log output.
    pub quiet: bool,

    /// Lower the default level to debug.
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Serve `/debug/stats` and `/debug/metrics` on the stream listener.
    pub debug_endpoints: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            quiet: false,
            verbose: false,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            debug_endpoints: false,
        }
    }
}
