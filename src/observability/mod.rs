//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges)
//!
//! Captured requests:
//!     → request_log.rs (log consumer, one structured event per record)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON or pretty) for machine and human parsing
//! - Metrics are cheap and only exported when diagnostics are enabled

pub mod logging;
pub mod metrics;
pub mod request_log;

pub use request_log::{LogConsumer, MemorySink, RecordSink, TracingSink};
