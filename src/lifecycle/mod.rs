//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validate config → Bind listeners → Start log consumer → Serve
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Drain connections → Close group → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then listeners, then traffic
//! - Each listener drains independently with its own timeout
//! - A drain timeout is reported, never fatal

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::{DrainOutcome, DrainReport, ListenerState, Shutdown};
pub use startup::{App, RunningApp, ShutdownSummary, StartupError};
