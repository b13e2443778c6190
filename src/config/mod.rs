//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → cli.rs (flag overrides)
//!     → validation.rs (semantic checks)
//!     → HttpLogConfig (validated, immutable)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod cli;
pub mod loader;
pub mod schema;
pub mod validation;

pub use cli::Cli;
pub use loader::ConfigError;
pub use schema::{
    BroadcastConfig, CaptureConfig, HttpLogConfig, LogFormat, ObservabilityConfig, ShutdownConfig,
    StreamConfig,
};
pub use validation::{parse_bind_address, ValidationError};
