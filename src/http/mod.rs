//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (hyper connection, drain on shutdown)
//!     → capture.rs (read body, build Record, publish)     [capture listener]
//!     → websocket.rs (upgrade, one member per session)    [stream listener]
//! ```

pub mod capture;
pub mod request;
pub mod server;
pub mod websocket;

pub use request::Record;
pub use server::ManagedServer;
