//! HTTP request capture with broadcast fan-out.

pub mod admin;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod multicast;
pub mod net;
pub mod observability;

pub use config::HttpLogConfig;
pub use http::Record;
pub use lifecycle::{App, Shutdown};
pub use multicast::{Group, Member};
