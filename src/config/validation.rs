//! Configuration validation.
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: HttpLogConfig → Result<(), Vec<ValidationError>>
//! - Runs before any listener is bound

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::HttpLogConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: invalid bind address {value:?}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("capture and stream bind addresses conflict ({capture} vs {stream})")]
    AddressConflict { capture: SocketAddr, stream: SocketAddr },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("stream.path must start with '/', got {0:?}")]
    InvalidPath(String),
}

/// Render a list of errors on one line.
pub fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse a bind address, accepting the `:port` shorthand for all interfaces.
pub fn parse_bind_address(value: &str) -> Option<SocketAddr> {
    let value = value.trim();
    if let Some(port) = value.strip_prefix(':') {
        return format!("0.0.0.0:{port}").parse().ok();
    }
    value.parse().ok()
}

/// Two listeners cannot share a fixed port on overlapping interfaces.
fn conflicts(a: SocketAddr, b: SocketAddr) -> bool {
    a.port() != 0
        && a.port() == b.port()
        && (a.ip() == b.ip() || a.ip().is_unspecified() || b.ip().is_unspecified())
}

pub fn validate_config(config: &HttpLogConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let capture = parse_bind_address(&config.capture.bind_address);
    if capture.is_none() {
        errors.push(ValidationError::InvalidAddress {
            field: "capture.bind_address",
            value: config.capture.bind_address.clone(),
        });
    }
    let stream = parse_bind_address(&config.stream.bind_address);
    if stream.is_none() {
        errors.push(ValidationError::InvalidAddress {
            field: "stream.bind_address",
            value: config.stream.bind_address.clone(),
        });
    }
    if let (Some(capture), Some(stream)) = (capture, stream) {
        if conflicts(capture, stream) {
            errors.push(ValidationError::AddressConflict { capture, stream });
        }
    }

    if config.capture.max_connections == 0 {
        errors.push(ValidationError::Zero("capture.max_connections"));
    }
    if config.stream.max_connections == 0 {
        errors.push(ValidationError::Zero("stream.max_connections"));
    }
    if config.broadcast.queue_capacity == 0 {
        errors.push(ValidationError::Zero("broadcast.queue_capacity"));
    }
    if config.shutdown.timeout_secs == 0 {
        errors.push(ValidationError::Zero("shutdown.timeout_secs"));
    }
    if !config.stream.path.starts_with('/') {
        errors.push(ValidationError::InvalidPath(config.stream.path.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
