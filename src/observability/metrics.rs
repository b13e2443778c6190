//! Metrics collection and exposition.
//!
//! # Metrics
//! - `http_log_records_published_total` (counter): records handed to the group
//! - `http_log_records_dropped_total` (counter): per-member deliveries skipped on a full queue
//! - `http_log_stream_sessions_total` (counter): websocket sessions opened
//! - `http_log_group_members` (gauge): currently joined members
//!
//! Updates are no-ops until a recorder is installed. The Prometheus recorder
//! is only installed when diagnostic endpoints are enabled.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub const RECORDS_PUBLISHED: &str = "http_log_records_published_total";
pub const RECORDS_DROPPED: &str = "http_log_records_dropped_total";
pub const STREAM_SESSIONS: &str = "http_log_stream_sessions_total";
pub const GROUP_MEMBERS: &str = "http_log_group_members";

/// Install the global Prometheus recorder.
///
/// Returns `None` when a recorder is already installed.
pub fn init_prometheus() -> Option<PrometheusHandle> {
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            tracing::info!("Prometheus recorder installed");
            Some(handle)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to install Prometheus recorder");
            None
        }
    }
}

/// Record one publish pass.
pub fn record_published(dropped: u64) {
    metrics::counter!(RECORDS_PUBLISHED).increment(1);
    if dropped > 0 {
        metrics::counter!(RECORDS_DROPPED).increment(dropped);
    }
}

pub fn set_group_members(count: usize) {
    metrics::gauge!(GROUP_MEMBERS).set(count as f64);
}

pub fn record_stream_session() {
    metrics::counter!(STREAM_SESSIONS).increment(1);
}
