//! Diagnostic endpoints, mounted on the stream listener when enabled.

pub mod handlers;

use axum::{routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::sync::watch;

use self::handlers::*;
use crate::http::request::Record;
use crate::lifecycle::shutdown::ListenerState;
use crate::multicast::Group;
use crate::net::ConnectionTracker;

/// A listener as seen by the diagnostic endpoints.
#[derive(Clone)]
pub struct ListenerView {
    pub name: &'static str,
    pub state: watch::Receiver<ListenerState>,
    pub tracker: ConnectionTracker,
}

#[derive(Clone)]
pub struct DebugState {
    pub group: Group<Record>,
    pub listeners: Vec<ListenerView>,
    pub prometheus: Option<PrometheusHandle>,
}

pub fn setup_debug_router(state: DebugState) -> Router {
    Router::new()
        .route("/debug/stats", get(get_stats))
        .route("/debug/metrics", get(get_metrics))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    #[tokio::test]
    async fn stats_report_group_and_listeners() {
        let group = Group::new(4);
        let _member = group.join().unwrap();
        let (_tx, rx) = watch::channel(ListenerState::Running);
        let tracker = ConnectionTracker::new();
        let _guard = tracker.track();

        let router = setup_debug_router(DebugState {
            group: group.clone(),
            listeners: vec![ListenerView { name: "capture", state: rx, tracker }],
            prometheus: None,
        });

        let response = router
            .oneshot(Request::builder().uri("/debug/stats").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let bytes = axum::body::to_bytes(response.into_body(), 1 << 16).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(json["group"]["members"], 1);
        assert_eq!(json["queue_capacity"], 4);
        assert_eq!(json["listeners"][0]["name"], "capture");
        assert_eq!(json["listeners"][0]["state"], "running");
        assert_eq!(json["listeners"][0]["in_flight"], 1);
    }

    #[tokio::test]
    async fn metrics_without_recorder_is_not_found() {
        let router = setup_debug_router(DebugState {
            group: Group::new(1),
            listeners: Vec::new(),
            prometheus: None,
        });
        let response = router
            .oneshot(Request::builder().uri("/debug/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), axum::http::StatusCode::NOT_FOUND);
    }
}
