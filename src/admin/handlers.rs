use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use super::DebugState;
use crate::lifecycle::shutdown::ListenerState;
use crate::multicast::GroupStats;

#[derive(Serialize)]
pub struct ListenerStatus {
    pub name: &'static str,
    pub state: ListenerState,
    pub in_flight: u64,
}

#[derive(Serialize)]
pub struct DebugStats {
    pub version: &'static str,
    pub queue_capacity: usize,
    pub group: GroupStats,
    pub listeners: Vec<ListenerStatus>,
}

pub async fn get_stats(State(state): State<DebugState>) -> Json<DebugStats> {
    let listeners = state
        .listeners
        .iter()
        .map(|l| ListenerStatus {
            name: l.name,
            state: *l.state.borrow(),
            in_flight: l.tracker.active_count(),
        })
        .collect();

    Json(DebugStats {
        version: env!("CARGO_PKG_VERSION"),
        queue_capacity: state.group.capacity(),
        group: state.group.stats(),
        listeners,
    })
}

pub async fn get_metrics(State(state): State<DebugState>) -> Response {
    match &state.prometheus {
        Some(handle) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed").into_response(),
    }
}
