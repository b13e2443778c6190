//! Websocket stream endpoint.
//!
//! # Data Flow
//! ```text
//! capture → Group → Member (one per session) → JSON text frame → viewer
//! ```
//!
//! # Design Decisions
//! - One member per session; it is dropped on every exit path
//! - Client frames are read only to notice Close and disconnects
//! - A listener drain ends the session with a Close frame

use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::{header::HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::watch;
use tower_http::{set_header::SetResponseHeaderLayer, trace::TraceLayer};

use crate::http::capture::SERVER_HEADER;
use crate::http::request::Record;
use crate::lifecycle::shutdown::ListenerState;
use crate::multicast::{Group, Member};
use crate::net::{ConnectionGuard, ConnectionTracker};
use crate::observability::metrics;

#[derive(Clone)]
pub struct StreamState {
    pub group: Group<Record>,
    pub tracker: ConnectionTracker,
    pub listener_state: watch::Receiver<ListenerState>,
}

/// Router exposing the websocket upgrade at `path`.
pub fn router(path: &str, state: StreamState) -> Router {
    Router::new()
        .route(path, get(stream_handler))
        .with_state(state)
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static(SERVER_HEADER),
            HeaderValue::from_static("HTTP Debug Websocket Server"),
        ))
        .layer(TraceLayer::new_for_http())
}

async fn stream_handler(
    State(state): State<StreamState>,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let upgrade = match upgrade {
        Ok(upgrade) => upgrade,
        Err(rejection) => {
            tracing::warn!(error = %rejection, "Upgrade failed");
            return rejection.into_response();
        }
    };

    // Joining before the upgrade completes means the viewer never misses a
    // record captured after its handshake was answered.
    let member = match state.group.join() {
        Ok(member) => member,
        Err(e) => {
            tracing::warn!(error = %e, "Refusing stream session");
            return (StatusCode::SERVICE_UNAVAILABLE, "shutting down").into_response();
        }
    };
    let guard = state.tracker.track();

    upgrade
        .on_failed_upgrade(|e| tracing::warn!(error = %e, "Upgrade failed"))
        .on_upgrade(move |socket| stream_session(socket, member, state.listener_state, guard))
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEnd {
    ClientClosed,
    WriteFailed,
    GroupClosed,
    Draining,
    Forced,
}

async fn stream_session(
    socket: WebSocket,
    mut member: Member<Record>,
    mut listener_state: watch::Receiver<ListenerState>,
    guard: ConnectionGuard,
) {
    metrics::record_stream_session();
    tracing::info!(connection_id = %guard.id(), member = %member.id(), "Stream session opened");

    let (mut sender, mut receiver) = socket.split();

    let end = loop {
        tokio::select! {
            record = member.recv() => {
                let Some(record) = record else { break SessionEnd::GroupClosed };
                let text = match serde_json::to_string(&*record) {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to serialize record");
                        continue;
                    }
                };
                // A viewer that stops reading stalls this write; only a forced
                // stop after the drain timeout may interrupt it.
                tokio::select! {
                    result = sender.send(Message::Text(text.into())) => {
                        if let Err(e) = result {
                            tracing::error!(connection_id = %guard.id(), error = %e, "Write failed");
                            break SessionEnd::WriteFailed;
                        }
                    }
                    _ = listener_state.wait_for(|s| *s == ListenerState::Stopped) => {
                        break SessionEnd::Forced;
                    }
                }
            }
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | None => break SessionEnd::ClientClosed,
                Some(Err(e)) => {
                    tracing::debug!(connection_id = %guard.id(), error = %e, "Read failed");
                    break SessionEnd::ClientClosed;
                }
                Some(Ok(_)) => {}
            },
            changed = listener_state.changed() => {
                if changed.is_err() || *listener_state.borrow() != ListenerState::Running {
                    break SessionEnd::Draining;
                }
            }
        }
    };

    // Release the queue before any further I/O on the socket.
    drop(member);

    if matches!(end, SessionEnd::GroupClosed | SessionEnd::Draining) {
        tokio::select! {
            _ = sender.send(Message::Close(None)) => {}
            _ = listener_state.wait_for(|s| *s == ListenerState::Stopped) => {}
        }
    }

    tracing::info!(connection_id = %guard.id(), reason = ?end, "Stream session closed");
}
