//! Managed HTTP listener.
//!
//! # Responsibilities
//! - Accept connections from a bounded [`Listener`]
//! - Serve each connection with hyper (HTTP/1.1, HTTP/2, upgrades)
//! - Track in-flight connections and expose the listener state
//! - Drain on shutdown, forcibly closing whatever outlives the timeout

use std::net::SocketAddr;
use std::time::{Duration, Instant};
use axum::{body::Body, http::Request, Router};
use hyper::body::Incoming;
use hyper_util::{
    rt::{TokioExecutor, TokioIo},
    server::conn::auto::Builder,
    service::TowerToHyperService,
};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinSet;
use tower::ServiceExt;

use crate::lifecycle::shutdown::{self, DrainOutcome, DrainReport, ListenerState};
use crate::net::{ConnectionGuard, ConnectionPermit, ConnectionTracker, Listener};

/// One listener with its own `Running → Draining → Stopped` lifecycle.
pub struct ManagedServer {
    listener: Listener,
    tracker: ConnectionTracker,
    state: watch::Sender<ListenerState>,
    drain_timeout: Duration,
}

impl ManagedServer {
    pub fn new(listener: Listener, drain_timeout: Duration) -> Self {
        let (state, _) = watch::channel(ListenerState::Running);
        Self {
            listener,
            tracker: ConnectionTracker::new(),
            state,
            drain_timeout,
        }
    }

    pub fn name(&self) -> &'static str {
        self.listener.name()
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.listener.local_addr()
    }

    /// Tracker counting this listener's in-flight work.
    ///
    /// Handlers that outlive their HTTP exchange (websocket sessions) hold a
    /// guard from here so the drain waits for them.
    pub fn tracker(&self) -> ConnectionTracker {
        self.tracker.clone()
    }

    /// Observe this listener's state.
    pub fn state(&self) -> watch::Receiver<ListenerState> {
        self.state.subscribe()
    }

    /// Serve `router` until `trigger` fires, then drain.
    pub async fn run(self, router: Router, mut trigger: broadcast::Receiver<()>) -> DrainReport {
        let ManagedServer {
            listener,
            tracker,
            state,
            drain_timeout,
        } = self;
        let name = listener.name();
        let mut connections = JoinSet::new();

        tracing::info!(listener = name, address = %listener.local_addr(), "HTTP server starting");

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer, permit)) => {
                        let guard = tracker.track();
                        connections.spawn(serve_connection(
                            name,
                            stream,
                            peer,
                            router.clone(),
                            state.subscribe(),
                            permit,
                            guard,
                        ));
                    }
                    Err(e) => {
                        tracing::warn!(listener = name, error = %e, "Accept failed");
                        tokio::time::sleep(Duration::from_millis(50)).await;
                    }
                },
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
                _ = shutdown::triggered(&mut trigger) => break,
            }
        }

        // Stop accepting before anything else.
        drop(listener);
        let started = Instant::now();

        let outcome = shutdown::drain(name, &state, &tracker, drain_timeout).await;
        if let DrainOutcome::TimedOut { .. } = outcome {
            connections.abort_all();
        }
        while connections.join_next().await.is_some() {}

        state.send_replace(ListenerState::Stopped);
        let report = DrainReport {
            listener: name,
            outcome,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        tracing::info!(listener = name, outcome = ?report.outcome, "HTTP server stopped");
        report
    }
}

async fn serve_connection(
    listener: &'static str,
    stream: TcpStream,
    peer: SocketAddr,
    router: Router,
    mut state: watch::Receiver<ListenerState>,
    _permit: ConnectionPermit,
    guard: ConnectionGuard,
) {
    let service = TowerToHyperService::new(
        router.map_request(|req: Request<Incoming>| req.map(Body::new)),
    );
    let builder = Builder::new(TokioExecutor::new());
    let conn = builder.serve_connection_with_upgrades(TokioIo::new(stream), service);
    tokio::pin!(conn);

    let mut draining = false;
    loop {
        tokio::select! {
            result = conn.as_mut() => {
                if let Err(e) = result {
                    tracing::debug!(listener, connection_id = %guard.id(), peer = %peer, error = %e, "Connection error");
                }
                break;
            }
            _ = state.changed(), if !draining => {
                draining = true;
                conn.as_mut().graceful_shutdown();
            }
        }
    }
}
