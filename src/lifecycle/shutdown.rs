//! Shutdown coordination.
//!
//! One process-wide trigger fans out to every managed listener. Each listener
//! then runs its own `Running → Draining → Stopped` sequence and reports how
//! the drain ended.

use std::time::Duration;
use serde::Serialize;
use tokio::sync::{broadcast, watch};

use crate::net::ConnectionTracker;

/// Coordinator for graceful shutdown.
///
/// Provides a broadcast channel that all long-running tasks can subscribe to.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Trigger the shutdown signal.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Get the number of active subscribers (tasks still running).
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Lifecycle state of one managed listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ListenerState {
    /// Accepting connections.
    Running,
    /// No new connections; in-flight ones may finish.
    Draining,
    /// Every connection is gone.
    Stopped,
}

impl std::fmt::Display for ListenerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListenerState::Running => write!(f, "running"),
            ListenerState::Draining => write!(f, "draining"),
            ListenerState::Stopped => write!(f, "stopped"),
        }
    }
}

/// Wait for the next shutdown trigger.
///
/// A closed or lagged channel also counts as a trigger.
pub async fn triggered(rx: &mut broadcast::Receiver<()>) {
    let _ = rx.recv().await;
}

/// How a listener's drain ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DrainOutcome {
    /// Every in-flight connection finished in time.
    Clean,
    /// The timeout elapsed; `remaining` connections were closed forcibly.
    TimedOut { remaining: u64 },
}

/// Per-listener shutdown report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DrainReport {
    pub listener: &'static str,
    #[serde(flatten)]
    pub outcome: DrainOutcome,
    pub elapsed_ms: u64,
}

impl DrainReport {
    pub fn is_clean(&self) -> bool {
        self.outcome == DrainOutcome::Clean
    }
}

/// Drive `state` through `Draining` and wait for `tracker` to go idle.
///
/// Returns the outcome without moving to `Stopped`; the caller does that once
/// it has released whatever the timeout left behind.
pub async fn drain(
    listener: &'static str,
    state: &watch::Sender<ListenerState>,
    tracker: &ConnectionTracker,
    timeout: Duration,
) -> DrainOutcome {
    state.send_replace(ListenerState::Draining);
    tracing::info!(
        listener,
        in_flight = tracker.active_count(),
        timeout = ?timeout,
        "Listener draining"
    );

    match tokio::time::timeout(timeout, tracker.wait_idle()).await {
        Ok(()) => DrainOutcome::Clean,
        Err(_) => {
            let remaining = tracker.active_count();
            tracing::error!(listener, remaining, "Listener drain timed out");
            DrainOutcome::TimedOut { remaining }
        }
    }
}
