//! Startup orchestration.
//!
//! # Responsibilities
//! - Validate configuration
//! - Bind every listener before any of them serves traffic
//! - Start the log consumer and both servers
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listeners start last (traffic only when ready)

use std::net::SocketAddr;
use std::time::Duration;
use metrics_exporter_prometheus::PrometheusHandle;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::admin::{setup_debug_router, DebugState, ListenerView};
use crate::config::validation::{join_errors, validate_config, ValidationError};
use crate::config::HttpLogConfig;
use crate::http::{capture, websocket, ManagedServer, Record};
use crate::lifecycle::shutdown::{DrainReport, ListenerState, Shutdown};
use crate::multicast::{Group, GroupError};
use crate::net::{Listener, ListenerError};
use crate::observability::{metrics, LogConsumer, RecordSink};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {}", join_errors(.0))]
    Invalid(Vec<ValidationError>),

    #[error("{listener} listener failed to start: {source}")]
    Listener {
        listener: &'static str,
        #[source]
        source: ListenerError,
    },

    #[error("log consumer could not join: {0}")]
    Group(#[from] GroupError),
}

/// Bound but not yet serving.
pub struct App {
    config: HttpLogConfig,
    group: Group<Record>,
    capture: ManagedServer,
    stream: ManagedServer,
    prometheus: Option<PrometheusHandle>,
}

impl App {
    /// Validate `config` and bind both listeners.
    pub async fn bind(config: HttpLogConfig) -> Result<Self, StartupError> {
        validate_config(&config).map_err(StartupError::Invalid)?;

        let drain_timeout = Duration::from_secs(config.shutdown.timeout_secs);
        let capture = Listener::bind(
            "capture",
            &config.capture.bind_address,
            config.capture.max_connections,
        )
        .await
        .map_err(|source| StartupError::Listener { listener: "capture", source })?;
        let stream = Listener::bind(
            "stream",
            &config.stream.bind_address,
            config.stream.max_connections,
        )
        .await
        .map_err(|source| StartupError::Listener { listener: "stream", source })?;

        let prometheus = if config.observability.debug_endpoints {
            metrics::init_prometheus()
        } else {
            None
        };

        Ok(Self {
            group: Group::new(config.broadcast.queue_capacity),
            capture: ManagedServer::new(capture, drain_timeout),
            stream: ManagedServer::new(stream, drain_timeout),
            prometheus,
            config,
        })
    }

    pub fn capture_addr(&self) -> SocketAddr {
        self.capture.local_addr()
    }

    pub fn stream_addr(&self) -> SocketAddr {
        self.stream.local_addr()
    }

    pub fn group(&self) -> &Group<Record> {
        &self.group
    }

    /// Start the log consumer and both servers.
    ///
    /// Both servers subscribe to `shutdown` before this returns.
    pub fn start<S>(self, shutdown: &Shutdown, sink: S) -> Result<RunningApp, StartupError>
    where
        S: RecordSink + 'static,
    {
        let App {
            config,
            group,
            capture: capture_server,
            stream: stream_server,
            prometheus,
        } = self;

        let log_member = group.join()?;
        let log_consumer = tokio::spawn(LogConsumer::new(log_member, sink).run());

        let capture_router = capture::router(capture::CaptureState {
            group: group.clone(),
            max_body_bytes: config.capture.max_body_bytes,
        });

        let mut stream_router = websocket::router(
            &config.stream.path,
            websocket::StreamState {
                group: group.clone(),
                tracker: stream_server.tracker(),
                listener_state: stream_server.state(),
            },
        );
        if config.observability.debug_endpoints {
            let views = [&capture_server, &stream_server]
                .into_iter()
                .map(|server| ListenerView {
                    name: server.name(),
                    state: server.state(),
                    tracker: server.tracker(),
                })
                .collect();
            stream_router = stream_router.merge(setup_debug_router(DebugState {
                group: group.clone(),
                listeners: views,
                prometheus,
            }));
            tracing::warn!("Diagnostic endpoints enabled on the stream listener");
        }

        tracing::info!(address = %capture_server.local_addr(), "HTTP Listen Address");
        tracing::info!(address = %stream_server.local_addr(), path = %config.stream.path, "WS Listen Address");

        let states = vec![
            (capture_server.name(), capture_server.state()),
            (stream_server.name(), stream_server.state()),
        ];
        let servers = vec![
            tokio::spawn(capture_server.run(capture_router, shutdown.subscribe())),
            tokio::spawn(stream_server.run(stream_router, shutdown.subscribe())),
        ];

        Ok(RunningApp {
            group,
            states,
            servers,
            log_consumer,
        })
    }
}

/// Final outcome of a run.
#[derive(Debug)]
pub struct ShutdownSummary {
    pub reports: Vec<DrainReport>,
    pub records_logged: u64,
}

/// Serving; waits for every listener to stop.
pub struct RunningApp {
    group: Group<Record>,
    states: Vec<(&'static str, watch::Receiver<ListenerState>)>,
    servers: Vec<JoinHandle<DrainReport>>,
    log_consumer: JoinHandle<u64>,
}

impl RunningApp {
    pub fn group(&self) -> &Group<Record> {
        &self.group
    }

    /// Observe a listener's state by name (`capture` or `stream`).
    pub fn listener_state(&self, name: &str) -> Option<watch::Receiver<ListenerState>> {
        self.states
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, rx)| rx.clone())
    }

    /// Wait for every listener to reach `Stopped`, then close the group and
    /// let the log consumer finish.
    pub async fn wait(self) -> ShutdownSummary {
        let mut reports = Vec::with_capacity(self.servers.len());
        for server in self.servers {
            match server.await {
                Ok(report) => reports.push(report),
                Err(e) => tracing::error!(error = %e, "Listener task failed"),
            }
        }

        self.group.close();
        let records_logged = match self.log_consumer.await {
            Ok(n) => n,
            Err(e) => {
                tracing::error!(error = %e, "Log consumer task failed");
                0
            }
        };

        ShutdownSummary {
            reports,
            records_logged,
        }
    }
}
