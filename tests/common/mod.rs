//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::time::Duration;
use futures_util::StreamExt;
use http_log::config::HttpLogConfig;
use http_log::lifecycle::{App, RunningApp, Shutdown};
use http_log::observability::MemorySink;
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

pub type Viewer = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Both listeners on ephemeral loopback ports.
pub fn test_config() -> HttpLogConfig {
    let mut config = HttpLogConfig::default();
    config.capture.bind_address = "127.0.0.1:0".into();
    config.stream.bind_address = "127.0.0.1:0".into();
    config.shutdown.timeout_secs = 1;
    config
}

pub struct Harness {
    pub shutdown: Shutdown,
    pub running: RunningApp,
    pub capture: SocketAddr,
    pub stream: SocketAddr,
    pub sink: MemorySink,
}

impl Harness {
    pub async fn start(config: HttpLogConfig) -> Self {
        let app = App::bind(config).await.expect("bind");
        let capture = app.capture_addr();
        let stream = app.stream_addr();
        let shutdown = Shutdown::new();
        let sink = MemorySink::default();
        let running = app.start(&shutdown, sink.clone()).expect("start");

        Self {
            shutdown,
            running,
            capture,
            stream,
            sink,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.capture, path)
    }

    /// Connect a websocket viewer and wait until its member has joined.
    pub async fn viewer(&self) -> Viewer {
        let before = self.running.group().member_count();
        let (ws, _) = connect_async(format!("ws://{}/http-debug", self.stream))
            .await
            .expect("websocket connect");
        let group = self.running.group().clone();
        wait_until(move || group.member_count() > before).await;
        ws
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// Poll `cond` until it holds, failing the test after two seconds.
pub async fn wait_until(mut cond: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not met in time");
}

/// Next JSON record pushed to `viewer`.
pub async fn next_record(viewer: &mut Viewer) -> serde_json::Value {
    let msg = tokio::time::timeout(Duration::from_secs(2), viewer.next())
        .await
        .expect("record in time")
        .expect("stream open")
        .expect("valid frame");
    serde_json::from_str(msg.to_text().expect("text frame")).expect("json record")
}
