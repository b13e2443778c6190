//! Coordinated graceful shutdown of the capture and stream listeners.

use std::time::{Duration, Instant};
use futures_util::StreamExt;
use http_log::lifecycle::{DrainOutcome, ListenerState};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio_tungstenite::tungstenite::Message;

mod common;
use common::{test_config, Harness};

async fn reach(state: &mut watch::Receiver<ListenerState>, target: ListenerState, within: Duration) {
    tokio::time::timeout(within, state.wait_for(|s| *s == target))
        .await
        .unwrap_or_else(|_| panic!("listener did not reach {target} in time"))
        .expect("state channel open");
}

/// Send request head and half of the declared body, leaving the request in flight.
async fn half_sent_request(addr: std::net::SocketAddr) -> TcpStream {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"POST /slow HTTP/1.1\r\nHost: test\r\nContent-Length: 10\r\n\r\nhello")
        .await
        .unwrap();
    stream
}

#[tokio::test]
async fn idle_listeners_stop_immediately() {
    let h = Harness::start(test_config()).await;
    let mut capture = h.running.listener_state("capture").unwrap();
    let mut stream = h.running.listener_state("stream").unwrap();
    assert_eq!(*capture.borrow(), ListenerState::Running);

    let started = Instant::now();
    h.shutdown.trigger();
    reach(&mut capture, ListenerState::Stopped, Duration::from_millis(500)).await;
    reach(&mut stream, ListenerState::Stopped, Duration::from_millis(500)).await;

    let summary = h.running.wait().await;
    assert!(started.elapsed() < Duration::from_millis(900));
    assert_eq!(summary.reports.len(), 2);
    assert!(summary.reports.iter().all(|r| r.is_clean()));
}

#[tokio::test]
async fn busy_listener_waits_for_in_flight_request() {
    let mut config = test_config();
    config.shutdown.timeout_secs = 5;
    let h = Harness::start(config).await;
    let mut capture = h.running.listener_state("capture").unwrap();
    let mut stream = h.running.listener_state("stream").unwrap();

    let mut client = half_sent_request(h.capture).await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    h.shutdown.trigger();
    reach(&mut stream, ListenerState::Stopped, Duration::from_millis(500)).await;
    reach(&mut capture, ListenerState::Draining, Duration::from_millis(500)).await;

    // Still draining while the body is incomplete.
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(*capture.borrow(), ListenerState::Draining);

    // New connections are refused once draining.
    assert!(TcpStream::connect(h.capture).await.is_err());

    client.write_all(b"world").await.unwrap();
    let mut response = Vec::new();
    client.read_to_end(&mut response).await.unwrap();
    assert!(String::from_utf8_lossy(&response).starts_with("HTTP/1.1 200"));

    reach(&mut capture, ListenerState::Stopped, Duration::from_secs(1)).await;

    let summary = h.running.wait().await;
    assert!(summary.reports.iter().all(|r| r.is_clean()));
    assert_eq!(summary.records_logged, 1);
    assert_eq!(h.sink.records()[0].body, "helloworld");
}

#[tokio::test]
async fn drain_timeout_closes_stuck_connection() {
    let h = Harness::start(test_config()).await;
    let mut client = half_sent_request(h.capture).await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    let started = Instant::now();
    h.shutdown.trigger();
    let summary = h.running.wait().await;
    let elapsed = started.elapsed();

    assert!(elapsed >= Duration::from_millis(900), "stopped too early: {elapsed:?}");
    assert!(elapsed < Duration::from_secs(3), "stopped too late: {elapsed:?}");

    let capture = summary.reports.iter().find(|r| r.listener == "capture").unwrap();
    assert_eq!(capture.outcome, DrainOutcome::TimedOut { remaining: 1 });
    let stream = summary.reports.iter().find(|r| r.listener == "stream").unwrap();
    assert!(stream.is_clean());

    // The stuck connection was closed by the server.
    let mut buf = [0u8; 64];
    let read = tokio::time::timeout(Duration::from_secs(1), client.read(&mut buf))
        .await
        .expect("socket closed");
    assert!(matches!(read, Ok(0) | Err(_)));
    assert_eq!(summary.records_logged, 0);
}

#[tokio::test]
async fn viewers_are_closed_on_shutdown() {
    let h = Harness::start(test_config()).await;
    let mut viewer = h.viewer().await;

    h.shutdown.trigger();
    let summary = h.running.wait().await;
    assert!(summary.reports.iter().all(|r| r.is_clean()));

    let next = tokio::time::timeout(Duration::from_secs(1), viewer.next())
        .await
        .expect("viewer notified");
    assert!(matches!(next, Some(Ok(Message::Close(_))) | None | Some(Err(_))));
}
