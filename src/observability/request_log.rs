//! Log consumer: writes every captured record to a structured sink.

use std::sync::Arc;

use crate::http::request::Record;
use crate::multicast::Member;

/// Destination for captured records.
pub trait RecordSink: Send {
    fn write(&mut self, record: &Record);
}

/// Emits one `tracing` event per record.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl RecordSink for TracingSink {
    fn write(&mut self, record: &Record) {
        tracing::info!(
            target: "http_log::request",
            time = %record.time,
            proto = %record.proto,
            host = %record.host,
            uri = %record.uri,
            method = %record.method,
            content_length = record.content_length,
            body = %record.body,
            "Request"
        );
        tracing::debug!(
            target: "http_log::request",
            uri = %record.uri,
            header = ?record.header,
            form = ?record.form,
            post_form = ?record.post_form,
            "Request details"
        );
    }
}

/// Long-lived consumer that drains one group member into a sink.
pub struct LogConsumer<S> {
    member: Member<Record>,
    sink: S,
}

impl<S: RecordSink> LogConsumer<S> {
    pub fn new(member: Member<Record>, sink: S) -> Self {
        Self { member, sink }
    }

    /// Run until the member's queue closes. Returns the number of records written.
    pub async fn run(mut self) -> u64 {
        tracing::info!(member = %self.member.id(), "Log consumer started");
        let mut written = 0u64;
        while let Some(record) = self.member.recv().await {
            self.sink.write(&record);
            written += 1;
        }
        tracing::info!(records = written, "Shutdown log consumer");
        written
    }
}

/// Sink that keeps records in memory; used by tests.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    records: Arc<std::sync::Mutex<Vec<Record>>>,
}

impl MemorySink {
    pub fn records(&self) -> Vec<Record> {
        self.records
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

impl RecordSink for MemorySink {
    fn write(&mut self, record: &Record) {
        if let Ok(mut records) = self.records.lock() {
            records.push(record.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::multicast::Group;
    use axum::http::Request;

    fn record(method: &str, uri: &str) -> Record {
        let (parts, _) = Request::builder().method(method).uri(uri).body(()).unwrap().into_parts();
        Record::from_parts(&parts, b"")
    }

    #[tokio::test]
    async fn writes_records_until_group_closes() {
        let group = Group::new(16);
        let sink = MemorySink::default();
        let consumer = LogConsumer::new(group.join().unwrap(), sink.clone());
        let handle = tokio::spawn(consumer.run());

        group.publish(record("GET", "/a"));
        group.publish(record("DELETE", "/b"));
        group.close();

        let written = handle.await.unwrap();
        assert_eq!(written, 2);
        let uris: Vec<String> = sink.records().into_iter().map(|r| r.uri).collect();
        assert_eq!(uris, vec!["/a", "/b"]);
    }

    #[test]
    fn tracing_sink_accepts_records() {
        let mut sink = TracingSink;
        sink.write(&record("PATCH", "/c"));
    }
}
