//! Captured request records.
//!
//! A [`Record`] is built once per inbound request and never mutated. Its JSON
//! form is what websocket viewers receive.

use std::collections::BTreeMap;
use axum::http::{header, request::Parts, Method};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use url::form_urlencoded;

/// Multi-valued form or header mapping.
pub type Values = BTreeMap<String, Vec<String>>;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Immutable snapshot of one captured request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Record {
    /// Capture time, RFC 3339 with nanoseconds (UTC).
    pub time: String,
    pub proto: String,
    pub host: String,
    /// Request target as sent: path plus query.
    pub uri: String,
    pub method: String,
    pub header: Values,
    /// Declared `Content-Length`, else the captured body length.
    pub content_length: u64,
    pub body: String,
    /// Query values plus url-encoded body values.
    pub form: Option<Values>,
    /// Url-encoded body values only.
    pub post_form: Option<Values>,
}

impl Record {
    /// Build a record from request head and fully read body.
    pub fn from_parts(parts: &Parts, body: &[u8]) -> Self {
        let mut header = Values::new();
        for (name, value) in parts.headers.iter() {
            header
                .entry(name.as_str().to_string())
                .or_default()
                .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
        }

        let host = parts
            .headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .or_else(|| parts.uri.authority().map(|a| a.to_string()))
            .unwrap_or_default();

        let uri = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| parts.uri.path().to_string());

        let content_length = parts
            .headers
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(body.len() as u64);

        let post_form = is_form_body(parts).then(|| collect(form_urlencoded::parse(body)));
        let form = match (parts.uri.query(), &post_form) {
            (None, None) => None,
            (query, post) => {
                let mut form = post.clone().unwrap_or_default();
                if let Some(query) = query {
                    for (k, v) in form_urlencoded::parse(query.as_bytes()) {
                        form.entry(k.into_owned()).or_default().push(v.into_owned());
                    }
                }
                Some(form)
            }
        };

        Self {
            time: Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true),
            proto: format!("{:?}", parts.version),
            host,
            uri,
            method: parts.method.to_string(),
            header,
            content_length,
            body: String::from_utf8_lossy(body).into_owned(),
            form,
            post_form,
        }
    }
}

fn is_form_body(parts: &Parts) -> bool {
    let body_method = matches!(parts.method, Method::POST | Method::PUT | Method::PATCH);
    body_method
        && parts
            .headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.trim().to_ascii_lowercase().starts_with(FORM_CONTENT_TYPE))
            .unwrap_or(false)
}

fn collect<'a>(pairs: impl Iterator<Item = (std::borrow::Cow<'a, str>, std::borrow::Cow<'a, str>)>) -> Values {
    let mut values = Values::new();
    for (k, v) in pairs {
        values.entry(k.into_owned()).or_default().push(v.into_owned());
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(req: Request<()>) -> Parts {
        req.into_parts().0
    }

    #[test]
    fn captures_request_head_and_body() {
        let p = parts(
            Request::builder()
                .method("PUT")
                .uri("/items/7?verbose=1")
                .header("host", "example.test")
                .header("x-tag", "a")
                .header("x-tag", "b")
                .body(())
                .unwrap(),
        );
        let record = Record::from_parts(&p, b"payload");

        assert_eq!(record.method, "PUT");
        assert_eq!(record.uri, "/items/7?verbose=1");
        assert_eq!(record.host, "example.test");
        assert_eq!(record.proto, "HTTP/1.1");
        assert_eq!(record.header["x-tag"], vec!["a", "b"]);
        assert_eq!(record.body, "payload");
        assert_eq!(record.content_length, 7);
        assert!(record.post_form.is_none());
        assert_eq!(record.form.unwrap()["verbose"], vec!["1"]);
        assert!(chrono::DateTime::parse_from_rfc3339(&record.time).is_ok());
    }

    #[test]
    fn parses_urlencoded_post_body() {
        let p = parts(
            Request::builder()
                .method("POST")
                .uri("/submit?name=query")
                .header("content-type", "application/x-www-form-urlencoded; charset=utf-8")
                .header("content-length", "20")
                .body(())
                .unwrap(),
        );
        let record = Record::from_parts(&p, b"name=body&empty=&x=1");

        let post = record.post_form.unwrap();
        assert_eq!(post["name"], vec!["body"]);
        assert_eq!(post["empty"], vec![""]);
        let form = record.form.unwrap();
        assert_eq!(form["name"], vec!["body", "query"]);
        assert_eq!(form["x"], vec!["1"]);
        assert_eq!(record.content_length, 20);
    }

    #[test]
    fn get_without_query_has_no_forms() {
        let p = parts(Request::builder().uri("/").body(()).unwrap());
        let record = Record::from_parts(&p, b"");

        assert!(record.form.is_none());
        assert!(record.post_form.is_none());
        assert_eq!(record.host, "");
        assert_eq!(record.content_length, 0);
    }

    #[test]
    fn serializes_with_capitalized_field_names() {
        let p = parts(Request::builder().method("GET").uri("/x").body(()).unwrap());
        let record = Record::from_parts(&p, b"");
        let json: serde_json::Value = serde_json::to_value(&record).unwrap();

        assert_eq!(json["Method"], "GET");
        assert_eq!(json["Uri"], "/x");
        assert_eq!(json["ContentLength"], 0);
        assert!(json["PostForm"].is_null());
        assert!(json.get("Time").is_some());
    }

    #[test]
    fn invalid_utf8_body_is_lossy() {
        let p = parts(Request::builder().method("POST").uri("/").body(()).unwrap());
        let record = Record::from_parts(&p, &[0x66, 0xff, 0x6f]);
        assert_eq!(record.body, "f\u{fffd}o");
    }
}
