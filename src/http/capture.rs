//! Capture endpoint: every request becomes a published [`Record`].

use axum::{
    body::{self, Body},
    extract::State,
    http::{header::HeaderName, HeaderValue, Request, StatusCode},
    response::IntoResponse,
    routing::any,
    Router,
};
use tower_http::{set_header::SetResponseHeaderLayer, trace::TraceLayer};

use crate::http::request::Record;
use crate::multicast::Group;

/// Name of the identification header added to every response.
pub const SERVER_HEADER: &str = "httpserver";

#[derive(Clone)]
pub struct CaptureState {
    pub group: Group<Record>,
    pub max_body_bytes: usize,
}

/// Router answering every method on every path.
pub fn router(state: CaptureState) -> Router {
    Router::new()
        .route("/", any(capture_handler))
        .route("/{*path}", any(capture_handler))
        .with_state(state)
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static(SERVER_HEADER),
            HeaderValue::from_static("HTTP Debug Server"),
        ))
        .layer(TraceLayer::new_for_http())
}

async fn capture_handler(State(state): State<CaptureState>, request: Request<Body>) -> impl IntoResponse {
    let (parts, body) = request.into_parts();
    let bytes = match body::to_bytes(body, state.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(uri = %parts.uri, error = %e, "Failed to read request body");
            Default::default()
        }
    };

    let record = Record::from_parts(&parts, &bytes);
    tracing::debug!(method = %record.method, uri = %record.uri, "Request captured");
    state.group.publish(record);

    StatusCode::OK
}

#[cfg(test)]
mod tests {
    use super::*;
    use tower::ServiceExt;

    fn state(group: &Group<Record>) -> CaptureState {
        CaptureState {
            group: group.clone(),
            max_body_bytes: 1024,
        }
    }

    #[tokio::test]
    async fn publishes_and_answers_ok() {
        let group = Group::new(8);
        let mut member = group.join().unwrap();

        let response = router(state(&group))
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/deep/path?q=1")
                    .body(Body::from("hello"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[SERVER_HEADER], "HTTP Debug Server");

        let record = member.try_recv().expect("record published");
        assert_eq!(record.method, "POST");
        assert_eq!(record.uri, "/deep/path?q=1");
        assert_eq!(record.body, "hello");
    }

    #[tokio::test]
    async fn answers_ok_without_members() {
        let group = Group::new(1);
        let response = router(state(&group))
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(group.stats().published, 1);
    }

    #[tokio::test]
    async fn oversized_body_is_captured_empty() {
        let group = Group::new(8);
        let mut member = group.join().unwrap();

        let response = router(state(&group))
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri("/big")
                    .body(Body::from(vec![b'x'; 4096]))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(member.try_recv().unwrap().body, "");
    }
}
