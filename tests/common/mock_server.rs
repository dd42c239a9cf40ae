//! Mock web page and Messages API server for integration tests.

#![allow(dead_code)]

use axum::body::{Body, Bytes};
use axum::extract::{Path, State};
use axum::http::{HeaderMap, Response, StatusCode};
use axum::routing::{get, post};
use axum::Router;
use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex;

/// A captured request for assertions.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).expect("request body is JSON")
    }
}

/// A mock response to return.
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    pub content_type: String,
    pub body: String,
    pub delay_ms: u64,
}

impl MockResponse {
    /// A successful Messages reply whose first block carries `text`
    pub fn reply(text: &str) -> Self {
        let body = serde_json::json!({
            "id": "msg_test",
            "type": "message",
            "role": "assistant",
            "content": [{ "type": "text", "text": text }],
            "stop_reason": "end_turn",
        });
        Self::json(200, &body.to_string())
    }

    /// Provider-style error body
    pub fn api_error(status: u16, message: &str) -> Self {
        let body = serde_json::json!({
            "type": "error",
            "error": { "type": "api_error", "message": message },
        });
        Self::json(status, &body.to_string())
    }

    pub fn json(status: u16, body: &str) -> Self {
        Self {
            status,
            content_type: "application/json".to_string(),
            body: body.to_string(),
            delay_ms: 0,
        }
    }

    pub fn html(status: u16, body: &str) -> Self {
        Self {
            status,
            content_type: "text/html; charset=utf-8".to_string(),
            body: body.to_string(),
            delay_ms: 0,
        }
    }

    pub fn with_delay(mut self, ms: u64) -> Self {
        self.delay_ms = ms;
        self
    }
}

#[derive(Clone, Default)]
struct MockState {
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
    replies: Arc<Mutex<VecDeque<MockResponse>>>,
    pages: Arc<Mutex<HashMap<String, VecDeque<MockResponse>>>>,
    page_hits: Arc<Mutex<HashMap<String, usize>>>,
}

/// Mock server for testing.
pub struct MockServer {
    pub addr: SocketAddr,
    state: MockState,
    shutdown: tokio::sync::watch::Sender<bool>,
}

impl MockServer {
    /// Start a new mock server on an ephemeral port.
    pub async fn start() -> Self {
        let state = MockState::default();
        let (shutdown_tx, mut shutdown_rx) = tokio::sync::watch::channel(false);

        let app = Router::new()
            .route("/v1/messages", post(handle_messages))
            .route("/pages/{name}", get(handle_page))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock server");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.changed().await;
                })
                .await
                .ok();
        });

        Self {
            addr,
            state,
            shutdown: shutdown_tx,
        }
    }

    /// Enqueue a response for the next Messages API call.
    pub async fn enqueue_reply(&self, resp: MockResponse) {
        self.state.replies.lock().await.push_back(resp);
    }

    /// Enqueue a response for the next fetch of `/pages/<name>`.
    pub async fn enqueue_page(&self, name: &str, resp: MockResponse) {
        self.state
            .pages
            .lock()
            .await
            .entry(name.to_string())
            .or_default()
            .push_back(resp);
    }

    /// Get all captured Messages API requests.
    pub async fn captured_requests(&self) -> Vec<CapturedRequest> {
        self.state.requests.lock().await.clone()
    }

    /// How many times `/pages/<name>` was fetched.
    pub async fn page_hits(&self, name: &str) -> usize {
        self.state
            .page_hits
            .lock()
            .await
            .get(name)
            .copied()
            .unwrap_or(0)
    }

    pub fn messages_url(&self) -> String {
        format!("http://{}/v1/messages", self.addr)
    }

    pub fn page_url(&self, name: &str) -> String {
        format!("http://{}/pages/{}", self.addr, name)
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}

async fn handle_messages(
    State(state): State<MockState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response<Body> {
    state.requests.lock().await.push(CapturedRequest {
        path: "/v1/messages".to_string(),
        headers: headers
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("").to_string()))
            .collect(),
        body: body.to_vec(),
    });

    let resp = state
        .replies
        .lock()
        .await
        .pop_front()
        .unwrap_or_else(|| MockResponse::api_error(500, "no reply queued"));
    respond(resp).await
}

async fn handle_page(State(state): State<MockState>, Path(name): Path<String>) -> Response<Body> {
    *state.page_hits.lock().await.entry(name.clone()).or_default() += 1;
    let resp = state
        .pages
        .lock()
        .await
        .get_mut(&name)
        .and_then(|queue| queue.pop_front())
        .unwrap_or_else(|| MockResponse::html(404, "<html><body>Not found</body></html>"));
    respond(resp).await
}

async fn respond(resp: MockResponse) -> Response<Body> {
    if resp.delay_ms > 0 {
        tokio::time::sleep(tokio::time::Duration::from_millis(resp.delay_ms)).await;
    }
    Response::builder()
        .status(StatusCode::from_u16(resp.status).unwrap())
        .header("content-type", resp.content_type)
        .body(Body::from(resp.body))
        .unwrap()
}
