//! Mock HTTP backend for exercising the cache engine.

#![allow(dead_code)]

use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, Response, StatusCode};
use axum::routing::any;
use axum::Router;
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex;

/// A captured request for assertions.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub body: Vec<u8>,
}

/// A mock response to return.
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    pub content_type: String,
    pub body: Vec<u8>,
    pub delay_ms: u64,
}

impl Default for MockResponse {
    fn default() -> Self {
        Self::json(r#"{"ok": true}"#)
    }
}

impl MockResponse {
    pub fn json(body: &str) -> Self {
        Self {
            status: 200,
            content_type: "application/json".to_string(),
            body: body.as_bytes().to_vec(),
            delay_ms: 0,
        }
    }

    pub fn text(status: u16, body: &str) -> Self {
        Self {
            status,
            content_type: "text/html".to_string(),
            body: body.as_bytes().to_vec(),
            delay_ms: 0,
        }
    }

    pub fn error(status: u16, message: &str) -> Self {
        Self {
            status,
            content_type: "application/json".to_string(),
            body: format!(r#"{{"error": "{}"}}"#, message).into_bytes(),
            delay_ms: 0,
        }
    }

    /// dummyjson-shaped quotes page with `count` quotes.
    pub fn quotes(count: u64, total: u64) -> Self {
        let quotes: Vec<serde_json::Value> = (1..=count)
            .map(|id| {
                serde_json::json!({
                    "id": id,
                    "quote": format!("Quote number {}", id),
                    "author": format!("Author {}", id),
                })
            })
            .collect();
        let body = serde_json::json!({
            "quotes": quotes,
            "total": total,
            "skip": 0,
            "limit": count,
        });
        Self::json(&body.to_string())
    }

    pub fn with_delay(mut self, ms: u64) -> Self {
        self.delay_ms = ms;
        self
    }
}

#[derive(Clone)]
struct MockState {
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
    responses: Arc<Mutex<VecDeque<MockResponse>>>,
}

/// Mock backend server for testing.
pub struct MockBackend {
    pub addr: SocketAddr,
    state: MockState,
    shutdown: tokio::sync::watch::Sender<bool>,
}

impl MockBackend {
    /// Start a new mock backend server.
    pub async fn start() -> Self {
        let state = MockState {
            requests: Arc::new(Mutex::new(Vec::new())),
            responses: Arc::new(Mutex::new(VecDeque::new())),
        };

        let (shutdown_tx, mut shutdown_rx) = tokio::sync::watch::channel(false);

        let app = Router::new()
            .route("/{*path}", any(handle_request))
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

        // Wait for server to be ready
        tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;

        Self {
            addr,
            state,
            shutdown: shutdown_tx,
        }
    }

    /// Enqueue a response to be returned for the next request.
    pub async fn enqueue_response(&self, resp: MockResponse) {
        self.state.responses.lock().await.push_back(resp);
    }

    /// Get all captured requests.
    pub async fn captured_requests(&self) -> Vec<CapturedRequest> {
        self.state.requests.lock().await.clone()
    }

    pub async fn request_count(&self) -> usize {
        self.state.requests.lock().await.len()
    }

    /// Get the base URL for this mock server.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}

async fn handle_request(State(state): State<MockState>, req: Request<Body>) -> Response<Body> {
    let method = req.method().to_string();
    let path = req.uri().path().to_string();
    let query = req.uri().query().map(str::to_string);

    let body_bytes = axum::body::to_bytes(req.into_body(), 1024 * 1024)
        .await
        .unwrap_or_default()
        .to_vec();

    state.requests.lock().await.push(CapturedRequest {
        method,
        path,
        query,
        body: body_bytes,
    });

    // Get next response or return default
    let mock_resp = state
        .responses
        .lock()
        .await
        .pop_front()
        .unwrap_or_default();

    if mock_resp.delay_ms > 0 {
        tokio::time::sleep(tokio::time::Duration::from_millis(mock_resp.delay_ms)).await;
    }

    Response::builder()
        .status(StatusCode::from_u16(mock_resp.status).unwrap())
        .header("content-type", mock_resp.content_type)
        .body(Body::from(mock_resp.body))
        .unwrap()
}
