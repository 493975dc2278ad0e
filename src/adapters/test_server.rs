//! In-process HTTP endpoints for adapter tests.
//!
//! [`TestServer`] accepts any JSON POST and records it. Paths under
//! `/broken` answer 500 and are not recorded. [`silent_listener`] accepts
//! connections and never answers.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{StatusCode, Uri};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::net::TcpListener;

// ---

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub path: String,
    pub query: Option<String>,
    pub body: Value,
}

type Recorder = Arc<Mutex<Vec<RecordedRequest>>>;

pub struct TestServer {
    addr: SocketAddr,
    recorded: Recorder,
}

impl TestServer {
    pub async fn start() -> Self {
        // ---
        let recorded = Recorder::default();
        let app = Router::new()
            .fallback(record)
            .with_state(recorded.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        TestServer { addr, recorded }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.recorded.lock().clone()
    }
}

async fn record(
    State(recorded): State<Recorder>,
    uri: Uri,
    Json(body): Json<Value>,
) -> StatusCode {
    // ---
    if uri.path().starts_with("/broken") {
        return StatusCode::INTERNAL_SERVER_ERROR;
    }
    recorded.lock().push(RecordedRequest {
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        body,
    });
    StatusCode::OK
}

/// Bind a listener that holds every connection open without replying.
pub async fn silent_listener() -> (SocketAddr, tokio::task::JoinHandle<()>) {
    // ---
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    (addr, handle)
}

/// Client that never routes loopback traffic through a proxy.
pub fn test_client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
