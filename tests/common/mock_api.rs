// Minimal HTTP server standing in for the cloud APIs
//
// Every request is recorded; every response is the canned status and body.

use axum::{
    body::Bytes,
    extract::State,
    http::{StatusCode, Uri},
    response::IntoResponse,
    Json, Router,
};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Recorded {
    pub path: String,
    pub query: Option<String>,
    pub body: Value,
}

#[derive(Clone)]
struct MockState {
    status: StatusCode,
    body: Value,
    delay: Duration,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

pub struct MockApi {
    pub base_url: String,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl MockApi {
    pub async fn start(status: StatusCode, body: Value) -> Self {
        Self::start_with_delay(status, body, Duration::ZERO).await
    }

    pub async fn start_with_delay(status: StatusCode, body: Value, delay: Duration) -> Self {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = MockState {
            status,
            body,
            delay,
            requests: requests.clone(),
        };

        let app = Router::new().fallback(record).with_state(state);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            requests,
        }
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }
}

async fn record(State(state): State<MockState>, uri: Uri, body: Bytes) -> impl IntoResponse {
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    state.requests.lock().unwrap().push(Recorded {
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        body: json,
    });

    if !state.delay.is_zero() {
        tokio::time::sleep(state.delay).await;
    }

    (state.status, Json(state.body.clone()))
}
