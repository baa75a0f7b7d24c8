//! Shared utilities for integration testing.

use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::Router;
use tokio::net::TcpListener;

use direct_call::config::DirectCallConfig;
use direct_call::{DirectServiceClient, StaticDirectory};

pub const SECRET: &str = "integration-secret";

/// One request as seen by a mock callee.
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub struct Captured {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

#[allow(dead_code)]
impl Captured {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn body_str(&self) -> &str {
        std::str::from_utf8(&self.body).unwrap()
    }
}

type Responder =
    Arc<dyn Fn(usize) -> Pin<Box<dyn Future<Output = (u16, String)> + Send>> + Send + Sync>;

#[derive(Clone)]
struct CalleeState {
    hits: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<Captured>>>,
    responder: Responder,
}

/// Handle to a running mock callee.
#[derive(Clone)]
pub struct MockCallee {
    pub addr: SocketAddr,
    hits: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<Captured>>>,
}

#[allow(dead_code)]
impl MockCallee {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<Captured> {
        self.requests.lock().unwrap().clone()
    }
}

/// Start a callee that always answers with `body` and status 200.
#[allow(dead_code)]
pub async fn start_mock_callee(body: &'static str) -> MockCallee {
    start_programmable_callee(move |_| async move { (200, body.to_string()) }).await
}

/// Start a programmable callee. `f` receives the zero-based hit number and
/// returns the status and body to answer with.
pub async fn start_programmable_callee<F, Fut>(f: F) -> MockCallee
where
    F: Fn(usize) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let responder: Responder = Arc::new(move |n| Box::pin(f(n)));
    let state = CalleeState {
        hits: Arc::new(AtomicUsize::new(0)),
        requests: Arc::new(Mutex::new(Vec::new())),
        responder,
    };
    let hits = state.hits.clone();
    let requests = state.requests.clone();

    let app = Router::new().fallback(handle).with_state(state);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    MockCallee {
        addr,
        hits,
        requests,
    }
}

async fn handle(
    State(state): State<CalleeState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, [(header::HeaderName, &'static str); 1], String) {
    let n = state.hits.fetch_add(1, Ordering::SeqCst);
    state.requests.lock().unwrap().push(Captured {
        method,
        path: uri.path().to_string(),
        headers,
        body,
    });
    let (status, body) = (state.responder)(n).await;
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, [(header::CONTENT_TYPE, "application/json")], body)
}

/// An active configuration pointing each service at its addresses, with
/// fast retries so tests stay quick.
#[allow(dead_code)]
pub fn test_config(services: &[(&str, Vec<String>)]) -> DirectCallConfig {
    let mut config = DirectCallConfig {
        enabled: true,
        shared_secret: SECRET.to_string(),
        source_service_name: "order-service".to_string(),
        ..Default::default()
    };
    config.retry.base_delay_ms = 1;
    config.retry.max_delay_ms = 5;
    config.observability.metrics_enabled = false;
    config.services = services
        .iter()
        .map(|(name, addresses)| (name.to_string(), addresses.clone()))
        .collect::<HashMap<_, _>>();
    config
}

/// HTTP client that ignores proxy settings from the environment.
#[allow(dead_code)]
pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

/// A client over a static directory built from `config.services`.
#[allow(dead_code)]
pub fn client_for(config: &DirectCallConfig) -> DirectServiceClient {
    let directory = StaticDirectory::from_map(&config.services);
    DirectServiceClient::new(config, Arc::new(directory)).with_http_client(http_client())
}

/// A successful envelope carrying `data`.
#[allow(dead_code)]
pub fn ok_body(data: serde_json::Value) -> String {
    serde_json::json!({ "success": true, "data": data }).to_string()
}

/// A business-failure envelope.
#[allow(dead_code)]
pub fn failure_body(code: &str, message: &str) -> String {
    serde_json::json!({ "success": false, "errorCode": code, "errorMessage": message }).to_string()
}
