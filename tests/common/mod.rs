//! Stub node for integration tests.
//!
//! Serves canned responses keyed by request path and records every request
//! it receives (method, path and query, headers, body).

#![allow(dead_code)]

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::Response;
use axum::Router;
use devpath_client::{Endpoint, NodeClient};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A request as seen by the stub.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: String,
}

/// A canned response.
#[derive(Debug, Clone)]
pub struct Canned {
    pub status: u16,
    pub content_type: Option<&'static str>,
    pub body: Vec<u8>,
    pub delay: Duration,
}

impl Canned {
    pub fn json(body: serde_json::Value) -> Self {
        Self {
            status: 200,
            content_type: Some("application/json"),
            body: body.to_string().into_bytes(),
            delay: Duration::ZERO,
        }
    }

    pub fn text(body: &str) -> Self {
        Self {
            status: 200,
            content_type: Some("text/plain"),
            body: body.to_string().into_bytes(),
            delay: Duration::ZERO,
        }
    }

    pub fn raw(status: u16, content_type: Option<&'static str>, body: &str) -> Self {
        Self {
            status,
            content_type,
            body: body.to_string().into_bytes(),
            delay: Duration::ZERO,
        }
    }

    pub fn binary(content_type: &'static str, body: &[u8]) -> Self {
        Self {
            status: 200,
            content_type: Some(content_type),
            body: body.to_vec(),
            delay: Duration::ZERO,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[derive(Clone, Default)]
pub struct StubNode {
    routes: Arc<Mutex<HashMap<String, Canned>>>,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl StubNode {
    pub fn route(&self, path: &str, canned: Canned) -> &Self {
        self.routes.lock().unwrap().insert(path.to_string(), canned);
        self
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }
}

async fn handle(
    State(node): State<StubNode>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> Response {
    let path = uri.path().to_string();
    node.requests.lock().unwrap().push(Recorded {
        method,
        path: path.clone(),
        query: uri.query().map(str::to_string),
        headers,
        body,
    });

    let canned = node.routes.lock().unwrap().get(&path).cloned();
    let Some(canned) = canned else {
        return Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(Body::empty())
            .unwrap();
    };

    if !canned.delay.is_zero() {
        tokio::time::sleep(canned.delay).await;
    }

    let mut response = Response::builder().status(canned.status);
    if let Some(content_type) = canned.content_type {
        response = response.header(header::CONTENT_TYPE, content_type);
    }
    response.body(Body::from(canned.body)).unwrap()
}

/// Spin up a stub node on a random port.
pub async fn start_stub_node() -> (StubNode, SocketAddr) {
    let node = StubNode::default();
    let app = Router::new().fallback(handle).with_state(node.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (node, addr)
}

pub fn endpoint_for(addr: SocketAddr) -> Endpoint {
    Endpoint::new(&format!("http://{addr}")).unwrap()
}

pub fn client_for(addr: SocketAddr) -> NodeClient {
    NodeClient::new(endpoint_for(addr)).unwrap()
}
