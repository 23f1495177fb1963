//! HTTP listener for a single mock server.
//!
//! Accepts inbound connections, translates each request into a
//! [`MockRequest`](crate::matcher::MockRequest), runs the route matcher and
//! renders the declared response. Unmatched requests get a structured 404;
//! internal failures get a structured 500 and never take the listener down.

use crate::config::MockServer;
use crate::matcher::{match_route, MockRequest};
use axum::body::Body;
use axum::extract::State;
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use axum::response::Response;
use axum::Router;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Bounded wait for in-flight requests when stopping a listener.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// A running mock server bound to one network endpoint.
#[derive(Debug)]
pub struct MockListener {
    name: String,
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl MockListener {
    /// Bind the server's endpoint and start serving.
    ///
    /// The socket is bound before this returns, so a successful return means
    /// the endpoint is accepting connections. A bind failure (port already in
    /// use) is fatal and reported immediately, never retried.
    pub async fn start(server: MockServer) -> anyhow::Result<Self> {
        let endpoint = format!("{}:{}", server.host, server.port);
        let listener = TcpListener::bind(&endpoint).await.map_err(|e| {
            anyhow::anyhow!("Server '{}' failed to bind {}: {}", server.name, endpoint, e)
        })?;
        let addr = listener.local_addr()?;
        let name = server.name.clone();

        info!(
            server = %server.name,
            protocol = %server.protocol,
            addr = %addr,
            routes = server.routes.len(),
            "Mock server listening"
        );

        let shared = Arc::new(server);
        let app = Router::new()
            .fallback(handle_request)
            .with_state(shared.clone());

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let shutdown = async {
                shutdown_rx.await.ok();
            };
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(shutdown)
                .await
            {
                error!(server = %shared.name, error = %e, "Mock listener terminated abnormally");
            }
        });

        Ok(Self {
            name,
            addr,
            shutdown: Some(shutdown_tx),
            task,
        })
    }

    /// Name of the server definition this listener serves.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Address the listener is bound to (resolves port 0 binds).
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stop accepting connections and drain in-flight requests.
    ///
    /// Waits up to [`DRAIN_TIMEOUT`] for the serve task, then aborts it.
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if tokio::time::timeout(DRAIN_TIMEOUT, &mut self.task)
            .await
            .is_err()
        {
            warn!(server = %self.name, "Drain timeout exceeded, aborting listener task");
            self.task.abort();
        }
        info!(server = %self.name, addr = %self.addr, "Mock server stopped");
    }
}

async fn handle_request(
    State(server): State<Arc<MockServer>>,
    request: axum::extract::Request,
) -> Response {
    let (parts, body) = request.into_parts();
    let head_only = parts.method == Method::HEAD;
    let body = axum::body::to_bytes(body, usize::MAX)
        .await
        .unwrap_or_default();

    let request = MockRequest {
        method: parts.method.to_string(),
        // Query strings do not participate in matching.
        path: parts.uri.path().to_string(),
        headers: flatten_headers(&parts.headers),
        body: body.to_vec(),
    };

    debug!(
        server = %server.name,
        method = %request.method,
        path = %request.path,
        content_length = request.body.len(),
        "Request received"
    );

    match respond(&server, &request, head_only).await {
        Ok(response) => response,
        Err(e) => {
            error!(
                server = %server.name,
                method = %request.method,
                path = %request.path,
                error = %e,
                "Request handling failed"
            );
            json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::json!({"error": "mock failure"}),
                head_only,
            )
        }
    }
}

async fn respond(
    server: &MockServer,
    request: &MockRequest,
    head_only: bool,
) -> anyhow::Result<Response> {
    let Some(route) = match_route(server, request) else {
        warn!(
            server = %server.name,
            method = %request.method,
            path = %request.path,
            "No mock route matched"
        );
        return Ok(json_response(
            StatusCode::NOT_FOUND,
            serde_json::json!({"error": "No mock route matched"}),
            head_only,
        ));
    };

    let response = &route.response;
    let latency = response.latency();
    if !latency.is_zero() {
        tokio::time::sleep(latency).await;
    }

    let status = StatusCode::from_u16(response.status)?;
    let body = response.body_bytes()?;

    let mut headers = HeaderMap::new();
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static(server.protocol.default_content_type()),
    );
    // Declared route headers win over the protocol default.
    for (name, value) in &response.headers {
        let name = HeaderName::from_bytes(name.as_bytes())?;
        headers.insert(name, HeaderValue::from_str(value)?);
    }
    headers.insert(CONTENT_LENGTH, HeaderValue::from(body.len()));

    info!(
        server = %server.name,
        method = %request.method,
        path = %request.path,
        operation = %route.operation,
        status = response.status,
        latency_ms = response.latency_ms,
        "Request served"
    );

    let body = if head_only { Vec::new() } else { body };
    let mut out = Response::new(Body::from(body));
    *out.status_mut() = status;
    *out.headers_mut() = headers;
    Ok(out)
}

fn json_response(status: StatusCode, payload: serde_json::Value, head_only: bool) -> Response {
    let body = payload.to_string().into_bytes();
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(CONTENT_LENGTH, HeaderValue::from(body.len()));

    let body = if head_only { Vec::new() } else { body };
    let mut out = Response::new(Body::from(body));
    *out.status_mut() = status;
    *out.headers_mut() = headers;
    out
}

/// Flatten a header map to single string values, skipping opaque bytes.
fn flatten_headers(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect()
}
