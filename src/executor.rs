//! Step execution over HTTP.
//!
//! Performs one network call per scenario step against a configurable base
//! URL. HTTP error statuses are ordinary outcomes here; only transport
//! failures (refused connections, DNS, timeouts) are errors.

use crate::error::StepError;
use crate::scenario::ScenarioStep;
use async_trait::async_trait;
use regex::Regex;
use std::time::{Duration, Instant};

/// Target base URL when neither the CLI nor the environment overrides it.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:9101";

/// Per-request timeout when not overridden.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Environment override for the target base URL.
pub const BASE_URL_ENV: &str = "SMOKE_RUNTIME_BASE_URL";

/// Environment override for the request timeout, in seconds.
pub const TIMEOUT_ENV: &str = "SMOKE_RUNTIME_TIMEOUT";

/// Outcome of one performed step request.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    /// HTTP status code
    pub status_code: u16,
    /// Wall-clock time for the call, including reading the body
    pub elapsed_ms: f64,
    /// Raw response body
    pub response_body: Option<String>,
}

/// Performs the network call for one scenario step.
#[async_trait]
pub trait StepExecutor: Send + Sync {
    /// Execute `step` under `protocol` with its resolved payload.
    async fn execute(
        &self,
        protocol: &str,
        step: &ScenarioStep,
        payload: Option<&serde_json::Value>,
    ) -> Result<ExecutionResult, StepError>;
}

/// Executes REST/OpenAPI steps directly via HTTP.
pub struct HttpStepExecutor {
    client: reqwest::Client,
    base_url: String,
    placeholder: Regex,
}

impl HttpStepExecutor {
    /// Build an executor.
    ///
    /// Explicit arguments win over `SMOKE_RUNTIME_BASE_URL` /
    /// `SMOKE_RUNTIME_TIMEOUT`, which win over the fixed defaults.
    pub fn new(base_url: Option<&str>, timeout: Option<Duration>) -> anyhow::Result<Self> {
        let base_url = base_url
            .map(str::to_owned)
            .or_else(|| std::env::var(BASE_URL_ENV).ok())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let timeout = timeout
            .or_else(|| {
                std::env::var(TIMEOUT_ENV)
                    .ok()
                    .and_then(|value| value.parse::<f64>().ok())
                    .filter(|secs| secs.is_finite() && *secs >= 0.0)
                    .map(Duration::from_secs_f64)
            })
            .unwrap_or(DEFAULT_TIMEOUT);
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            placeholder: Regex::new(r"\{([^}]+)\}").unwrap(),
        })
    }

    fn build_url(&self, raw_path: &str) -> String {
        let resolved = self
            .placeholder
            .replace_all(raw_path, |caps: &regex::Captures| sample_value(&caps[1]));
        if resolved.starts_with('/') {
            format!("{}{}", self.base_url, resolved)
        } else {
            format!("{}/{}", self.base_url, resolved)
        }
    }
}

#[async_trait]
impl StepExecutor for HttpStepExecutor {
    async fn execute(
        &self,
        protocol: &str,
        step: &ScenarioStep,
        payload: Option<&serde_json::Value>,
    ) -> Result<ExecutionResult, StepError> {
        if !matches!(
            protocol.to_ascii_lowercase().as_str(),
            "openapi" | "rest" | "http"
        ) {
            return Err(StepError::UnsupportedProtocol(protocol.to_string()));
        }

        let method = step
            .request
            .method
            .as_deref()
            .unwrap_or("GET")
            .to_ascii_uppercase();
        let method = reqwest::Method::from_bytes(method.as_bytes())
            .map_err(|_| StepError::InvalidRequest(format!("Invalid HTTP method '{}'", method)))?;
        let url = self.build_url(step.request.path.as_deref().unwrap_or("/"));

        let mut request = self
            .client
            .request(method.clone(), &url)
            .header("Accept", "application/json");
        for (name, value) in extract_headers(payload) {
            request = request.header(name, value);
        }
        if let Some(body) = encode_body(&method, payload) {
            request = request.body(body);
        }

        let started = Instant::now();
        let response = request.send().await.map_err(|source| StepError::Transport {
            method: method.to_string(),
            url: url.clone(),
            source,
        })?;
        let status_code = response.status().as_u16();
        let response_body = response.text().await.ok();
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

        Ok(ExecutionResult {
            status_code,
            elapsed_ms,
            response_body,
        })
    }
}

/// Sample values substituted into `{name}` path placeholders.
fn sample_value(name: &str) -> &'static str {
    match name {
        "paymentId" => "111",
        "customerId" => "cust-001",
        "reportId" => "rep-001",
        _ => "sample",
    }
}

fn extract_headers(payload: Option<&serde_json::Value>) -> Vec<(String, String)> {
    payload
        .and_then(|value| value.get("headers"))
        .and_then(|headers| headers.as_object())
        .map(|map| {
            map.iter()
                .map(|(name, value)| {
                    let value = match value {
                        serde_json::Value::String(text) => text.clone(),
                        other => other.to_string(),
                    };
                    (name.clone(), value)
                })
                .collect()
        })
        .unwrap_or_default()
}

fn encode_body(method: &reqwest::Method, payload: Option<&serde_json::Value>) -> Option<Vec<u8>> {
    if *method == reqwest::Method::GET {
        return None;
    }
    let body = payload?.as_object()?.get("body")?;
    match body {
        serde_json::Value::Null => None,
        serde_json::Value::String(text) => Some(text.clone().into_bytes()),
        value => serde_json::to_vec(value).ok(),
    }
}
