//! Mock configuration model.
//!
//! Defines the servers, routes, matchers and static responses consumed by the
//! mock runtime.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;

/// Top-level configuration consumed by the mock runtime.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MockConfig {
    /// Service name the mocks stand in for
    pub service: String,

    /// Service version
    pub version: String,

    /// Source contract protocol (e.g. "openapi", "wsdl")
    pub protocol: String,

    /// Timestamp the configuration was generated, if known
    #[serde(default)]
    pub generated_at: Option<String>,

    /// Reference to the contract document this configuration was derived from
    #[serde(default)]
    pub source_ir: Option<String>,

    /// Free-form metadata carried through to consumers
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,

    /// Server definitions, started in declaration order
    #[serde(default)]
    pub servers: Vec<MockServer>,
}

impl MockConfig {
    /// Load configuration from a YAML or JSON file (decided by extension).
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&content)?,
            _ => serde_yaml::from_str(&content)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> anyhow::Result<()> {
        let mut endpoints = HashSet::new();
        for (i, server) in self.servers.iter().enumerate() {
            server
                .validate()
                .map_err(|e| anyhow::anyhow!("Server {}: {}", i, e))?;
            // Port 0 binds an ephemeral port, so it never collides.
            if server.port != 0 && !endpoints.insert((server.host.clone(), server.port)) {
                anyhow::bail!(
                    "Server {}: endpoint {}:{} is declared more than once",
                    i,
                    server.host,
                    server.port
                );
            }
        }
        Ok(())
    }
}

/// Wire protocol a mock server speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Rest,
    Soap,
    Rpc,
}

impl Protocol {
    /// Default content type for responses under this protocol.
    pub fn default_content_type(&self) -> &'static str {
        match self {
            Protocol::Soap => "text/xml",
            Protocol::Rest | Protocol::Rpc => "application/json",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Rest => write!(f, "rest"),
            Protocol::Soap => write!(f, "soap"),
            Protocol::Rpc => write!(f, "rpc"),
        }
    }
}

/// A single mock server instance: protocol, bind endpoint and its routes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MockServer {
    /// Display name used in logs
    pub name: String,

    /// Protocol the server answers
    pub protocol: Protocol,

    /// Bind host
    pub host: String,

    /// Bind port (0 picks an ephemeral port)
    pub port: u16,

    /// Routes evaluated in declaration order, first match wins
    #[serde(default)]
    pub routes: Vec<MockRoute>,
}

impl MockServer {
    /// Validate the server definition.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.name.is_empty() {
            anyhow::bail!("Server name cannot be empty");
        }
        if self.host.is_empty() {
            anyhow::bail!("Server host cannot be empty");
        }
        for (i, route) in self.routes.iter().enumerate() {
            route
                .validate()
                .map_err(|e| anyhow::anyhow!("Route {}: {}", i, e))?;
        }
        Ok(())
    }
}

/// A single mocked operation (REST endpoint, SOAP operation or RPC method).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MockRoute {
    /// Operation identifier from the source contract
    pub operation: String,

    /// Human description
    #[serde(default)]
    pub description: String,

    /// Request matching criteria
    pub matcher: RouteMatcher,

    /// Static response returned on match
    pub response: MockResponse,

    /// Assertion clauses carried for downstream consumers (informational)
    #[serde(default)]
    pub assertions: Vec<String>,

    /// Opaque reference to an external driver snippet; never loaded here
    #[serde(default)]
    pub driver_stub: Option<String>,
}

impl MockRoute {
    /// Validate the route definition.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.operation.is_empty() {
            anyhow::bail!("Route operation cannot be empty");
        }
        self.response.validate()?;
        Ok(())
    }
}

/// Request matching criteria.
///
/// Which fields apply depends on the owning server's protocol; an unspecified
/// field acts as a wildcard.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouteMatcher {
    /// HTTP method, compared case-insensitively (rest)
    #[serde(default)]
    pub method: Option<String>,

    /// Request path, may contain `{param}` template segments (rest, soap)
    #[serde(default)]
    pub path: Option<String>,

    /// Expected SOAPAction header value (soap)
    #[serde(default)]
    pub soap_action: Option<String>,

    /// Expected `method` field in the JSON request body (rpc)
    #[serde(default)]
    pub rpc_method: Option<String>,
}

/// Static response payload returned by a mock server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MockResponse {
    /// HTTP status code
    #[serde(default = "default_status")]
    pub status: u16,

    /// Response headers; override the protocol default content type on conflict
    #[serde(default)]
    pub headers: HashMap<String, String>,

    /// Response body: serialized as JSON when structured, verbatim when a string
    #[serde(default)]
    pub body: serde_json::Value,

    /// Artificial delay before responding, bounded below at zero
    #[serde(default)]
    pub latency_ms: i64,
}

impl Default for MockResponse {
    fn default() -> Self {
        Self {
            status: default_status(),
            headers: HashMap::new(),
            body: serde_json::Value::Null,
            latency_ms: 0,
        }
    }
}

fn default_status() -> u16 {
    200
}

impl MockResponse {
    /// Validate the response definition.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.status < 100 || self.status > 599 {
            anyhow::bail!("Invalid status code: {}", self.status);
        }
        Ok(())
    }

    /// Delay to apply before responding.
    pub fn latency(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.latency_ms.max(0) as u64)
    }

    /// Encode the body for the wire.
    pub fn body_bytes(&self) -> anyhow::Result<Vec<u8>> {
        match &self.body {
            serde_json::Value::String(text) => Ok(text.clone().into_bytes()),
            value => Ok(serde_json::to_vec(value)?),
        }
    }
}
