//! Step-level error taxonomy.
//!
//! Every variant here is recoverable at the scenario runner's per-step
//! boundary: it becomes one failed step result and the run continues. Fatal
//! setup errors (missing bundle, malformed documents, port already bound)
//! stay `anyhow` at the CLI boundary instead.

use thiserror::Error;

/// Error produced while executing or judging a single scenario step.
#[derive(Debug, Error)]
pub enum StepError {
    /// Referenced payload file is missing or unreadable.
    #[error("Payload file not found: {0}")]
    PayloadNotFound(String),

    /// Payload file exists but cannot be parsed.
    #[error("Payload file {path} is not valid YAML: {source}")]
    PayloadInvalid {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    /// Step declares a protocol this executor cannot drive.
    #[error("Protocol '{0}' is not supported")]
    UnsupportedProtocol(String),

    /// Step request block is malformed (e.g. unusable HTTP method).
    #[error("Invalid step request: {0}")]
    InvalidRequest(String),

    /// The request never produced an HTTP response (refused, DNS, timeout).
    #[error("HTTP request failed for {method} {url}: {source}")]
    Transport {
        method: String,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// An assertion clause rejected the step outcome.
    #[error("{0}")]
    Assertion(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_protocol() {
        let err = StepError::UnsupportedProtocol("grpc".to_string());
        assert_eq!(err.to_string(), "Protocol 'grpc' is not supported");
    }

    #[test]
    fn test_display_names_payload_path() {
        let err = StepError::PayloadNotFound("payloads/missing.json".to_string());
        assert!(err.to_string().contains("payloads/missing.json"));
    }
}
