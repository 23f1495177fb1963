//! Scenario bundle model and loading.
//!
//! A bundle is a directory holding `scenario.yaml` plus a `payloads/`
//! directory with the files its steps reference. A path straight to the
//! scenario document is also accepted; payload references then resolve
//! against its parent directory.

use crate::error::StepError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Scenario document file name inside a bundle directory.
pub const SCENARIO_FILE: &str = "scenario.yaml";

/// A scripted sequence of requests against one service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Stable identifier, also used as the JUnit suite name
    pub scenario_id: String,

    /// Service under test
    pub service: String,

    /// Service version
    pub version: String,

    /// Default protocol for steps that do not override it
    pub protocol: String,

    /// Timestamp the scenario was generated, if known
    #[serde(default)]
    pub generated_at: Option<String>,

    /// Free-form metadata carried into the run summary
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,

    /// Steps executed strictly in order
    #[serde(default)]
    pub steps: Vec<ScenarioStep>,
}

/// Single request-and-assert unit inside a scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioStep {
    /// Display and report key; uniqueness is not enforced
    pub name: String,

    /// Human description
    #[serde(default)]
    pub description: Option<String>,

    /// Protocol override; falls back to the scenario protocol
    #[serde(default)]
    pub protocol: Option<String>,

    /// Request description
    pub request: StepRequest,

    /// Assertion clauses evaluated against the step outcome
    #[serde(default)]
    pub assertions: Vec<String>,

    /// Free-text notes for maintainers
    #[serde(default)]
    pub notes: Option<String>,
}

/// Request block of a step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepRequest {
    /// HTTP method, defaults to GET
    #[serde(default)]
    pub method: Option<String>,

    /// Request path, may contain `{name}` placeholders
    #[serde(default)]
    pub path: Option<String>,

    /// Operation identifier from the source contract
    #[serde(default)]
    pub operation: Option<String>,

    /// Payload file path, relative to the bundle root
    #[serde(default)]
    pub payload: Option<String>,
}

/// Resolve a bundle path to its scenario document.
pub fn scenario_file(bundle: &Path) -> PathBuf {
    if bundle.is_file() {
        bundle.to_path_buf()
    } else {
        bundle.join(SCENARIO_FILE)
    }
}

/// Directory payload references resolve against.
pub fn payload_root(bundle: &Path) -> PathBuf {
    if bundle.is_dir() {
        bundle.to_path_buf()
    } else {
        bundle.parent().unwrap_or(Path::new(".")).to_path_buf()
    }
}

/// Load and validate a scenario document.
///
/// Failure here is fatal for the whole run; no artifacts are produced.
pub fn load_scenario(path: &Path) -> anyhow::Result<Scenario> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Scenario file not found: {}: {}", path.display(), e))?;
    let scenario: Scenario = serde_yaml::from_str(&content)
        .map_err(|e| anyhow::anyhow!("Invalid scenario document {}: {}", path.display(), e))?;
    Ok(scenario)
}

/// Resolve a step's payload reference to a structured value.
///
/// YAML files parse as YAML, everything else tries JSON and falls back to the
/// raw text. A missing file fails the referencing step only, not the run.
pub fn resolve_payload(
    bundle: &Path,
    reference: Option<&str>,
) -> Result<Option<serde_json::Value>, StepError> {
    let Some(reference) = reference else {
        return Ok(None);
    };
    let path = payload_root(bundle).join(reference);
    let text = std::fs::read_to_string(&path)
        .map_err(|_| StepError::PayloadNotFound(path.display().to_string()))?;

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match extension.as_deref() {
        Some("yaml") | Some("yml") => {
            let value = serde_yaml::from_str(&text).map_err(|e| StepError::PayloadInvalid {
                path: path.display().to_string(),
                source: e,
            })?;
            Ok(Some(value))
        }
        _ => match serde_json::from_str(&text) {
            Ok(value) => Ok(Some(value)),
            Err(_) => Ok(Some(serde_json::Value::String(text))),
        },
    }
}
