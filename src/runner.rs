//! Scenario execution engine.
//!
//! Drives a loaded scenario step by step, in strict order, against a target
//! base URL, and records three artifacts per run: an incremental event
//! stream, a summary document and a JUnit report. One broken step never
//! hides results for the rest of the scenario: every per-step failure is
//! captured into its result and iteration continues.

use crate::assertions;
use crate::error::StepError;
use crate::executor::StepExecutor;
use crate::junit;
use crate::scenario::{self, Scenario, ScenarioStep};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, warn};

/// Terminal status of one executed step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Passed,
    Failed,
}

/// Runtime result for one step, appended to the event stream as it happens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    /// 1-based position in the scenario
    pub step_index: usize,
    /// Display and report key
    pub step_name: String,
    pub status: StepStatus,
    /// ISO-8601 timestamps
    pub started_at: String,
    pub finished_at: String,
    pub duration_ms: f64,
    /// Assertion clauses that were in force for the step
    pub assertions: Vec<String>,
    /// Error text for failed steps
    pub error: Option<String>,
    /// Captured error chain for failed steps
    pub trace: Option<String>,
}

/// One entry in the summary's failure list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepFailure {
    pub step_name: String,
    pub error: Option<String>,
    pub trace: Option<String>,
}

/// Aggregated result of a scenario run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario_id: String,
    pub service: String,
    pub version: String,
    pub protocol: String,
    pub run_id: String,
    pub started_at: String,
    pub finished_at: String,
    pub duration_ms: f64,
    pub total_steps: usize,
    pub passed_steps: usize,
    pub failed_steps: usize,
    pub failures: Vec<StepFailure>,
    pub metadata: HashMap<String, serde_json::Value>,
    pub events_file: String,
    pub summary_file: String,
    pub junit_file: String,
}

impl ScenarioResult {
    /// Whether the run finished without any failed step.
    pub fn passed(&self) -> bool {
        self.failed_steps == 0
    }
}

/// File locations for one run's artifacts.
#[derive(Debug, Clone)]
struct RunArtifacts {
    events_file: PathBuf,
    summary_file: PathBuf,
    junit_file: PathBuf,
}

/// Executes a scenario bundle and records artifacts.
pub struct ScenarioRunner {
    bundle: PathBuf,
    output_root: PathBuf,
    run_id: String,
    executor: Box<dyn StepExecutor>,
}

impl ScenarioRunner {
    /// Create a runner for one bundle.
    ///
    /// `run_id` names the artifact directory under `output_root`; a fresh
    /// UUID is used when absent.
    pub fn new(
        bundle: PathBuf,
        output_root: PathBuf,
        run_id: Option<String>,
        executor: Box<dyn StepExecutor>,
    ) -> Self {
        Self {
            bundle,
            output_root,
            run_id: run_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            executor,
        }
    }

    /// Identifier of this run.
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Execute the scenario and write all artifacts.
    ///
    /// A missing or malformed scenario document is fatal and produces no
    /// artifacts. Per-step failures are recorded and the run continues.
    pub async fn run(&self) -> anyhow::Result<ScenarioResult> {
        let scenario_path = scenario::scenario_file(&self.bundle);
        let scenario = scenario::load_scenario(&scenario_path)?;
        let artifacts = self.prepare_artifacts()?;
        let mut events = fs::File::create(&artifacts.events_file)?;

        info!(
            scenario = %scenario.scenario_id,
            service = %scenario.service,
            steps = scenario.steps.len(),
            run_id = %self.run_id,
            "Scenario run starting"
        );

        let run_started_at = Utc::now().to_rfc3339();
        let timer = Instant::now();
        let mut results: Vec<StepResult> = Vec::new();
        for (i, step) in scenario.steps.iter().enumerate() {
            let result = self.execute_step(&scenario, step, i + 1).await;

            // One line per step, flushed immediately, so partial progress
            // survives a crash.
            writeln!(events, "{}", serde_json::to_string(&result)?)?;
            events.flush()?;

            match result.status {
                StepStatus::Passed => info!(
                    step = %result.step_name,
                    index = result.step_index,
                    duration_ms = result.duration_ms,
                    "Step passed"
                ),
                StepStatus::Failed => warn!(
                    step = %result.step_name,
                    index = result.step_index,
                    error = result.error.as_deref().unwrap_or(""),
                    "Step failed"
                ),
            }
            results.push(result);
        }
        let run_finished_at = Utc::now().to_rfc3339();
        let duration_ms = timer.elapsed().as_secs_f64() * 1000.0;

        let summary = build_summary(
            &scenario,
            &self.run_id,
            run_started_at,
            run_finished_at,
            duration_ms,
            &results,
            &artifacts,
        );
        fs::write(
            &artifacts.summary_file,
            serde_json::to_string_pretty(&summary)?,
        )?;
        fs::write(
            &artifacts.junit_file,
            junit::render(&scenario.scenario_id, &scenario.service, &results),
        )?;

        info!(
            total = summary.total_steps,
            passed = summary.passed_steps,
            failed = summary.failed_steps,
            duration_ms = summary.duration_ms,
            "Scenario run finished"
        );
        Ok(summary)
    }

    async fn execute_step(
        &self,
        scenario: &Scenario,
        step: &ScenarioStep,
        step_index: usize,
    ) -> StepResult {
        let started_at = Utc::now().to_rfc3339();
        let timer = Instant::now();
        let outcome = self.perform_step(scenario, step).await;
        let duration_ms = timer.elapsed().as_secs_f64() * 1000.0;
        let finished_at = Utc::now().to_rfc3339();

        let (status, error, trace) = match outcome {
            Ok(()) => (StepStatus::Passed, None, None),
            Err(e) => {
                let trace = error_trace(&e);
                (StepStatus::Failed, Some(e.to_string()), Some(trace))
            }
        };

        StepResult {
            step_index,
            step_name: step.name.clone(),
            status,
            started_at,
            finished_at,
            duration_ms,
            assertions: step.assertions.clone(),
            error,
            trace,
        }
    }

    async fn perform_step(
        &self,
        scenario: &Scenario,
        step: &ScenarioStep,
    ) -> Result<(), StepError> {
        let payload = scenario::resolve_payload(&self.bundle, step.request.payload.as_deref())?;
        let protocol = step.protocol.as_deref().unwrap_or(&scenario.protocol);
        let execution = self.executor.execute(protocol, step, payload.as_ref()).await?;
        assertions::evaluate(&step.name, &step.assertions, &execution)
    }

    fn prepare_artifacts(&self) -> anyhow::Result<RunArtifacts> {
        let run_dir = self.output_root.join(&self.run_id);
        fs::create_dir_all(&run_dir)?;
        Ok(RunArtifacts {
            events_file: run_dir.join("events.jsonl"),
            summary_file: run_dir.join("summary.json"),
            junit_file: run_dir.join("results.junit.xml"),
        })
    }
}

fn build_summary(
    scenario: &Scenario,
    run_id: &str,
    started_at: String,
    finished_at: String,
    duration_ms: f64,
    results: &[StepResult],
    artifacts: &RunArtifacts,
) -> ScenarioResult {
    let failures: Vec<StepFailure> = results
        .iter()
        .filter(|r| r.status == StepStatus::Failed)
        .map(|r| StepFailure {
            step_name: r.step_name.clone(),
            error: r.error.clone(),
            trace: r.trace.clone(),
        })
        .collect();

    ScenarioResult {
        scenario_id: scenario.scenario_id.clone(),
        service: scenario.service.clone(),
        version: scenario.version.clone(),
        protocol: scenario.protocol.clone(),
        run_id: run_id.to_string(),
        started_at,
        finished_at,
        duration_ms,
        total_steps: results.len(),
        passed_steps: results.len() - failures.len(),
        failed_steps: failures.len(),
        failures,
        metadata: scenario.metadata.clone(),
        events_file: artifacts.events_file.display().to_string(),
        summary_file: artifacts.summary_file.display().to_string(),
        junit_file: artifacts.junit_file.display().to_string(),
    }
}

/// Flatten an error and its causes into one readable chain.
fn error_trace(error: &StepError) -> String {
    let mut out = error.to_string();
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        out.push_str("\ncaused by: ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}
