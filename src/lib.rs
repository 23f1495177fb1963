//! Smoke Runtime
//!
//! Contract-driven smoke testing runtime: serves protocol-aware mock
//! backends from a static configuration, and drives scripted scenarios
//! against any compatible backend, recording pass/fail artifacts.
//!
//! # Features
//!
//! - **Mock servers**: one HTTP endpoint per declared server, REST/SOAP/RPC
//!   aware, first-match-wins routing with static responses
//! - **Latency simulation**: per-route artificial delay
//! - **Scenario execution**: ordered steps, continue-on-failure, fixed
//!   assertion grammar
//! - **Run artifacts**: incremental event stream (`events.jsonl`), run
//!   summary (`summary.json`) and JUnit report (`results.junit.xml`)
//!
//! # Example Mock Configuration
//!
//! ```yaml
//! service: Payments
//! version: 1.0.0
//! protocol: openapi
//! servers:
//!   - name: payments-rest
//!     protocol: rest
//!     host: 127.0.0.1
//!     port: 9101
//!     routes:
//!       - operation: listPayments
//!         matcher:
//!           method: GET
//!           path: /payments
//!         response:
//!           status: 200
//!           body:
//!             items: []
//! ```

pub mod assertions;
pub mod config;
pub mod error;
pub mod executor;
pub mod junit;
pub mod listener;
pub mod matcher;
pub mod runner;
pub mod runtime;
pub mod scenario;

pub use config::MockConfig;
pub use error::StepError;
pub use executor::HttpStepExecutor;
pub use runner::{ScenarioResult, ScenarioRunner};
pub use runtime::MockRuntime;
pub use scenario::Scenario;
