//! JUnit XML report rendering.
//!
//! Produces the standard `testsuite`/`testcase` structure CI systems ingest.
//! Failing steps carry a `failure` child whose message is the error text and
//! whose body is the captured trace.

use crate::runner::{StepResult, StepStatus};
use std::fmt::Write;

/// Render one scenario run as a JUnit test suite.
pub fn render(suite_name: &str, classname: &str, results: &[StepResult]) -> String {
    let failures = results
        .iter()
        .filter(|r| r.status == StepStatus::Failed)
        .count();

    let mut xml = String::new();
    xml.push_str("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");
    let _ = write!(
        xml,
        "<testsuite name=\"{}\" tests=\"{}\" failures=\"{}\">",
        escape(suite_name),
        results.len(),
        failures
    );
    for result in results {
        let _ = write!(
            xml,
            "<testcase classname=\"{}\" name=\"{}\" time=\"{}\">",
            escape(classname),
            escape(&result.step_name),
            result.duration_ms / 1000.0
        );
        if result.status == StepStatus::Failed {
            let message = result.error.as_deref().unwrap_or("Step failed");
            let body = result
                .trace
                .as_deref()
                .or(result.error.as_deref())
                .unwrap_or("");
            let _ = write!(
                xml,
                "<failure message=\"{}\">{}</failure>",
                escape(message),
                escape(body)
            );
        }
        xml.push_str("</testcase>");
    }
    xml.push_str("</testsuite>\n");
    xml
}

/// Minimal XML entity escaping for attribute and text content.
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}
