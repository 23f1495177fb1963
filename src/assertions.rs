//! Assertion clause evaluation.
//!
//! The grammar is fixed and line-oriented: `status == <int>` and
//! `response_time_ms < <float>`. Clauses outside the grammar are skipped with
//! a warning rather than rejected, so configurations can carry clauses meant
//! for other consumers.

use crate::error::StepError;
use crate::executor::ExecutionResult;
use tracing::warn;

/// Evaluate a step's assertion clauses against its execution outcome.
///
/// Stops at the first failing clause; later clauses are not evaluated.
pub fn evaluate(
    step_name: &str,
    clauses: &[String],
    execution: &ExecutionResult,
) -> Result<(), StepError> {
    for clause in clauses {
        let text = clause.trim();
        if let Some(rest) = text.strip_prefix("status ==") {
            let expected: u16 = rest.trim().parse().map_err(|_| {
                StepError::Assertion(format!(
                    "Step '{}' has an invalid status assertion: '{}'",
                    step_name, text
                ))
            })?;
            if execution.status_code != expected {
                return Err(StepError::Assertion(format!(
                    "Step '{}' expected status {} but received {}",
                    step_name, expected, execution.status_code
                )));
            }
            continue;
        }
        if let Some(rest) = text.strip_prefix("response_time_ms <") {
            let threshold: f64 = rest.trim().parse().map_err(|_| {
                StepError::Assertion(format!(
                    "Step '{}' has an invalid response time assertion: '{}'",
                    step_name, text
                ))
            })?;
            if execution.elapsed_ms >= threshold {
                return Err(StepError::Assertion(format!(
                    "Step '{}' exceeded response time threshold {}ms ({:.3}ms observed)",
                    step_name, threshold, execution.elapsed_ms
                )));
            }
            continue;
        }
        warn!(step = %step_name, clause = %text, "Skipping unrecognized assertion clause");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(status_code: u16, elapsed_ms: f64) -> ExecutionResult {
        ExecutionResult {
            status_code,
            elapsed_ms,
            response_body: None,
        }
    }

    #[test]
    fn test_status_pass() {
        let clauses = vec!["status == 200".to_string()];
        assert!(evaluate("step", &clauses, &outcome(200, 5.0)).is_ok());
    }

    #[test]
    fn test_status_failure_names_expected_and_actual() {
        let clauses = vec!["status == 200".to_string()];
        let err = evaluate("step-fail", &clauses, &outcome(500, 5.0)).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("step-fail"));
        assert!(message.contains("200"));
        assert!(message.contains("500"));
    }

    #[test]
    fn test_response_time_strictly_below() {
        let clauses = vec!["response_time_ms < 100".to_string()];
        assert!(evaluate("step", &clauses, &outcome(200, 99.9)).is_ok());
        assert!(evaluate("step", &clauses, &outcome(200, 100.0)).is_err());
        assert!(evaluate("step", &clauses, &outcome(200, 150.0)).is_err());
    }

    #[test]
    fn test_unknown_clause_ignored() {
        let clauses = vec![
            "body contains item".to_string(),
            "status == 200".to_string(),
        ];
        assert!(evaluate("step", &clauses, &outcome(200, 5.0)).is_ok());
    }

    #[test]
    fn test_malformed_numeric_clause_fails() {
        let clauses = vec!["status == twohundred".to_string()];
        assert!(evaluate("step", &clauses, &outcome(200, 5.0)).is_err());
    }

    #[test]
    fn test_first_failure_stops_evaluation() {
        // The second clause would also fail; only the first is reported.
        let clauses = vec![
            "status == 200".to_string(),
            "response_time_ms < 0".to_string(),
        ];
        let err = evaluate("step", &clauses, &outcome(404, 10.0)).unwrap_err();
        assert!(err.to_string().contains("expected status 200"));
    }

    #[test]
    fn test_whitespace_tolerated() {
        let clauses = vec!["  status ==   200  ".to_string()];
        assert!(evaluate("step", &clauses, &outcome(200, 5.0)).is_ok());
    }
}
