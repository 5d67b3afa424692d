//! Pass/fail verdict over a scan result.

use serde::{Deserialize, Serialize};

use crate::domain::{RuleResult, ScanResult};

/// Verdict handed to the caller's orchestration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanVerdict {
    /// Whether no rule reported a violation.
    pub passed: bool,

    /// Rules with `valid == "false"`, in result order.
    pub failures: Vec<RuleResult>,

    /// Summary message.
    pub message: String,
}

impl ScanVerdict {
    pub fn from_result(result: &ScanResult) -> Self {
        let failures: Vec<RuleResult> = result.violations().cloned().collect();
        let passed = failures.is_empty();
        let message = if passed {
            format!("All {} rule(s) passed", result.len())
        } else {
            format!(
                "{} of {} rule(s) failed",
                failures.len(),
                result.len()
            )
        };

        Self {
            passed,
            failures,
            message,
        }
    }

    /// JSON array of the failing rules, as reported back to a pipeline.
    pub fn failure_payload(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.failures)
    }
}
