//! Decoding of `opa` JSON output.

use opascan_core::Binding;
use serde::Deserialize;
use serde_json::Value;

/// `opa eval --format json` output. `result` is absent when the query is
/// undefined.
#[derive(Debug, Deserialize)]
struct EvalOutput {
    #[serde(default)]
    result: Vec<EvalResult>,
}

#[derive(Debug, Deserialize)]
struct EvalResult {
    #[serde(default)]
    expressions: Vec<EvalExpression>,
}

#[derive(Debug, Deserialize)]
struct EvalExpression {
    value: Value,
}

/// Error report printed by `opa check` and `opa eval` with `--format json`.
#[derive(Debug, Deserialize)]
struct ErrorReport {
    errors: Vec<EngineError>,
}

#[derive(Debug, Deserialize)]
struct EngineError {
    #[serde(default)]
    code: String,
    message: String,
    #[serde(default)]
    location: Option<ErrorLocation>,
}

#[derive(Debug, Deserialize)]
struct ErrorLocation {
    file: String,
    row: u64,
}

/// Bindings from `opa eval` stdout, in engine order.
pub fn parse_eval_output(stdout: &str) -> serde_json::Result<Vec<Binding>> {
    let output: EvalOutput = serde_json::from_str(stdout)?;
    Ok(output
        .result
        .into_iter()
        .map(|r| Binding::new(r.expressions.into_iter().map(|e| e.value).collect()))
        .collect())
}

/// One line per engine error, or the raw text when it is not a JSON report.
pub fn summarize_errors(stdout: &str, stderr: &str) -> String {
    for text in [stdout, stderr] {
        if let Ok(report) = serde_json::from_str::<ErrorReport>(text) {
            if !report.errors.is_empty() {
                return report
                    .errors
                    .iter()
                    .map(format_error)
                    .collect::<Vec<_>>()
                    .join("; ");
            }
        }
    }

    let stderr = stderr.trim();
    if stderr.is_empty() {
        stdout.trim().to_string()
    } else {
        stderr.to_string()
    }
}

fn format_error(err: &EngineError) -> String {
    let prefix = match &err.location {
        Some(loc) => format!("{}:{}: ", loc.file, loc.row),
        None => String::new(),
    };
    if err.code.is_empty() {
        format!("{}{}", prefix, err.message)
    } else {
        format!("{}{}: {}", prefix, err.code, err.message)
    }
}
