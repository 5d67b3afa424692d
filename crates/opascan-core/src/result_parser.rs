//! Decode engine bindings into rule results.

use serde::Deserialize;
use serde_json::Value;

use crate::domain::{Result, RuleResult, ScanError, ScanResult};
use crate::gateway::Binding;

/// Flatten every expression of every binding into one ordered result.
///
/// Each expression value must be an array of rule result objects. Any other
/// shape is an evaluation error naming the offending position.
pub fn parse_bindings(bindings: &[Binding]) -> Result<ScanResult> {
    let mut rules = Vec::new();

    for (b, binding) in bindings.iter().enumerate() {
        for (e, expression) in binding.expressions.iter().enumerate() {
            let Value::Array(items) = expression else {
                return Err(ScanError::Evaluation(format!(
                    "binding {} expression {}: expected an array of rule results, got {}",
                    b,
                    e,
                    kind(expression)
                )));
            };

            for (i, item) in items.iter().enumerate() {
                let rule = RuleResult::deserialize(item).map_err(|err| {
                    ScanError::Evaluation(format!(
                        "binding {} expression {} item {}: {}",
                        b, e, i, err
                    ))
                })?;
                rules.push(rule);
            }
        }
    }

    Ok(ScanResult::new(rules))
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
