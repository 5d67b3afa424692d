//! Parameter substitution into transformed documents.
//!
//! The default `Textual` mode works on the serialized document: all
//! whitespace is removed and every `{"Ref":"<key>"}` token is replaced with
//! the parameter's literal. Existing rule libraries depend on that exact
//! behavior (including whitespace disappearing from string values), so it
//! stays the default. `Structured` mode replaces `{"Ref": key}` objects in
//! the decoded tree instead and leaves string contents alone.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{Result, ScanError};
use crate::parameters::ParameterSet;

/// How Ref placeholders are replaced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubstitutionMode {
    #[default]
    Textual,
    Structured,
}

/// Apply `params` to one transformed fragment.
///
/// `uri` names the source document in decode errors.
pub fn substitute(
    fragment: Value,
    params: &ParameterSet,
    mode: SubstitutionMode,
    uri: &str,
) -> Result<Value> {
    match mode {
        SubstitutionMode::Textual => {
            let serialized = serde_json::to_string(&fragment).map_err(|e| ScanError::Decode {
                uri: uri.to_string(),
                reason: e.to_string(),
            })?;
            let replaced = substitute_text(&serialized, params);
            serde_json::from_str(&replaced).map_err(|e| ScanError::Decode {
                uri: uri.to_string(),
                reason: format!("after parameter substitution: {}", e),
            })
        }
        SubstitutionMode::Structured => {
            let literals = decode_literals(params)?;
            let mut fragment = fragment;
            substitute_tree(&mut fragment, &literals);
            Ok(fragment)
        }
    }
}

/// Strip whitespace, then replace every Ref token with its literal.
pub fn substitute_text(serialized: &str, params: &ParameterSet) -> String {
    let mut text: String = serialized.chars().filter(|c| !c.is_whitespace()).collect();
    for (key, literal) in params.iter() {
        text = text.replace(&ParameterSet::ref_token(key), literal);
    }
    text
}

fn decode_literals(params: &ParameterSet) -> Result<HashMap<&str, Value>> {
    params
        .iter()
        .map(|(key, literal)| {
            serde_json::from_str(literal)
                .map(|value| (key, value))
                .map_err(|e| ScanError::Decode {
                    uri: format!("parameter {}", key),
                    reason: e.to_string(),
                })
        })
        .collect()
}

/// Replace `{"Ref": "<key>"}` objects in place.
fn substitute_tree(value: &mut Value, literals: &HashMap<&str, Value>) {
    if let Some(replacement) = ref_target(value).and_then(|key| literals.get(key)) {
        *value = replacement.clone();
        return;
    }

    match value {
        Value::Object(map) => {
            for child in map.values_mut() {
                substitute_tree(child, literals);
            }
        }
        Value::Array(items) => {
            for child in items.iter_mut() {
                substitute_tree(child, literals);
            }
        }
        _ => {}
    }
}

fn ref_target(value: &Value) -> Option<&str> {
    let map = value.as_object()?;
    if map.len() != 1 {
        return None;
    }
    map.get("Ref")?.as_str()
}
