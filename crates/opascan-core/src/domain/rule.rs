//! Rule outcomes returned by the policy engine.

use serde::{Deserialize, Deserializer, Serialize};

/// Outcome of one policy rule.
///
/// `valid` is string-encoded (`"true"` / `"false"`) to stay compatible with
/// existing rule libraries; engines that emit a JSON boolean are accepted
/// and normalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleResult {
    pub id: String,
    #[serde(default)]
    pub message: String,
    #[serde(rename = "type", default)]
    pub rule_type: String,
    #[serde(deserialize_with = "deserialize_valid")]
    pub valid: String,
}

impl RuleResult {
    pub fn new(id: &str, message: &str, rule_type: &str, valid: bool) -> Self {
        Self {
            id: id.to_string(),
            message: message.to_string(),
            rule_type: rule_type.to_string(),
            valid: valid.to_string(),
        }
    }

    /// Whether the rule reported a violation.
    pub fn is_violation(&self) -> bool {
        self.valid == "false"
    }
}

fn deserialize_valid<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Valid {
        Flag(bool),
        Text(String),
    }

    Ok(match Valid::deserialize(deserializer)? {
        Valid::Flag(flag) => flag.to_string(),
        Valid::Text(text) => text,
    })
}

/// Ordered rule outcomes of one scan. Serializes as a bare JSON array.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScanResult {
    pub rules: Vec<RuleResult>,
}

impl ScanResult {
    pub fn new(rules: Vec<RuleResult>) -> Self {
        Self { rules }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Rules whose `valid` is `"false"`, in result order.
    pub fn violations(&self) -> impl Iterator<Item = &RuleResult> {
        self.rules.iter().filter(|r| r.is_violation())
    }
}
