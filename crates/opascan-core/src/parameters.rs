//! Deployment parameter parsing.
//!
//! Parameters arrive as one flat string, `key=value` pairs separated by
//! commas, where a value may be a bracketed list:
//!
//! ```text
//! foo1=abc,foo2=225,foo3=[value1,value2,value3]
//! ```
//!
//! Each value is encoded as the JSON literal that will replace
//! `{"Ref":"<key>"}` in a document: integers stay bare, lists become arrays
//! of strings, everything else becomes a string.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde_json::Value;

/// Errors in the parameter grammar.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParameterError {
    #[error("unbalanced brackets in parameter `{segment}`")]
    UnbalancedBrackets { segment: String },

    #[error("nested list in parameter `{segment}`")]
    NestedList { segment: String },

    #[error("parameter `{segment}` is missing `=`")]
    MissingEquals { segment: String },

    #[error("parameter `{segment}` has an empty key")]
    EmptyKey { segment: String },
}

/// Parsed parameters: raw key to literal-encoded value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterSet {
    values: BTreeMap<String, String>,
}

impl ParameterSet {
    /// Parse a raw parameter string. Empty input gives an empty set.
    pub fn parse(raw: &str) -> Result<Self, ParameterError> {
        let mut values = BTreeMap::new();

        for segment in split_top_level(raw)? {
            if segment.trim().is_empty() {
                continue;
            }
            let (key, value) = segment
                .split_once('=')
                .ok_or_else(|| ParameterError::MissingEquals {
                    segment: segment.to_string(),
                })?;
            let key = key.trim();
            if key.is_empty() {
                return Err(ParameterError::EmptyKey {
                    segment: segment.to_string(),
                });
            }
            values.insert(key.to_string(), encode_value(value));
        }

        Ok(Self { values })
    }

    /// Literal for `key`, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The placeholder replaced by the value of `key`.
    pub fn ref_token(key: &str) -> String {
        format!("{{\"Ref\":\"{}\"}}", key)
    }

    pub fn as_map(&self) -> &BTreeMap<String, String> {
        &self.values
    }
}

impl FromStr for ParameterSet {
    type Err = ParameterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Split on commas outside `[...]`. One level of brackets is allowed.
fn split_top_level(raw: &str) -> Result<Vec<&str>, ParameterError> {
    let mut segments = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;

    for (idx, ch) in raw.char_indices() {
        match ch {
            '[' => {
                depth += 1;
                if depth > 1 {
                    return Err(ParameterError::NestedList {
                        segment: segment_at(raw, start),
                    });
                }
            }
            ']' => {
                if depth == 0 {
                    return Err(ParameterError::UnbalancedBrackets {
                        segment: segment_at(raw, start),
                    });
                }
                depth -= 1;
            }
            ',' if depth == 0 => {
                segments.push(&raw[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }

    if depth != 0 {
        return Err(ParameterError::UnbalancedBrackets {
            segment: raw[start..].to_string(),
        });
    }
    segments.push(&raw[start..]);

    Ok(segments)
}

/// Text of the segment beginning at `start`, up to the next comma.
fn segment_at(raw: &str, start: usize) -> String {
    let rest = &raw[start..];
    rest.split(',').next().unwrap_or(rest).to_string()
}

fn encode_value(raw: &str) -> String {
    let unquoted = raw.replace('"', "");
    let value = unquoted.trim();

    if value.starts_with('[') {
        let inner = value.replace(['[', ']'], "");
        if inner.trim().is_empty() {
            return "[]".to_string();
        }
        let items: Vec<String> = inner
            .split(',')
            .map(|item| Value::String(item.trim().to_string()).to_string())
            .collect();
        return format!("[{}]", items.join(","));
    }

    if let Ok(number) = value.parse::<i64>() {
        return number.to_string();
    }

    Value::String(value.to_string()).to_string()
}
