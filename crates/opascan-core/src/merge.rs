//! Deep merge of canonical fragments.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::{Result, ScanError};

/// What happens when two fragments disagree on a leaf.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergePolicy {
    /// The later fragment overwrites the earlier one.
    #[default]
    LastWins,
    /// A differing leaf is a `MergeConflict`.
    RejectConflicts,
}

/// Merge `fragment` into `acc`.
///
/// For each key in `fragment`: when both sides hold objects they are merged
/// recursively, otherwise the fragment's value replaces the accumulator's.
pub fn deep_merge(acc: &mut Map<String, Value>, fragment: Map<String, Value>) {
    for (key, incoming) in fragment {
        match (acc.get_mut(&key), incoming) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                deep_merge(existing, incoming);
            }
            (_, incoming) => {
                acc.insert(key, incoming);
            }
        }
    }
}

/// Merge under `policy`. With `RejectConflicts` the accumulator is left
/// unspecified on error; callers discard it.
pub fn merge_with_policy(
    acc: &mut Map<String, Value>,
    fragment: Map<String, Value>,
    policy: MergePolicy,
) -> Result<()> {
    match policy {
        MergePolicy::LastWins => {
            deep_merge(acc, fragment);
            Ok(())
        }
        MergePolicy::RejectConflicts => merge_strict(acc, fragment, ""),
    }
}

fn merge_strict(acc: &mut Map<String, Value>, fragment: Map<String, Value>, path: &str) -> Result<()> {
    for (key, incoming) in fragment {
        let child_path = format!("{}/{}", path, key);
        match (acc.get_mut(&key), incoming) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                merge_strict(existing, incoming, &child_path)?;
            }
            (Some(existing), incoming) => {
                if *existing != incoming {
                    return Err(ScanError::MergeConflict { path: child_path });
                }
            }
            (None, incoming) => {
                acc.insert(key, incoming);
            }
        }
    }
    Ok(())
}

/// Fold fragments left to right into one tree.
pub fn merge_all<I>(fragments: I, policy: MergePolicy) -> Result<Map<String, Value>>
where
    I: IntoIterator<Item = Map<String, Value>>,
{
    let mut acc = Map::new();
    for fragment in fragments {
        merge_with_policy(&mut acc, fragment, policy)?;
    }
    Ok(acc)
}
