//! Dialect runners.
//!
//! A runner knows how to recognise one IaC dialect, how to rewrite its
//! documents into canonical fragments, and which policy libraries its rules
//! rely on. [`RunnerRegistry`] resolves the dialect of an input once per
//! scan.

mod cloudformation;
mod terraform;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::domain::{Result, ScanError};

pub use cloudformation::CloudFormationRunner;
pub use terraform::TerraformRunner;

/// Supported input dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dialect {
    Terraform,
    #[serde(rename = "cloudformation")]
    CloudFormation,
}

impl Dialect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::Terraform => "terraform",
            Dialect::CloudFormation => "cloudformation",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dialect {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "terraform" | "tf" => Ok(Dialect::Terraform),
            "cloudformation" | "cfn" => Ok(Dialect::CloudFormation),
            other => Err(ScanError::InvalidDialect(format!(
                "unknown dialect `{}`",
                other
            ))),
        }
    }
}

/// A decoded input document awaiting transformation.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedDocument {
    pub uri: String,
    pub value: Value,
    pub hint: Option<String>,
}

/// Per-dialect behaviour.
pub trait DialectRunner: Send + Sync {
    fn dialect(&self) -> Dialect;

    /// Whether `document` carries this dialect's marker.
    fn identify(&self, document: &Value) -> bool;

    /// Rewrite one document into a canonical fragment.
    fn transform(&self, uri: &str, document: Value) -> Result<Value>;

    /// Embedded policy libraries this dialect's rules import.
    fn dependencies(&self) -> &'static [&'static str];

    /// Whether deployment parameters are substituted into transformed
    /// documents.
    fn accepts_parameters(&self) -> bool {
        true
    }
}

/// Ordered set of runners plus the fallback dialect.
pub struct RunnerRegistry {
    runners: Vec<Box<dyn DialectRunner>>,
    fallback: Dialect,
}

impl Default for RunnerRegistry {
    fn default() -> Self {
        Self {
            runners: vec![Box::new(TerraformRunner), Box::new(CloudFormationRunner)],
            fallback: Dialect::CloudFormation,
        }
    }
}

impl RunnerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn runner(&self, dialect: Dialect) -> Result<&dyn DialectRunner> {
        self.runners
            .iter()
            .find(|r| r.dialect() == dialect)
            .map(|r| r.as_ref())
            .ok_or_else(|| ScanError::InvalidDialect(format!("no runner registered for {}", dialect)))
    }

    /// Pick the dialect of an input set.
    ///
    /// Caller hints win when they agree. Otherwise a marker is only honoured
    /// on a single-document input; a marker inside a multi-document input is
    /// rejected. Everything else falls back to CloudFormation.
    pub fn resolve(&self, documents: &[DecodedDocument]) -> Result<Dialect> {
        if let Some(dialect) = resolve_hints(documents)? {
            debug!(dialect = %dialect, "Dialect taken from caller hint");
            return Ok(dialect);
        }

        for runner in self.runners.iter().filter(|r| r.dialect() != self.fallback) {
            let marked: Vec<&str> = documents
                .iter()
                .filter(|d| runner.identify(&d.value))
                .map(|d| d.uri.as_str())
                .collect();

            if marked.is_empty() {
                continue;
            }
            if documents.len() == 1 {
                return Ok(runner.dialect());
            }
            return Err(ScanError::InvalidDialect(format!(
                "{} input must be a single document, found {} documents ({} marked: {})",
                runner.dialect(),
                documents.len(),
                runner.dialect(),
                marked.join(", ")
            )));
        }

        Ok(self.fallback)
    }
}

fn resolve_hints(documents: &[DecodedDocument]) -> Result<Option<Dialect>> {
    let mut resolved: Option<Dialect> = None;
    for doc in documents {
        let Some(hint) = doc.hint.as_deref() else {
            continue;
        };
        let dialect: Dialect = hint.parse()?;
        match resolved {
            Some(existing) if existing != dialect => {
                return Err(ScanError::InvalidDialect(format!(
                    "conflicting dialect hints: {} and {}",
                    existing, dialect
                )));
            }
            _ => resolved = Some(dialect),
        }
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(uri: &str, value: Value) -> DecodedDocument {
        DecodedDocument {
            uri: uri.to_string(),
            value,
            hint: None,
        }
    }

    fn hinted(uri: &str, hint: &str) -> DecodedDocument {
        DecodedDocument {
            uri: uri.to_string(),
            value: json!({}),
            hint: Some(hint.to_string()),
        }
    }

    #[test]
    fn single_plan_is_terraform() {
        let registry = RunnerRegistry::new();
        let docs = vec![doc("tfplan.json", json!({"terraform_version": "1.5.7"}))];
        assert_eq!(registry.resolve(&docs).unwrap(), Dialect::Terraform);
    }

    #[test]
    fn unmarked_input_is_cloudformation() {
        let registry = RunnerRegistry::new();
        let docs = vec![
            doc("a.json", json!({"Resources": {}})),
            doc("b.json", json!({"Resources": {}})),
        ];
        assert_eq!(registry.resolve(&docs).unwrap(), Dialect::CloudFormation);
    }

    #[test]
    fn plan_among_several_documents_is_rejected() {
        let registry = RunnerRegistry::new();
        let docs = vec![
            doc("tfplan.json", json!({"terraform_version": "1.5.7"})),
            doc("vpc.json", json!({"Resources": {}})),
        ];
        let err = registry.resolve(&docs).unwrap_err();
        assert!(matches!(err, ScanError::InvalidDialect(_)));
        assert!(err.to_string().contains("tfplan.json"));
    }

    #[test]
    fn agreeing_hints_override_markers() {
        let registry = RunnerRegistry::new();
        let mut plan = doc("tfplan.json", json!({"terraform_version": "1.5.7"}));
        plan.hint = Some("cloudformation".to_string());
        assert_eq!(registry.resolve(&[plan]).unwrap(), Dialect::CloudFormation);
    }

    #[test]
    fn conflicting_hints_are_rejected() {
        let registry = RunnerRegistry::new();
        let docs = vec![hinted("a.json", "terraform"), hinted("b.json", "cfn")];
        assert!(matches!(
            registry.resolve(&docs).unwrap_err(),
            ScanError::InvalidDialect(_)
        ));
    }

    #[test]
    fn unknown_hint_is_rejected() {
        let registry = RunnerRegistry::new();
        let err = registry.resolve(&[hinted("a.json", "pulumi")]).unwrap_err();
        assert!(err.to_string().contains("pulumi"));
    }

    #[test]
    fn dialect_names_round_trip() {
        for dialect in [Dialect::Terraform, Dialect::CloudFormation] {
            assert_eq!(dialect.to_string().parse::<Dialect>().unwrap(), dialect);
        }
        assert_eq!(
            serde_json::to_string(&Dialect::CloudFormation).unwrap(),
            "\"cloudformation\""
        );
    }

    #[test]
    fn runners_declare_libraries() {
        let registry = RunnerRegistry::new();
        assert_eq!(
            registry.runner(Dialect::Terraform).unwrap().dependencies(),
            &["terraform_utils", "utils"]
        );
        assert_eq!(
            registry.runner(Dialect::CloudFormation).unwrap().dependencies(),
            &["cloudformation_utils", "utils"]
        );
    }
}
