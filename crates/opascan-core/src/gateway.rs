//! Policy evaluation boundary.
//!
//! The engine itself lives outside this crate; scans talk to it through
//! [`EvaluationGateway`].

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Query evaluated against every rule set.
pub const RULES_QUERY: &str = "data.rules[_].rule";

/// Engine failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// The module set does not compile.
    #[error("{0}")]
    Compile(String),

    /// Evaluation failed after a successful compile.
    #[error("{0}")]
    Evaluation(String),
}

/// One query binding: the value of each expression in the query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Binding {
    pub expressions: Vec<Value>,
}

impl Binding {
    pub fn new(expressions: Vec<Value>) -> Self {
        Self { expressions }
    }
}

/// Everything the engine needs for one evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationRequest {
    /// Canonical input document.
    pub input: Value,
    /// Module name to module source. Rule modules are keyed by source URI,
    /// libraries by library name.
    pub modules: BTreeMap<String, String>,
    pub query: String,
}

impl EvaluationRequest {
    pub fn new(input: Value, modules: BTreeMap<String, String>) -> Self {
        Self {
            input,
            modules,
            query: RULES_QUERY.to_string(),
        }
    }
}

/// Compiles modules and evaluates the rules query.
#[async_trait]
pub trait EvaluationGateway: Send + Sync {
    /// Bindings in engine order. An empty vector means nothing matched.
    async fn evaluate(&self, request: &EvaluationRequest) -> Result<Vec<Binding>, GatewayError>;
}
