//! opascan-core: IaC normalization and policy scan orchestration
//!
//! Turns CloudFormation templates or a Terraform plan into one canonical
//! JSON document, substitutes deployment parameters, and hands the result to
//! a policy engine together with the rule modules.
//!
//! ## Layer 1 - Scan pipeline
//!
//! - `parameters`: the `key=value,key=[a,b]` grammar
//! - `dialect`: runners that recognise and canonicalise each IaC dialect
//! - `substitution` / `merge`: Ref replacement and deep merge of fragments
//! - `gateway` / `result_parser`: the engine boundary and its output
//! - `scanner`: orchestration of a single scan
//! - `verdict`: pass/fail summary for pipelines

pub mod dialect;
pub mod domain;
pub mod fakes;
pub mod gateway;
pub mod libraries;
pub mod merge;
pub mod obs;
pub mod parameters;
pub mod result_parser;
pub mod scanner;
pub mod substitution;
pub mod telemetry;
pub mod verdict;

pub use dialect::{
    CloudFormationRunner, DecodedDocument, Dialect, DialectRunner, RunnerRegistry, TerraformRunner,
};
pub use domain::{Resource, Result, RuleResult, ScanError, ScanResult};
pub use gateway::{Binding, EvaluationGateway, EvaluationRequest, GatewayError, RULES_QUERY};
pub use merge::{deep_merge, merge_all, merge_with_policy, MergePolicy};
pub use parameters::{ParameterError, ParameterSet};
pub use result_parser::parse_bindings;
pub use scanner::{
    build_canonical_input, split_rules, ScanOptions, ScanReport, ScanRequest, Scanner,
};
pub use substitution::{substitute, SubstitutionMode};
pub use verdict::ScanVerdict;
