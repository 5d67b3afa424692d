//! opascan-engine: Open Policy Agent integration
//!
//! Implements [`opascan_core::EvaluationGateway`] on top of the `opa` binary.
//! Each evaluation writes the modules and canonical input to a scratch
//! directory, type-checks the modules with `opa check`, then runs
//! `opa eval --format json` and decodes the bindings.

pub mod config;
pub mod gateway;
pub mod output;
pub mod process;
pub mod workspace;

pub use config::{ConfigError, OpaConfig, DEFAULT_BINARY, DEFAULT_TIMEOUT_SECS};
pub use gateway::OpaCliGateway;
pub use output::{parse_eval_output, summarize_errors};
pub use workspace::PolicyWorkspace;
