//! [`EvaluationGateway`] backed by the `opa` command line tool.

use std::ffi::OsString;

use async_trait::async_trait;
use opascan_core::{Binding, EvaluationGateway, EvaluationRequest, GatewayError};
use tracing::{debug, info};

use crate::config::OpaConfig;
use crate::output::{parse_eval_output, summarize_errors};
use crate::process::{self, ProcessOutput};
use crate::workspace::PolicyWorkspace;

/// Runs `opa check` then `opa eval` for each request.
///
/// Every request gets its own scratch directory, so one gateway can serve
/// concurrent scans.
#[derive(Debug, Clone, Default)]
pub struct OpaCliGateway {
    config: OpaConfig,
}

impl OpaCliGateway {
    pub fn new(config: OpaConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OpaConfig {
        &self.config
    }

    /// Arguments for `opa check`.
    pub fn check_args(&self, workspace: &PolicyWorkspace) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["check".into(), "--format".into(), "json".into()];
        if self.config.v0_compatible {
            args.push("--v0-compatible".into());
        }
        args.push(workspace.modules_dir().into_os_string());
        args
    }

    /// Arguments for `opa eval`.
    pub fn eval_args(&self, workspace: &PolicyWorkspace, query: &str) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["eval".into(), "--format".into(), "json".into()];
        if self.config.v0_compatible {
            args.push("--v0-compatible".into());
        }
        args.push("--data".into());
        args.push(workspace.modules_dir().into_os_string());
        args.push("--input".into());
        args.push(workspace.input_path().into_os_string());
        args.push(query.into());
        args
    }

    async fn invoke(&self, args: &[OsString]) -> Result<ProcessOutput, String> {
        process::run(&self.config.binary, args, self.config.timeout_secs)
            .await
            .map_err(|e| e.to_string())
    }
}

#[async_trait]
impl EvaluationGateway for OpaCliGateway {
    async fn evaluate(&self, request: &EvaluationRequest) -> Result<Vec<Binding>, GatewayError> {
        let workspace = PolicyWorkspace::materialize(request).await.map_err(|e| {
            GatewayError::Evaluation(format!("failed to prepare policy workspace: {}", e))
        })?;
        debug!(root = %workspace.root().display(), modules = request.modules.len(), "Materialized policy workspace");

        let check = self
            .invoke(&self.check_args(&workspace))
            .await
            .map_err(GatewayError::Compile)?;
        if !check.success() {
            let summary = summarize_errors(&check.stdout, &check.stderr);
            return Err(GatewayError::Compile(workspace.rewrite_paths(&summary)));
        }

        let eval = self
            .invoke(&self.eval_args(&workspace, &request.query))
            .await
            .map_err(GatewayError::Evaluation)?;
        if !eval.success() {
            let summary = summarize_errors(&eval.stdout, &eval.stderr);
            return Err(GatewayError::Evaluation(workspace.rewrite_paths(&summary)));
        }

        let bindings = parse_eval_output(&eval.stdout).map_err(|e| {
            GatewayError::Evaluation(format!("unreadable opa eval output: {}", e))
        })?;

        info!(
            bindings = bindings.len(),
            check_ms = check.duration_ms,
            eval_ms = eval.duration_ms,
            "Policy evaluation finished"
        );
        Ok(bindings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opascan_core::RULES_QUERY;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn strings(args: &[OsString]) -> Vec<String> {
        args.iter().map(|a| a.to_string_lossy().into_owned()).collect()
    }

    #[tokio::test]
    async fn builds_check_and_eval_arguments() {
        let request = EvaluationRequest::new(json!({}), BTreeMap::new());
        let workspace = PolicyWorkspace::materialize(&request).await.unwrap();
        let gateway = OpaCliGateway::default();

        let modules = workspace.modules_dir().to_string_lossy().into_owned();
        let input = workspace.input_path().to_string_lossy().into_owned();

        assert_eq!(
            strings(&gateway.check_args(&workspace)),
            vec!["check", "--format", "json", modules.as_str()]
        );
        assert_eq!(
            strings(&gateway.eval_args(&workspace, RULES_QUERY)),
            vec![
                "eval",
                "--format",
                "json",
                "--data",
                modules.as_str(),
                "--input",
                input.as_str(),
                "data.rules[_].rule"
            ]
        );
    }

    #[tokio::test]
    async fn v0_flag_is_passed_to_both_commands() {
        let request = EvaluationRequest::new(json!({}), BTreeMap::new());
        let workspace = PolicyWorkspace::materialize(&request).await.unwrap();
        let gateway = OpaCliGateway::new(OpaConfig::default().with_v0_compatible(true));

        assert!(strings(&gateway.check_args(&workspace)).contains(&"--v0-compatible".to_string()));
        assert!(strings(&gateway.eval_args(&workspace, RULES_QUERY))
            .contains(&"--v0-compatible".to_string()));
    }

    #[tokio::test]
    async fn missing_binary_is_compile_failure() {
        let gateway = OpaCliGateway::new(OpaConfig::default().with_binary("opascan-no-such-opa"));
        let request = EvaluationRequest::new(json!({}), BTreeMap::new());

        let err = gateway.evaluate(&request).await.unwrap_err();
        match err {
            GatewayError::Compile(msg) => assert!(msg.contains("opascan-no-such-opa")),
            other => panic!("expected Compile, got {other:?}"),
        }
    }
}
