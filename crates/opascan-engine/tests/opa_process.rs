//! OpaCliGateway against a scripted stand-in for `opa`, plus the real
//! binary when it is installed.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use opascan_core::{libraries, parse_bindings, EvaluationGateway, EvaluationRequest, GatewayError};
use opascan_engine::{OpaCliGateway, OpaConfig};
use serde_json::json;

#[cfg(unix)]
fn script(dir: &Path, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("opa");
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn request() -> EvaluationRequest {
    let mut modules = BTreeMap::new();
    modules.insert(
        "s3://rules/tags.rego".to_string(),
        "package rules.tags\n\nrule := []\n".to_string(),
    );
    EvaluationRequest::new(json!({"Resources": {}}), modules)
}

fn gateway_for(binary: &Path) -> OpaCliGateway {
    OpaCliGateway::new(
        OpaConfig::default()
            .with_binary(binary.to_string_lossy())
            .with_timeout_secs(10),
    )
}

#[cfg(unix)]
#[tokio::test]
async fn eval_output_becomes_bindings() {
    let dir = tempfile::tempdir().unwrap();
    let opa = script(
        dir.path(),
        r#"case "$1" in
  check) exit 0 ;;
  eval) echo '{"result":[{"expressions":[{"value":[{"id":"TAG_001","message":"LB has no tags","type":"tagging","valid":"false"}],"text":"data.rules[_].rule"}]}]}' ;;
  *) exit 2 ;;
esac"#,
    );

    let bindings = gateway_for(&opa).evaluate(&request()).await.unwrap();
    let result = parse_bindings(&bindings).unwrap();

    assert_eq!(result.len(), 1);
    assert_eq!(result.rules[0].id, "TAG_001");
    assert!(result.rules[0].is_violation());
}

#[cfg(unix)]
#[tokio::test]
async fn undefined_query_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let opa = script(
        dir.path(),
        r#"case "$1" in
  check) exit 0 ;;
  eval) echo '{}' ;;
esac"#,
    );

    let bindings = gateway_for(&opa).evaluate(&request()).await.unwrap();
    assert!(bindings.is_empty());
}

#[cfg(unix)]
#[tokio::test]
async fn check_failure_is_compile_error_naming_the_module() {
    let dir = tempfile::tempdir().unwrap();
    let opa = script(
        dir.path(),
        r#"if [ "$1" = "check" ]; then
  f=$(ls "$4"/*.rego | head -n1)
  printf '{"errors":[{"code":"rego_parse_error","message":"unexpected eof token","location":{"file":"%s","row":3,"col":1}}]}' "$f"
  exit 1
fi
exit 0"#,
    );

    let err = gateway_for(&opa).evaluate(&request()).await.unwrap_err();

    assert_eq!(
        err,
        GatewayError::Compile(
            "s3://rules/tags.rego:3: rego_parse_error: unexpected eof token".to_string()
        )
    );
}

#[cfg(unix)]
#[tokio::test]
async fn eval_failure_is_evaluation_error() {
    let dir = tempfile::tempdir().unwrap();
    let opa = script(
        dir.path(),
        r#"if [ "$1" = "eval" ]; then
  echo "eval_conflict_error: complete rules must not produce multiple outputs" >&2
  exit 1
fi
exit 0"#,
    );

    let err = gateway_for(&opa).evaluate(&request()).await.unwrap_err();
    match err {
        GatewayError::Evaluation(msg) => assert!(msg.contains("eval_conflict_error")),
        other => panic!("expected Evaluation, got {other:?}"),
    }
}

#[cfg(unix)]
#[tokio::test]
async fn hung_engine_times_out() {
    let dir = tempfile::tempdir().unwrap();
    let opa = script(dir.path(), "sleep 30");
    let gateway = OpaCliGateway::new(
        OpaConfig::default()
            .with_binary(opa.to_string_lossy())
            .with_timeout_secs(1),
    );

    let err = gateway.evaluate(&request()).await.unwrap_err();
    match err {
        GatewayError::Compile(msg) => assert!(msg.contains("timed out after 1 seconds")),
        other => panic!("expected Compile timeout, got {other:?}"),
    }
}

fn opa_installed() -> bool {
    std::process::Command::new("opa")
        .arg("version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

#[tokio::test]
async fn real_opa_evaluates_rules_with_embedded_libraries() {
    if !opa_installed() {
        eprintln!("opa not on PATH, skipping");
        return;
    }

    let mut modules = BTreeMap::new();
    for name in ["utils", "cloudformation_utils"] {
        modules.insert(name.to_string(), libraries::library(name).unwrap().to_string());
    }
    modules.insert(
        "rules/tags.rego".to_string(),
        r#"package rules.tags

import data.lib.cloudformation_utils as cfn
import data.lib.utils
import rego.v1

rule contains result if {
	some name, resource in cfn.resources
	count(resource.tags) == 0
	result := utils.result("TAG_001", sprintf("%s has no tags", [name]), "tagging", false)
}
"#
        .to_string(),
    );

    let input = json!({"Resources": {
        "WebServer": {"address": "AWS::EC2::Instance.WebServer", "type": "AWS::EC2::Instance", "name": "WebServer", "tags": {"team": "web"}},
        "LB": {"address": "AWS::ElasticLoadBalancingV2::LoadBalancer.LB", "type": "AWS::ElasticLoadBalancingV2::LoadBalancer", "name": "LB", "tags": {}}
    }});

    let bindings = OpaCliGateway::default()
        .evaluate(&EvaluationRequest::new(input, modules))
        .await
        .unwrap();
    let result = parse_bindings(&bindings).unwrap();

    assert_eq!(result.len(), 1);
    assert_eq!(result.rules[0].message, "LB has no tags");
    assert_eq!(result.rules[0].valid, "false");
}
