//! Serverless scan events.
//!
//! A direct invocation names the input, rules and parameters itself. An
//! invocation from a CodePipeline action carries a `CodePipeline.job`
//! instead: the input is the first input artifact, the rules and parameters
//! come from the action's `UserParameters` JSON, and the result is written to
//! the first output artifact.

use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct ScanEvent {
    #[serde(default)]
    pub input: String,
    #[serde(default)]
    pub rules: Vec<String>,
    #[serde(default)]
    pub parameters: String,
    #[serde(rename = "CodePipeline.job", default)]
    pub job: Option<CodePipelineJob>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodePipelineJob {
    pub id: String,
    pub data: JobData,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobData {
    pub action_configuration: ActionConfiguration,
    #[serde(default)]
    pub input_artifacts: Vec<Artifact>,
    #[serde(default)]
    pub output_artifacts: Vec<Artifact>,
}

#[derive(Debug, Deserialize)]
pub struct ActionConfiguration {
    pub configuration: ActionSettings,
}

#[derive(Debug, Deserialize)]
pub struct ActionSettings {
    #[serde(rename = "UserParameters", default)]
    pub user_parameters: String,
}

#[derive(Debug, Deserialize)]
pub struct Artifact {
    pub location: ArtifactLocation,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactLocation {
    pub s3_location: S3Location,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct S3Location {
    pub bucket_name: String,
    pub object_key: String,
}

impl S3Location {
    pub fn uri(&self) -> String {
        format!("s3://{}/{}", self.bucket_name, self.object_key)
    }
}

/// Rules and parameters encoded in a CodePipeline action's `UserParameters`.
#[derive(Debug, Default, Deserialize)]
struct UserParameters {
    #[serde(default)]
    rules: Vec<String>,
    #[serde(default)]
    parameters: String,
}

/// What an event asks for, independent of where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub input: String,
    pub rules: Vec<String>,
    pub parameters: String,
    /// Where to write the result, if anywhere.
    pub output: Option<String>,
    pub job_id: Option<String>,
}

impl ScanEvent {
    pub fn into_invocation(self) -> Result<Invocation> {
        match self.job {
            Some(job) if !job.id.is_empty() => job.into_invocation(),
            _ => {
                if self.input.is_empty() {
                    anyhow::bail!("Scan event has no input");
                }
                Ok(Invocation {
                    input: self.input,
                    rules: self.rules,
                    parameters: self.parameters,
                    output: None,
                    job_id: None,
                })
            }
        }
    }
}

impl CodePipelineJob {
    fn into_invocation(self) -> Result<Invocation> {
        let raw = self.data.action_configuration.configuration.user_parameters;
        let user: UserParameters = if raw.trim().is_empty() {
            UserParameters::default()
        } else {
            serde_json::from_str(&raw)
                .with_context(|| format!("Job {} has invalid UserParameters", self.id))?
        };

        let input = self
            .data
            .input_artifacts
            .first()
            .with_context(|| format!("Job {} has no input artifact", self.id))?
            .location
            .s3_location
            .uri();
        let output = self
            .data
            .output_artifacts
            .first()
            .map(|artifact| artifact.location.s3_location.uri());

        Ok(Invocation {
            input,
            rules: user.rules,
            parameters: user.parameters,
            output,
            job_id: Some(self.id),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn codepipeline_event(user_parameters: &str) -> serde_json::Value {
        json!({
            "CodePipeline.job": {
                "id": "11111111-abcd-1111-abcd-111111abcdef",
                "accountId": "111111111111",
                "data": {
                    "actionConfiguration": {
                        "configuration": {
                            "FunctionName": "opascan",
                            "UserParameters": user_parameters
                        }
                    },
                    "inputArtifacts": [{
                        "name": "BuildOutput",
                        "revision": null,
                        "location": {
                            "type": "S3",
                            "s3Location": {"bucketName": "pipeline-artifacts", "objectKey": "build/7DRj2I"}
                        }
                    }],
                    "outputArtifacts": [{
                        "name": "ScanOutput",
                        "revision": null,
                        "location": {
                            "type": "S3",
                            "s3Location": {"bucketName": "pipeline-artifacts", "objectKey": "scan/Xk9pQ2"}
                        }
                    }],
                    "artifactCredentials": {
                        "secretAccessKey": "secret",
                        "sessionToken": "token",
                        "accessKeyId": "key"
                    }
                }
            }
        })
    }

    #[test]
    fn direct_event() {
        let event: ScanEvent = serde_json::from_value(json!({
            "input": "s3://opascan-test/terraform-examples/tfplan.json",
            "rules": ["s3://opascan-rules/terraform"],
            "parameters": ""
        }))
        .unwrap();

        let invocation = event.into_invocation().unwrap();

        assert_eq!(invocation.input, "s3://opascan-test/terraform-examples/tfplan.json");
        assert_eq!(invocation.rules, vec!["s3://opascan-rules/terraform".to_string()]);
        assert!(invocation.output.is_none());
        assert!(invocation.job_id.is_none());
    }

    #[test]
    fn codepipeline_job_maps_artifacts_and_user_parameters() {
        let user = r#"{"rules": ["s3://opascan-rules/cloudformation"], "parameters": "Env=prod,Subnets=[a,b]"}"#;
        let event: ScanEvent = serde_json::from_value(codepipeline_event(user)).unwrap();

        let invocation = event.into_invocation().unwrap();

        assert_eq!(invocation.input, "s3://pipeline-artifacts/build/7DRj2I");
        assert_eq!(invocation.rules, vec!["s3://opascan-rules/cloudformation".to_string()]);
        assert_eq!(invocation.parameters, "Env=prod,Subnets=[a,b]");
        assert_eq!(invocation.output.as_deref(), Some("s3://pipeline-artifacts/scan/Xk9pQ2"));
        assert_eq!(
            invocation.job_id.as_deref(),
            Some("11111111-abcd-1111-abcd-111111abcdef")
        );
    }

    #[test]
    fn job_overrides_direct_fields() {
        let mut value = codepipeline_event(r#"{"rules": ["rules"]}"#);
        value["input"] = json!("ignored.json");
        let event: ScanEvent = serde_json::from_value(value).unwrap();

        assert_eq!(
            event.into_invocation().unwrap().input,
            "s3://pipeline-artifacts/build/7DRj2I"
        );
    }

    #[test]
    fn invalid_user_parameters_are_reported() {
        let event: ScanEvent = serde_json::from_value(codepipeline_event("rules=x")).unwrap();
        let err = event.into_invocation().unwrap_err();
        assert!(err.to_string().contains("invalid UserParameters"));
    }

    #[test]
    fn missing_input_artifact_is_reported() {
        let mut value = codepipeline_event("{}");
        value["CodePipeline.job"]["data"]["inputArtifacts"] = json!([]);
        let event: ScanEvent = serde_json::from_value(value).unwrap();

        let err = event.into_invocation().unwrap_err();
        assert!(err.to_string().contains("no input artifact"));
    }

    #[test]
    fn empty_event_is_rejected() {
        assert!(ScanEvent::default().into_invocation().is_err());
    }
}
