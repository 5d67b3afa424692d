use serde_json::Value;

use super::{Dialect, DialectRunner};
use crate::domain::Result;

/// Marker field present at the top of every `terraform show -json` plan.
const PLAN_MARKER: &str = "terraform_version";

/// Terraform plans are already canonical; the runner passes them through.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerraformRunner;

impl DialectRunner for TerraformRunner {
    fn dialect(&self) -> Dialect {
        Dialect::Terraform
    }

    fn identify(&self, document: &Value) -> bool {
        document.get(PLAN_MARKER).is_some()
    }

    fn transform(&self, _uri: &str, document: Value) -> Result<Value> {
        Ok(document)
    }

    fn dependencies(&self) -> &'static [&'static str] {
        &["terraform_utils", "utils"]
    }

    /// Plans carry resolved values; there is nothing to substitute.
    fn accepts_parameters(&self) -> bool {
        false
    }
}
