use serde::Deserialize;
use serde_json::{Map, Value};

use super::{Dialect, DialectRunner};
use crate::domain::{Resource, Result, ScanError};

/// Template sections that mark a CloudFormation document.
const TEMPLATE_MARKERS: &[&str] = &["AWSTemplateFormatVersion", "Resources"];

/// Rewrites CloudFormation templates into canonical resources.
///
/// Every entry under `Resources` gains `address`, `type`, `name` and a flat
/// `tags` map; the source `Type` and `Tags` fields are removed. Documents
/// without `Resources` (parameter files, stack configs) pass through.
#[derive(Debug, Default, Clone, Copy)]
pub struct CloudFormationRunner;

#[derive(Debug, Deserialize)]
struct TemplateResource {
    #[serde(rename = "Type")]
    resource_type: String,
    #[serde(rename = "Tags", default)]
    tags: Vec<TemplateTag>,
    #[serde(flatten)]
    rest: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct TemplateTag {
    #[serde(rename = "Key")]
    key: String,
    #[serde(rename = "Value")]
    value: Value,
}

impl CloudFormationRunner {
    fn canonical_resource(uri: &str, name: &str, entry: Value) -> Result<Value> {
        let resource: TemplateResource = serde_json::from_value(entry).map_err(|e| {
            ScanError::InvalidDialect(format!("{}: resource {}: {}", uri, name, e))
        })?;

        let tags: Map<String, Value> = resource
            .tags
            .into_iter()
            .map(|tag| (tag.key, tag.value))
            .collect();

        let mut body = resource.rest;
        Resource::new(resource.resource_type, name)
            .with_tags(tags)
            .inject_into(&mut body);
        Ok(Value::Object(body))
    }
}

impl DialectRunner for CloudFormationRunner {
    fn dialect(&self) -> Dialect {
        Dialect::CloudFormation
    }

    fn identify(&self, document: &Value) -> bool {
        TEMPLATE_MARKERS.iter().any(|m| document.get(m).is_some())
    }

    fn transform(&self, uri: &str, document: Value) -> Result<Value> {
        let Value::Object(mut template) = document else {
            return Err(ScanError::Decode {
                uri: uri.to_string(),
                reason: "document is not a JSON object".to_string(),
            });
        };

        if !template.contains_key("Resources") {
            return Ok(Value::Object(template));
        }
        let resources = template
            .get_mut("Resources")
            .and_then(Value::as_object_mut)
            .ok_or_else(|| {
                ScanError::InvalidDialect(format!("{}: Resources is not an object", uri))
            })?;

        for (name, entry) in resources.iter_mut() {
            *entry = Self::canonical_resource(uri, name, entry.take())?;
        }

        Ok(Value::Object(template))
    }

    fn dependencies(&self) -> &'static [&'static str] {
        &["cloudformation_utils", "utils"]
    }
}
