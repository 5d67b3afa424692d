//! Canonical resource shape.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Fields every canonical resource carries, whatever its dialect.
///
/// Dialect-specific properties live next to these fields in the same JSON
/// object; this type only describes the injected part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    /// Unique key, `<type>.<name>`.
    pub address: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    pub name: String,
    /// Tag key to tag value. Values are usually strings but may be
    /// unresolved intrinsic references such as `{"Ref": "Env"}`.
    #[serde(default)]
    pub tags: Map<String, Value>,
}

impl Resource {
    pub fn new(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        let resource_type = resource_type.into();
        let name = name.into();
        Self {
            address: Self::address_for(&resource_type, &name),
            resource_type,
            name,
            tags: Map::new(),
        }
    }

    pub fn with_tags(mut self, tags: Map<String, Value>) -> Self {
        self.tags = tags;
        self
    }

    pub fn address_for(resource_type: &str, name: &str) -> String {
        format!("{}.{}", resource_type, name)
    }

    /// Write the canonical fields into an existing resource object.
    pub fn inject_into(self, target: &mut Map<String, Value>) {
        target.insert("address".to_string(), Value::String(self.address));
        target.insert("type".to_string(), Value::String(self.resource_type));
        target.insert("name".to_string(), Value::String(self.name));
        target.insert("tags".to_string(), Value::Object(self.tags));
    }
}
