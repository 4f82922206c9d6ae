//! Generated resources and the resource graph

use super::GenericConfig;
use super::workspace::SecretStore;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Extension marking the application's workload.
pub const IS_WORKLOAD_KEY: &str = "kusion.io/is-workload";

/// Extension carrying the health policy of a resource.
pub const HEALTH_POLICY_KEY: &str = "healthPolicy";

/// Extension carrying the identifier of an imported resource.
pub const IMPORT_ID_KEY: &str = "kusion.io/import-id";

/// Resource type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceType {
    Kubernetes,
    Terraform,
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceType::Kubernetes => write!(f, "Kubernetes"),
            ResourceType::Terraform => write!(f, "Terraform"),
        }
    }
}

/// One infrastructure resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    /// Unique within one resource graph
    pub id: String,

    #[serde(rename = "type")]
    pub resource_type: ResourceType,

    /// Desired state of the resource
    #[serde(default, deserialize_with = "null_as_empty")]
    pub attributes: Map<String, Value>,

    #[serde(default, rename = "dependsOn", skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,

    /// Out-of-band metadata (workload marker, health policy, import ID)
    #[serde(default, deserialize_with = "null_as_empty")]
    pub extensions: Map<String, Value>,
}

impl Resource {
    pub fn new(id: impl Into<String>, resource_type: ResourceType, attributes: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            resource_type,
            attributes,
            depends_on: Vec::new(),
            extensions: Map::new(),
        }
    }

    pub fn kubernetes(id: impl Into<String>, attributes: Map<String, Value>) -> Self {
        Self::new(id, ResourceType::Kubernetes, attributes)
    }

    /// Marker accepts both boolean `true` and the string `"true"`.
    pub fn is_workload(&self) -> bool {
        match self.extensions.get(IS_WORKLOAD_KEY) {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => s == "true",
            _ => false,
        }
    }

    /// Set the canonical (boolean) workload marker.
    pub fn mark_workload(&mut self) {
        self.extensions
            .insert(IS_WORKLOAD_KEY.to_string(), Value::Bool(true));
    }

    pub fn api_version(&self) -> Option<&str> {
        self.attributes.get("apiVersion").and_then(Value::as_str)
    }

    pub fn kind(&self) -> Option<&str> {
        self.attributes.get("kind").and_then(Value::as_str)
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Map<String, Value>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Resource graph generated for one stack.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Spec {
    #[serde(default)]
    pub resources: Vec<Resource>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_store: Option<SecretStore>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<GenericConfig>,
}

impl Spec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.resources.iter().any(|r| r.id == id)
    }

    pub fn get(&self, id: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.id == id)
    }

    pub fn workload(&self) -> Option<&Resource> {
        self.resources.iter().find(|r| r.is_workload())
    }
}
