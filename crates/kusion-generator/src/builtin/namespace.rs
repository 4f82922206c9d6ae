use super::SpecGenerator;
use crate::error::Result;
use kusion_core::{Resource, Spec};
use serde_json::{Map, Value, json};
use tracing::debug;

/// Emits the Kubernetes namespace of the application.
#[derive(Debug, Clone)]
pub struct NamespaceGenerator {
    namespace: String,
}

impl NamespaceGenerator {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    pub fn resource_id(&self) -> String {
        format!("v1:Namespace:{}", self.namespace)
    }
}

impl SpecGenerator for NamespaceGenerator {
    fn generate(&self, spec: &mut Spec) -> Result<()> {
        let id = self.resource_id();
        if spec.contains(&id) {
            debug!(namespace = %self.namespace, "Namespace already in graph");
            return Ok(());
        }

        let attributes = match json!({
            "apiVersion": "v1",
            "kind": "Namespace",
            "metadata": {"name": self.namespace},
        }) {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        spec.resources.push(Resource::kubernetes(id, attributes));
        Ok(())
    }
}
