//! Post-processors applied to assembled resources

use crate::index::HealthPolicy;
use kusion_core::{HEALTH_POLICY_KEY, IMPORT_ID_KEY, Resource};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::debug;

/// Mark resources under import management.
///
/// Each matched resource gets its imported ID under [`IMPORT_ID_KEY`] and
/// loses its attributes, so the importing tool's discovered state is
/// authoritative.
pub fn patch_imported_resources(resources: &mut [Resource], imported: &BTreeMap<String, String>) {
    for resource in resources.iter_mut() {
        if let Some(imported_id) = imported.get(&resource.id) {
            resource
                .extensions
                .insert(IMPORT_ID_KEY.to_string(), Value::String(imported_id.clone()));
            resource.attributes = Map::new();
            debug!(resource = %resource.id, imported = %imported_id, "Marked imported resource");
        }
    }
}

/// Copy a health policy into the resource's extensions.
///
/// Values that are not maps are ignored.
pub fn patch_health_policy(resource: &mut Resource, health_policy: &Value) {
    if let Some(policy) = HealthPolicy::from_value(health_policy) {
        attach_health_policy(resource, &policy);
    }
}

pub(crate) fn attach_health_policy(resource: &mut Resource, policy: &HealthPolicy) {
    let fields: Map<String, Value> = policy
        .fields()
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    resource
        .extensions
        .insert(HEALTH_POLICY_KEY.to_string(), Value::Object(fields));
}

#[cfg(test)]
mod tests {
    use super::*;
    use kusion_core::IS_WORKLOAD_KEY;
    use serde_json::json;

    fn resource(id: &str) -> Resource {
        let Value::Object(attributes) = json!({"kind": "Service", "spec": {"type": "ClusterIP"}}) else {
            unreachable!()
        };
        let mut res = Resource::kubernetes(id, attributes);
        res.extensions.insert("custom".into(), json!("kept"));
        res
    }

    #[test]
    fn test_imported_resource_cleared() {
        let mut resources = vec![resource("a"), resource("b")];
        resources[0].mark_workload();
        let imported = BTreeMap::from([
            ("a".to_string(), "arn:aws:a".to_string()),
            ("missing".to_string(), "arn:aws:m".to_string()),
        ]);

        patch_imported_resources(&mut resources, &imported);

        let a = &resources[0];
        assert_eq!(a.id, "a");
        assert!(a.attributes.is_empty());
        assert_eq!(a.extensions[IMPORT_ID_KEY], "arn:aws:a");
        assert_eq!(a.extensions["custom"], "kept");
        assert_eq!(a.extensions[IS_WORKLOAD_KEY], true);
        assert!(!resources[1].attributes.is_empty());
        assert!(!resources[1].extensions.contains_key(IMPORT_ID_KEY));
    }

    #[test]
    fn test_health_policy_shallow_copy() {
        let mut res = resource("a");
        let policy = json!({"kcl": "assert res.ready", "apiVersion": "v1", "kind": "Service"});
        patch_health_policy(&mut res, &policy);
        assert_eq!(res.extensions[HEALTH_POLICY_KEY], policy);
    }

    #[test]
    fn test_health_policy_non_map_ignored() {
        let mut res = resource("a");
        patch_health_policy(&mut res, &json!(["not", "a", "map"]));
        assert!(!res.extensions.contains_key(HEALTH_POLICY_KEY));
    }
}
