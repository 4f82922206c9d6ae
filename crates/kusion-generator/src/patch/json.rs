//! Generic JSON Merge Patch / JSON Patch against resource attributes

use crate::error::{GenerateError, Result};
use json_patch::PatchOperation;
use kusion_core::{JsonPatcher, PatchType, Patcher, Resource};
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Apply every JSON patcher of `patcher` to the resource it targets.
///
/// A target ID missing from `resources` is skipped with a warning.
/// `JSONPatch` tolerates `remove` of a missing path and creates missing
/// parents on `add`: arrays before an index or `-` token, objects otherwise.
pub fn json_patch(resources: &mut [Resource], patcher: Option<&Patcher>) -> Result<()> {
    let Some(json_patchers) = patcher.and_then(|p| p.json_patchers.as_ref()) else {
        return Ok(());
    };

    for (id, json_patcher) in json_patchers {
        let Some(resource) = resources.iter_mut().find(|r| &r.id == id) else {
            warn!(resource = %id, "target patch resource not found, skipped");
            continue;
        };

        let mut doc = Value::Object(std::mem::take(&mut resource.attributes));
        let outcome = apply(&mut doc, json_patcher, id);
        match (outcome, doc) {
            (Ok(()), Value::Object(map)) => {
                resource.attributes = map;
                debug!(resource = %id, patch_type = %json_patcher.patch_type, "Patched resource");
            }
            (Ok(()), _) => {
                return Err(GenerateError::Patch(format!(
                    "patched attributes of {} are not an object",
                    id
                )));
            }
            (Err(e), _) => return Err(e),
        }
    }

    Ok(())
}

fn apply(doc: &mut Value, json_patcher: &JsonPatcher, id: &str) -> Result<()> {
    let payload = json_patcher
        .payload_bytes()
        .map_err(|e| GenerateError::Patch(format!("encode patch payload for {} failed: {}", id, e)))?;

    match &json_patcher.patch_type {
        PatchType::MergePatch => {
            let patch: Value = serde_json::from_slice(&payload).map_err(|e| {
                GenerateError::Patch(format!("merge patch to:{} failed with error {}", id, e))
            })?;
            json_patch::merge(doc, &patch);
            Ok(())
        }
        PatchType::JsonPatch => {
            let ops: Vec<Value> = serde_json::from_slice(&payload).map_err(|e| {
                GenerateError::Patch(format!("decode json patch for {} failed with error {}", id, e))
            })?;
            for op in ops {
                apply_operation(doc, op, id)?;
            }
            Ok(())
        }
        PatchType::Unsupported(other) => Err(GenerateError::UnsupportedPatchType(other.clone())),
    }
}

fn apply_operation(doc: &mut Value, raw: Value, id: &str) -> Result<()> {
    let op_name = raw.get("op").and_then(Value::as_str).unwrap_or_default().to_string();
    let path = raw.get("path").and_then(Value::as_str).unwrap_or_default().to_string();

    match op_name.as_str() {
        "remove" if doc.pointer(&path).is_none() => {
            debug!(resource = %id, path = %path, "Path absent, remove skipped");
            return Ok(());
        }
        "add" => ensure_parents(doc, &path),
        _ => {}
    }

    let op: PatchOperation = serde_json::from_value(raw).map_err(|e| {
        GenerateError::Patch(format!("decode json patch for {} failed with error {}", id, e))
    })?;
    json_patch::patch(doc, std::slice::from_ref(&op)).map_err(|e| {
        GenerateError::Patch(format!("apply json patch to:{} failed with error {}", id, e))
    })
}

/// Create missing parents of a JSON pointer.
///
/// A missing parent becomes an array when the token after it is an index or
/// `-`, an object otherwise. Arrays created here are padded with nulls up to
/// the index that is walked into. Stops at the first parent that exists but
/// is not a container; the patch itself then reports the failure.
fn ensure_parents(doc: &mut Value, pointer: &str) {
    let tokens: Vec<String> = pointer
        .split('/')
        .skip(1)
        .map(|t| t.replace("~1", "/").replace("~0", "~"))
        .collect();
    let Some((last, parents)) = tokens.split_last() else {
        return;
    };

    let mut current = doc;
    let mut fresh = false;
    for (i, token) in parents.iter().enumerate() {
        let next = tokens[i + 1].as_str();
        let slot = match current {
            Value::Object(map) => map.entry(token.clone()).or_insert(Value::Null),
            Value::Array(items) => {
                let index = match array_index(token, items.len()) {
                    Some(index) => index,
                    None => return,
                };
                if fresh && index >= items.len() {
                    items.resize(index + 1, Value::Null);
                }
                match items.get_mut(index) {
                    Some(item) => item,
                    None => return,
                }
            }
            _ => return,
        };

        fresh = slot.is_null();
        if fresh {
            *slot = empty_container(next);
        }
        current = slot;
    }

    if let (true, Value::Array(items)) = (fresh, current) {
        if let Ok(index) = last.parse::<usize>() {
            if items.len() < index {
                items.resize(index, Value::Null);
            }
        }
    }
}

/// Position a token addresses in an array of `len` items; `-` is one past the end.
fn array_index(token: &str, len: usize) -> Option<usize> {
    if token == "-" {
        return Some(len);
    }
    token.parse().ok()
}

fn empty_container(next_token: &str) -> Value {
    if next_token == "-" || next_token.parse::<usize>().is_ok() {
        Value::Array(Vec::new())
    } else {
        Value::Object(Map::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    const SVC: &str = "v1:Service:demo:web";

    fn resources() -> Vec<Resource> {
        let Value::Object(attributes) = json!({
            "apiVersion": "v1",
            "kind": "Service",
            "metadata": {"name": "web", "labels": {"app": "web"}},
            "spec": {"type": "ClusterIP", "ports": [{"port": 80}]}
        }) else {
            unreachable!()
        };
        vec![Resource::kubernetes(SVC, attributes)]
    }

    fn patcher(id: &str, patch_type: PatchType, payload: Value) -> Patcher {
        Patcher {
            json_patchers: Some(BTreeMap::from([(
                id.to_string(),
                JsonPatcher::new(patch_type, payload),
            )])),
            ..Default::default()
        }
    }

    #[test]
    fn test_merge_patch() {
        let mut res = resources();
        let p = patcher(
            SVC,
            PatchType::MergePatch,
            json!(r#"{"spec":{"type":"NodePort"},"metadata":{"labels":{"app":null}}}"#),
        );
        json_patch(&mut res, Some(&p)).unwrap();
        assert_eq!(res[0].attributes["spec"]["type"], "NodePort");
        assert_eq!(res[0].attributes["metadata"]["labels"], json!({}));
    }

    #[test]
    fn test_identity_patches_leave_attributes_unchanged() {
        let before = resources();

        let mut res = resources();
        json_patch(&mut res, Some(&patcher(SVC, PatchType::MergePatch, json!("{}")))).unwrap();
        assert_eq!(res, before);

        json_patch(&mut res, Some(&patcher(SVC, PatchType::JsonPatch, json!("[]")))).unwrap();
        assert_eq!(res, before);
    }

    #[test]
    fn test_json_patch_relaxations() {
        let mut res = resources();
        let p = patcher(
            SVC,
            PatchType::JsonPatch,
            json!([
                {"op": "remove", "path": "/spec/selector"},
                {"op": "add", "path": "/metadata/annotations/team~1owner", "value": "infra"},
                {"op": "replace", "path": "/spec/ports/0/port", "value": 8080}
            ]),
        );
        json_patch(&mut res, Some(&p)).unwrap();
        assert_eq!(
            res[0].attributes["metadata"]["annotations"],
            json!({"team/owner": "infra"})
        );
        assert_eq!(res[0].attributes["spec"]["ports"][0]["port"], 8080);
    }

    #[test]
    fn test_add_creates_missing_array_parents() {
        let mut res = resources();
        let p = patcher(
            SVC,
            PatchType::JsonPatch,
            json!([
                {"op": "add", "path": "/spec/tolerations/-", "value": {"key": "gpu"}},
                {"op": "add", "path": "/spec/tolerations/-", "value": {"key": "spot"}},
                {"op": "add", "path": "/spec/externalIPs/0/address", "value": "10.0.0.1"},
                {"op": "add", "path": "/spec/extra/2", "value": "x"}
            ]),
        );
        json_patch(&mut res, Some(&p)).unwrap();

        let spec = &res[0].attributes["spec"];
        assert_eq!(spec["tolerations"], json!([{"key": "gpu"}, {"key": "spot"}]));
        assert_eq!(spec["externalIPs"], json!([{"address": "10.0.0.1"}]));
        assert_eq!(spec["ports"], json!([{"port": 80}]));
        assert_eq!(spec["extra"], json!([null, null, "x"]));
    }

    #[test]
    fn test_add_past_end_of_existing_array_fails() {
        let mut res = resources();
        let p = patcher(
            SVC,
            PatchType::JsonPatch,
            json!([{"op": "add", "path": "/spec/ports/5", "value": {"port": 1}}]),
        );
        assert!(json_patch(&mut res, Some(&p)).unwrap_err().is_patch());
    }

    #[test]
    fn test_json_patch_failing_op() {
        let mut res = resources();
        let p = patcher(
            SVC,
            PatchType::JsonPatch,
            json!([{"op": "replace", "path": "/spec/missing", "value": 1}]),
        );
        let err = json_patch(&mut res, Some(&p)).unwrap_err();
        assert!(err.is_patch());
    }

    #[test]
    fn test_unknown_target_skipped() {
        let mut res = resources();
        let before = res.clone();
        let p = patcher("v1:Service:demo:other", PatchType::MergePatch, json!("{}"));
        json_patch(&mut res, Some(&p)).unwrap();
        assert_eq!(res, before);
    }

    #[test]
    fn test_unsupported_patch_type() {
        let mut res = resources();
        let p = patcher(SVC, PatchType::Unsupported("StrategicMerge".into()), json!("{}"));
        let err = json_patch(&mut res, Some(&p)).unwrap_err();
        assert!(matches!(err, GenerateError::UnsupportedPatchType(ref t) if t == "StrategicMerge"));
        assert!(err.is_patch());
    }

    #[test]
    fn test_non_object_result_rejected() {
        let mut res = resources();
        let p = patcher(SVC, PatchType::MergePatch, json!("[1, 2]"));
        let err = json_patch(&mut res, Some(&p)).unwrap_err();
        assert!(matches!(err, GenerateError::Patch(_)));
    }
}
