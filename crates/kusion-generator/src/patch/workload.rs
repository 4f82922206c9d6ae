//! Structural patch of the workload resource

use crate::error::{GenerateError, Result};
use kusion_core::{EnvVar, Patcher, REMOVAL_VALUE, Resource};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;
use tracing::{debug, info};

const LABELS: &[&str] = &["metadata", "labels"];
const ANNOTATIONS: &[&str] = &["metadata", "annotations"];
const POD_LABELS: &[&str] = &["spec", "template", "metadata", "labels"];
const POD_ANNOTATIONS: &[&str] = &["spec", "template", "metadata", "annotations"];
const CONTAINERS: &[&str] = &["spec", "template", "spec", "containers"];

/// Apply a patcher's labels, annotations and environments to the workload.
///
/// A patch value equal to [`REMOVAL_VALUE`] deletes the entry. Environment
/// entries to merge are prepended, in patch order, to every container's
/// `env`. Unset patcher fields leave their dimension untouched.
pub fn patch_workload(workload: Option<&mut Resource>, patcher: Option<&Patcher>) -> Result<()> {
    let Some(patcher) = patcher else {
        return Ok(());
    };
    let Some(workload) = workload else {
        debug!("No workload to patch");
        return Ok(());
    };

    let id = workload.id.clone();
    let attributes = &mut workload.attributes;
    normalize_numbers(attributes);

    if let Some(labels) = &patcher.labels {
        merge_string_map(attributes, LABELS, labels, &id)?;
    }
    if let Some(labels) = &patcher.pod_labels {
        merge_string_map(attributes, POD_LABELS, labels, &id)?;
    }
    if let Some(annotations) = &patcher.annotations {
        merge_string_map(attributes, ANNOTATIONS, annotations, &id)?;
    }
    if let Some(annotations) = &patcher.pod_annotations {
        merge_string_map(attributes, POD_ANNOTATIONS, annotations, &id)?;
    }
    if let Some(envs) = &patcher.environments {
        patch_environments(attributes, envs, &id)?;
    }

    Ok(())
}

/// Integral floats become integers so `2.0` and `2` compare equal.
fn normalize_numbers(map: &mut Map<String, Value>) {
    for value in map.values_mut() {
        normalize_value(value);
    }
}

fn normalize_value(value: &mut Value) {
    match value {
        Value::Number(n) if n.is_f64() => {
            if let Some(f) = n.as_f64() {
                if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
                    *n = Number::from(f as i64);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(normalize_value),
        Value::Object(map) => normalize_numbers(map),
        _ => {}
    }
}

fn unstructured(id: &str, message: impl Into<String>) -> GenerateError {
    GenerateError::UnstructuredConversion {
        id: id.to_string(),
        message: message.into(),
    }
}

fn nested<'a>(root: &'a Map<String, Value>, path: &[&str]) -> Option<&'a Value> {
    let (first, rest) = path.split_first()?;
    rest.iter()
        .try_fold(root.get(*first)?, |value, segment| value.get(*segment))
}

/// Walk `path`, creating missing objects.
fn nested_object_mut<'a>(
    root: &'a mut Map<String, Value>,
    path: &[&str],
    id: &str,
) -> Result<&'a mut Map<String, Value>> {
    let mut current = root;
    for segment in path {
        let entry = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        current = match entry {
            Value::Object(map) => map,
            _ => return Err(unstructured(id, format!("{} is not an object", path.join(".")))),
        };
    }
    Ok(current)
}

fn merge_string_map(
    attributes: &mut Map<String, Value>,
    path: &[&str],
    patch: &BTreeMap<String, String>,
    id: &str,
) -> Result<()> {
    let field = path.join(".");
    let existing = nested(attributes, path);
    let present = existing.is_some();

    let mut merged = Map::new();
    match existing {
        None | Some(Value::Null) => {}
        Some(Value::Object(map)) => {
            for (k, v) in map {
                if !v.is_string() {
                    return Err(unstructured(id, format!("{}.{} is not a string", field, k)));
                }
                merged.insert(k.clone(), v.clone());
            }
        }
        Some(_) => return Err(unstructured(id, format!("{} is not a string map", field))),
    }

    for (k, v) in patch {
        if v == REMOVAL_VALUE {
            merged.remove(k);
        } else {
            merged.insert(k.clone(), Value::String(v.clone()));
        }
    }

    if !present && merged.is_empty() {
        return Ok(());
    }
    let Some((last, parents)) = path.split_last() else {
        return Ok(());
    };
    nested_object_mut(attributes, parents, id)?.insert(last.to_string(), Value::Object(merged));
    Ok(())
}

fn patch_environments(attributes: &mut Map<String, Value>, envs: &[EnvVar], id: &str) -> Result<()> {
    let (to_remove, to_merge): (Vec<&EnvVar>, Vec<&EnvVar>) = envs.iter().partition(|e| e.is_removal());
    let merge_values = to_merge
        .iter()
        .map(|env| serde_json::to_value(env))
        .collect::<serde_json::Result<Vec<_>>>()
        .map_err(|e| unstructured(id, e.to_string()))?;

    let containers = match nested_containers(attributes) {
        Some(Value::Array(containers)) => containers,
        _ => {
            return Err(GenerateError::Patch(format!(
                "failed to get containers from workload:{}",
                id
            )));
        }
    };

    for container in containers.iter_mut() {
        let Value::Object(container) = container else {
            return Err(GenerateError::Patch(format!(
                "failed to get container from workload:{}, not an object",
                id
            )));
        };
        let name = container
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let mut current = match container.remove("env") {
            None => None,
            Some(Value::Array(items)) => Some(items),
            Some(_) => {
                return Err(GenerateError::Patch(format!(
                    "failed to get env from workload:{}, container:{}, not a list",
                    id, name
                )));
            }
        };

        if let Some(items) = current.as_mut() {
            items.retain(|item| {
                let env_name = item.get("name").and_then(Value::as_str);
                let removed = env_name.is_some_and(|n| to_remove.iter().any(|r| r.name == n));
                if removed {
                    info!(env = ?env_name, workload = id, container = %name, "Removing env");
                }
                !removed
            });
        }

        if !merge_values.is_empty() {
            let mut patched = merge_values.clone();
            patched.extend(current.take().unwrap_or_default());
            current = Some(patched);
            info!(count = merge_values.len(), workload = id, container = %name, "Prepended env");
        }

        if let Some(items) = current {
            container.insert("env".to_string(), Value::Array(items));
        }
    }

    Ok(())
}

fn nested_containers(attributes: &mut Map<String, Value>) -> Option<&mut Value> {
    let (first, rest) = CONTAINERS.split_first()?;
    let mut current = attributes.get_mut(*first)?;
    for segment in rest {
        current = current.get_mut(*segment)?;
    }
    Some(current)
}
