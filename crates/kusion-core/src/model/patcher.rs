//! Patcher emitted by modules alongside their resources

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Reserved value meaning "delete this entry" on every patch surface.
pub const REMOVAL_VALUE: &str = "ops://kusionstack.io/remove";

/// Patch directives a module applies to already-generated resources.
///
/// Every `None` field leaves the corresponding dimension untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patcher {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pod_labels: Option<BTreeMap<String, String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<BTreeMap<String, String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pod_annotations: Option<BTreeMap<String, String>>,

    /// Container environment entries, applied in order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environments: Option<Vec<EnvVar>>,

    /// Generic patches keyed by target resource ID
    #[serde(
        default,
        rename = "jsonPatcher",
        skip_serializing_if = "Option::is_none"
    )]
    pub json_patchers: Option<BTreeMap<String, JsonPatcher>>,
}

/// Container environment variable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvVar {
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub value: String,

    #[serde(default, rename = "valueFrom", skip_serializing_if = "Option::is_none")]
    pub value_from: Option<serde_json::Value>,
}

impl EnvVar {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            value_from: None,
        }
    }

    pub fn is_removal(&self) -> bool {
        self.value == REMOVAL_VALUE
    }
}

/// Patch algebra of a [`JsonPatcher`].
///
/// Unknown values decode into [`PatchType::Unsupported`] and are rejected
/// when the patch is applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PatchType {
    /// RFC 7396 JSON Merge Patch
    MergePatch,
    /// RFC 6902 JSON Patch
    JsonPatch,
    Unsupported(String),
}

impl From<String> for PatchType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "MergePatch" => PatchType::MergePatch,
            "JSONPatch" => PatchType::JsonPatch,
            _ => PatchType::Unsupported(value),
        }
    }
}

impl From<PatchType> for String {
    fn from(value: PatchType) -> Self {
        match value {
            PatchType::MergePatch => "MergePatch".to_string(),
            PatchType::JsonPatch => "JSONPatch".to_string(),
            PatchType::Unsupported(other) => other,
        }
    }
}

impl std::fmt::Display for PatchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PatchType::MergePatch => write!(f, "MergePatch"),
            PatchType::JsonPatch => write!(f, "JSONPatch"),
            PatchType::Unsupported(other) => write!(f, "{}", other),
        }
    }
}

/// One generic patch targeting a resource's attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonPatcher {
    #[serde(rename = "type")]
    pub patch_type: PatchType,

    /// Either a string holding the raw JSON document, or the document inline.
    pub payload: serde_json::Value,
}

impl JsonPatcher {
    pub fn new(patch_type: PatchType, payload: serde_json::Value) -> Self {
        Self {
            patch_type,
            payload,
        }
    }

    /// Raw JSON bytes of the payload.
    pub fn payload_bytes(&self) -> serde_json::Result<Vec<u8>> {
        match &self.payload {
            serde_json::Value::String(raw) => Ok(raw.clone().into_bytes()),
            other => serde_json::to_vec(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patcher_parse() {
        let yaml = r#"
labels:
  env: prod
podAnnotations:
  prometheus.io/scrape: "true"
environments:
  - name: DB_HOST
    value: mysql.default
  - name: LEGACY
    value: ops://kusionstack.io/remove
jsonPatcher:
  "v1:Service:default:web":
    type: MergePatch
    payload: '{"spec":{"type":"NodePort"}}'
"#;
        let patcher: Patcher = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(patcher.labels.as_ref().unwrap()["env"], "prod");
        assert!(patcher.pod_labels.is_none());
        let envs = patcher.environments.as_ref().unwrap();
        assert!(!envs[0].is_removal());
        assert!(envs[1].is_removal());
        let jp = &patcher.json_patchers.as_ref().unwrap()["v1:Service:default:web"];
        assert_eq!(jp.patch_type, PatchType::MergePatch);
        assert_eq!(
            jp.payload_bytes().unwrap(),
            br#"{"spec":{"type":"NodePort"}}"#.to_vec()
        );
    }

    #[test]
    fn test_patch_type_unknown_is_kept() {
        let jp: JsonPatcher =
            serde_yaml::from_str("type: StrategicMerge\npayload: '{}'\n").unwrap();
        assert_eq!(jp.patch_type, PatchType::Unsupported("StrategicMerge".into()));
        assert_eq!(jp.patch_type.to_string(), "StrategicMerge");
    }

    #[test]
    fn test_inline_payload_serialized_as_json() {
        let jp: JsonPatcher = serde_yaml::from_str(
            "type: JSONPatch\npayload:\n  - op: remove\n    path: /spec/replicas\n",
        )
        .unwrap();
        let bytes = jp.payload_bytes().unwrap();
        let ops: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(ops[0]["op"], "remove");
    }

    #[test]
    fn test_env_var_serialization_omits_empty_value() {
        let env = EnvVar::new("EMPTY", "");
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json, serde_json::json!({"name": "EMPTY"}));
    }
}
