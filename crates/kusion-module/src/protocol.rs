//! Wire protocol between the generator and module plugins
//!
//! Frames are newline-delimited JSON over the plugin's stdin/stdout. Byte
//! payloads travel as base64 strings, `null` when absent.
//!
//! Request frame:
//! ```json
//! {"metadata":{"kusion_trace_id":"..","kusion_module_name":"mysql"},
//!  "request":{"project":"..","stack":"..","app":"..","workload":"<b64>",
//!             "devConfig":"<b64>","platformConfig":null,"context":null,"secretStore":null}}
//! ```
//!
//! Reply frame, success or failure:
//! ```json
//! {"kusion_trace_id":"..","response":{"resources":["<b64>"],"patcher":null}}
//! {"kusion_trace_id":"..","error":"message"}
//! ```

use kusion_core::{Patcher, Resource};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-call correlation metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallMetadata {
    #[serde(rename = "kusion_trace_id")]
    pub trace_id: String,

    #[serde(rename = "kusion_module_name")]
    pub module_name: String,
}

impl CallMetadata {
    /// Fresh metadata with a random v4 trace ID.
    pub fn new(module_name: impl Into<String>) -> Self {
        Self {
            trace_id: Uuid::new_v4().to_string(),
            module_name: module_name.into(),
        }
    }
}

/// Generation request sent to one module.
///
/// Every byte field is serialized independently; `None` means the input is
/// absent, not empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratorRequest {
    pub project: String,
    pub stack: String,
    pub app: String,

    #[serde(default, with = "base64_opt")]
    pub workload: Option<Vec<u8>>,

    #[serde(default, with = "base64_opt")]
    pub dev_config: Option<Vec<u8>>,

    #[serde(default, with = "base64_opt")]
    pub platform_config: Option<Vec<u8>>,

    #[serde(default, with = "base64_opt")]
    pub context: Option<Vec<u8>>,

    #[serde(default, with = "base64_opt")]
    pub secret_store: Option<Vec<u8>>,
}

impl GeneratorRequest {
    pub fn workload_as<T: DeserializeOwned>(&self) -> serde_yaml::Result<Option<T>> {
        decode_yaml(&self.workload)
    }

    pub fn dev_config_as<T: DeserializeOwned>(&self) -> serde_yaml::Result<Option<T>> {
        decode_yaml(&self.dev_config)
    }

    pub fn platform_config_as<T: DeserializeOwned>(&self) -> serde_yaml::Result<Option<T>> {
        decode_yaml(&self.platform_config)
    }

    pub fn context_as<T: DeserializeOwned>(&self) -> serde_yaml::Result<Option<T>> {
        decode_yaml(&self.context)
    }
}

fn decode_yaml<T: DeserializeOwned>(bytes: &Option<Vec<u8>>) -> serde_yaml::Result<Option<T>> {
    bytes.as_deref().map(serde_yaml::from_slice).transpose()
}

/// Resources and optional patcher produced by one module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorResponse {
    /// Serialized resource documents
    #[serde(default, with = "base64_list")]
    pub resources: Vec<Vec<u8>>,

    #[serde(default, with = "base64_opt")]
    pub patcher: Option<Vec<u8>>,
}

impl GeneratorResponse {
    /// Encode typed resources and patcher as JSON documents.
    pub fn encode(resources: &[Resource], patcher: Option<&Patcher>) -> serde_json::Result<Self> {
        Ok(Self {
            resources: resources
                .iter()
                .map(serde_json::to_vec)
                .collect::<serde_json::Result<_>>()?,
            patcher: patcher.map(serde_json::to_vec).transpose()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestFrame {
    pub metadata: CallMetadata,
    pub request: GeneratorRequest,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyFrame {
    pub kusion_trace_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<GeneratorResponse>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ReplyFrame {
    pub fn ok(trace_id: impl Into<String>, response: GeneratorResponse) -> Self {
        Self {
            kusion_trace_id: trace_id.into(),
            response: Some(response),
            error: None,
        }
    }

    pub fn err(trace_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kusion_trace_id: trace_id.into(),
            response: None,
            error: Some(message.into()),
        }
    }
}

mod base64_opt {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(bytes) => serializer.serialize_some(&STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|encoded| STANDARD.decode(encoded).map_err(serde::de::Error::custom))
            .transpose()
    }
}

mod base64_list {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::ser::SerializeSeq;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &[Vec<u8>], serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(value.len()))?;
        for bytes in value {
            seq.serialize_element(&STANDARD.encode(bytes))?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Vec<u8>>, D::Error> {
        Option::<Vec<String>>::deserialize(deserializer)?
            .unwrap_or_default()
            .into_iter()
            .map(|encoded| STANDARD.decode(encoded).map_err(serde::de::Error::custom))
            .collect()
    }
}
