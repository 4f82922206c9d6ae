//! Secrets declared by the workload
//!
//! ```yaml
//! secrets:
//!   db-auth:
//!     type: basic
//!     data:
//!       username: admin
//!       password: s3cr3t
//!   api-key:
//!     type: external
//!     data:
//!       key: ref://api-keys/primary
//! ```

use super::SpecGenerator;
use crate::error::{GenerateError, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use kusion_core::{Accessory, FakeProvider, Resource, SecretStore, Spec};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use tracing::debug;

/// Workload field holding the secrets.
pub const SECRETS_FIELD: &str = "secrets";

const REF_PREFIX: &str = "ref://";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretType {
    /// `username` + `password`
    Basic,
    /// `token`
    Token,
    /// Arbitrary keys
    Opaque,
    /// `tls.crt` + `tls.key`
    Certificate,
    /// Values are `ref://<key>[/<property>]` into the workspace secret store
    External,
}

impl SecretType {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "basic" => Some(SecretType::Basic),
            "token" => Some(SecretType::Token),
            "opaque" => Some(SecretType::Opaque),
            "certificate" => Some(SecretType::Certificate),
            "external" => Some(SecretType::External),
            _ => None,
        }
    }

    fn required_keys(&self) -> &'static [&'static str] {
        match self {
            SecretType::Basic => &["username", "password"],
            SecretType::Token => &["token"],
            SecretType::Certificate => &["tls.crt", "tls.key"],
            SecretType::Opaque | SecretType::External => &[],
        }
    }

    fn kubernetes_type(&self) -> &'static str {
        match self {
            SecretType::Basic => "kubernetes.io/basic-auth",
            SecretType::Certificate => "kubernetes.io/tls",
            SecretType::Token | SecretType::Opaque | SecretType::External => "Opaque",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecretSpec {
    #[serde(rename = "type")]
    pub secret_type: String,

    #[serde(default)]
    pub data: BTreeMap<String, String>,

    #[serde(default)]
    pub immutable: bool,
}

/// Emits one `v1:Secret` per workload secret.
pub struct SecretGenerator<'a> {
    namespace: &'a str,
    workload: &'a Accessory,
    secret_store: Option<&'a SecretStore>,
}

impl<'a> SecretGenerator<'a> {
    pub fn new(namespace: &'a str, workload: &'a Accessory, secret_store: Option<&'a SecretStore>) -> Self {
        Self {
            namespace,
            workload,
            secret_store,
        }
    }

    fn secrets(&self) -> Result<BTreeMap<String, SecretSpec>> {
        match self.workload.get(SECRETS_FIELD) {
            None | Some(serde_yaml::Value::Null) => Ok(BTreeMap::new()),
            Some(value) => serde_yaml::from_value(value.clone())
                .map_err(|e| GenerateError::Config(format!("invalid workload secrets: {}", e))),
        }
    }

    fn fake_provider(&self, secret: &str) -> Result<FakeProvider> {
        let store = self.secret_store.ok_or_else(|| {
            GenerateError::Config(format!(
                "secret {} references an external store but the workspace has no secret store",
                secret
            ))
        })?;
        store
            .fake_provider()
            .map_err(|e| GenerateError::Config(format!("invalid fake secret store: {}", e)))?
            .ok_or_else(|| {
                GenerateError::Config(format!(
                    "secret {}: unsupported secret store provider {:?}",
                    secret,
                    store.provider.keys().collect::<Vec<_>>()
                ))
            })
    }

    fn resolve_external(&self, secret: &str, data: &BTreeMap<String, String>) -> Result<BTreeMap<String, String>> {
        let provider = self.fake_provider(secret)?;
        let mut resolved = BTreeMap::new();

        for (name, reference) in data {
            let path = reference.strip_prefix(REF_PREFIX).ok_or_else(|| {
                GenerateError::Config(format!(
                    "secret {}: value of {} must start with {}",
                    secret, name, REF_PREFIX
                ))
            })?;
            let (key, property) = match path.split_once('/') {
                Some((key, property)) => (key, Some(property)),
                None => (path, None),
            };

            let entry = provider.data.iter().find(|d| d.key == key).ok_or_else(|| {
                GenerateError::Config(format!("secret {}: key {} not found in secret store", secret, key))
            })?;
            let value = match property {
                Some(property) => entry
                    .value_map
                    .as_ref()
                    .and_then(|m| m.get(property))
                    .cloned(),
                None => entry.value.clone(),
            }
            .ok_or_else(|| {
                GenerateError::Config(format!("secret {}: no value for {}", secret, reference))
            })?;

            resolved.insert(name.clone(), value);
        }

        Ok(resolved)
    }

    fn build(&self, name: &str, spec: &SecretSpec) -> Result<Resource> {
        let secret_type = SecretType::parse(&spec.secret_type).ok_or_else(|| {
            GenerateError::Config(format!("secret {}: unsupported secret type {}", name, spec.secret_type))
        })?;

        for key in secret_type.required_keys() {
            if !spec.data.contains_key(*key) {
                return Err(GenerateError::Config(format!(
                    "secret {} of type {} requires {}",
                    name, spec.secret_type, key
                )));
            }
        }

        let data = match secret_type {
            SecretType::External => self.resolve_external(name, &spec.data)?,
            _ => spec.data.clone(),
        };
        let encoded: Map<String, Value> = data
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(STANDARD.encode(v))))
            .collect();

        let mut attributes = match json!({
            "apiVersion": "v1",
            "kind": "Secret",
            "metadata": {"name": name, "namespace": self.namespace},
            "type": secret_type.kubernetes_type(),
            "data": encoded,
        }) {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        if spec.immutable {
            attributes.insert("immutable".to_string(), Value::Bool(true));
        }

        Ok(Resource::kubernetes(
            format!("v1:Secret:{}:{}", self.namespace, name),
            attributes,
        ))
    }
}

impl SpecGenerator for SecretGenerator<'_> {
    fn generate(&self, spec: &mut Spec) -> Result<()> {
        for (name, secret) in self.secrets()? {
            let resource = self.build(&name, &secret)?;
            debug!(secret = %name, id = %resource.id, "Generated secret");
            spec.resources.push(resource);
        }
        Ok(())
    }
}
