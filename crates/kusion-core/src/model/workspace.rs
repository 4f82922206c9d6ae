//! Workspace: platform-side module configuration and secret store

use super::GenericConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Platform configuration shared by every project deployed into it.
///
/// ```yaml
/// name: prod
/// modules:
///   mysql:
///     path: oci://ghcr.io/kusionstack/mysql
///     version: 0.2.0
///     configs:
///       default:
///         instanceType: db.t3.micro
///       large:
///         instanceType: db.m5.xlarge
///         projectSelector: [payments]
/// context:
///   region: us-east-1
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    pub name: String,

    /// Module configs keyed by module name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub modules: BTreeMap<String, ModuleConfigs>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<GenericConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_store: Option<SecretStore>,
}

impl Workspace {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// All configuration blocks of one module.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleConfigs {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,

    #[serde(default)]
    pub configs: ModuleConfigBlocks,
}

/// The `default` block plus named patcher blocks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleConfigBlocks {
    #[serde(default)]
    pub default: GenericConfig,

    #[serde(flatten)]
    pub patchers: BTreeMap<String, ModulePatcherConfig>,
}

/// Overrides applied on top of `default` for the selected projects.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModulePatcherConfig {
    #[serde(default, rename = "projectSelector")]
    pub project_selector: Vec<String>,

    #[serde(flatten)]
    pub config: GenericConfig,
}

/// Secret store provider configuration, keyed by provider name.
///
/// Exactly one provider is expected. The `fake` provider holds its data
/// inline:
///
/// ```yaml
/// secretStore:
///   provider:
///     fake:
///       data:
///         - key: db-pass
///           value: s3cr3t
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SecretStore {
    #[serde(default)]
    pub provider: BTreeMap<String, serde_json::Value>,
}

/// Provider name of the inline secret store.
pub const FAKE_PROVIDER: &str = "fake";

/// One entry of the `fake` provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FakeSecretData {
    pub key: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_map: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FakeProvider {
    #[serde(default)]
    pub data: Vec<FakeSecretData>,
}

impl SecretStore {
    /// Decode the `fake` provider block, if configured.
    pub fn fake_provider(&self) -> serde_json::Result<Option<FakeProvider>> {
        self.provider
            .get(FAKE_PROVIDER)
            .map(|value| serde_json::from_value(value.clone()))
            .transpose()
    }
}
