//! Projects, stacks and their extensions

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A project groups the stacks of one application family.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extensions: Vec<Extension>,
}

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// One deployable instance of a project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stack {
    pub name: String,

    /// Working directory of the stack; module plugins run inside it
    #[serde(default)]
    pub path: PathBuf,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extensions: Vec<Extension>,
}

impl Stack {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            extensions: Vec::new(),
        }
    }
}

/// Extension kind
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExtensionKind {
    KubernetesNamespace,
    KubernetesMetadata,
    #[serde(other)]
    Other,
}

/// Project or stack extension
///
/// ```yaml
/// extensions:
///   - kind: kubernetesNamespace
///     kubernetesNamespace:
///       namespace: payments
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Extension {
    pub kind: ExtensionKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubernetes_namespace: Option<KubeNamespaceExtension>,
}

impl Extension {
    pub fn namespace(namespace: impl Into<String>) -> Self {
        Self {
            kind: ExtensionKind::KubernetesNamespace,
            kubernetes_namespace: Some(KubeNamespaceExtension {
                namespace: namespace.into(),
            }),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KubeNamespaceExtension {
    pub namespace: String,
}
