//! Module dependency metadata

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Dependencies declared by a stack, keyed by module name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependencies {
    #[serde(default)]
    pub deps: BTreeMap<String, Dependency>,
}

impl Dependencies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, module_name: &str) -> Option<&Dependency> {
        self.deps.get(module_name)
    }

    pub fn insert(&mut self, module_name: impl Into<String>, dependency: Dependency) {
        self.deps.insert(module_name.into(), dependency);
    }
}

/// One module dependency, addressed through a registry or a git repository.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    #[serde(default)]
    pub name: String,

    /// Version used for registry-addressed modules
    #[serde(default)]
    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oci: Option<OciSource>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git: Option<GitSource>,
}

impl Dependency {
    /// Registry-addressed dependency.
    pub fn oci(repo: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            oci: Some(OciSource {
                repo: repo.into(),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    /// Git-addressed dependency.
    pub fn git(url: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            git: Some(GitSource {
                url: url.into(),
                tag: tag.into(),
            }),
            ..Default::default()
        }
    }
}

/// OCI registry coordinates
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OciSource {
    #[serde(default)]
    pub reg: String,
    pub repo: String,
    #[serde(default)]
    pub tag: String,
}

/// Git coordinates
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitSource {
    pub url: String,
    #[serde(default)]
    pub tag: String,
}
