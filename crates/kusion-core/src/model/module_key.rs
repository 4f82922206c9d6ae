//! Module key

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of one module plugin: `"<namespace>/<module>@<version>"`.
///
/// Ordering is lexicographic on the full key; module invocation order
/// follows it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleKey(String);

impl ModuleKey {
    /// Build a key from a source (`org/repo`) and a version.
    pub fn new(source: &str, version: &str) -> Self {
        Self(format!("{}@{}", source, version))
    }

    pub fn parse(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Part before the last `@`.
    pub fn source(&self) -> &str {
        self.0.rsplit_once('@').map(|(s, _)| s).unwrap_or(&self.0)
    }

    /// Part after the last `@` (empty when absent).
    pub fn version(&self) -> &str {
        self.0.rsplit_once('@').map(|(_, v)| v).unwrap_or("")
    }

    /// Last path segment of the source.
    pub fn module_name(&self) -> &str {
        let source = self.source();
        source.rsplit_once('/').map(|(_, m)| m).unwrap_or(source)
    }

    /// Everything before the module name, if any.
    pub fn namespace(&self) -> Option<&str> {
        self.source().rsplit_once('/').map(|(ns, _)| ns)
    }
}

impl fmt::Display for ModuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
