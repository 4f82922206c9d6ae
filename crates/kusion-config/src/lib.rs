//! Kusion home and module plugin settings
//!
//! Settings are looked up in this order:
//! 1. `KUSION_CONFIG_PATH` (direct path)
//! 2. `<kusion home>/config.yaml`, then `<kusion home>/config.yml`
//!
//! The kusion home is `KUSION_HOME` when set, else `~/.kusion`. Missing
//! settings fall back to defaults.

pub mod error;

pub use error::*;

use kusion_core::ModuleKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

pub const KUSION_HOME_ENV: &str = "KUSION_HOME";
pub const KUSION_CONFIG_PATH_ENV: &str = "KUSION_CONFIG_PATH";

/// Default per-invocation plugin RPC budget.
pub const DEFAULT_INVOKE_TIMEOUT_SECS: u64 = 60;

/// File name prefix of module plugin binaries.
pub const PLUGIN_PREFIX: &str = "kusion-module-";

/// Resolve the kusion home directory.
pub fn get_kusion_home() -> Result<PathBuf> {
    if let Ok(home) = std::env::var(KUSION_HOME_ENV) {
        if !home.is_empty() {
            return Ok(PathBuf::from(home));
        }
    }
    dirs::home_dir()
        .map(|home| home.join(".kusion"))
        .ok_or(ConfigError::HomeDirNotFound)
}

/// Locate the settings file, if any.
pub fn find_settings_file() -> Result<Option<PathBuf>> {
    if let Ok(config_path) = std::env::var(KUSION_CONFIG_PATH_ENV) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(Some(path));
        }
    }

    let home = get_kusion_home()?;
    for filename in ["config.yaml", "config.yml"] {
        let path = home.join(filename);
        if path.exists() {
            return Ok(Some(path));
        }
    }

    Ok(None)
}

/// Module plugin settings.
///
/// ```yaml
/// modulesDir: /opt/kusion/modules
/// invokeTimeoutSecs: 30
/// plugins:
///   kusionstack/mysql@0.2.0: /usr/local/bin/kusion-module-mysql
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleSettings {
    /// Root of the installed module binaries (`<home>/modules` when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modules_dir: Option<PathBuf>,

    #[serde(default = "default_invoke_timeout_secs")]
    pub invoke_timeout_secs: u64,

    /// Explicit binary per module key
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub plugins: BTreeMap<String, PathBuf>,
}

fn default_invoke_timeout_secs() -> u64 {
    DEFAULT_INVOKE_TIMEOUT_SECS
}

impl Default for ModuleSettings {
    fn default() -> Self {
        Self {
            modules_dir: None,
            invoke_timeout_secs: DEFAULT_INVOKE_TIMEOUT_SECS,
            plugins: BTreeMap::new(),
        }
    }
}

impl ModuleSettings {
    /// Load from the discovered settings file, or defaults when none exists.
    pub fn load() -> Result<Self> {
        match find_settings_file()? {
            Some(path) => Self::from_file(&path),
            None => {
                debug!("No settings file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let settings = Self::from_yaml_str(&content).map_err(|source| ConfigError::SettingsParse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), plugins = settings.plugins.len(), "Settings loaded");
        Ok(settings)
    }

    /// Parse settings; an empty document yields defaults.
    pub fn from_yaml_str(content: &str) -> std::result::Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    pub fn invoke_timeout(&self) -> Duration {
        Duration::from_secs(self.invoke_timeout_secs)
    }

    pub fn modules_dir(&self) -> Result<PathBuf> {
        match &self.modules_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(get_kusion_home()?.join("modules")),
        }
    }

    /// Binary path of the plugin serving `key`.
    ///
    /// An entry in `plugins` wins. Otherwise the path is
    /// `<modules_dir>/<namespace>/<module>/<version>/kusion-module-<module>_<version>`.
    pub fn plugin_path(&self, key: &ModuleKey) -> Result<PathBuf> {
        if let Some(path) = self.plugins.get(key.as_str()) {
            return Ok(path.clone());
        }

        let mut dir = self.modules_dir()?;
        if let Some(namespace) = key.namespace() {
            dir.push(namespace);
        }
        dir.push(key.module_name());
        dir.push(key.version());

        Ok(dir.join(format!(
            "{}{}_{}",
            PLUGIN_PREFIX,
            key.module_name(),
            key.version()
        )))
    }
}
