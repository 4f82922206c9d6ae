//! Per-module request construction

use crate::error::{GenerateError, Result};
use crate::index::ModuleConfig;
use kusion_core::{Accessory, SecretStore};
use kusion_module::GeneratorRequest;

/// Builds the [`GeneratorRequest`] of each module invocation.
///
/// Inputs shared by every module (names, workload, secret store) are
/// serialized once; per-module fields are serialized by [`build`](Self::build).
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    project: String,
    stack: String,
    app: String,
    workload: Option<Vec<u8>>,
    secret_store: Option<Vec<u8>>,
}

impl RequestBuilder {
    pub fn new(
        project: &str,
        stack: &str,
        app: &str,
        workload: Option<&Accessory>,
        secret_store: Option<&SecretStore>,
    ) -> Result<Self> {
        let workload = workload
            .map(Accessory::to_yaml_bytes)
            .transpose()
            .map_err(|e| GenerateError::Config(format!("marshal workload failed: {}", e)))?;
        let secret_store = secret_store
            .map(to_yaml_bytes)
            .transpose()
            .map_err(|e| GenerateError::Config(format!("marshal secret store failed: {}", e)))?;

        Ok(Self {
            project: project.to_string(),
            stack: stack.to_string(),
            app: app.to_string(),
            workload,
            secret_store,
        })
    }

    pub fn build(&self, config: &ModuleConfig) -> Result<GeneratorRequest> {
        let dev_config = config
            .dev_config
            .as_ref()
            .map(Accessory::to_yaml_bytes)
            .transpose()
            .map_err(|e| GenerateError::Config(format!("marshal dev config failed: {}", e)))?;
        let platform_config = config
            .platform_config
            .as_ref()
            .map(|p| to_yaml_bytes(&p.config))
            .transpose()
            .map_err(|e| GenerateError::Config(format!("marshal platform config failed: {}", e)))?;
        let context = config
            .context
            .as_ref()
            .map(to_yaml_bytes)
            .transpose()
            .map_err(|e| GenerateError::Config(format!("marshal context failed: {}", e)))?;

        Ok(GeneratorRequest {
            project: self.project.clone(),
            stack: self.stack.clone(),
            app: self.app.clone(),
            workload: self.workload.clone(),
            dev_config,
            platform_config,
            context,
            secret_store: self.secret_store.clone(),
        })
    }
}

fn to_yaml_bytes<T: serde::Serialize>(value: &T) -> serde_yaml::Result<Vec<u8>> {
    serde_yaml::to_string(value).map(String::into_bytes)
}
