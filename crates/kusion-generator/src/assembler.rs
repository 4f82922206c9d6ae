//! Assembly of module responses into workload, resources and patchers

use crate::index::ModuleConfig;
use crate::error::Result;
use crate::postprocess::attach_health_policy;
use kusion_core::{ModuleKey, Patcher, Resource, ResourceType};
use kusion_module::{GeneratorResponse, ModuleError};
use tracing::debug;

/// Results accumulated across module invocations.
#[derive(Debug, Default)]
pub struct Assembly {
    pub workload: Option<Resource>,
    /// Non-workload resources, in module invocation order
    pub resources: Vec<Resource>,
    /// Patchers, in module invocation order
    pub patchers: Vec<Patcher>,
}

impl Assembly {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one module's response into the assembly.
    ///
    /// A response of exactly one resource from the workload's module is the
    /// workload. Otherwise the first resource of the workload's module that
    /// carries the workload marker is. Every other resource is plain.
    pub fn absorb(
        &mut self,
        key: &ModuleKey,
        workload_key: Option<&ModuleKey>,
        config: &ModuleConfig,
        response: GeneratorResponse,
    ) -> Result<()> {
        let decoded = response
            .resources
            .iter()
            .map(|bytes| {
                serde_yaml::from_slice::<Resource>(bytes).map_err(|e| {
                    ModuleError::Protocol(format!("malformed resource from module {}: {}", key, e))
                })
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let from_workload_module = workload_key == Some(key);
        let single = decoded.len() == 1;
        let mut workload = None;

        for resource in decoded {
            let is_workload = from_workload_module
                && workload.is_none()
                && (single || resource.is_workload());
            if is_workload {
                workload = Some(resource);
            } else {
                self.resources.push(resource);
            }
        }

        let health_policy = config
            .platform_config
            .as_ref()
            .and_then(|p| p.health_policy.as_ref());

        if let Some(mut resolved) = workload {
            resolved.mark_workload();
            if let Some(policy) = health_policy {
                attach_health_policy(&mut resolved, policy);
            }
            debug!(module = %key, workload = %resolved.id, "Resolved workload");
            self.workload = Some(resolved);
        }

        if let Some(policy) = health_policy {
            for resource in self
                .resources
                .iter_mut()
                .filter(|r| r.resource_type == ResourceType::Kubernetes)
            {
                let api_version = resource.api_version().unwrap_or("");
                let kind = resource.kind().unwrap_or("");
                if api_version.eq_ignore_ascii_case(policy.api_version())
                    && kind.eq_ignore_ascii_case(policy.kind())
                {
                    debug!(module = %key, resource = %resource.id, "Attached health policy");
                    attach_health_policy(resource, policy);
                }
            }
        }

        if let Some(bytes) = &response.patcher {
            let patcher: Patcher = serde_yaml::from_slice(bytes).map_err(|e| {
                ModuleError::Protocol(format!("malformed patcher from module {}: {}", key, e))
            })?;
            self.patchers.push(patcher);
        }

        Ok(())
    }
}
