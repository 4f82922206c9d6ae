//! Final ordering pass over the resource graph

use crate::error::Result;
use kusion_core::{Resource, ResourceType};
use tracing::debug;

/// Last pass over the finished graph.
///
/// Implementations may reorder resources or rewrite their dependencies but
/// must keep the set of resource IDs unchanged.
pub trait ResourceOrderer: Send + Sync {
    fn order(&self, resources: &mut Vec<Resource>) -> Result<()>;
}

/// Kubernetes kinds in apply order.
pub const DEFAULT_KIND_ORDER: &[&str] = &[
    "Namespace",
    "ResourceQuota",
    "StorageClass",
    "CustomResourceDefinition",
    "ServiceAccount",
    "PodSecurityPolicy",
    "Role",
    "ClusterRole",
    "RoleBinding",
    "ClusterRoleBinding",
    "ConfigMap",
    "Secret",
    "Endpoints",
    "Service",
    "LimitRange",
    "PriorityClass",
    "PersistentVolume",
    "PersistentVolumeClaim",
    "Deployment",
    "StatefulSet",
    "CronJob",
    "PodDisruptionBudget",
    "MutatingWebhookConfiguration",
    "ValidatingWebhookConfiguration",
];

/// Makes each Kubernetes resource depend on every Kubernetes resource of an
/// earlier kind. Resource positions are left as they are.
#[derive(Debug, Clone)]
pub struct KindOrderer {
    kinds: Vec<String>,
}

impl Default for KindOrderer {
    fn default() -> Self {
        Self::new(DEFAULT_KIND_ORDER.iter().map(|k| k.to_string()).collect())
    }
}

impl KindOrderer {
    pub fn new(kinds: Vec<String>) -> Self {
        Self { kinds }
    }

    fn rank(&self, resource: &Resource) -> Option<usize> {
        if resource.resource_type != ResourceType::Kubernetes {
            return None;
        }
        let kind = resource.kind()?;
        self.kinds.iter().position(|k| k == kind)
    }
}

impl ResourceOrderer for KindOrderer {
    fn order(&self, resources: &mut Vec<Resource>) -> Result<()> {
        let ranked: Vec<(Option<usize>, String)> = resources
            .iter()
            .map(|r| (self.rank(r), r.id.clone()))
            .collect();

        for resource in resources.iter_mut() {
            let Some(rank) = self.rank(resource) else {
                continue;
            };
            for (other_rank, other_id) in &ranked {
                let earlier = other_rank.is_some_and(|r| r < rank);
                if earlier && !resource.depends_on.contains(other_id) {
                    resource.depends_on.push(other_id.clone());
                }
            }
            if !resource.depends_on.is_empty() {
                debug!(resource = %resource.id, depends_on = resource.depends_on.len(), "Injected dependencies");
            }
        }
        Ok(())
    }
}
