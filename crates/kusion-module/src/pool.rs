//! Plugin handle pool
//!
//! A pool belongs to one generation call. Plugins start lazily, at most one
//! per module key, and are all torn down by [`PluginPool::shutdown`].

use crate::error::{ModuleError, Result};
use crate::plugin::{ModulePlugin, PluginLauncher};
use crate::protocol::{CallMetadata, GeneratorRequest, GeneratorResponse};
use kusion_config::DEFAULT_INVOKE_TIMEOUT_SECS;
use kusion_core::ModuleKey;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

pub struct PluginPool {
    launcher: Arc<dyn PluginLauncher>,
    work_dir: PathBuf,
    invoke_timeout: Duration,
    deadline: Option<Instant>,
    handles: BTreeMap<ModuleKey, Box<dyn ModulePlugin>>,
}

impl PluginPool {
    /// Pool whose plugins run inside `work_dir`.
    pub fn new(launcher: Arc<dyn PluginLauncher>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            launcher,
            work_dir: work_dir.into(),
            invoke_timeout: Duration::from_secs(DEFAULT_INVOKE_TIMEOUT_SECS),
            deadline: None,
            handles: BTreeMap::new(),
        }
    }

    pub fn with_invoke_timeout(mut self, timeout: Duration) -> Self {
        self.invoke_timeout = timeout;
        self
    }

    /// Deadline for the whole call; caps every invocation budget.
    pub fn with_deadline(mut self, deadline: Option<Instant>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Number of started plugins.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn contains(&self, key: &ModuleKey) -> bool {
        self.handles.contains_key(key)
    }

    /// Remaining budget for one invocation.
    fn budget(&self) -> Duration {
        match self.deadline {
            Some(deadline) => self
                .invoke_timeout
                .min(deadline.saturating_duration_since(Instant::now())),
            None => self.invoke_timeout,
        }
    }

    /// Invoke the plugin for `key`, starting it on first use.
    #[instrument(skip(self, request), fields(module = %key))]
    pub async fn invoke(
        &mut self,
        key: &ModuleKey,
        request: GeneratorRequest,
    ) -> Result<GeneratorResponse> {
        if !self.handles.contains_key(key) {
            let plugin = self.launcher.launch(key, &self.work_dir).await?;
            info!("Module plugin launched");
            self.handles.insert(key.clone(), plugin);
        }

        let budget = self.budget();
        let plugin = self
            .handles
            .get_mut(key)
            .ok_or_else(|| ModuleError::Protocol(format!("no plugin handle for {}", key)))?;

        let metadata = CallMetadata::new(key.module_name());
        debug!(trace_id = %metadata.trace_id, budget = ?budget, "Invoking module");

        match tokio::time::timeout(budget, plugin.generate(metadata, request)).await {
            Ok(result) => result,
            Err(_) => Err(ModuleError::Timeout {
                key: key.to_string(),
                elapsed: budget,
            }),
        }
    }

    /// Tear down every started plugin exactly once.
    ///
    /// Returns every teardown failure; an empty vector means a clean shutdown.
    pub async fn shutdown(self) -> Vec<ModuleError> {
        let mut failures = Vec::new();
        for (key, mut plugin) in self.handles {
            match plugin.kill().await {
                Ok(()) => debug!(module = %key, "Module plugin torn down"),
                Err(e) => {
                    warn!(module = %key, error = %e, "Failed to tear down module plugin");
                    failures.push(e);
                }
            }
        }
        failures
    }
}
