//! Generation of every app of a stack into one graph

use crate::error::Result;
use crate::generator::{AppConfigurationGenerator, GeneratorOptions};
use crate::order::ResourceOrderer;
use kusion_core::{AppConfiguration, Dependencies, Project, Spec, Stack, Workspace};
use kusion_module::PluginLauncher;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, instrument};

/// Builds the graph of a stack from all its application configurations.
///
/// Apps are generated in name order into a shared graph, so built-in
/// resources such as the namespace appear once.
pub struct AppsConfigBuilder {
    apps: BTreeMap<String, AppConfiguration>,
    workspace: Workspace,
    dependencies: Dependencies,
    launcher: Option<Arc<dyn PluginLauncher>>,
    orderer: Option<Arc<dyn ResourceOrderer>>,
    options: GeneratorOptions,
}

impl AppsConfigBuilder {
    pub fn new(
        apps: BTreeMap<String, AppConfiguration>,
        workspace: Workspace,
        dependencies: Dependencies,
    ) -> Self {
        Self {
            apps,
            workspace,
            dependencies,
            launcher: None,
            orderer: None,
            options: GeneratorOptions::default(),
        }
    }

    pub fn with_launcher(mut self, launcher: Arc<dyn PluginLauncher>) -> Self {
        self.launcher = Some(launcher);
        self
    }

    pub fn with_orderer(mut self, orderer: Arc<dyn ResourceOrderer>) -> Self {
        self.orderer = Some(orderer);
        self
    }

    pub fn with_options(mut self, options: GeneratorOptions) -> Self {
        self.options = options;
        self
    }

    #[instrument(skip(self, project, stack), fields(project = %project.name, stack = %stack.name, apps = self.apps.len()))]
    pub async fn build(&self, project: &Project, stack: &Stack) -> Result<Spec> {
        let mut spec = Spec::new();

        for (name, app) in &self.apps {
            let mut generator = AppConfigurationGenerator::new(
                project.clone(),
                stack.clone(),
                name.clone(),
                app.clone(),
                self.workspace.clone(),
                self.dependencies.clone(),
            )?
            .with_options(self.options.clone());
            if let Some(launcher) = &self.launcher {
                generator = generator.with_launcher(launcher.clone());
            }
            if let Some(orderer) = &self.orderer {
                generator = generator.with_orderer(orderer.clone());
            }

            generator.generate_into(&mut spec).await?;
        }

        info!(resources = spec.resources.len(), "Built stack configuration");
        Ok(spec)
    }
}
