//! Application configuration generator
//!
//! Turns one application configuration into a resource graph:
//!
//! 1. resolve the Kubernetes namespace and run the built-in generators
//! 2. index module configs and invoke one plugin per module key, in key order
//! 3. assemble the workload and plain resources, then apply every patcher
//! 4. mark imported resources and run the ordering pass
//! 5. attach the workspace secret store and context
//!
//! Any failure aborts generation without publishing a partial graph.

use crate::assembler::Assembly;
use crate::builtin::{NamespaceGenerator, SecretGenerator, SpecGenerator, call_generators};
use crate::error::{GenerateError, Result};
use crate::index::{ModuleConfigIndex, build_module_config_index};
use crate::order::{KindOrderer, ResourceOrderer};
use crate::patch::{json_patch, patch_workload};
use crate::postprocess::patch_imported_resources;
use crate::request::RequestBuilder;
use crate::resolver::resolve_module_key;
use futures_util::FutureExt;
use kusion_config::{DEFAULT_INVOKE_TIMEOUT_SECS, ModuleSettings};
use kusion_core::workspace::{
    FIELD_IMPORTED_RESOURCES, get_string_map, project_module_configs, validate_workspace,
};
use kusion_core::{
    AppConfiguration, Dependencies, Extension, ExtensionKind, GenericConfig, ModuleKey, Project,
    Spec, Stack, Workspace,
};
use kusion_module::{ModuleError, PluginLauncher, PluginPool, ProcessLauncher};
use std::any::Any;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, instrument};

/// Knobs of one generation call.
#[derive(Debug, Clone, Default)]
pub struct GeneratorOptions {
    /// Per-invocation timeout; the module settings value when unset
    pub invoke_timeout: Option<Duration>,

    /// Deadline of the whole call
    pub deadline: Option<Instant>,
}

pub struct AppConfigurationGenerator {
    project: Project,
    stack: Stack,
    app_name: String,
    app: AppConfiguration,
    workspace: Workspace,
    dependencies: Dependencies,
    launcher: Option<Arc<dyn PluginLauncher>>,
    orderer: Arc<dyn ResourceOrderer>,
    options: GeneratorOptions,
}

impl AppConfigurationGenerator {
    /// Validate the inputs and prepare a generator.
    ///
    /// The workspace is validated here, before any plugin can start.
    pub fn new(
        project: Project,
        stack: Stack,
        app_name: impl Into<String>,
        mut app: AppConfiguration,
        workspace: Workspace,
        dependencies: Dependencies,
    ) -> Result<Self> {
        let app_name = app_name.into();
        if project.name.is_empty() {
            return Err(GenerateError::Config("project name must not be empty".into()));
        }
        if app_name.is_empty() {
            return Err(GenerateError::Config("app name must not be empty".into()));
        }
        validate_workspace(&workspace)?;

        app.name = app_name.clone();

        Ok(Self {
            project,
            stack,
            app_name,
            app,
            workspace,
            dependencies,
            launcher: None,
            orderer: Arc::new(KindOrderer::default()),
            options: GeneratorOptions::default(),
        })
    }

    /// Launch plugins through `launcher` instead of the process launcher.
    pub fn with_launcher(mut self, launcher: Arc<dyn PluginLauncher>) -> Self {
        self.launcher = Some(launcher);
        self
    }

    pub fn with_orderer(mut self, orderer: Arc<dyn ResourceOrderer>) -> Self {
        self.orderer = orderer;
        self
    }

    pub fn with_options(mut self, options: GeneratorOptions) -> Self {
        self.options = options;
        self
    }

    pub fn app(&self) -> &AppConfiguration {
        &self.app
    }

    /// Generate the resource graph of the application.
    pub async fn generate(&self) -> Result<Spec> {
        let mut spec = Spec::new();
        self.generate_into(&mut spec).await?;
        Ok(spec)
    }

    /// Generate into an existing graph, e.g. one shared by several apps.
    ///
    /// `spec` is left untouched when generation fails.
    #[instrument(skip(self, spec), fields(project = %self.project.name, stack = %self.stack.name, app = %self.app_name))]
    pub async fn generate_into(&self, spec: &mut Spec) -> Result<()> {
        let mut working = spec.clone();

        let module_configs = project_module_configs(&self.workspace, &self.project.name)?;
        let imported = collect_imported_resources(&module_configs)?;

        let namespace = self.namespace();
        debug!(namespace = %namespace, "Resolved namespace");
        let namespace_generator = NamespaceGenerator::new(namespace.clone());
        match &self.app.workload {
            Some(workload) => {
                let secret_generator =
                    SecretGenerator::new(&namespace, workload, self.workspace.secret_store.as_ref());
                call_generators(&mut working, &[&namespace_generator as &dyn SpecGenerator, &secret_generator])?;
            }
            None => call_generators(&mut working, &[&namespace_generator])?,
        }

        let index = build_module_config_index(
            &self.app,
            self.workspace.context.as_ref(),
            &module_configs,
            &self.dependencies,
        )?;
        let workload_key = resolve_module_key(self.app.workload.as_ref(), &self.dependencies)?;

        let assembly = self.call_modules(&index, workload_key.as_ref()).await?;

        let workload_index = assembly.workload.as_ref().map(|_| working.resources.len());
        working.resources.extend(assembly.workload);
        working.resources.extend(assembly.resources);

        for patcher in &assembly.patchers {
            patch_workload(
                workload_index.and_then(|i| working.resources.get_mut(i)),
                Some(patcher),
            )?;
            json_patch(&mut working.resources, Some(patcher))?;
        }

        patch_imported_resources(&mut working.resources, &imported);

        let before = sorted_ids(&working);
        self.orderer.order(&mut working.resources)?;
        if sorted_ids(&working) != before {
            return Err(GenerateError::Config(
                "resource orderer changed the set of resource IDs".into(),
            ));
        }

        working.secret_store = self.workspace.secret_store.clone();
        working.context = self.workspace.context.clone();

        info!(
            resources = working.resources.len(),
            modules = index.len(),
            "Generated app configuration"
        );
        *spec = working;
        Ok(())
    }

    /// Namespace from the stack extensions, then the project extensions
    /// whose kind the stack does not declare. Defaults to the project name.
    fn namespace(&self) -> String {
        let stack_kinds: Vec<&ExtensionKind> = self.stack.extensions.iter().map(|e| &e.kind).collect();
        let extensions = self.stack.extensions.iter().chain(
            self.project
                .extensions
                .iter()
                .filter(|e| !stack_kinds.contains(&&e.kind)),
        );
        namespace_from_extensions(extensions).unwrap_or_else(|| self.project.name.clone())
    }

    async fn call_modules(
        &self,
        index: &ModuleConfigIndex,
        workload_key: Option<&ModuleKey>,
    ) -> Result<Assembly> {
        let (launcher, settings_timeout) = match &self.launcher {
            Some(launcher) => (launcher.clone(), Duration::from_secs(DEFAULT_INVOKE_TIMEOUT_SECS)),
            None => {
                let settings = ModuleSettings::load().map_err(ModuleError::from)?;
                let timeout = settings.invoke_timeout();
                (Arc::new(ProcessLauncher::new(settings)) as Arc<dyn PluginLauncher>, timeout)
            }
        };
        let mut pool = PluginPool::new(launcher, &self.stack.path)
            .with_invoke_timeout(self.options.invoke_timeout.unwrap_or(settings_timeout))
            .with_deadline(self.options.deadline);

        let requests = RequestBuilder::new(
            &self.project.name,
            &self.stack.name,
            &self.app_name,
            self.app.workload.as_ref(),
            self.workspace.secret_store.as_ref(),
        )?;

        let outcome = AssertUnwindSafe(invoke_modules(&mut pool, index, workload_key, &requests))
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(panic_error(payload)));

        let failures = pool.shutdown().await;
        if failures.is_empty() {
            return outcome;
        }

        let primary = outcome.err().map(Box::new);
        let err = GenerateError::Teardown { primary, failures };
        error!(error = %err, "Module teardown failed");
        Err(err)
    }
}

async fn invoke_modules(
    pool: &mut PluginPool,
    index: &ModuleConfigIndex,
    workload_key: Option<&ModuleKey>,
    requests: &RequestBuilder,
) -> Result<Assembly> {
    let mut assembly = Assembly::new();
    for (key, config) in index {
        let request = requests.build(config)?;
        let response = pool.invoke(key, request).await?;
        debug!(module = %key, resources = response.resources.len(), "Module responded");
        assembly.absorb(key, workload_key, config, response)?;
    }
    Ok(assembly)
}

fn panic_error(payload: Box<dyn Any + Send>) -> GenerateError {
    let payload = match payload.downcast::<GenerateError>() {
        Ok(err) => return *err,
        Err(payload) => payload,
    };
    let payload = match payload.downcast::<String>() {
        Ok(message) => return GenerateError::Panic(*message),
        Err(payload) => payload,
    };
    let payload = match payload.downcast::<&'static str>() {
        Ok(message) => return GenerateError::Panic(message.to_string()),
        Err(payload) => payload,
    };
    match payload.downcast::<Box<dyn std::error::Error + Send + Sync>>() {
        Ok(err) => GenerateError::Panic(err.to_string()),
        Err(_) => GenerateError::UnknownPanic,
    }
}

fn namespace_from_extensions<'a>(extensions: impl Iterator<Item = &'a Extension>) -> Option<String> {
    extensions
        .filter(|e| e.kind == ExtensionKind::KubernetesNamespace)
        .find_map(|e| e.kubernetes_namespace.as_ref())
        .map(|ns| ns.namespace.clone())
        .filter(|ns| !ns.is_empty())
}

/// Merge the `importedResources` maps of every module config.
fn collect_imported_resources(
    module_configs: &BTreeMap<String, GenericConfig>,
) -> Result<BTreeMap<String, String>> {
    let mut imported = BTreeMap::new();
    for (module, config) in module_configs {
        for (id, imported_id) in get_string_map(config, FIELD_IMPORTED_RESOURCES)? {
            match imported.get(&id) {
                Some(existing) if existing != &imported_id => {
                    return Err(GenerateError::Config(format!(
                        "resource {} is imported as both {} and {} (module {})",
                        id, existing, imported_id, module
                    )));
                }
                _ => {
                    imported.insert(id, imported_id);
                }
            }
        }
    }
    Ok(imported)
}

/// Resource IDs with multiplicity, sorted.
fn sorted_ids(spec: &Spec) -> Vec<String> {
    let mut ids: Vec<String> = spec.resources.iter().map(|r| r.id.clone()).collect();
    ids.sort_unstable();
    ids
}
