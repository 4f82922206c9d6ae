//! YAML document loaders
//!
//! Project, stack, workspace, application and dependency documents are
//! plain YAML files. A stack directory holds `stack.yaml`; its path becomes
//! the working directory of the module plugins.

use crate::error::{CoreError, Result};
use crate::model::{AppConfiguration, Dependencies, Project, Stack, Workspace};
use serde::de::DeserializeOwned;
use std::path::Path;
use tracing::{debug, info, instrument};

/// Stack file name inside a stack directory.
pub const STACK_FILE: &str = "stack.yaml";

/// Project file name inside a project directory.
pub const PROJECT_FILE: &str = "project.yaml";

fn read_yaml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    debug!(path = %path.display(), bytes = content.len(), "Read YAML document");
    Ok(serde_yaml::from_str(&content)?)
}

/// Load `project.yaml` from a project directory.
#[instrument(skip(dir), fields(dir = %dir.display()))]
pub fn load_project(dir: &Path) -> Result<Project> {
    let project: Project = read_yaml(&dir.join(PROJECT_FILE))?;
    if project.name.is_empty() {
        return Err(CoreError::InvalidConfig(format!(
            "project in {} has no name",
            dir.display()
        )));
    }
    info!(project = %project.name, "Project loaded");
    Ok(project)
}

/// Load `stack.yaml` from a stack directory.
///
/// A missing `path` is filled with the stack directory itself.
#[instrument(skip(dir), fields(dir = %dir.display()))]
pub fn load_stack(dir: &Path) -> Result<Stack> {
    let mut stack: Stack = read_yaml(&dir.join(STACK_FILE))?;
    if stack.path.as_os_str().is_empty() {
        stack.path = dir.to_path_buf();
    }
    info!(stack = %stack.name, "Stack loaded");
    Ok(stack)
}

#[instrument(skip(path), fields(path = %path.display()))]
pub fn load_workspace(path: &Path) -> Result<Workspace> {
    let workspace: Workspace = read_yaml(path)?;
    info!(
        workspace = %workspace.name,
        modules = workspace.modules.len(),
        "Workspace loaded"
    );
    Ok(workspace)
}

#[instrument(skip(path), fields(path = %path.display()))]
pub fn load_app_configuration(path: &Path) -> Result<AppConfiguration> {
    let app: AppConfiguration = read_yaml(path)?;
    info!(
        has_workload = app.workload.is_some(),
        accessories = app.accessories.len(),
        "Application configuration loaded"
    );
    Ok(app)
}

#[instrument(skip(path), fields(path = %path.display()))]
pub fn load_dependencies(path: &Path) -> Result<Dependencies> {
    let deps: Dependencies = read_yaml(path)?;
    info!(deps = deps.deps.len(), "Dependencies loaded");
    Ok(deps)
}
