//! Workspace validation and project-scoped module configs

use crate::error::{CoreError, Result};
use crate::model::{GenericConfig, ModuleConfigs, Workspace};
use std::collections::BTreeMap;
use tracing::debug;

/// Name of the block every project inherits.
pub const DEFAULT_BLOCK: &str = "default";

/// Field selecting the projects a patcher block applies to.
pub const FIELD_PROJECT_SELECTOR: &str = "projectSelector";

/// Module config field mapping kusion IDs to imported resource IDs.
pub const FIELD_IMPORTED_RESOURCES: &str = "importedResources";

/// Platform config field carrying the health policy.
pub const FIELD_HEALTH_POLICY: &str = "healthPolicy";

/// Check the structural rules a workspace must satisfy before generation.
pub fn validate_workspace(workspace: &Workspace) -> Result<()> {
    if workspace.name.is_empty() {
        return Err(CoreError::invalid_workspace("", "empty workspace name"));
    }

    for (name, module) in &workspace.modules {
        validate_module_configs(&workspace.name, name, module)?;
    }

    if let Some(store) = &workspace.secret_store {
        if store.provider.len() != 1 {
            return Err(CoreError::invalid_workspace(
                &workspace.name,
                format!(
                    "secret store must configure exactly one provider, found {}",
                    store.provider.len()
                ),
            ));
        }
    }

    debug!(workspace = %workspace.name, modules = workspace.modules.len(), "Workspace validated");
    Ok(())
}

fn validate_module_configs(ws: &str, module: &str, configs: &ModuleConfigs) -> Result<()> {
    if configs.configs.default.contains_key(FIELD_PROJECT_SELECTOR) {
        return Err(CoreError::invalid_workspace(
            ws,
            format!("module {}: default block must not declare {}", module, FIELD_PROJECT_SELECTOR),
        ));
    }

    let mut selected: BTreeMap<&str, &str> = BTreeMap::new();
    for (patcher_name, patcher) in &configs.configs.patchers {
        if patcher.project_selector.is_empty() {
            return Err(CoreError::invalid_workspace(
                ws,
                format!(
                    "module {}: patcher block {} has an empty {}",
                    module, patcher_name, FIELD_PROJECT_SELECTOR
                ),
            ));
        }
        for project in &patcher.project_selector {
            if project.is_empty() {
                return Err(CoreError::invalid_workspace(
                    ws,
                    format!("module {}: patcher block {} selects an empty project", module, patcher_name),
                ));
            }
            if let Some(previous) = selected.insert(project, patcher_name) {
                return Err(CoreError::invalid_workspace(
                    ws,
                    format!(
                        "module {}: project {} is selected by both {} and {}",
                        module, project, previous, patcher_name
                    ),
                ));
            }
        }
    }
    Ok(())
}

/// Module configs effective for `project`, keyed by module name.
///
/// Each result is the `default` block shallowly overlaid with the patcher
/// block selecting the project. Modules whose effective config is empty are
/// left out.
pub fn project_module_configs(
    workspace: &Workspace,
    project: &str,
) -> Result<BTreeMap<String, GenericConfig>> {
    let mut result = BTreeMap::new();

    for (name, module) in &workspace.modules {
        let mut matched = None;
        for (patcher_name, patcher) in &module.configs.patchers {
            if !patcher.project_selector.iter().any(|p| p == project) {
                continue;
            }
            if let Some(previous) = matched.replace(patcher_name) {
                return Err(CoreError::InvalidConfig(format!(
                    "project {} is selected by more than one patcher of module {}: {}, {}",
                    project, name, previous, patcher_name
                )));
            }
        }

        let mut config = module.configs.default.clone();
        if let Some(patcher_name) = matched {
            let patcher = &module.configs.patchers[patcher_name];
            for (key, value) in &patcher.config {
                config.insert(key.clone(), value.clone());
            }
        }

        if !config.is_empty() {
            result.insert(name.clone(), config);
        }
    }

    Ok(result)
}

/// Read `key` of a config as a string-to-string map.
///
/// Absent key yields an empty map. A non-map value, or a map holding a
/// non-string value, is a config error.
pub fn get_string_map(config: &GenericConfig, key: &str) -> Result<BTreeMap<String, String>> {
    let Some(value) = config.get(key) else {
        return Ok(BTreeMap::new());
    };
    let object = value
        .as_object()
        .ok_or_else(|| CoreError::InvalidConfig(format!("{} must be a map", key)))?;

    object
        .iter()
        .map(|(k, v)| match v.as_str() {
            Some(s) => Ok((k.clone(), s.to_string())),
            None => Err(CoreError::InvalidConfig(format!(
                "value of {}.{} must be a string",
                key, k
            ))),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SecretStore;

    fn workspace(yaml: &str) -> Workspace {
        serde_yaml::from_str(yaml).unwrap()
    }

    const WS: &str = r#"
name: dev
modules:
  mysql:
    configs:
      default:
        size: 10
        engine: mysql
      big:
        size: 100
        projectSelector: [payments]
  network:
    configs:
      default: {}
"#;

    #[test]
    fn test_validate_ok() {
        validate_workspace(&workspace(WS)).unwrap();
    }

    #[test]
    fn test_validate_empty_name() {
        let err = validate_workspace(&Workspace::default()).unwrap_err();
        assert!(matches!(err, CoreError::InvalidWorkspace { .. }));
    }

    #[test]
    fn test_validate_selector_in_default() {
        let ws = workspace(
            r#"
name: dev
modules:
  mysql:
    configs:
      default:
        projectSelector: [a]
"#,
        );
        assert!(matches!(
            validate_workspace(&ws),
            Err(CoreError::InvalidWorkspace { .. })
        ));
    }

    #[test]
    fn test_validate_project_selected_twice() {
        let ws = workspace(
            r#"
name: dev
modules:
  mysql:
    configs:
      default: {}
      a:
        projectSelector: [payments]
      b:
        projectSelector: [payments]
"#,
        );
        let err = validate_workspace(&ws).unwrap_err();
        assert!(err.to_string().contains("payments"));
    }

    #[test]
    fn test_validate_secret_store_providers() {
        let mut ws = Workspace::new("dev");
        ws.secret_store = Some(SecretStore::default());
        assert!(validate_workspace(&ws).is_err());
    }

    #[test]
    fn test_project_module_configs_overlay() {
        let ws = workspace(WS);

        let configs = project_module_configs(&ws, "payments").unwrap();
        assert_eq!(configs.len(), 1);
        assert_eq!(configs["mysql"]["size"], 100);
        assert_eq!(configs["mysql"]["engine"], "mysql");

        let configs = project_module_configs(&ws, "other").unwrap();
        assert_eq!(configs["mysql"]["size"], 10);
        assert!(!configs.contains_key("network"));
    }

    #[test]
    fn test_get_string_map() {
        let mut config = GenericConfig::new();
        assert!(get_string_map(&config, FIELD_IMPORTED_RESOURCES).unwrap().is_empty());

        config.insert(
            FIELD_IMPORTED_RESOURCES.into(),
            serde_json::json!({"v1:Service:ns:web": "arn:aws:web"}),
        );
        let map = get_string_map(&config, FIELD_IMPORTED_RESOURCES).unwrap();
        assert_eq!(map["v1:Service:ns:web"], "arn:aws:web");

        config.insert(FIELD_IMPORTED_RESOURCES.into(), serde_json::json!({"a": 1}));
        assert!(get_string_map(&config, FIELD_IMPORTED_RESOURCES).is_err());
    }
}
