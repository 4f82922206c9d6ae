//! Module key resolution

use crate::error::{GenerateError, Result};
use kusion_core::{Accessory, Dependencies, ModuleKey};
use tracing::debug;

/// Resolve the module key serving `accessory`.
///
/// Registry dependencies yield `"<repo>@<version>"`; git dependencies yield
/// `"<org>/<repo>@<tag>"` from the last two segments of the URL with any
/// `.git` suffix removed. `None` resolves to `None`.
pub fn resolve_module_key(
    accessory: Option<&Accessory>,
    deps: &Dependencies,
) -> Result<Option<ModuleKey>> {
    let Some(accessory) = accessory else {
        debug!("Accessory is absent, no module key");
        return Ok(None);
    };

    let module_name = accessory.module_name()?;
    let dep = deps
        .get(module_name)
        .ok_or_else(|| GenerateError::ModuleNotFound(module_name.to_string()))?;

    if let Some(oci) = &dep.oci {
        return Ok(Some(ModuleKey::new(&oci.repo, &dep.version)));
    }

    if let Some(git) = &dep.git {
        let url = git.url.strip_suffix(".git").unwrap_or(&git.url);
        let segments: Vec<&str> = url.split('/').filter(|s| !s.is_empty()).collect();
        let [.., org, repo] = segments.as_slice() else {
            return Err(GenerateError::Config(format!(
                "git url {} of module {} needs at least two path segments",
                git.url, module_name
            )));
        };
        return Ok(Some(ModuleKey::new(&format!("{}/{}", org, repo), &git.tag)));
    }

    Err(GenerateError::Config(format!(
        "dependency of module {} declares neither an oci nor a git source",
        module_name
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use kusion_core::Dependency;

    fn accessory(type_tag: &str) -> Accessory {
        serde_yaml::from_str(&format!("_type: {}\n", type_tag)).unwrap()
    }

    fn deps() -> Dependencies {
        let mut deps = Dependencies::new();
        deps.insert("mysql", Dependency::oci("kusionstack/mysql", "0.2.0"));
        deps.insert(
            "service",
            Dependency::git("https://github.com/KusionStack/service.git", "v0.1.0"),
        );
        deps.insert("network", Dependency::git("network", "v1"));
        deps.insert("empty", Dependency::default());
        deps
    }

    #[test]
    fn test_registry_key() {
        let key = resolve_module_key(Some(&accessory("mysql.MySQL")), &deps()).unwrap();
        assert_eq!(key.unwrap().as_str(), "kusionstack/mysql@0.2.0");
    }

    #[test]
    fn test_git_key() {
        let key = resolve_module_key(Some(&accessory("service.Service")), &deps()).unwrap();
        assert_eq!(key.unwrap().as_str(), "KusionStack/service@v0.1.0");
    }

    #[test]
    fn test_absent_accessory() {
        assert!(resolve_module_key(None, &deps()).unwrap().is_none());
    }

    #[test]
    fn test_unknown_module() {
        let err = resolve_module_key(Some(&accessory("redis.Redis")), &deps()).unwrap_err();
        assert!(matches!(err, GenerateError::ModuleNotFound(ref name) if name == "redis"));
        assert!(err.is_config());
    }

    #[test]
    fn test_missing_type_is_config_error() {
        let acc: Accessory = serde_yaml::from_str("size: 1\n").unwrap();
        let err = resolve_module_key(Some(&acc), &deps()).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_short_git_url() {
        let err = resolve_module_key(Some(&accessory("network.Network")), &deps()).unwrap_err();
        assert!(matches!(err, GenerateError::Config(_)));
    }

    #[test]
    fn test_dependency_without_source() {
        let err = resolve_module_key(Some(&accessory("empty.Empty")), &deps()).unwrap_err();
        assert!(matches!(err, GenerateError::Config(_)));
    }
}
