//! Model definitions
//!
//! Each model lives in its own module and is re-exported here.

mod app;
mod dependency;
mod module_key;
mod patcher;
mod project;
mod resource;
mod workspace;

// Re-exports
pub use app::*;
pub use dependency::*;
pub use module_key::*;
pub use patcher::*;
pub use project::*;
pub use resource::*;
pub use workspace::*;

/// Free-form configuration block (platform config, workspace context, ...).
pub type GenericConfig = std::collections::BTreeMap<String, serde_json::Value>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generic_config_from_yaml() {
        let yaml = r#"
replicas: 2
labels:
  team: infra
"#;
        let config: GenericConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config["replicas"], serde_json::json!(2));
        assert_eq!(config["labels"]["team"], "infra");
    }
}
