//! Module config index
//!
//! Maps each module key to the configuration its plugin receives. Platform
//! configs are decoded once here so later stages work on typed values.

use crate::error::Result;
use crate::resolver::resolve_module_key;
use kusion_core::workspace::FIELD_HEALTH_POLICY;
use kusion_core::{Accessory, AppConfiguration, Dependencies, GenericConfig, ModuleKey};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Pseudo accessory name under which the workload is indexed.
pub const WORKLOAD_ACCESSORY: &str = "workload";

/// Health policy declared by a platform config.
#[derive(Debug, Clone, PartialEq)]
pub struct HealthPolicy(GenericConfig);

impl HealthPolicy {
    /// Recognise a health policy value; only maps qualify.
    pub fn from_value(value: &Value) -> Option<Self> {
        value
            .as_object()
            .map(|map| Self(map.iter().map(|(k, v)| (k.clone(), v.clone())).collect()))
    }

    pub fn api_version(&self) -> &str {
        self.0.get("apiVersion").and_then(Value::as_str).unwrap_or("")
    }

    pub fn kind(&self) -> &str {
        self.0.get("kind").and_then(Value::as_str).unwrap_or("")
    }

    pub fn fields(&self) -> &GenericConfig {
        &self.0
    }
}

/// Platform-side module configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlatformConfig {
    /// Raw config, sent to the plugin as-is
    pub config: GenericConfig,
    pub health_policy: Option<HealthPolicy>,
}

impl PlatformConfig {
    pub fn decode(config: GenericConfig) -> Self {
        let health_policy = config.get(FIELD_HEALTH_POLICY).and_then(HealthPolicy::from_value);
        Self {
            config,
            health_policy,
        }
    }
}

/// Everything one module invocation needs besides the shared inputs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModuleConfig {
    pub dev_config: Option<Accessory>,
    pub platform_config: Option<PlatformConfig>,
    pub context: Option<GenericConfig>,
}

pub type ModuleConfigIndex = BTreeMap<ModuleKey, ModuleConfig>;

/// Index the workload and every accessory by module key.
///
/// Accessories are visited in name order, the workload under
/// [`WORKLOAD_ACCESSORY`] (replacing an accessory of that name). When two
/// entries resolve to the same key, the later visit wins.
pub fn build_module_config_index(
    app: &AppConfiguration,
    context: Option<&GenericConfig>,
    platform_configs: &BTreeMap<String, GenericConfig>,
    deps: &Dependencies,
) -> Result<ModuleConfigIndex> {
    let mut visits: BTreeMap<&str, &Accessory> = app
        .accessories
        .iter()
        .map(|(name, accessory)| (name.as_str(), accessory))
        .collect();
    if let Some(workload) = &app.workload {
        visits.insert(WORKLOAD_ACCESSORY, workload);
    }

    let mut index = ModuleConfigIndex::new();
    for (name, accessory) in visits {
        let Some(key) = resolve_module_key(Some(accessory), deps)? else {
            continue;
        };
        let module_name = accessory.module_name()?;
        debug!(accessory = name, module = %key, "Indexed module config");

        let config = ModuleConfig {
            dev_config: Some(accessory.clone()),
            platform_config: platform_configs.get(module_name).cloned().map(PlatformConfig::decode),
            context: context.cloned(),
        };
        if index.insert(key.clone(), config).is_some() {
            warn!(accessory = name, module = %key, "Module key indexed twice, keeping the later config");
        }
    }

    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kusion_core::Dependency;
    use serde_json::json;

    fn app(yaml: &str) -> AppConfiguration {
        serde_yaml::from_str(yaml).unwrap()
    }

    fn deps() -> Dependencies {
        let mut deps = Dependencies::new();
        deps.insert("service", Dependency::oci("kusionstack/service", "0.1.0"));
        deps.insert("mysql", Dependency::oci("kusionstack/mysql", "0.2.0"));
        deps
    }

    #[test]
    fn test_index_workload_and_accessories() {
        let app = app(
            r#"
workload:
  _type: service.Service
accessories:
  db:
    _type: mysql.MySQL
"#,
        );
        let mut platform = BTreeMap::new();
        platform.insert(
            "mysql".to_string(),
            GenericConfig::from([
                ("size".to_string(), json!(10)),
                ("healthPolicy".to_string(), json!({"apiVersion": "v1", "kind": "Service"})),
            ]),
        );
        let ctx = GenericConfig::from([("region".to_string(), json!("us-east-1"))]);

        let index = build_module_config_index(&app, Some(&ctx), &platform, &deps()).unwrap();
        let keys: Vec<_> = index.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["kusionstack/mysql@0.2.0", "kusionstack/service@0.1.0"]);

        let mysql = &index[&ModuleKey::parse("kusionstack/mysql@0.2.0")];
        let platform = mysql.platform_config.as_ref().unwrap();
        assert_eq!(platform.config["size"], 10);
        assert_eq!(platform.health_policy.as_ref().unwrap().kind(), "Service");
        assert_eq!(mysql.context.as_ref().unwrap()["region"], "us-east-1");

        let service = &index[&ModuleKey::parse("kusionstack/service@0.1.0")];
        assert!(service.platform_config.is_none());
    }

    #[test]
    fn test_colliding_keys_last_write_wins() {
        // "db" and "replica" both resolve to the mysql key; "replica" is visited last
        let app = app(
            r#"
accessories:
  replica:
    _type: mysql.MySQL
    role: replica
  db:
    _type: mysql.MySQL
    role: primary
"#,
        );
        let index = build_module_config_index(&app, None, &BTreeMap::new(), &deps()).unwrap();
        assert_eq!(index.len(), 1);
        let dev = index.values().next().unwrap().dev_config.as_ref().unwrap();
        assert_eq!(dev.get("role").and_then(|v| v.as_str()), Some("replica"));
    }

    #[test]
    fn test_workload_replaces_accessory_named_workload() {
        let app = app(
            r#"
workload:
  _type: service.Service
  image: web
accessories:
  workload:
    _type: mysql.MySQL
"#,
        );
        let index = build_module_config_index(&app, None, &BTreeMap::new(), &deps()).unwrap();
        assert_eq!(index.len(), 1);
        assert!(index.contains_key(&ModuleKey::parse("kusionstack/service@0.1.0")));
    }

    #[test]
    fn test_health_policy_must_be_map() {
        let platform = PlatformConfig::decode(GenericConfig::from([(
            "healthPolicy".to_string(),
            json!("kcl: check"),
        )]));
        assert!(platform.health_policy.is_none());
    }
}
