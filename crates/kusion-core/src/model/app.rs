//! Application configuration

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Field that names the module an accessory (or workload) belongs to.
pub const TYPE_FIELD: &str = "_type";

/// Declarative configuration block handled by one module.
///
/// Backed by an order-preserving YAML mapping: some workload schemas depend
/// on the declared key order surviving serialization to the plugin.
///
/// ```yaml
/// _type: mysql.MySQL
/// type: cloud
/// version: "8.0"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Accessory(pub serde_yaml::Mapping);

impl Accessory {
    pub fn new(mapping: serde_yaml::Mapping) -> Self {
        Self(mapping)
    }

    /// Value stored under `key`, if any.
    pub fn get(&self, key: &str) -> Option<&serde_yaml::Value> {
        self.0.get(key)
    }

    /// Raw `_type` tag, e.g. `"service.Service"`.
    pub fn type_tag(&self) -> Result<&str> {
        match self.0.get(TYPE_FIELD) {
            None => Err(CoreError::MissingTypeField),
            Some(value) => value.as_str().ok_or(CoreError::InvalidTypeField),
        }
    }

    /// Module name: the first dot-separated segment of `_type`.
    pub fn module_name(&self) -> Result<&str> {
        let tag = self.type_tag()?;
        Ok(tag.split('.').next().unwrap_or(tag))
    }

    /// Serialize keeping declaration order.
    pub fn to_yaml_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_yaml::to_string(&self.0)?.into_bytes())
    }
}

impl From<serde_yaml::Mapping> for Accessory {
    fn from(mapping: serde_yaml::Mapping) -> Self {
        Self(mapping)
    }
}

/// A named application: one optional workload plus named accessories.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfiguration {
    /// Application name (stamped by the generator)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    /// Primary runtime unit of the application
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workload: Option<Accessory>,

    /// Accessories, keyed by accessory name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub accessories: BTreeMap<String, Accessory>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accessory(yaml: &str) -> Accessory {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_module_name_first_segment() {
        let acc = accessory("_type: mysql.MySQL\nversion: '8.0'\n");
        assert_eq!(acc.module_name().unwrap(), "mysql");
    }

    #[test]
    fn test_module_name_without_dot() {
        let acc = accessory("_type: network\n");
        assert_eq!(acc.module_name().unwrap(), "network");
    }

    #[test]
    fn test_module_name_missing_type() {
        let acc = accessory("version: '8.0'\n");
        assert!(matches!(acc.module_name(), Err(CoreError::MissingTypeField)));
    }

    #[test]
    fn test_module_name_non_string_type() {
        let acc = accessory("_type: 42\n");
        assert!(matches!(acc.module_name(), Err(CoreError::InvalidTypeField)));
    }

    #[test]
    fn test_yaml_preserves_declaration_order() {
        let acc = accessory("_type: service.Service\nzeta: 1\nalpha: 2\nmid: 3\n");
        let out = String::from_utf8(acc.to_yaml_bytes().unwrap()).unwrap();
        let zeta = out.find("zeta").unwrap();
        let alpha = out.find("alpha").unwrap();
        let mid = out.find("mid").unwrap();
        assert!(zeta < alpha && alpha < mid, "order lost: {}", out);
    }

    #[test]
    fn test_app_configuration_parse() {
        let yaml = r#"
workload:
  _type: service.Service
  containers:
    main:
      image: nginx:1.25
accessories:
  db:
    _type: mysql.MySQL
    version: "8.0"
"#;
        let app: AppConfiguration = serde_yaml::from_str(yaml).unwrap();
        assert!(app.workload.is_some());
        assert_eq!(app.accessories.len(), 1);
        assert_eq!(app.accessories["db"].module_name().unwrap(), "mysql");
    }
}
