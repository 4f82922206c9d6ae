//! Reference module plugin.
//!
//! Turns a `service.*` config into a Deployment and any other config into a
//! ConfigMap holding its scalar fields. Recognised dev config keys:
//! - `image`, `replicas`: Deployment container image and replica count
//! - `patchLabels`: label patcher returned alongside the resource
//! - `patchEnv`: environment patcher returned alongside the resource
//! - `fail`: reply with this error message instead of resources

use anyhow::{Context, bail};
use async_trait::async_trait;
use kusion_core::{EnvVar, Patcher, Resource, TYPE_FIELD};
use kusion_module::{GeneratorRequest, GeneratorResponse, Module, serve};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use tracing::debug;
use tracing_subscriber::EnvFilter;

struct Echo;

#[async_trait]
impl Module for Echo {
    async fn generate(&self, request: GeneratorRequest) -> anyhow::Result<GeneratorResponse> {
        let dev: serde_yaml::Mapping = request
            .dev_config_as()
            .context("decode dev config")?
            .context("dev config is required")?;

        if let Some(message) = dev.get("fail").and_then(|v| v.as_str()) {
            bail!("{}", message);
        }

        let type_tag = dev
            .get(TYPE_FIELD)
            .and_then(|v| v.as_str())
            .context("dev config has no _type")?;
        let module = type_tag.split('.').next().unwrap_or(type_tag);
        let namespace = request.project.as_str();

        let resource = if module == "service" {
            deployment(&request.app, namespace, &dev)
        } else {
            config_map(&request.app, module, namespace, &dev)?
        };
        debug!(id = %resource.id, "Generated resource");

        let patcher = build_patcher(&dev)?;
        Ok(GeneratorResponse::encode(&[resource], patcher.as_ref())?)
    }
}

fn deployment(app: &str, namespace: &str, dev: &serde_yaml::Mapping) -> Resource {
    let image = dev
        .get("image")
        .and_then(|v| v.as_str())
        .unwrap_or("nginx:latest");
    let replicas = dev.get("replicas").and_then(|v| v.as_u64()).unwrap_or(1);

    let attributes = json!({
        "apiVersion": "apps/v1",
        "kind": "Deployment",
        "metadata": {"name": app, "namespace": namespace},
        "spec": {
            "replicas": replicas,
            "selector": {"matchLabels": {"app": app}},
            "template": {
                "metadata": {"labels": {"app": app}},
                "spec": {"containers": [{"name": "main", "image": image}]}
            }
        }
    });

    Resource::kubernetes(
        format!("apps/v1:Deployment:{}:{}", namespace, app),
        into_object(attributes),
    )
}

fn config_map(
    app: &str,
    module: &str,
    namespace: &str,
    dev: &serde_yaml::Mapping,
) -> anyhow::Result<Resource> {
    let name = format!("{}-{}", app, module);
    let mut data = Map::new();
    for (key, value) in dev {
        let Some(key) = key.as_str() else { continue };
        if key == TYPE_FIELD {
            continue;
        }
        let rendered = match value {
            serde_yaml::Value::String(s) => s.clone(),
            serde_yaml::Value::Number(n) => n.to_string(),
            serde_yaml::Value::Bool(b) => b.to_string(),
            _ => continue,
        };
        data.insert(key.to_string(), Value::String(rendered));
    }

    let attributes = json!({
        "apiVersion": "v1",
        "kind": "ConfigMap",
        "metadata": {"name": name, "namespace": namespace},
        "data": data,
    });
    Ok(Resource::kubernetes(
        format!("v1:ConfigMap:{}:{}", namespace, name),
        into_object(attributes),
    ))
}

fn build_patcher(dev: &serde_yaml::Mapping) -> anyhow::Result<Option<Patcher>> {
    let labels: Option<BTreeMap<String, String>> = dev
        .get("patchLabels")
        .map(|v| serde_yaml::from_value(v.clone()))
        .transpose()
        .context("patchLabels must be a string map")?;
    let env: Option<BTreeMap<String, String>> = dev
        .get("patchEnv")
        .map(|v| serde_yaml::from_value(v.clone()))
        .transpose()
        .context("patchEnv must be a string map")?;

    if labels.is_none() && env.is_none() {
        return Ok(None);
    }
    Ok(Some(Patcher {
        labels,
        environments: env.map(|env| env.into_iter().map(|(k, v)| EnvVar::new(k, v)).collect()),
        ..Default::default()
    }))
}

fn into_object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout carries the protocol, logs go to stderr
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env())
        .with_ansi(false)
        .init();

    serve(Echo).await?;
    Ok(())
}
