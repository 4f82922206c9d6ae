use async_trait::async_trait;
use kusion_core::{
    AppConfiguration, Dependencies, Dependency, EnvVar, Patcher, Project, Resource, Stack,
    Workspace,
};
use kusion_generator::AppConfigurationGenerator;
use kusion_module::{
    CallMetadata, GeneratorRequest, GeneratorResponse, ModuleError, ModulePlugin, PluginLauncher,
};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const SERVICE_KEY: &str = "kusionstack/service@0.1.0";
pub const MYSQL_KEY: &str = "kusionstack/mysql@0.2.0";
pub const NETWORK_KEY: &str = "kusionstack/network@0.3.0";

/// What a fake plugin does when asked to generate.
#[derive(Clone)]
#[allow(dead_code)]
pub enum Behaviour {
    Respond(GeneratorResponse),
    Fail(String),
    Panic(String),
    Sleep(Duration),
}

#[derive(Default)]
pub struct Journal {
    pub launched: Vec<String>,
    pub killed: Vec<String>,
    pub requests: Vec<(String, GeneratorRequest)>,
}

/// Launcher serving canned behaviours per module key.
pub struct FakeLauncher {
    pub journal: Arc<Mutex<Journal>>,
    behaviours: BTreeMap<String, Behaviour>,
    fail_kill: bool,
}

impl FakeLauncher {
    pub fn new() -> Self {
        Self {
            journal: Arc::new(Mutex::new(Journal::default())),
            behaviours: BTreeMap::new(),
            fail_kill: false,
        }
    }

    pub fn on(mut self, key: &str, behaviour: Behaviour) -> Self {
        self.behaviours.insert(key.to_string(), behaviour);
        self
    }

    #[allow(dead_code)]
    pub fn failing_kill(mut self) -> Self {
        self.fail_kill = true;
        self
    }

    pub fn launched(&self) -> Vec<String> {
        self.journal.lock().unwrap().launched.clone()
    }

    pub fn killed(&self) -> Vec<String> {
        self.journal.lock().unwrap().killed.clone()
    }

    #[allow(dead_code)]
    pub fn requests(&self) -> Vec<(String, GeneratorRequest)> {
        self.journal.lock().unwrap().requests.clone()
    }
}

#[async_trait]
impl PluginLauncher for FakeLauncher {
    async fn launch(
        &self,
        key: &kusion_core::ModuleKey,
        _work_dir: &Path,
    ) -> kusion_module::Result<Box<dyn ModulePlugin>> {
        self.journal.lock().unwrap().launched.push(key.to_string());
        Ok(Box::new(FakePlugin {
            key: key.clone(),
            journal: self.journal.clone(),
            behaviour: self
                .behaviours
                .get(key.as_str())
                .cloned()
                .unwrap_or(Behaviour::Respond(GeneratorResponse::default())),
            fail_kill: self.fail_kill,
        }))
    }
}

struct FakePlugin {
    key: kusion_core::ModuleKey,
    journal: Arc<Mutex<Journal>>,
    behaviour: Behaviour,
    fail_kill: bool,
}

#[async_trait]
impl ModulePlugin for FakePlugin {
    fn key(&self) -> &kusion_core::ModuleKey {
        &self.key
    }

    async fn generate(
        &mut self,
        _metadata: CallMetadata,
        request: GeneratorRequest,
    ) -> kusion_module::Result<GeneratorResponse> {
        self.journal
            .lock()
            .unwrap()
            .requests
            .push((self.key.to_string(), request));

        match &self.behaviour {
            Behaviour::Respond(response) => Ok(response.clone()),
            Behaviour::Fail(message) => Err(ModuleError::Remote {
                key: self.key.to_string(),
                message: message.clone(),
            }),
            Behaviour::Panic(message) => panic!("{}", message),
            Behaviour::Sleep(delay) => {
                tokio::time::sleep(*delay).await;
                Ok(GeneratorResponse::default())
            }
        }
    }

    async fn kill(&mut self) -> kusion_module::Result<()> {
        self.journal.lock().unwrap().killed.push(self.key.to_string());
        if self.fail_kill {
            return Err(ModuleError::KillFailed {
                key: self.key.to_string(),
                message: "process still running".into(),
            });
        }
        Ok(())
    }
}

pub fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => panic!("expected a JSON object"),
    }
}

pub fn deployment(name: &str, env: Value) -> Resource {
    Resource::kubernetes(
        format!("apps/v1:Deployment:demo:{}", name),
        object(json!({
            "apiVersion": "apps/v1",
            "kind": "Deployment",
            "metadata": {"name": name, "namespace": "demo"},
            "spec": {
                "replicas": 1,
                "template": {
                    "metadata": {"labels": {"app": name}},
                    "spec": {"containers": [{"name": "main", "image": "nginx", "env": env}]}
                }
            }
        })),
    )
}

pub fn config_map(name: &str) -> Resource {
    Resource::kubernetes(
        format!("v1:ConfigMap:demo:{}", name),
        object(json!({
            "apiVersion": "v1",
            "kind": "ConfigMap",
            "metadata": {"name": name, "namespace": "demo"},
            "data": {"owner": name}
        })),
    )
}

pub fn respond(resources: &[Resource], patcher: Option<&Patcher>) -> Behaviour {
    Behaviour::Respond(GeneratorResponse::encode(resources, patcher).unwrap())
}

pub fn label_patcher(key: &str, value: &str) -> Patcher {
    Patcher {
        labels: Some(BTreeMap::from([(key.to_string(), value.to_string())])),
        ..Default::default()
    }
}

#[allow(dead_code)]
pub fn env_patcher(vars: &[(&str, &str)]) -> Patcher {
    Patcher {
        environments: Some(vars.iter().map(|(n, v)| EnvVar::new(*n, *v)).collect()),
        ..Default::default()
    }
}

pub fn dependencies() -> Dependencies {
    let mut deps = Dependencies::new();
    deps.insert("service", Dependency::oci("kusionstack/service", "0.1.0"));
    deps.insert("mysql", Dependency::oci("kusionstack/mysql", "0.2.0"));
    deps.insert(
        "network",
        Dependency::git("https://github.com/kusionstack/network.git", "0.3.0"),
    );
    deps
}

pub fn app(yaml: &str) -> AppConfiguration {
    serde_yaml::from_str(yaml).unwrap()
}

pub fn workspace(yaml: &str) -> Workspace {
    serde_yaml::from_str(yaml).unwrap()
}

pub fn generator(
    app: AppConfiguration,
    workspace: Workspace,
    launcher: Arc<FakeLauncher>,
) -> AppConfigurationGenerator {
    AppConfigurationGenerator::new(
        Project::new("demo"),
        Stack::new("dev", std::env::temp_dir()),
        "web",
        app,
        workspace,
        dependencies(),
    )
    .unwrap()
    .with_launcher(launcher)
}
