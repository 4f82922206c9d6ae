//! Child-process plugin transport
//!
//! Launches a module binary with piped stdin/stdout and exchanges one JSON
//! line per call. The child's stderr is inherited so plugin logs reach the
//! host's terminal.

use crate::error::{ModuleError, Result};
use crate::plugin::{ModulePlugin, PluginLauncher};
use crate::protocol::{CallMetadata, GeneratorRequest, GeneratorResponse, ReplyFrame, RequestFrame};
use async_trait::async_trait;
use kusion_config::ModuleSettings;
use kusion_core::ModuleKey;
use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{debug, info};

/// Launches plugins found through [`ModuleSettings`].
#[derive(Debug, Clone, Default)]
pub struct ProcessLauncher {
    settings: ModuleSettings,
}

impl ProcessLauncher {
    pub fn new(settings: ModuleSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ModuleSettings {
        &self.settings
    }
}

#[async_trait]
impl PluginLauncher for ProcessLauncher {
    async fn launch(&self, key: &ModuleKey, work_dir: &Path) -> Result<Box<dyn ModulePlugin>> {
        let path = self.settings.plugin_path(key)?;
        if !path.is_file() {
            return Err(ModuleError::PluginNotFound {
                key: key.to_string(),
                path,
            });
        }
        let plugin = ProcessPlugin::spawn(key.clone(), &path, work_dir)?;
        Ok(Box::new(plugin))
    }
}

/// A module plugin running as a child process.
pub struct ProcessPlugin {
    key: ModuleKey,
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    killed: bool,
}

impl ProcessPlugin {
    pub fn spawn(key: ModuleKey, program: &Path, work_dir: &Path) -> Result<Self> {
        let mut cmd = Command::new(program);
        cmd.current_dir(work_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        debug!(module = %key, program = %program.display(), "Spawning module plugin");

        let mut child = cmd.spawn().map_err(|source| ModuleError::SpawnFailed {
            key: key.to_string(),
            source,
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ModuleError::Protocol(format!("no stdin for module plugin {}", key)))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ModuleError::Protocol(format!("no stdout for module plugin {}", key)))?;

        info!(module = %key, pid = ?child.id(), "Module plugin started");

        Ok(Self {
            key,
            child,
            stdin,
            stdout: BufReader::new(stdout),
            killed: false,
        })
    }

    fn rpc_error(&self, err: impl std::fmt::Display) -> ModuleError {
        ModuleError::Rpc {
            key: self.key.to_string(),
            message: err.to_string(),
        }
    }
}

#[async_trait]
impl ModulePlugin for ProcessPlugin {
    fn key(&self) -> &ModuleKey {
        &self.key
    }

    async fn generate(
        &mut self,
        metadata: CallMetadata,
        request: GeneratorRequest,
    ) -> Result<GeneratorResponse> {
        let trace_id = metadata.trace_id.clone();
        let frame = RequestFrame { metadata, request };
        let mut line = serde_json::to_string(&frame)?;
        line.push('\n');

        if let Err(e) = self.stdin.write_all(line.as_bytes()).await {
            return Err(self.rpc_error(e));
        }
        if let Err(e) = self.stdin.flush().await {
            return Err(self.rpc_error(e));
        }

        let mut reply = String::new();
        let read = match self.stdout.read_line(&mut reply).await {
            Ok(read) => read,
            Err(e) => return Err(self.rpc_error(e)),
        };
        if read == 0 {
            return Err(ModuleError::PluginExited(self.key.to_string()));
        }

        let reply: ReplyFrame = serde_json::from_str(reply.trim())
            .map_err(|e| ModuleError::Protocol(format!("malformed reply from {}: {}", self.key, e)))?;

        if reply.kusion_trace_id != trace_id {
            return Err(ModuleError::Protocol(format!(
                "trace id mismatch from {}: sent {}, got {}",
                self.key, trace_id, reply.kusion_trace_id
            )));
        }

        match (reply.response, reply.error) {
            (_, Some(message)) => Err(ModuleError::Remote {
                key: self.key.to_string(),
                message,
            }),
            (Some(response), None) => Ok(response),
            (None, None) => Err(ModuleError::EmptyResponse(self.key.to_string())),
        }
    }

    async fn kill(&mut self) -> Result<()> {
        if self.killed {
            return Ok(());
        }
        self.killed = true;

        if let Ok(Some(status)) = self.child.try_wait() {
            debug!(module = %self.key, %status, "Module plugin already exited");
            return Ok(());
        }

        self.child.kill().await.map_err(|e| ModuleError::KillFailed {
            key: self.key.to_string(),
            message: e.to_string(),
        })?;
        debug!(module = %self.key, "Module plugin killed");
        Ok(())
    }
}
