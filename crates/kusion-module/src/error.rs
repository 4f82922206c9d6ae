//! Module plugin error types

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModuleError {
    #[error("module plugin for {key} not found at {}", path.display())]
    PluginNotFound { key: String, path: PathBuf },

    #[error("failed to start module plugin {key}: {source}")]
    SpawnFailed {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invoke kusion module: {key} failed. {message}")]
    Rpc { key: String, message: String },

    #[error("empty response from module {0}")]
    EmptyResponse(String),

    #[error("module {key} returned an error: {message}")]
    Remote { key: String, message: String },

    #[error("invoke kusion module: {key} timed out after {elapsed:?}")]
    Timeout { key: String, elapsed: Duration },

    #[error("module plugin {0} exited unexpectedly")]
    PluginExited(String),

    #[error("module protocol error: {0}")]
    Protocol(String),

    #[error("kill module plugin {key} failed: {message}")]
    KillFailed { key: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] kusion_config::ConfigError),
}

pub type Result<T> = std::result::Result<T, ModuleError>;
