use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("IO error: {path}\nreason: {message}")]
    IoError { path: PathBuf, message: String },

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("can not find '_type' in module config")]
    MissingTypeField,

    #[error("'_type' in module config must be a string")]
    InvalidTypeField,

    #[error("invalid config of workspace: {workspace}, {message}")]
    InvalidWorkspace { workspace: String, message: String },

    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

impl CoreError {
    pub(crate) fn invalid_workspace(workspace: &str, message: impl Into<String>) -> Self {
        CoreError::InvalidWorkspace {
            workspace: workspace.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
