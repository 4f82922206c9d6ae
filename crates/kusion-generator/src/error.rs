//! Generation error types

use kusion_core::CoreError;
use kusion_module::ModuleError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("config error: {0}")]
    Config(String),

    #[error("can not find module {0} in dependencies")]
    ModuleNotFound(String),

    #[error("plugin invocation failed: {0}")]
    PluginInvocation(#[from] ModuleError),

    #[error("patch error: {0}")]
    Patch(String),

    #[error("unsupported patch type:{0}")]
    UnsupportedPatchType(String),

    #[error("failed to convert workload {id} to unstructured: {message}")]
    UnstructuredConversion { id: String, message: String },

    #[error("invalid workspace: {0}")]
    InvalidWorkspace(String),

    #[error("call modules panic:{0}")]
    Panic(String),

    #[error("call modules unknown panic")]
    UnknownPanic,

    #[error("{}", teardown_message(.primary.as_deref(), .failures))]
    Teardown {
        primary: Option<Box<GenerateError>>,
        failures: Vec<ModuleError>,
    },
}

fn teardown_message(primary: Option<&GenerateError>, failures: &[ModuleError]) -> String {
    let failures = failures
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ");
    match primary {
        Some(primary) => format!("kill modules failed {}. {}", primary, failures),
        None => format!("kill modules failed. {}", failures),
    }
}

impl GenerateError {
    /// Configuration class, including unresolvable modules.
    pub fn is_config(&self) -> bool {
        matches!(self, GenerateError::Config(_) | GenerateError::ModuleNotFound(_))
    }

    /// Patch class, including unsupported patch types.
    pub fn is_patch(&self) -> bool {
        matches!(
            self,
            GenerateError::Patch(_) | GenerateError::UnsupportedPatchType(_)
        )
    }

    /// The error that aborted generation, looking through teardown failures.
    pub fn primary(&self) -> Option<&GenerateError> {
        match self {
            GenerateError::Teardown { primary, .. } => primary.as_deref(),
            other => Some(other),
        }
    }
}

impl From<CoreError> for GenerateError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidWorkspace { .. } => GenerateError::InvalidWorkspace(err.to_string()),
            other => GenerateError::Config(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, GenerateError>;
