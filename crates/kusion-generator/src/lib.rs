//! Kusion application configuration generator
//!
//! [`AppConfigurationGenerator`] turns one application configuration into a
//! resource graph ([`kusion_core::Spec`]) by invoking module plugins through
//! a per-call [`kusion_module::PluginPool`], assembling their resources and
//! applying their patchers. [`AppsConfigBuilder`] does the same for every app
//! of a stack.

pub mod assembler;
pub mod builder;
pub mod builtin;
pub mod error;
pub mod generator;
pub mod index;
pub mod order;
pub mod patch;
pub mod postprocess;
pub mod request;
pub mod resolver;

pub use assembler::Assembly;
pub use builder::AppsConfigBuilder;
pub use error::{GenerateError, Result};
pub use generator::{AppConfigurationGenerator, GeneratorOptions};
pub use index::{HealthPolicy, ModuleConfig, ModuleConfigIndex, PlatformConfig, build_module_config_index};
pub use order::{DEFAULT_KIND_ORDER, KindOrderer, ResourceOrderer};
pub use patch::{json_patch, patch_workload};
pub use postprocess::{patch_health_policy, patch_imported_resources};
pub use request::RequestBuilder;
pub use resolver::resolve_module_key;
