//! Kusion core data model
//!
//! Types shared by the generation engine and module plugins: application
//! configurations, projects and stacks, workspaces, module dependencies,
//! generated resources and patchers.

pub mod error;
pub mod loader;
pub mod model;
pub mod workspace;

pub use error::{CoreError, Result};
pub use model::*;
