//! Built-in generators run before any module plugin

mod namespace;
mod secret;

pub use namespace::NamespaceGenerator;
pub use secret::{SecretGenerator, SecretSpec, SecretType};

use crate::error::Result;
use kusion_core::Spec;

/// A generator contributing resources to the graph.
pub trait SpecGenerator {
    fn generate(&self, spec: &mut Spec) -> Result<()>;
}

/// Run `generators` in order against `spec`.
pub fn call_generators(spec: &mut Spec, generators: &[&dyn SpecGenerator]) -> Result<()> {
    for generator in generators {
        generator.generate(spec)?;
    }
    Ok(())
}
