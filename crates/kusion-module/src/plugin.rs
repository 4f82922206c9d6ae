//! Module plugin traits

use crate::error::Result;
use crate::protocol::{CallMetadata, GeneratorRequest, GeneratorResponse};
use async_trait::async_trait;
use kusion_core::ModuleKey;
use std::path::Path;

/// One running module plugin, bound to a single module key.
///
/// A handle serves any number of `generate` calls and is torn down once
/// with `kill`.
#[async_trait]
pub trait ModulePlugin: Send {
    /// Module key this plugin serves
    fn key(&self) -> &ModuleKey;

    /// Perform one generation round trip
    async fn generate(
        &mut self,
        metadata: CallMetadata,
        request: GeneratorRequest,
    ) -> Result<GeneratorResponse>;

    /// Tear the plugin down
    async fn kill(&mut self) -> Result<()>;
}

/// Starts module plugins.
#[async_trait]
pub trait PluginLauncher: Send + Sync {
    /// Start the plugin for `key` with `work_dir` as its working directory
    async fn launch(&self, key: &ModuleKey, work_dir: &Path) -> Result<Box<dyn ModulePlugin>>;
}
