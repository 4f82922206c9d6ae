//! Kusion module plugins
//!
//! Host side: [`PluginPool`] starts module plugins through a
//! [`PluginLauncher`] and performs one RPC round trip per invocation.
//! [`ProcessLauncher`] runs each plugin as a child process speaking
//! newline-delimited JSON (see [`protocol`]).
//!
//! Plugin side: implement [`Module`] and call [`serve`].

pub mod error;
pub mod plugin;
pub mod pool;
pub mod process;
pub mod protocol;
pub mod server;

pub use error::{ModuleError, Result};
pub use plugin::{ModulePlugin, PluginLauncher};
pub use pool::PluginPool;
pub use process::{ProcessLauncher, ProcessPlugin};
pub use protocol::{CallMetadata, GeneratorRequest, GeneratorResponse, ReplyFrame, RequestFrame};
pub use server::{Module, serve, serve_io};
