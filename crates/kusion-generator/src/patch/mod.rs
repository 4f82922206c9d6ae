//! Patch engine
//!
//! [`patch_workload`] applies the structural part of a patcher to the
//! workload; [`json_patch`] applies its generic JSON patches to any resource.

mod json;
mod workload;

pub use json::json_patch;
pub use workload::patch_workload;
