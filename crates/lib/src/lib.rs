//! stageflush-lib: reclaiming local stage containers and images.
//!
//! - `shellout`: running external commands isolated, bounded and optionally live
//! - `lock`: named exclusive locks, cross-process (files) or in-process
//! - `registry`: container and image registries, backed by the docker CLI
//! - `flush`: locked, per-namespace flushing of containers then images
//! - `config`: build configurations and ambient settings

pub mod config;
pub mod consts;
pub mod flush;
pub mod lock;
pub mod platform;
pub mod registry;
pub mod shellout;
pub mod step;
#[cfg(test)]
mod util;
