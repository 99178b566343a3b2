//! Container and image registries.
//!
//! The flush orchestrator only talks to these traits. [`Docker`] implements
//! both on top of the docker CLI.

pub mod docker;

use std::fmt;
use std::future::Future;

use serde::Serialize;
use thiserror::Error;

use crate::shellout::ShelloutError;

pub use docker::{Docker, DockerOptions};

/// Handle of a container as reported by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ContainerId(pub String);

impl fmt::Display for ContainerId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// Selects the images belonging to a namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageQuery {
  /// Repository the namespace's stage images are tagged into.
  pub repository: String,
}

impl fmt::Display for ImageQuery {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "repository={}", self.repository)
  }
}

#[derive(Debug, Error)]
pub enum RegistryError {
  #[error("{action} failed: {source}")]
  Command {
    action: &'static str,
    #[source]
    source: ShelloutError,
  },
}

pub trait ContainerRegistry: Send + Sync {
  /// Containers derived from the namespace's images.
  fn list_containers(&self, basename: &str) -> impl Future<Output = Result<Vec<ContainerId>, RegistryError>> + Send;

  /// Remove the given containers, forcibly stopping running ones.
  fn remove_containers(&self, ids: &[ContainerId]) -> impl Future<Output = Result<(), RegistryError>> + Send;
}

pub trait ImageRegistry: Send + Sync {
  /// The query selecting the namespace's images.
  fn images_query(&self, basename: &str) -> ImageQuery;

  /// Remove every image matched by `query`, returning their references.
  fn remove_images(&self, query: &ImageQuery) -> impl Future<Output = Result<Vec<String>, RegistryError>> + Send;
}
