//! Outcome and error types for flushing namespaces.

use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::config::ConfigError;
use crate::lock::LockError;
use crate::registry::{ContainerId, ImageQuery, RegistryError};

/// Errors that can occur while flushing.
#[derive(Debug, Error)]
pub enum FlushError {
  /// The basename does not name a single namespace; nothing was locked or removed.
  #[error("refusing to flush {basename:?}: {source}")]
  InvalidBasename {
    basename: String,
    #[source]
    source: ConfigError,
  },

  /// The namespace lock could not be taken; nothing was removed.
  #[error("failed to lock namespace {basename}: {source}")]
  Lock {
    basename: String,
    #[source]
    source: LockError,
  },

  /// Listing or removing the namespace's containers failed; images were left alone.
  #[error("failed to flush containers of {basename}: {source}")]
  Containers {
    basename: String,
    #[source]
    source: RegistryError,
  },

  /// Removing the namespace's images failed after its containers were gone.
  #[error("failed to remove images of {basename} ({query}): {source}")]
  Images {
    basename: String,
    query: ImageQuery,
    #[source]
    source: RegistryError,
  },

  /// One or more namespaces failed; the others were flushed.
  #[error("flush failed for {} namespace(s): {}", .failed.len(), .failed.join(", "))]
  Incomplete { failed: Vec<String> },
}

impl FlushError {
  /// The namespace the error belongs to, if it is about a single one.
  pub fn basename(&self) -> Option<&str> {
    match self {
      FlushError::InvalidBasename { basename, .. }
      | FlushError::Lock { basename, .. }
      | FlushError::Containers { basename, .. }
      | FlushError::Images { basename, .. } => Some(basename),
      FlushError::Incomplete { .. } => None,
    }
  }
}

/// What was removed for one namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Flushed {
  pub containers: Vec<ContainerId>,
  pub images: Vec<String>,
}

/// Result of flushing one namespace.
#[derive(Debug)]
pub struct NamespaceOutcome {
  pub basename: String,
  pub result: Result<Flushed, FlushError>,
}

impl NamespaceOutcome {
  pub fn is_success(&self) -> bool {
    self.result.is_ok()
  }
}

impl Serialize for NamespaceOutcome {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    #[derive(Serialize)]
    struct View<'a> {
      basename: &'a str,
      flushed: bool,
      containers: &'a [ContainerId],
      images: &'a [String],
      #[serde(skip_serializing_if = "Option::is_none")]
      error: Option<String>,
    }

    let view = match &self.result {
      Ok(flushed) => View {
        basename: &self.basename,
        flushed: true,
        containers: &flushed.containers,
        images: &flushed.images,
        error: None,
      },
      Err(err) => View {
        basename: &self.basename,
        flushed: false,
        containers: &[],
        images: &[],
        error: Some(err.to_string()),
      },
    };
    view.serialize(serializer)
  }
}

/// Result of flushing every namespace of a set of build configurations.
///
/// Namespaces appear in the order they were processed.
#[derive(Debug, Default, Serialize)]
pub struct FlushReport {
  pub namespaces: Vec<NamespaceOutcome>,
}

impl FlushReport {
  /// Returns true if every namespace was flushed.
  pub fn is_success(&self) -> bool {
    self.namespaces.iter().all(NamespaceOutcome::is_success)
  }

  pub fn succeeded(&self) -> impl Iterator<Item = (&str, &Flushed)> {
    self
      .namespaces
      .iter()
      .filter_map(|outcome| outcome.result.as_ref().ok().map(|flushed| (outcome.basename.as_str(), flushed)))
  }

  pub fn failed(&self) -> impl Iterator<Item = (&str, &FlushError)> {
    self
      .namespaces
      .iter()
      .filter_map(|outcome| outcome.result.as_ref().err().map(|err| (outcome.basename.as_str(), err)))
  }

  pub fn containers_removed(&self) -> usize {
    self.succeeded().map(|(_, flushed)| flushed.containers.len()).sum()
  }

  pub fn images_removed(&self) -> usize {
    self.succeeded().map(|(_, flushed)| flushed.images.len()).sum()
  }

  /// The combined failure naming every failed namespace, if any failed.
  pub fn error(&self) -> Option<FlushError> {
    let failed: Vec<String> = self.failed().map(|(basename, _)| basename.to_string()).collect();
    if failed.is_empty() {
      None
    } else {
      Some(FlushError::Incomplete { failed })
    }
  }
}
