//! Locked flushing of local stage containers and images.
//!
//! For every distinct basename among a set of build configurations, the
//! [`Flusher`] takes the namespace lock `<basename>.images`, removes the
//! namespace's containers, then removes its images, and releases the lock.
//! Namespaces are processed one after another in first-seen order. A failing
//! namespace is recorded in the [`FlushReport`] and does not stop the others.

pub mod types;

use std::collections::HashSet;

use tracing::{error, info};

use crate::config::{BuildConfig, validate_basename};
use crate::consts::IMAGES_LOCK_SUFFIX;
use crate::lock::NamedLock;
use crate::registry::{ContainerRegistry, ImageRegistry};
use crate::step::run_step;

pub use types::{FlushError, FlushReport, Flushed, NamespaceOutcome};

/// Name of the lock guarding a namespace's images.
pub fn lock_name(basename: &str) -> String {
  format!("{}.{}", basename, IMAGES_LOCK_SUFFIX)
}

/// Distinct basenames of `configs`, in the order they first appear.
pub fn unique_basenames<B: BuildConfig>(configs: &[B]) -> Vec<String> {
  let mut seen = HashSet::new();
  configs
    .iter()
    .map(BuildConfig::basename)
    .filter(|basename| seen.insert(*basename))
    .map(str::to_string)
    .collect()
}

/// Flushes namespaces under exclusive locks.
#[derive(Debug)]
pub struct Flusher<L, C, I> {
  locks: L,
  containers: C,
  images: I,
}

impl<L, C, I> Flusher<L, C, I>
where
  L: NamedLock,
  C: ContainerRegistry,
  I: ImageRegistry,
{
  pub fn new(locks: L, containers: C, images: I) -> Self {
    Self {
      locks,
      containers,
      images,
    }
  }

  pub fn locks(&self) -> &L {
    &self.locks
  }

  pub fn containers(&self) -> &C {
    &self.containers
  }

  pub fn images(&self) -> &I {
    &self.images
  }

  /// Flush every namespace named by `configs`.
  ///
  /// Never fails as a whole; check [`FlushReport::error`] for namespaces that
  /// could not be flushed.
  pub async fn flush_local<B: BuildConfig>(&self, configs: &[B]) -> FlushReport {
    let basenames = unique_basenames(configs);
    info!(namespaces = basenames.len(), "flushing local stages");

    let mut report = FlushReport::default();
    for basename in basenames {
      let result = self.flush_namespace(&basename).await;
      if let Err(err) = &result {
        error!(basename = %basename, error = %err, "namespace flush failed");
      }
      report.namespaces.push(NamespaceOutcome { basename, result });
    }

    report
  }

  /// Flush one namespace: containers first, then images, all under its lock.
  ///
  /// The lock is released when this returns, whether it succeeded or not.
  /// A basename that could match other namespaces is rejected before the
  /// lock is taken.
  pub async fn flush_namespace(&self, basename: &str) -> Result<Flushed, FlushError> {
    validate_basename(basename).map_err(|source| FlushError::InvalidBasename {
      basename: basename.to_string(),
      source,
    })?;

    let _guard = self
      .locks
      .acquire(&lock_name(basename))
      .await
      .map_err(|source| FlushError::Lock {
        basename: basename.to_string(),
        source,
      })?;

    run_step(basename, async {
      let containers = self
        .containers
        .list_containers(basename)
        .await
        .map_err(|source| FlushError::Containers {
          basename: basename.to_string(),
          source,
        })?;
      self
        .containers
        .remove_containers(&containers)
        .await
        .map_err(|source| FlushError::Containers {
          basename: basename.to_string(),
          source,
        })?;

      let query = self.images.images_query(basename);
      let images = self
        .images
        .remove_images(&query)
        .await
        .map_err(|source| FlushError::Images {
          basename: basename.to_string(),
          query: query.clone(),
          source,
        })?;

      Ok(Flushed { containers, images })
    })
    .await
  }
}
