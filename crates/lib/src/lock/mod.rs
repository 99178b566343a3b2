//! Named exclusive locks.
//!
//! A [`NamedLock`] hands out a guard for a name; the lock is released when the
//! guard drops, whichever way the protected block exits. [`FileLocks`] works
//! across processes, [`InProcessLocks`] only within one.

pub mod file;
pub mod memory;

use std::fmt;
use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use file::{FileLockGuard, FileLocks};
pub use memory::{InProcessGuard, InProcessLocks};

/// A backend handing out exclusive locks keyed by name.
pub trait NamedLock: Send + Sync {
  /// Held while the lock is owned; dropping it releases the lock.
  type Guard: Send;

  /// Wait until `name` is free and take it.
  fn acquire(&self, name: &str) -> impl Future<Output = Result<Self::Guard, LockError>> + Send;
}

/// Information a holder records about itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockMetadata {
  pub version: u32,
  pub name: String,
  pub pid: u32,
  pub started_at_unix: u64,
}

impl fmt::Display for LockMetadata {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "PID {}, started at Unix timestamp {}", self.pid, self.started_at_unix)
  }
}

#[derive(Debug, Error)]
pub enum LockError {
  #[error("failed to create lock directory {}: {source}", .path.display())]
  CreateDir {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to open lock file {}: {source}", .path.display())]
  OpenFile {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to acquire lock {name}: {source}")]
  LockFailed {
    name: String,
    #[source]
    source: io::Error,
  },

  #[error("failed to write lock metadata for {name}: {source}")]
  WriteMetadata {
    name: String,
    #[source]
    source: io::Error,
  },

  #[error("timed out after {}s waiting for lock {name}{}", .waited.as_secs(), holder_suffix(.holder))]
  Timeout {
    name: String,
    waited: Duration,
    holder: Option<LockMetadata>,
  },
}

fn holder_suffix(holder: &Option<LockMetadata>) -> String {
  match holder {
    Some(holder) => format!(" (held by {})", holder),
    None => String::new(),
  }
}
