//! In-process named locks.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use tokio::sync::OwnedMutexGuard;
use tracing::debug;

use crate::lock::{LockError, NamedLock};

type LockTable = Arc<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>>;

/// Named locks shared by every caller holding the same `InProcessLocks`.
///
/// Only excludes callers within this process; use [`super::FileLocks`] when
/// other processes may flush the same namespaces. A name's entry is dropped
/// once nobody holds or waits for it.
#[derive(Debug, Default)]
pub struct InProcessLocks {
  locks: LockTable,
  acquire_timeout: Option<Duration>,
}

#[derive(Debug)]
pub struct InProcessGuard {
  name: String,
  guard: Option<OwnedMutexGuard<()>>,
  table: LockTable,
}

impl InProcessGuard {
  pub fn name(&self) -> &str {
    &self.name
  }
}

impl Drop for InProcessGuard {
  fn drop(&mut self) {
    drop(self.guard.take());
    prune(&self.table, &self.name);
    debug!(lock = %self.name, "lock released");
  }
}

impl InProcessLocks {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_acquire_timeout(mut self, timeout: Option<Duration>) -> Self {
    self.acquire_timeout = timeout;
    self
  }

  /// Whether some guard for `name` is currently alive.
  pub fn is_locked(&self, name: &str) -> bool {
    let locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
    locks.get(name).is_some_and(|mutex| mutex.try_lock().is_err())
  }

  /// Number of names currently held or waited for.
  pub fn tracked(&self) -> usize {
    self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
  }

  fn mutex(&self, name: &str) -> Arc<tokio::sync::Mutex<()>> {
    let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
    locks.entry(name.to_string()).or_default().clone()
  }
}

/// Drop `name`'s entry if the table holds the only reference to it.
///
/// Holders and waiters each own a clone, and new clones are only handed out
/// under the table lock, so a count of one means the name is idle.
fn prune(table: &LockTable, name: &str) {
  let mut locks = table.lock().unwrap_or_else(PoisonError::into_inner);
  if locks.get(name).is_some_and(|mutex| Arc::strong_count(mutex) == 1) {
    locks.remove(name);
  }
}

impl NamedLock for InProcessLocks {
  type Guard = InProcessGuard;

  async fn acquire(&self, name: &str) -> Result<InProcessGuard, LockError> {
    let mutex = self.mutex(name);
    let start = Instant::now();

    let guard = match self.acquire_timeout {
      Some(timeout) => match tokio::time::timeout(timeout, mutex.lock_owned()).await {
        Ok(guard) => guard,
        Err(_) => {
          prune(&self.locks, name);
          return Err(LockError::Timeout {
            name: name.to_string(),
            waited: start.elapsed(),
            holder: None,
          });
        }
      },
      None => mutex.lock_owned().await,
    };

    debug!(lock = %name, waited = ?start.elapsed(), "lock acquired");

    Ok(InProcessGuard {
      name: name.to_string(),
      guard: Some(guard),
      table: self.locks.clone(),
    })
  }
}
