//! Environment isolation for spawned processes.

use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};

use tokio::process::Command;

use crate::consts::{ISOLATED_ENV_PREFIXES, ISOLATED_ENV_VARS};

/// A snapshot of an environment with dependency-resolution overrides removed.
///
/// The snapshot is applied to a single [`Command`] and never touches the
/// environment of the current process, so there is nothing to restore once
/// the command finishes, times out or fails to spawn.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IsolatedEnv {
  vars: BTreeMap<OsString, OsString>,
}

impl IsolatedEnv {
  /// Snapshot the current process environment.
  pub fn capture() -> Self {
    Self::from_vars(std::env::vars_os())
  }

  pub fn from_vars<I>(vars: I) -> Self
  where
    I: IntoIterator<Item = (OsString, OsString)>,
  {
    let vars = vars
      .into_iter()
      .filter(|(key, _)| !key.to_str().is_some_and(is_isolated))
      .collect();
    Self { vars }
  }

  pub fn get(&self, key: impl AsRef<OsStr>) -> Option<&OsStr> {
    self.vars.get(key.as_ref()).map(OsString::as_os_str)
  }

  pub fn len(&self) -> usize {
    self.vars.len()
  }

  pub fn is_empty(&self) -> bool {
    self.vars.is_empty()
  }

  /// Replace the command's environment with this snapshot.
  pub fn apply(&self, command: &mut Command) {
    command.env_clear().envs(&self.vars);
  }
}

/// Whether a variable must not leak into spawned processes.
pub fn is_isolated(key: &str) -> bool {
  ISOLATED_ENV_VARS.contains(&key) || ISOLATED_ENV_PREFIXES.iter().any(|prefix| key.starts_with(prefix))
}
