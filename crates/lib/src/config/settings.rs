use std::path::PathBuf;
use std::time::Duration;

use crate::config::ConfigError;
use crate::platform::paths::{default_lock_dir, lock_dir_override};

/// Ambient settings resolved from the environment.
///
/// Command-line flags take precedence; the CLI overwrites fields after
/// calling [`Settings::from_env`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
  /// Where namespace lock files live (`STAGEFLUSH_LOCK_DIR`). `None` falls
  /// back to the cache directory, see [`Settings::resolve_lock_dir`].
  pub lock_dir: Option<PathBuf>,

  /// The docker executable (`STAGEFLUSH_DOCKER`).
  pub docker_binary: String,

  /// Log every docker command line (`STAGEFLUSH_DEBUG_DOCKER=1`).
  pub debug_docker: bool,

  /// Give up waiting for a namespace lock after this long
  /// (`STAGEFLUSH_LOCK_TIMEOUT`, in seconds). Unset waits forever.
  pub lock_timeout: Option<Duration>,
}

impl Settings {
  pub fn from_env() -> Result<Self, ConfigError> {
    let docker_binary = std::env::var("STAGEFLUSH_DOCKER")
      .ok()
      .filter(|value| !value.is_empty())
      .unwrap_or_else(|| "docker".to_string());

    let debug_docker = std::env::var("STAGEFLUSH_DEBUG_DOCKER").is_ok_and(|value| value == "1");

    let lock_timeout = match std::env::var("STAGEFLUSH_LOCK_TIMEOUT") {
      Ok(value) if !value.is_empty() => {
        let secs = value.parse::<u64>().map_err(|e| ConfigError::InvalidSetting {
          var: "STAGEFLUSH_LOCK_TIMEOUT",
          value: value.clone(),
          reason: e.to_string(),
        })?;
        Some(Duration::from_secs(secs))
      }
      _ => None,
    };

    Ok(Self {
      lock_dir: lock_dir_override(),
      docker_binary,
      debug_docker,
      lock_timeout,
    })
  }

  /// The lock directory to use, computing the default only when no
  /// directory was given.
  pub fn resolve_lock_dir(&self) -> Result<PathBuf, ConfigError> {
    match &self.lock_dir {
      Some(dir) => Ok(dir.clone()),
      None => default_lock_dir().ok_or(ConfigError::NoLockDir),
    }
  }
}
