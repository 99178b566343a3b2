use std::path::PathBuf;

use crate::consts::APP_NAME;

/// Returns the user's home directory, if the environment names one
#[cfg(windows)]
pub fn home_dir() -> Option<PathBuf> {
  std::env::var_os("USERPROFILE")
    .filter(|value| !value.is_empty())
    .map(PathBuf::from)
}

/// Returns the user's home directory, if the environment names one
#[cfg(not(windows))]
pub fn home_dir() -> Option<PathBuf> {
  std::env::var_os("HOME").filter(|value| !value.is_empty()).map(PathBuf::from)
}

/// Returns the directory for cache files for the application
#[cfg(windows)]
pub fn cache_dir() -> Option<PathBuf> {
  let local_appdata = std::env::var_os("LOCALAPPDATA")
    .filter(|value| !value.is_empty())
    .map(PathBuf::from)
    .or_else(|| home_dir().map(|home| home.join("AppData").join("Local")))?;
  Some(local_appdata.join(APP_NAME).join("Cache"))
}

/// Returns the directory for cache files for the application
#[cfg(not(windows))]
pub fn cache_dir() -> Option<PathBuf> {
  let cache_home = std::env::var_os("XDG_CACHE_HOME")
    .filter(|value| !value.is_empty())
    .map(PathBuf::from)
    .or_else(|| home_dir().map(|home| home.join(".cache")))?;
  Some(cache_home.join(APP_NAME))
}

/// Lock directory named by `STAGEFLUSH_LOCK_DIR`, if set.
pub fn lock_dir_override() -> Option<PathBuf> {
  std::env::var_os("STAGEFLUSH_LOCK_DIR")
    .filter(|value| !value.is_empty())
    .map(PathBuf::from)
}

/// Returns the directory holding namespace lock files.
///
/// `STAGEFLUSH_LOCK_DIR` wins over the cache-derived default so that several
/// users (or CI jobs) can share one lock directory. `None` when neither is
/// available.
pub fn lock_dir() -> Option<PathBuf> {
  lock_dir_override().or_else(default_lock_dir)
}

/// The lock directory under the cache directory.
pub fn default_lock_dir() -> Option<PathBuf> {
  cache_dir().map(|cache| cache.join("locks"))
}
