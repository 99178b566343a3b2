use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read {}: {source}", .path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to parse {}: {source}", .path.display())]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("invalid basename {basename:?}: {reason}")]
  InvalidBasename { basename: String, reason: &'static str },

  #[error("image #{index} in {}: {source}", .path.display())]
  InvalidImage {
    path: PathBuf,
    index: usize,
    #[source]
    source: Box<ConfigError>,
  },

  #[error("cannot determine the lock directory: set STAGEFLUSH_LOCK_DIR, --lock-dir or HOME")]
  NoLockDir,

  #[error("invalid value for {var}: {value:?} ({reason})")]
  InvalidSetting {
    var: &'static str,
    value: String,
    reason: String,
  },
}

/// Check that `basename` names exactly one namespace.
///
/// A basename ends up in a lock file name, a label filter and an image
/// repository, so it is restricted to what docker accepts in a repository
/// name: lowercase ASCII letters, digits, `.`, `_` and `-`.
/// An empty basename would otherwise select the containers of every
/// namespace.
pub fn validate_basename(basename: &str) -> Result<(), ConfigError> {
  let reason = if basename.trim().is_empty() {
    "must not be empty"
  } else if !basename
    .chars()
    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '_' | '-'))
  {
    "may only contain lowercase letters, digits, '.', '_' and '-'"
  } else {
    return Ok(());
  };

  Err(ConfigError::InvalidBasename {
    basename: basename.to_string(),
    reason,
  })
}

/// One image declared by a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageConfig {
  #[serde(default)]
  pub name: Option<String>,
  pub basename: String,
}

impl ImageConfig {
  pub fn new(basename: impl Into<String>) -> Self {
    Self {
      name: None,
      basename: basename.into(),
    }
  }
}

/// The images of a project, read from a JSON file.
///
/// ```json
/// { "images": [ { "name": "backend", "basename": "app" } ] }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectFile {
  #[serde(default)]
  pub images: Vec<ImageConfig>,
}

impl ProjectFile {
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;

    let project: ProjectFile = serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
      path: path.to_path_buf(),
      source,
    })?;

    for (index, image) in project.images.iter().enumerate() {
      validate_basename(&image.basename).map_err(|source| ConfigError::InvalidImage {
        path: path.to_path_buf(),
        index,
        source: Box::new(source),
      })?;
    }

    Ok(project)
  }
}
