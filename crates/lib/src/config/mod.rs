//! Build configurations and ambient settings.

mod project;
mod settings;

pub use project::{ConfigError, ImageConfig, ProjectFile, validate_basename};
pub use settings::Settings;

/// A build configuration, as far as flushing is concerned.
///
/// Only the basename matters: it names the namespace whose containers and
/// images are reclaimed. Several configurations may share one.
pub trait BuildConfig {
  fn basename(&self) -> &str;
}

impl BuildConfig for ImageConfig {
  fn basename(&self) -> &str {
    &self.basename
  }
}

impl BuildConfig for String {
  fn basename(&self) -> &str {
    self
  }
}

impl BuildConfig for &str {
  fn basename(&self) -> &str {
    self
  }
}
