//! Constants shared across the crate.

use std::time::Duration;

pub const APP_NAME: &str = "stageflush";

/// Upper bound on the wall-clock duration of any external command.
pub const SHELLOUT_TIMEOUT: Duration = Duration::from_secs(3600);

/// Suffix appended to a basename to form its namespace lock name.
pub const IMAGES_LOCK_SUFFIX: &str = "images";

/// Label every container created for a project carries.
pub const CONTAINER_LABEL: &str = "stageflush";

/// Label whose value is the namespace a container was created for.
///
/// Label filters match values exactly, unlike docker's `name` filter which
/// matches any substring of the container name.
pub const BASENAME_LABEL: &str = "stageflush.basename";

/// Maximum number of handles passed to a single `docker rm`/`docker rmi` call.
pub const REMOVE_CHUNK_SIZE: usize = 50;

/// How often a waiting file lock retries.
pub const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Environment variable prefixes stripped from spawned processes.
///
/// These carry the caller's dependency-resolution state (bundler, rubygems,
/// cargo, rustup) and our own settings, none of which a child should see.
pub const ISOLATED_ENV_PREFIXES: &[&str] = &["BUNDLE_", "GEM_", "CARGO_", "STAGEFLUSH_"];

/// Exact environment variable names stripped from spawned processes.
pub const ISOLATED_ENV_VARS: &[&str] = &[
  "RUBYOPT",
  "RUBYLIB",
  "BUNDLER_ORIG_PATH",
  "RUSTUP_TOOLCHAIN",
  "RUSTFLAGS",
  "RUSTC_WRAPPER",
];

/// Project file read when no configuration is given explicitly.
pub const DEFAULT_PROJECT_FILE: &str = "stageflush.json";
