//! Shared test helpers for CLI integration tests.

use std::path::PathBuf;

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

/// Isolated test environment.
///
/// Each test gets its own temporary directory holding a fake `docker`, its
/// call log and canned output, the lock directory and the project file.
pub struct TestEnv {
  pub temp: TempDir,
}

impl TestEnv {
  pub fn new() -> Self {
    use std::os::unix::fs::PermissionsExt;

    let temp = TempDir::new().unwrap();
    let env = Self { temp };
    let root = env.root_path().display().to_string();

    // `ps` prints `<basename>-c1` and `<basename>-c2` for the namespace label,
    // `images` prints two tags of the queried repository.
    let script = format!(
      r#"#!/bin/sh
dir='{root}'
echo "$*" >> "$dir/calls.log"
sub="$1"
if [ -f "$dir/fail.$sub" ]; then
  echo "Error response from daemon: conflict: unable to remove repository reference" >&2
  exit 1
fi
case "$sub" in
  ps)
    for arg in "$@"; do
      case "$arg" in label=stageflush.basename=*) name="${{arg#label=stageflush.basename=}}" ;; esac
    done
    echo "$name-c1"
    echo "$name-c2"
    ;;
  images)
    for repo in "$@"; do :; done
    echo "$repo:one"
    echo "$repo:two"
    ;;
  rm|rmi)
    shift
    [ "$1" = "-f" ] && shift
    for id in "$@"; do echo "$id"; done
    ;;
esac
"#
    );

    let binary = env.docker_path();
    std::fs::write(&binary, script).unwrap();
    std::fs::set_permissions(&binary, std::fs::Permissions::from_mode(0o755)).unwrap();
    env
  }

  pub fn root_path(&self) -> PathBuf {
    let p = self.temp.path().to_path_buf();
    dunce::canonicalize(&p).unwrap_or(p)
  }

  pub fn docker_path(&self) -> PathBuf {
    self.root_path().join("docker")
  }

  pub fn lock_dir(&self) -> PathBuf {
    self.root_path().join("locks")
  }

  /// Make every `docker <subcommand>` call fail.
  pub fn fail_subcommand(&self, subcommand: &str) {
    std::fs::write(self.root_path().join(format!("fail.{}", subcommand)), "").unwrap();
  }

  /// Write a project file and return its path.
  pub fn write_project(&self, content: &str) -> PathBuf {
    let path = self.root_path().join("stageflush.json");
    std::fs::write(&path, content).unwrap();
    path
  }

  /// Every argument line the fake docker was called with.
  pub fn docker_calls(&self) -> Vec<String> {
    std::fs::read_to_string(self.root_path().join("calls.log"))
      .unwrap_or_default()
      .lines()
      .map(str::to_string)
      .collect()
  }

  /// Get a pre-configured Command for the stageflush binary.
  ///
  /// Runs inside the temp directory with the fake docker and an isolated
  /// lock directory.
  pub fn stageflush_cmd(&self) -> Command {
    let mut cmd: Command = cargo_bin_cmd!("stageflush");
    cmd.current_dir(self.root_path());
    cmd.env("STAGEFLUSH_DOCKER", self.docker_path());
    cmd.env("STAGEFLUSH_LOCK_DIR", self.lock_dir());
    cmd.env_remove("STAGEFLUSH_LOCK_TIMEOUT");
    cmd.env_remove("STAGEFLUSH_DEBUG_DOCKER");
    cmd.env_remove("RUST_LOG");
    cmd
  }
}
