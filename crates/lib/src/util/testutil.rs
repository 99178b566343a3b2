//! Test utilities for stageflush-lib.
//!
//! Cross-platform invocations for tests that need to run real processes.

use crate::shellout::Invocation;

/// An invocation that echoes an environment variable.
///
/// Variable expansion needs a shell, so this goes through one.
#[cfg(unix)]
pub fn shell_echo_env(var: &str) -> Invocation {
  Invocation::new("/bin/sh").args(["-c".to_string(), format!("echo \"${}\"", var)])
}

#[cfg(windows)]
pub fn shell_echo_env(var: &str) -> Invocation {
  Invocation::new("cmd.exe").args(["/C".to_string(), format!("echo %{}%", var)])
}

/// An invocation that runs a shell script.
#[cfg(unix)]
pub fn shell_cmd(script: &str) -> Invocation {
  Invocation::new("/bin/sh").args(["-c", script])
}

#[cfg(windows)]
pub fn shell_cmd(script: &str) -> Invocation {
  Invocation::new("cmd.exe").args(["/C", script])
}

/// An invocation that echoes a message.
///
/// On Windows, echo is a shell builtin, so it is wrapped in cmd.exe.
#[cfg(unix)]
pub fn echo_msg(msg: &str) -> Invocation {
  Invocation::new("/bin/echo").arg(msg)
}

#[cfg(windows)]
pub fn echo_msg(msg: &str) -> Invocation {
  Invocation::new("cmd.exe").args(["/C".to_string(), format!("echo {}", msg)])
}

/// An invocation that sleeps for the given number of seconds.
#[cfg(unix)]
pub fn sleep_secs(secs: u64) -> Invocation {
  Invocation::new("/bin/sh").args(["-c".to_string(), format!("sleep {}", secs)])
}

#[cfg(windows)]
pub fn sleep_secs(secs: u64) -> Invocation {
  Invocation::new("powershell.exe").args([
    "-NoProfile".to_string(),
    "-Command".to_string(),
    format!("Start-Sleep -Seconds {}", secs),
  ])
}

/// A stand-in `docker` executable backed by a shell script.
///
/// Every call is appended to `calls.log`; `ps` and `images` print canned
/// output and a subcommand marked with [`FakeDocker::failing`] exits 1.
/// Containers registered with [`FakeDocker::with_labelled_containers`] are
/// filtered the way docker does: `label=k=v` exactly, `name=v` by substring.
#[cfg(unix)]
pub struct FakeDocker {
  dir: tempfile::TempDir,
}

#[cfg(unix)]
impl FakeDocker {
  pub fn new() -> Self {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::TempDir::new().unwrap();
    let root = dir.path().display().to_string();
    let script = format!(
      r#"#!/bin/sh
dir='{root}'
echo "$*" >> "$dir/calls.log"
printf '%s' "$DOCKER_CONFIG" > "$dir/docker_config.out"
if [ -f "$dir/fail.$1" ]; then
  echo "Error response from daemon: conflict" >&2
  exit 1
fi
case "$1" in
  ps)
    if [ -f "$dir/containers.tsv" ]; then
      label=''
      name=''
      for arg in "$@"; do
        case "$arg" in
          label=stageflush.basename=*) label="${{arg#label=stageflush.basename=}}" ;;
          name=*) name="${{arg#name=}}" ;;
        esac
      done
      while read -r id basename cname; do
        [ -n "$label" ] && [ "$basename" != "$label" ] && continue
        case "$cname" in *"$name"*) echo "$id" ;; esac
      done < "$dir/containers.tsv"
    else
      cat "$dir/ps.out"
    fi
    ;;
  images) cat "$dir/images.out" ;;
  rm|rmi) shift; [ "$1" = "-f" ] && shift; for id in "$@"; do echo "$id"; done ;;
esac
"#
    );

    let binary = dir.path().join("docker");
    std::fs::write(&binary, script).unwrap();
    std::fs::set_permissions(&binary, std::fs::Permissions::from_mode(0o755)).unwrap();
    std::fs::write(dir.path().join("ps.out"), "").unwrap();
    std::fs::write(dir.path().join("images.out"), "").unwrap();

    Self { dir }
  }

  pub fn with_containers(self, ids: &[&str]) -> Self {
    std::fs::write(self.dir.path().join("ps.out"), lines(ids)).unwrap();
    self
  }

  /// Containers as `(id, basename label, name)`.
  pub fn with_labelled_containers(self, containers: &[(&str, &str, &str)]) -> Self {
    let table: String = containers
      .iter()
      .map(|(id, basename, name)| format!("{} {} {}\n", id, basename, name))
      .collect();
    std::fs::write(self.dir.path().join("containers.tsv"), table).unwrap();
    self
  }

  pub fn with_images(self, references: &[&str]) -> Self {
    std::fs::write(self.dir.path().join("images.out"), lines(references)).unwrap();
    self
  }

  pub fn failing(self, subcommand: &str) -> Self {
    std::fs::write(self.dir.path().join(format!("fail.{}", subcommand)), "").unwrap();
    self
  }

  pub fn binary(&self) -> String {
    self.dir.path().join("docker").display().to_string()
  }

  pub fn calls(&self) -> Vec<String> {
    std::fs::read_to_string(self.dir.path().join("calls.log"))
      .unwrap_or_default()
      .lines()
      .map(str::to_string)
      .collect()
  }

  pub fn docker_config(&self) -> String {
    std::fs::read_to_string(self.dir.path().join("docker_config.out")).unwrap_or_default()
  }
}

#[cfg(unix)]
fn lines(items: &[&str]) -> String {
  items.iter().map(|item| format!("{}\n", item)).collect()
}

/// A finished `docker` invocation that exited with `code`.
pub fn docker_result(args: &[&str], code: i32, stderr: &str) -> crate::shellout::ExecResult {
  crate::shellout::ExecResult {
    status: exit_status(code),
    stdout: String::new(),
    stderr: stderr.to_string(),
    invocation: Invocation::new("docker").args(args.iter().copied()),
    streamed: false,
  }
}

#[cfg(unix)]
fn exit_status(code: i32) -> std::process::ExitStatus {
  use std::os::unix::process::ExitStatusExt;
  std::process::ExitStatus::from_raw(code << 8)
}

#[cfg(windows)]
fn exit_status(code: i32) -> std::process::ExitStatus {
  use std::os::windows::process::ExitStatusExt;
  std::process::ExitStatus::from_raw(code as u32)
}
