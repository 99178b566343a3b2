//! The command executor.

use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::consts::SHELLOUT_TIMEOUT;
use crate::shellout::env::IsolatedEnv;
use crate::shellout::types::{ExecResult, Invocation, ShelloutError};

/// Settings shared by every command an executor runs.
#[derive(Debug, Clone)]
pub struct ExecConfig {
  /// Global verbosity. Live output requires both this and the invocation's
  /// own `log_verbose` flag.
  pub verbose: bool,

  /// Hard limit on each command's wall-clock duration.
  pub timeout: Duration,

  /// Log every command line at `info` instead of `debug`.
  pub trace_commands: bool,
}

impl Default for ExecConfig {
  fn default() -> Self {
    Self {
      verbose: false,
      timeout: SHELLOUT_TIMEOUT,
      trace_commands: false,
    }
  }
}

/// Runs external commands under an [`ExecConfig`].
#[derive(Debug, Clone, Default)]
pub struct Shellout {
  config: ExecConfig,
}

impl Shellout {
  pub fn new(config: ExecConfig) -> Self {
    Self { config }
  }

  pub fn config(&self) -> &ExecConfig {
    &self.config
  }

  /// Whether the invocation's stdout will be streamed instead of captured.
  pub fn streams_live(&self, invocation: &Invocation) -> bool {
    invocation.log_verbose && self.config.verbose
  }

  /// Run a command and report its outcome.
  ///
  /// A non-zero exit status is not an error here; inspect the returned
  /// [`ExecResult`] or use [`Shellout::shellout_checked`]. Timeouts and spawn
  /// failures are errors.
  pub async fn shellout(&self, invocation: Invocation) -> Result<ExecResult, ShelloutError> {
    let command_line = invocation.command_line();
    if self.config.trace_commands {
      info!(cmd = %command_line, "running command");
    } else {
      debug!(cmd = %command_line, "running command");
    }

    let streamed = self.streams_live(&invocation);

    let mut command = Command::new(&invocation.program);
    command.args(&invocation.args);
    IsolatedEnv::capture().apply(&mut command);
    command
      .envs(&invocation.env)
      .stdin(Stdio::null())
      .stdout(if streamed { Stdio::inherit() } else { Stdio::piped() })
      .stderr(Stdio::piped())
      .kill_on_drop(true);
    if let Some(cwd) = &invocation.cwd {
      command.current_dir(cwd);
    }

    let child = command.spawn().map_err(|source| ShelloutError::Spawn {
      command: command_line.clone(),
      source,
    })?;

    // Dropping the wait future on timeout drops the child, which kills it.
    let output = match tokio::time::timeout(self.config.timeout, child.wait_with_output()).await {
      Ok(output) => output.map_err(|source| ShelloutError::Io {
        command: command_line.clone(),
        source,
      })?,
      Err(_) => {
        warn!(cmd = %command_line, timeout = ?self.config.timeout, "command timed out");
        return Err(ShelloutError::Timeout {
          command: command_line,
          timeout: self.config.timeout,
        });
      }
    };

    let result = ExecResult {
      status: output.status,
      stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
      stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
      invocation,
      streamed,
    };

    if !result.success() {
      debug!(cmd = %command_line, code = ?result.code(), stderr = %result.stderr.trim(), "command failed");
    }

    Ok(result)
  }

  /// Run a command and fail unless it exits successfully.
  ///
  /// The error carries the complete [`ExecResult`] for diagnosis.
  pub async fn shellout_checked(&self, invocation: Invocation) -> Result<ExecResult, ShelloutError> {
    self.shellout(invocation).await?.error_for_status()
  }
}
