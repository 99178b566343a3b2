//! Invocation, result and error types for external commands.

use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;

use thiserror::Error;

/// A command to run: program, arguments and execution options.
///
/// Built once and consumed by a single execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
  pub program: String,
  pub args: Vec<String>,
  /// Variables set on top of the isolated environment.
  pub env: BTreeMap<String, String>,
  pub cwd: Option<PathBuf>,
  /// Ask for stdout to be streamed live. Only honoured when the executor is
  /// itself configured as verbose.
  pub log_verbose: bool,
}

impl Invocation {
  pub fn new(program: impl Into<String>) -> Self {
    Self {
      program: program.into(),
      args: Vec::new(),
      env: BTreeMap::new(),
      cwd: None,
      log_verbose: false,
    }
  }

  pub fn arg(mut self, arg: impl Into<String>) -> Self {
    self.args.push(arg.into());
    self
  }

  pub fn args<I, S>(mut self, args: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.args.extend(args.into_iter().map(Into::into));
    self
  }

  pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.env.insert(key.into(), value.into());
    self
  }

  pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
    self.cwd = Some(cwd.into());
    self
  }

  pub fn log_verbose(mut self, log_verbose: bool) -> Self {
    self.log_verbose = log_verbose;
    self
  }

  /// The command line as a user would type it, for logs and error messages.
  pub fn command_line(&self) -> String {
    std::iter::once(self.program.as_str())
      .chain(self.args.iter().map(String::as_str))
      .map(quote)
      .collect::<Vec<_>>()
      .join(" ")
  }
}

impl fmt::Display for Invocation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.command_line())
  }
}

fn quote(token: &str) -> String {
  if token.is_empty() || token.chars().any(|c| c.is_whitespace() || c == '\'' || c == '"') {
    format!("'{}'", token.replace('\'', r"'\''"))
  } else {
    token.to_string()
  }
}

/// Outcome of one external command.
#[derive(Debug, Clone)]
pub struct ExecResult {
  pub status: ExitStatus,
  pub stdout: String,
  pub stderr: String,
  pub invocation: Invocation,
  /// True when stdout went to the live stream and was not captured.
  pub streamed: bool,
}

impl ExecResult {
  pub fn success(&self) -> bool {
    self.status.success()
  }

  /// Exit code, `None` when the process was terminated by a signal.
  pub fn code(&self) -> Option<i32> {
    self.status.code()
  }

  /// Non-empty, trimmed stdout lines.
  pub fn stdout_lines(&self) -> impl Iterator<Item = &str> {
    self.stdout.lines().map(str::trim).filter(|line| !line.is_empty())
  }

  /// Converts a failed exit status into [`ShelloutError::Failed`].
  pub fn error_for_status(self) -> Result<Self, ShelloutError> {
    if self.success() {
      Ok(self)
    } else {
      Err(ShelloutError::Failed(Box::new(self)))
    }
  }
}

/// Errors that can occur while running an external command.
#[derive(Debug, Error)]
pub enum ShelloutError {
  /// The program could not be started (missing binary, permissions).
  #[error("failed to spawn `{command}`: {source}")]
  Spawn {
    command: String,
    #[source]
    source: io::Error,
  },

  /// The program ran longer than the allowed duration and was killed.
  #[error("command `{command}` timed out after {}s", .timeout.as_secs_f64())]
  Timeout { command: String, timeout: Duration },

  /// Reading the program's output or waiting for it failed.
  #[error("failed to collect output of `{command}`: {source}")]
  Io {
    command: String,
    #[source]
    source: io::Error,
  },

  /// The program exited with a failure status (checked mode only).
  #[error("{}", failure_message(.0))]
  Failed(Box<ExecResult>),
}

impl ShelloutError {
  /// The result of the failed command, when there is one.
  pub fn result(&self) -> Option<&ExecResult> {
    match self {
      ShelloutError::Failed(result) => Some(&**result),
      _ => None,
    }
  }

  pub fn is_timeout(&self) -> bool {
    matches!(self, ShelloutError::Timeout { .. })
  }
}

fn failure_message(result: &ExecResult) -> String {
  let status = match result.code() {
    Some(code) => format!("exit code {}", code),
    None => "a signal".to_string(),
  };

  let mut message = format!("command `{}` failed with {}", result.invocation, status);
  for (label, stream) in [("stdout", &result.stdout), ("stderr", &result.stderr)] {
    let stream = stream.trim();
    if !stream.is_empty() {
      message.push_str(&format!("\n{}:\n{}", label, stream));
    }
  }
  message
}
