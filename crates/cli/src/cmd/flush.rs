//! Implementation of the `stageflush flush` command.

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::{debug, info};

use stageflush_lib::config::{BuildConfig, ImageConfig, ProjectFile, Settings};
use stageflush_lib::consts::DEFAULT_PROJECT_FILE;
use stageflush_lib::flush::Flusher;
use stageflush_lib::lock::FileLocks;
use stageflush_lib::registry::{Docker, DockerOptions};
use stageflush_lib::shellout::{ExecConfig, Shellout};

use crate::FlushArgs;
use crate::output::{OutputFormat, print_report, print_warning};

/// Execute the flush command.
///
/// Collects build configurations from the project file and the command line,
/// then flushes every distinct namespace under its lock. Prints one line per
/// namespace and fails if any namespace could not be flushed.
pub fn cmd_flush(args: FlushArgs, verbose: bool, output: OutputFormat) -> Result<()> {
  let start = Instant::now();

  let mut settings = Settings::from_env().context("Invalid settings")?;
  if args.lock_dir.is_some() {
    settings.lock_dir = args.lock_dir;
  }
  if args.lock_timeout.is_some() {
    settings.lock_timeout = args.lock_timeout;
  }

  let configs = collect_configs(args.config.as_deref(), args.basenames)?;
  if configs.is_empty() {
    print_warning("No images declared, nothing to flush");
    return Ok(());
  }
  debug!(
    basenames = ?configs.iter().map(BuildConfig::basename).collect::<Vec<_>>(),
    "collected build configurations"
  );

  // Live command output would corrupt the JSON document on stdout.
  let shellout = Shellout::new(ExecConfig {
    verbose: verbose && !output.is_json(),
    trace_commands: settings.debug_docker,
    ..ExecConfig::default()
  });
  let docker = Docker::new(
    shellout,
    DockerOptions {
      binary: settings.docker_binary.clone(),
      config_dir: args.docker_config,
      dry_run: args.dry_run,
    },
  );

  let lock_dir = settings.resolve_lock_dir()?;
  debug!(lock_dir = %lock_dir.display(), "using lock directory");
  let locks = FileLocks::new(lock_dir).with_acquire_timeout(settings.lock_timeout);
  let flusher = Flusher::new(locks, docker.clone(), docker);

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let report = rt.block_on(flusher.flush_local(&configs));
  info!(
    namespaces = report.namespaces.len(),
    failed = report.failed().count(),
    elapsed = ?start.elapsed(),
    "flush finished"
  );

  print_report(&report, output, args.dry_run, start.elapsed())?;

  match report.error() {
    Some(err) => Err(err.into()),
    None => Ok(()),
  }
}

/// Project file images first, then basenames given on the command line.
fn collect_configs(config: Option<&Path>, basenames: Vec<String>) -> Result<Vec<ImageConfig>> {
  let mut configs = Vec::new();

  match config {
    Some(path) => {
      configs.extend(ProjectFile::load(path)?.images);
    }
    None => {
      let default = Path::new(DEFAULT_PROJECT_FILE);
      if basenames.is_empty() || default.exists() {
        let project = ProjectFile::load(default)
          .with_context(|| format!("No basenames given and {} could not be loaded", DEFAULT_PROJECT_FILE))?;
        configs.extend(project.images);
      }
    }
  }

  configs.extend(basenames.into_iter().map(ImageConfig::new));
  Ok(configs)
}
