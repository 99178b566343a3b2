mod cmd;
mod output;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use stageflush_lib::config::validate_basename;
use tracing_subscriber::EnvFilter;

use crate::cmd::cmd_flush;
use crate::output::OutputFormat;

/// stageflush - reclaim local stage containers and images
#[derive(Parser)]
#[command(name = "stageflush")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Show progress logs and live output of removal commands
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Output format
  #[arg(short, long, global = true, value_enum, default_value_t)]
  output: OutputFormat,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Remove the containers and images of every namespace, one lock at a time
  Flush(FlushArgs),
}

#[derive(Args)]
pub struct FlushArgs {
  /// Basenames to flush, in addition to those in the project file
  #[arg(value_parser = parse_basename)]
  pub basenames: Vec<String>,

  /// Project file declaring the images (default: ./stageflush.json if present)
  #[arg(short, long)]
  pub config: Option<PathBuf>,

  /// List what would be removed without removing anything
  #[arg(long)]
  pub dry_run: bool,

  /// Give up waiting for a namespace lock after this long (e.g. "30s", "5m")
  #[arg(long, value_parser = humantime::parse_duration)]
  pub lock_timeout: Option<Duration>,

  /// Directory holding namespace lock files
  #[arg(long)]
  pub lock_dir: Option<PathBuf>,

  /// Docker client configuration directory (sets DOCKER_CONFIG)
  #[arg(long)]
  pub docker_config: Option<PathBuf>,
}

fn parse_basename(value: &str) -> Result<String, String> {
  validate_basename(value).map_err(|err| err.to_string())?;
  Ok(value.to_string())
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "info" } else { "warn" };
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  match cli.command {
    Commands::Flush(args) => cmd_flush(args, cli.verbose, cli.output),
  }
}
