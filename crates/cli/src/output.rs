//! Rendering of flush reports for the terminal.
//!
//! Text output has one line per namespace followed by a short summary. JSON
//! output is the serialized [`FlushReport`] and nothing else, so it can be
//! piped into other tools.

use std::time::Duration;

use anyhow::Context;
use clap::ValueEnum;
use owo_colors::{OwoColorize, Stream};
use stageflush_lib::flush::{FlushReport, NamespaceOutcome};

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
  #[default]
  Text,
  Json,
}

impl OutputFormat {
  pub fn is_json(self) -> bool {
    matches!(self, OutputFormat::Json)
  }
}

const FLUSHED: &str = "✓";
const FAILED: &str = "✗";
const WARNING: &str = "⚠";

/// Print the report in the requested format.
pub fn print_report(report: &FlushReport, format: OutputFormat, dry_run: bool, elapsed: Duration) -> anyhow::Result<()> {
  if format.is_json() {
    let json = serde_json::to_string_pretty(report).context("Failed to serialize report to JSON")?;
    println!("{}", json);
    return Ok(());
  }

  for outcome in &report.namespaces {
    let line = outcome_line(outcome, dry_run);
    if outcome.is_success() {
      println!("{} {}", FLUSHED.if_supports_color(Stream::Stdout, |s| s.green()), line);
    } else {
      println!(
        "{} {}",
        FAILED.if_supports_color(Stream::Stdout, |s| s.red()),
        line.if_supports_color(Stream::Stdout, |s| s.red())
      );
    }
  }

  println!();
  println!("{}", headline(report, dry_run).if_supports_color(Stream::Stdout, |s| s.bold()));
  for (label, value) in summary(report, dry_run, elapsed) {
    println!("  {}: {}", label.if_supports_color(Stream::Stdout, |s| s.dimmed()), value);
  }
  Ok(())
}

/// Warnings go to stderr so they never end up in piped output.
pub fn print_warning(message: &str) {
  eprintln!(
    "{} {}",
    WARNING.if_supports_color(Stream::Stderr, |s| s.yellow()),
    message.if_supports_color(Stream::Stderr, |s| s.yellow())
  );
}

fn outcome_line(outcome: &NamespaceOutcome, dry_run: bool) -> String {
  match &outcome.result {
    Ok(flushed) => format!(
      "{}: {} container(s), {} image(s) {}",
      outcome.basename,
      flushed.containers.len(),
      flushed.images.len(),
      if dry_run { "would be removed" } else { "removed" }
    ),
    Err(err) => format!("{}: {}", outcome.basename, err),
  }
}

fn headline(report: &FlushReport, dry_run: bool) -> &'static str {
  if dry_run {
    "Dry run - no changes made"
  } else if report.is_success() {
    "Flush complete!"
  } else {
    "Flush incomplete"
  }
}

fn summary(report: &FlushReport, dry_run: bool, elapsed: Duration) -> Vec<(&'static str, String)> {
  let (containers, images) = if dry_run {
    ("Containers to remove", "Images to remove")
  } else {
    ("Containers removed", "Images removed")
  };

  vec![
    ("Namespaces", report.namespaces.len().to_string()),
    (containers, report.containers_removed().to_string()),
    (images, report.images_removed().to_string()),
    ("Duration", format_elapsed(elapsed)),
  ]
}

/// Elapsed time rounded to whole milliseconds, e.g. `1s 500ms`.
fn format_elapsed(elapsed: Duration) -> String {
  let millis = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
  humantime::format_duration(Duration::from_millis(millis)).to_string()
}
