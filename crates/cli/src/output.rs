//! CLI output formatting utilities.
//!
//! Provides consistent formatting for terminal output including colored status
//! messages, human-readable byte/duration formatting, and build summaries.

use std::time::Duration;

use anyhow::Context;
use clap::ValueEnum;
use owo_colors::{OwoColorize, Stream};
use wrapkit_lib::StatsSummary;

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

pub mod symbols {
  pub const SUCCESS: &str = "✓";
  pub const ERROR: &str = "✗";
  pub const WARNING: &str = "⚠";
  pub const INFO: &str = "•";
  pub const SKIPPED: &str = "=";
}

pub fn truncate_hash(hash: &str) -> &str {
  let len = hash.len().min(12);
  &hash[..len]
}

pub fn format_bytes(bytes: u64) -> String {
  const KB: u64 = 1024;
  const MB: u64 = KB * 1024;
  const GB: u64 = MB * 1024;

  if bytes >= GB {
    format!("{:.1} GB", bytes as f64 / GB as f64)
  } else if bytes >= MB {
    format!("{:.1} MB", bytes as f64 / MB as f64)
  } else if bytes >= KB {
    format!("{:.1} KB", bytes as f64 / KB as f64)
  } else {
    format!("{} B", bytes)
  }
}

pub fn format_duration(duration: Duration) -> String {
  let secs = duration.as_secs();
  let millis = duration.subsec_millis();

  if secs >= 60 {
    let mins = secs / 60;
    let remaining_secs = secs % 60;
    format!("{}m {}s", mins, remaining_secs)
  } else if secs > 0 {
    format!("{}.{:02}s", secs, millis / 10)
  } else {
    format!("{}ms", millis)
  }
}

pub fn print_success(message: &str) {
  println!(
    "{} {}",
    symbols::SUCCESS.if_supports_color(Stream::Stdout, |s| s.green()),
    message
  );
}

pub fn print_error(message: &str) {
  eprintln!(
    "{} {}",
    symbols::ERROR.if_supports_color(Stream::Stderr, |s| s.red()),
    message.if_supports_color(Stream::Stderr, |s| s.red())
  );
}

pub fn print_warning(message: &str) {
  eprintln!(
    "{} {}",
    symbols::WARNING.if_supports_color(Stream::Stderr, |s| s.yellow()),
    message.if_supports_color(Stream::Stderr, |s| s.yellow())
  );
}

pub fn print_stat(label: &str, value: &str) {
  println!(
    "  {}: {}",
    label.if_supports_color(Stream::Stdout, |s| s.dimmed()),
    value
  );
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize to JSON")?;
  println!("{}", json);
  Ok(())
}

/// Print a finished build: headline, timings, then one line per asset and
/// every error and warning.
pub fn print_summary(summary: &StatsSummary) {
  let label = summary.name.as_deref().unwrap_or("build");
  let hash = summary.hash.as_deref().map(truncate_hash).unwrap_or("-");
  if summary.errors.is_empty() {
    print_success(&format!("{} {}", label, hash));
  } else {
    print_error(&format!("{} {} failed with {} error(s)", label, hash, summary.errors.len()));
  }
  if let Some(ms) = summary.duration_ms {
    print_stat("Time", &format_duration(Duration::from_millis(ms)));
  }
  print_stat("Emitted", &summary.emitted().count().to_string());
  print_stat("Unchanged", &summary.skipped().count().to_string());

  for asset in &summary.assets {
    let symbol = if asset.emitted {
      symbols::SUCCESS
    } else {
      symbols::SKIPPED
    };
    println!("  {} {} ({})", symbol, asset.name, format_bytes(asset.size as u64));
  }
  for child in &summary.children {
    println!(
      "  {} child {} {}",
      symbols::INFO,
      child.name.as_deref().unwrap_or("<unnamed>"),
      child.hash.as_deref().map(truncate_hash).unwrap_or("-")
    );
  }
  for warning in &summary.warnings {
    print_warning(warning);
  }
  for error in &summary.errors {
    print_error(error);
  }
}
