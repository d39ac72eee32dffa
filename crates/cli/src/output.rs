//! CLI output formatting utilities.
//!
//! Colored status lines, the one-line fatal error, duration formatting, and JSON output.

use std::time::Duration;

use anyhow::Context;
use clap::ValueEnum;
use owo_colors::{OwoColorize, Stream};

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
}

pub fn format_duration(duration: Duration) -> String {
  let secs = duration.as_secs();
  let millis = duration.subsec_millis();

  if secs >= 3600 {
    format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
  } else if secs >= 60 {
    let mins = secs / 60;
    let remaining_secs = secs % 60;
    format!("{}m {}s", mins, remaining_secs)
  } else if secs > 0 {
    format!("{}.{:02}s", secs, millis / 10)
  } else {
    format!("{}ms", millis)
  }
}

/// The message, terminated, followed by ` Exiting ...`.
pub fn fatal_line(message: &str) -> String {
  let message = message.trim_end();
  let sep = if message.ends_with(['.', '!', '?']) { "" } else { "." };
  format!("{message}{sep} Exiting ...")
}

/// `ERROR: <message> Exiting ...` on stderr.
pub fn print_fatal(message: &str) {
  eprintln!(
    "{} {}",
    "ERROR:".if_supports_color(Stream::Stderr, |s| s.red()),
    fatal_line(message)
  );
}

pub fn print_success(message: &str) {
  println!(
    "{} {}",
    symbols::SUCCESS.if_supports_color(Stream::Stdout, |s| s.green()),
    message
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
