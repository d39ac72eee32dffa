//! Distro detection and classification.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::exec::{ExecError, Executor, Invocation};

/// Distribution families with a known package list and package manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistroFamily {
  Void,
  Arch,
  Debian,
  Devuan,
  /// Ubuntu and Linux Mint.
  Ubuntu,
  Fedora,
}

impl DistroFamily {
  pub const ALL: [DistroFamily; 6] = [
    DistroFamily::Void,
    DistroFamily::Arch,
    DistroFamily::Debian,
    DistroFamily::Devuan,
    DistroFamily::Ubuntu,
    DistroFamily::Fedora,
  ];

  /// Key used in the package table.
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Void => "void",
      Self::Arch => "arch",
      Self::Debian => "debian",
      Self::Devuan => "devuan",
      Self::Ubuntu => "ubuntu",
      Self::Fedora => "fedora",
    }
  }

  pub fn display_name(&self) -> &'static str {
    match self {
      Self::Void => "Void Linux",
      Self::Arch => "Arch Linux",
      Self::Debian => "Debian",
      Self::Devuan => "Devuan",
      Self::Ubuntu => "Mint or Ubuntu",
      Self::Fedora => "Fedora",
    }
  }
}

impl fmt::Display for DistroFamily {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Map a distro description (e.g. `Ubuntu 22.04.3 LTS`) to its family.
///
/// Matches whole words, case-insensitively. Returns `None` for anything
/// unrecognized.
pub fn classify(description: &str) -> Option<DistroFamily> {
  let words: Vec<String> = description
    .split(|c: char| !c.is_ascii_alphanumeric())
    .filter(|w| !w.is_empty())
    .map(|w| w.to_ascii_lowercase())
    .collect();
  let has = |word: &str| words.iter().any(|w| w == word);

  if has("void") {
    Some(DistroFamily::Void)
  } else if has("arch") {
    Some(DistroFamily::Arch)
  } else if has("debian") {
    Some(DistroFamily::Debian)
  } else if has("devuan") {
    Some(DistroFamily::Devuan)
  } else if has("ubuntu") || has("mint") {
    Some(DistroFamily::Ubuntu)
  } else if has("fedora") {
    Some(DistroFamily::Fedora)
  } else {
    None
  }
}

#[derive(Debug, Error)]
pub enum DistroError {
  #[error("unable to determine your distro: {0}")]
  Unavailable(#[source] ExecError),

  #[error("lsb_release failed: {0}")]
  Failed(String),

  #[error("unrecognized lsb_release output: {0:?}")]
  Unparseable(String),
}

/// Run `lsb_release -d` and return the description text.
pub async fn detect<E: Executor>(executor: &E) -> Result<String, DistroError> {
  let done = executor
    .run(&Invocation::new("lsb_release").arg("-d").captured())
    .await
    .map_err(DistroError::Unavailable)?;

  if !done.success() {
    return Err(DistroError::Failed(done.diagnostic().to_string()));
  }

  let description = parse_description(&done.stdout).ok_or_else(|| DistroError::Unparseable(done.stdout.clone()))?;
  debug!(distro = %description, "detected distro");
  Ok(description)
}

/// Extract the value from `Description:\t<value>`.
pub fn parse_description(output: &str) -> Option<String> {
  let (_, value) = output.split_once(':')?;
  let value = value.trim();
  (!value.is_empty()).then(|| value.to_string())
}
