//! Distro package installation.
//!
//! Package lists are configuration data: a TOML table keyed by
//! [`DistroFamily`], embedded at build time and replaceable at startup with
//! `--packages <FILE>`. Planning is pure; [`install`] runs the plan and only
//! logs failures.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::distro::{DistroFamily, classify};
use crate::exec::{Executor, Invocation};

const BUILTIN_TABLE: &str = include_str!("packages.toml");

#[derive(Debug, Error)]
pub enum PackageError {
  #[error(
    "your OS is not yet supported ({0})! If you think you know what you are doing, you can use '-S' to continue anyway."
  )]
  UnsupportedOs(String),

  #[error("no package list configured for {0}")]
  MissingFamily(DistroFamily),

  #[error("failed to read package table '{}': {source}", path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("invalid package table: {0}")]
  Parse(#[from] toml::de::Error),
}

/// The package manager a family installs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
  Xbps,
  Pacman,
  Apt,
  Dnf,
}

impl PackageManager {
  pub fn for_family(family: DistroFamily) -> Self {
    match family {
      DistroFamily::Void => Self::Xbps,
      DistroFamily::Arch => Self::Pacman,
      DistroFamily::Debian | DistroFamily::Devuan | DistroFamily::Ubuntu => Self::Apt,
      DistroFamily::Fedora => Self::Dnf,
    }
  }

  /// argv prefix that installs packages non-interactively.
  fn install_argv(&self) -> &'static [&'static str] {
    match self {
      Self::Xbps => &["xbps-install", "--yes"],
      Self::Pacman => &["pacman", "-S", "--needed", "--noconfirm"],
      Self::Apt => &["apt-get", "install", "-y"],
      Self::Dnf => &["dnf", "install", "-y"],
    }
  }

  /// argv prefix that installs package groups, if the manager has them.
  fn group_argv(&self) -> Option<&'static [&'static str]> {
    match self {
      Self::Dnf => Some(&["dnf", "groupinstall", "-y"]),
      _ => None,
    }
  }
}

/// Packages for one distro family.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FamilyPackages {
  #[serde(default)]
  pub groups: Vec<String>,
  pub packages: Vec<String>,
  #[serde(default)]
  pub tes3mp: Vec<String>,
}

/// Immutable distro → packages table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct PackageTable(BTreeMap<DistroFamily, FamilyPackages>);

impl PackageTable {
  /// The table shipped with the binary.
  pub fn builtin() -> Result<Self, PackageError> {
    Self::parse(BUILTIN_TABLE)
  }

  pub fn parse(content: &str) -> Result<Self, PackageError> {
    Ok(toml::from_str(content)?)
  }

  pub fn from_path(path: &Path) -> Result<Self, PackageError> {
    let content = std::fs::read_to_string(path).map_err(|source| PackageError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    Self::parse(&content)
  }

  pub fn get(&self, family: DistroFamily) -> Option<&FamilyPackages> {
    self.0.get(&family)
  }
}

/// What to install and how.
#[derive(Debug, Clone, Copy, Default)]
pub struct InstallRequest {
  /// Add the family's TES3MP extras.
  pub tes3mp: bool,
  /// Running as root; otherwise commands are prefixed with `sudo`.
  pub elevated: bool,
}

/// Installation plan for a detected distro.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallPlan {
  pub family: DistroFamily,
  pub invocations: Vec<Invocation>,
}

/// Classify `distro` and build the package-manager invocations for it.
///
/// Fails with [`PackageError::UnsupportedOs`] when the distro is missing or unrecognized.
pub fn plan_install(
  distro: Option<&str>,
  table: &PackageTable,
  request: InstallRequest,
) -> Result<InstallPlan, PackageError> {
  let family = distro
    .and_then(classify)
    .ok_or_else(|| PackageError::UnsupportedOs(distro.unwrap_or("unknown").to_string()))?;
  let entry = table.get(family).ok_or(PackageError::MissingFamily(family))?;
  let manager = PackageManager::for_family(family);

  let mut packages = entry.packages.clone();
  if request.tes3mp {
    packages.extend(entry.tes3mp.iter().cloned());
  }

  let mut invocations = Vec::new();
  if let Some(group_argv) = manager.group_argv()
    && !entry.groups.is_empty()
  {
    invocations.push(command(group_argv, &entry.groups, request.elevated));
  }
  if !packages.is_empty() {
    invocations.push(command(manager.install_argv(), &packages, request.elevated));
  }

  Ok(InstallPlan { family, invocations })
}

fn command(argv: &[&str], packages: &[String], elevated: bool) -> Invocation {
  let mut full: Vec<String> = Vec::with_capacity(argv.len() + packages.len() + 1);
  if !elevated {
    full.push("sudo".to_string());
  }
  full.extend(argv.iter().map(|s| s.to_string()));
  full.extend(packages.iter().cloned());

  let mut parts = full.into_iter();
  let program = parts.next().unwrap_or_default();
  Invocation::new(program).args(parts)
}

/// Run an install plan. Failures are logged, never fatal.
///
/// Returns the number of invocations that did not succeed.
pub async fn install<E: Executor>(executor: &E, plan: &InstallPlan) -> usize {
  info!(
    distro = plan.family.display_name(),
    "attempting to install dependency packages, enter your sudo password as needed"
  );

  let mut failures = 0;
  for invocation in &plan.invocations {
    match executor.run(invocation).await {
      Ok(done) if done.success() => {}
      Ok(done) => {
        failures += 1;
        warn!(cmd = %invocation.program, code = ?done.code, "package install exited nonzero: {}", done.diagnostic());
      }
      Err(e) => {
        failures += 1;
        warn!(cmd = %invocation.program, error = %e, "package install could not run");
      }
    }
  }

  if failures == 0 {
    info!("package installation completed");
  }
  failures
}
