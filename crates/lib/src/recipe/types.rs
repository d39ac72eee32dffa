//! Recipe types: dependency specs, build strategies, and errors.

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::exec::ExecError;

/// How a component is built once its source tree is ready.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildStrategy {
  /// Out-of-tree CMake build in `<source>/build`, configured with the install
  /// prefix followed by these arguments.
  CMake { args: Vec<String> },
  /// In-tree `./configure --prefix=<install> <args>` followed by make.
  ConfigureMake { args: Vec<String> },
  /// Source only: clone and reset, nothing to compile.
  None,
}

/// Static description of one buildable component.
///
/// Immutable for the duration of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencySpec {
  /// Component name used in logs and for the nonzero-build exemption.
  pub name: String,
  /// Git URL to clone from.
  pub url: String,
  /// Directory below the source root holding the working tree.
  pub clone_dest: String,
  /// Branch or tag passed to `git clone -b`, distinct from [`Self::revision`].
  pub clone_branch: Option<String>,
  /// Revision the tree is checked out and hard-reset to before building.
  pub revision: String,
  pub strategy: BuildStrategy,
  /// Whether to run the install step after compiling.
  pub install: bool,
  /// Install location relative to the install prefix.
  pub install_subpath: PathBuf,
  /// File whose existence means the component is already built.
  pub check_file: PathBuf,
  /// Patch applied with `patch -p1` after the reset.
  pub patch: Option<PathBuf>,
}

impl DependencySpec {
  /// A CMake component cloned into, and installed under, its own name.
  pub fn cmake(name: &str, url: &str, revision: &str, check_file: impl Into<PathBuf>) -> Self {
    Self {
      name: name.to_string(),
      url: url.to_string(),
      clone_dest: name.to_string(),
      clone_branch: None,
      revision: revision.to_string(),
      strategy: BuildStrategy::CMake { args: Vec::new() },
      install: true,
      install_subpath: PathBuf::from(name),
      check_file: check_file.into(),
      patch: None,
    }
  }

  pub fn with_strategy(mut self, strategy: BuildStrategy) -> Self {
    self.strategy = strategy;
    self
  }

  pub fn with_cmake_args<I, S>(self, args: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.with_strategy(BuildStrategy::CMake {
      args: args.into_iter().map(Into::into).collect(),
    })
  }

  pub fn with_clone_branch(mut self, branch: &str) -> Self {
    self.clone_branch = Some(branch.to_string());
    self
  }

  pub fn with_install_subpath(mut self, subpath: impl Into<PathBuf>) -> Self {
    self.install_subpath = subpath.into();
    self
  }

  pub fn with_install(mut self, install: bool) -> Self {
    self.install = install;
    self
  }

  pub fn with_patch(mut self, patch: Option<PathBuf>) -> Self {
    self.patch = patch;
    self
  }
}

/// Where source trees and installs live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
  pub install_prefix: PathBuf,
  pub src_root: PathBuf,
}

impl Layout {
  pub fn new(install_prefix: impl Into<PathBuf>, src_root: impl Into<PathBuf>) -> Self {
    Self {
      install_prefix: install_prefix.into(),
      src_root: src_root.into(),
    }
  }

  pub fn source_dir(&self, spec: &DependencySpec) -> PathBuf {
    self.src_root.join(&spec.clone_dest)
  }

  pub fn install_dir(&self, spec: &DependencySpec) -> PathBuf {
    self.install_prefix.join(&spec.install_subpath)
  }

  /// `<install-prefix>/<name>`
  pub fn prefix_join(&self, name: impl AsRef<Path>) -> PathBuf {
    self.install_prefix.join(name)
  }
}

/// What a recipe run did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecipeOutcome {
  /// Check-file present, nothing touched.
  Skipped,
  Built,
}

/// Fatal recipe failures. Each one terminates the whole run.
#[derive(Debug, Error)]
pub enum RecipeError {
  #[error("could not clone {name} from {url}")]
  Clone { name: String, url: String },

  #[error("there was a problem applying the patch {}", patch.display())]
  Patch { name: String, patch: PathBuf },

  #[error("{name}: {tool} exited nonzero (code {code:?})")]
  Configure { name: String, tool: String, code: Option<i32> },

  #[error("{name}: make exited nonzero (code {code:?})")]
  Compile { name: String, code: Option<i32> },

  #[error("{name}: make install exited nonzero (code {code:?})")]
  Install { name: String, code: Option<i32> },

  #[error("{name}: failed to remove {}: {source}", path.display())]
  RemoveInstall {
    name: String,
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("{name}: failed to prepare build directory {}: {source}", path.display())]
  BuildDir {
    name: String,
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error(transparent)]
  Exec(#[from] ExecError),
}
