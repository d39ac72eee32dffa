//! Options for one driver run.

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::catalog::{BuildType, Component, OpenMwTools};
use crate::consts::{DEFAULT_BRANCH, DEFAULT_INSTALL_PREFIX, SRC_SUBDIR, TES3MP_VERSION, default_jobs};
use crate::recipe::Layout;

/// The revision of the application to build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "value")]
pub enum RevisionSelector {
  Branch(String),
  Sha(String),
  Tag(String),
}

impl RevisionSelector {
  /// Git reference to check out. Bare branch names are qualified with `origin/`.
  pub fn reference(&self) -> String {
    match self {
      Self::Branch(branch) if !branch.contains('/') => format!("origin/{branch}"),
      Self::Branch(reference) | Self::Sha(reference) | Self::Tag(reference) => reference.clone(),
    }
  }
}

impl Default for RevisionSelector {
  fn default() -> Self {
    Self::Branch(DEFAULT_BRANCH.to_string())
  }
}

impl fmt::Display for RevisionSelector {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Branch(b) => write!(f, "branch {b}"),
      Self::Sha(s) => write!(f, "sha {s}"),
      Self::Tag(t) => write!(f, "tag {t}"),
    }
  }
}

/// The application built after the dependencies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Application {
  #[default]
  OpenMw,
  Tes3mp {
    server_only: bool,
  },
}

impl Application {
  pub fn component(&self) -> Component {
    match self {
      Self::OpenMw => Component::OpenMw,
      Self::Tes3mp { .. } => Component::Tes3mp,
    }
  }

  pub fn name(&self) -> &'static str {
    self.component().name()
  }

  pub fn is_tes3mp(&self) -> bool {
    matches!(self, Self::Tes3mp { .. })
  }
}

/// Everything a run needs to know, resolved from the command line.
#[derive(Debug, Clone)]
pub struct BuildOptions {
  pub install_prefix: PathBuf,
  pub src_dir: PathBuf,
  pub jobs: usize,
  /// Explicit application revision; `None` means the application's default.
  pub revision: Option<RevisionSelector>,
  pub force: BTreeSet<Component>,
  pub system_osg: bool,
  pub system_bullet: bool,
  pub build_mygui: bool,
  pub build_unshield: bool,
  pub application: Application,
  /// Install TES3MP (OpenMW is always installed).
  pub make_install: bool,
  /// Fetch before resolving the application revision.
  pub pull: bool,
  pub patch: Option<PathBuf>,
  pub skip_install_pkgs: bool,
  /// Package table file replacing the built-in one.
  pub packages: Option<PathBuf>,
  pub with_corescripts: bool,
  pub build_type: BuildType,
  pub tools: OpenMwTools,
}

impl Default for BuildOptions {
  fn default() -> Self {
    Self::new(DEFAULT_INSTALL_PREFIX)
  }
}

impl BuildOptions {
  /// Defaults for a prefix: sources in `<prefix>/src`, OpenMW at the default branch.
  pub fn new(install_prefix: impl Into<PathBuf>) -> Self {
    let install_prefix = install_prefix.into();
    Self {
      src_dir: install_prefix.join(SRC_SUBDIR),
      install_prefix,
      jobs: default_jobs(),
      revision: None,
      force: BTreeSet::new(),
      system_osg: false,
      system_bullet: false,
      build_mygui: false,
      build_unshield: false,
      application: Application::OpenMw,
      make_install: false,
      pull: true,
      patch: None,
      skip_install_pkgs: false,
      packages: None,
      with_corescripts: false,
      build_type: BuildType::Release,
      tools: OpenMwTools::default(),
    }
  }

  pub fn layout(&self) -> Layout {
    Layout::new(&self.install_prefix, &self.src_dir)
  }

  pub fn is_forced(&self, component: Component) -> bool {
    self.force.contains(&component)
  }

  pub fn force_all(&mut self, components: &[Component]) {
    self.force.extend(components.iter().copied());
  }

  /// Reference the application tree is pinned to.
  ///
  /// TES3MP defaults to the revision known to build against the pinned dependencies.
  pub fn app_reference(&self) -> String {
    match (&self.revision, self.application) {
      (Some(selector), _) => selector.reference(),
      (None, Application::Tes3mp { .. }) => TES3MP_VERSION.to_string(),
      (None, Application::OpenMw) => RevisionSelector::default().reference(),
    }
  }

  pub fn builds_osg(&self) -> bool {
    !self.system_osg
  }

  pub fn builds_bullet(&self) -> bool {
    !self.system_bullet || self.is_forced(Component::Bullet)
  }

  pub fn builds_unshield(&self) -> bool {
    self.build_unshield || self.is_forced(Component::Unshield)
  }

  pub fn builds_mygui(&self) -> bool {
    self.build_mygui || self.is_forced(Component::MyGui)
  }

  /// TES3MP is only promoted when it was installed.
  pub fn promotes_app(&self) -> bool {
    !self.application.is_tes3mp() || self.make_install
  }
}
