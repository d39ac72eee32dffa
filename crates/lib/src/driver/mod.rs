//! The build driver.
//!
//! One run goes through, in order:
//! 1. distro detection and package installation (unless skipped)
//! 2. preparing the install prefix and source root
//! 3. the dependencies, in a fixed order, through the Recipe Runner
//! 4. the application, named and then promoted by the Revision Tracker
//! 5. TES3MP CoreScripts, when requested
//!
//! The first fatal error ends the run. Nothing is rolled back.

mod options;

pub use options::{Application, BuildOptions, RevisionSelector};

use std::path::PathBuf;
use std::time::Instant;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::catalog::{self, Component};
use crate::corescripts::{self, CorescriptsError};
use crate::distro::{self, DistroError, DistroFamily, classify};
use crate::env::{BuildEnv, PrefixPath};
use crate::exec::Executor;
use crate::packages::{self, InstallRequest, PackageError, PackageTable, plan_install};
use crate::platform::{self, DirError, ensure_dir};
use crate::recipe::{DependencySpec, Layout, RecipeError, RecipeOutcome, Runner};
use crate::revision::{self, RevisionError, RevisionTracker, ShortHash};

#[derive(Debug, Error)]
pub enum DriverError {
  #[error("the patch file '{}' does not exist", .0.display())]
  PatchNotFound(PathBuf),

  #[error("{0}. Try again and use '-S' if you know what you are doing.")]
  Distro(#[from] DistroError),

  #[error(transparent)]
  Packages(#[from] PackageError),

  #[error(transparent)]
  Dir(#[from] DirError),

  #[error(transparent)]
  Recipe(#[from] RecipeError),

  #[error(transparent)]
  Revision(#[from] RevisionError),

  #[error("no revision could be read from '{}' after building", .0.display())]
  MissingRevision(PathBuf),

  #[error(transparent)]
  Corescripts(#[from] CorescriptsError),
}

/// What happened to one component.
#[derive(Debug, Clone, Serialize)]
pub struct ComponentReport {
  pub component: Component,
  pub outcome: RecipeOutcome,
}

/// Summary of a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
  /// Detected distro description, if detection ran and succeeded.
  pub distro: Option<String>,
  pub family: Option<DistroFamily>,
  /// Package-manager invocations that did not succeed.
  pub package_failures: usize,
  pub components: Vec<ComponentReport>,
  pub application: Application,
  pub revision: ShortHash,
  /// `<prefix>/<app>-<hash>`
  pub install_dir: PathBuf,
  /// Whether the `<app>` symlink was repointed.
  pub promoted: bool,
  pub corescripts: Option<PathBuf>,
  pub elapsed_ms: u64,
}

impl BuildReport {
  pub fn built(&self) -> impl Iterator<Item = Component> + '_ {
    self.components_with(RecipeOutcome::Built)
  }

  pub fn skipped(&self) -> impl Iterator<Item = Component> + '_ {
    self.components_with(RecipeOutcome::Skipped)
  }

  fn components_with(&self, outcome: RecipeOutcome) -> impl Iterator<Item = Component> + '_ {
    self
      .components
      .iter()
      .filter(move |c| c.outcome == outcome)
      .map(|c| c.component)
  }
}

/// The dependencies this run builds, in build order.
pub fn dependency_plan(options: &BuildOptions, layout: &Layout) -> Vec<(Component, DependencySpec)> {
  let mut plan = Vec::new();
  if options.builds_osg() {
    plan.push((Component::Osg, catalog::osg(layout)));
  }
  if options.builds_bullet() {
    plan.push((Component::Bullet, catalog::bullet(layout)));
  }
  if options.builds_unshield() {
    plan.push((Component::Unshield, catalog::unshield(layout)));
  }
  if options.builds_mygui() {
    plan.push((Component::MyGui, catalog::mygui(layout)));
  }
  if options.application.is_tes3mp() {
    plan.push((Component::RakNet, catalog::raknet(layout)));
  }
  plan
}

/// Linker flags for the application build.
pub fn ldflags(family: Option<DistroFamily>) -> &'static str {
  match family {
    Some(DistroFamily::Debian | DistroFamily::Ubuntu) => "-lz -lbz2",
    _ => "-llzma -lz -lbz2",
  }
}

/// Build everything `options` asks for.
pub async fn run<E: Executor>(options: &BuildOptions, executor: &E) -> Result<BuildReport, DriverError> {
  let start = Instant::now();

  if let Some(patch) = &options.patch
    && !patch.is_file()
  {
    return Err(DriverError::PatchNotFound(patch.clone()));
  }

  let distro = match distro::detect(executor).await {
    Ok(description) => Some(description),
    Err(e) if options.skip_install_pkgs => {
      warn!(error = %e, "could not detect distro, continuing");
      None
    }
    Err(e) => return Err(e.into()),
  };
  let family = distro.as_deref().and_then(classify);

  let package_failures = if options.skip_install_pkgs {
    info!("skipping package installation");
    0
  } else {
    let table = match &options.packages {
      Some(path) => PackageTable::from_path(path)?,
      None => PackageTable::builtin()?,
    };
    let request = InstallRequest {
      tes3mp: options.application.is_tes3mp(),
      elevated: platform::is_elevated(),
    };
    let plan = plan_install(distro.as_deref(), &table, request)?;
    packages::install(executor, &plan).await
  };

  ensure_dir(executor, &options.install_prefix).await?;
  ensure_dir(executor, &options.src_dir).await?;

  let layout = options.layout();
  let runner = Runner::new(executor, &layout, options.jobs);
  let mut components = Vec::new();
  let mut prefix_path = PrefixPath::default();

  for (component, spec) in dependency_plan(options, &layout) {
    let outcome = runner.run(&spec, &BuildEnv::new(), options.is_forced(component)).await?;
    components.push(ComponentReport { component, outcome });
    match component {
      Component::RakNet => prefix_path.push(catalog::raknet_lib_dir(&layout)),
      _ => prefix_path.push(layout.install_dir(&spec)),
    }
  }

  let app = options.application;
  let app_name = app.name();
  let tree = layout.src_root.join(app_name);
  let reference = options.app_reference();
  let tracker = RevisionTracker::new(executor);

  let initial = tracker.resolve(&tree, &reference, options.pull).await?;
  let install_name = revision::install_name(app_name, initial.as_ref());
  info!(app = app_name, reference = %reference, install = %install_name, "building application");

  let env = BuildEnv::new()
    .with_prefix_path(prefix_path.paths())
    .with_ldflags(ldflags(family));
  let spec = app_spec(options, &layout, &reference, &install_name).with_patch(options.patch.clone());
  let outcome = runner.run(&spec, &env, options.is_forced(app.component())).await?;
  components.push(ComponentReport {
    component: app.component(),
    outcome,
  });

  // no fetch: the tree must stay at what was just built
  let hash = tracker
    .resolve(&tree, &reference, false)
    .await?
    .ok_or_else(|| DriverError::MissingRevision(tree.clone()))?;

  let promoted = options.promotes_app();
  let install_dir = if promoted {
    revision::promote(&layout.install_prefix, app_name, &install_name, &hash)?
  } else {
    layout.prefix_join(revision::versioned_name(app_name, &hash))
  };

  let corescripts = if app.is_tes3mp() && options.with_corescripts {
    Some(corescripts::install(executor, &install_dir).await?)
  } else {
    None
  };

  Ok(BuildReport {
    distro,
    family,
    package_failures,
    components,
    application: app,
    revision: hash,
    install_dir,
    promoted,
    corescripts,
    elapsed_ms: start.elapsed().as_millis() as u64,
  })
}

fn app_spec(options: &BuildOptions, layout: &Layout, reference: &str, install_name: &str) -> DependencySpec {
  match options.application {
    Application::OpenMw => {
      let osg = options
        .builds_osg()
        .then(|| layout.prefix_join(Component::Osg.name()));
      let args = catalog::openmw_cmake_args(options.build_type, osg.as_deref(), options.tools);
      catalog::openmw(layout, reference, install_name, args)
    }
    Application::Tes3mp { server_only } => {
      catalog::tes3mp(layout, reference, install_name, server_only, options.make_install)
    }
  }
}
