//! Recipe execution.

use std::path::Path;

use tracing::{debug, error, info, warn};

use super::types::{BuildStrategy, DependencySpec, Layout, RecipeError, RecipeOutcome};
use crate::env::BuildEnv;
use crate::exec::{Completed, Executor, Invocation};

/// Component allowed to exit nonzero from compile and install.
///
/// The TES3MP build returns nonzero after producing usable binaries. Only this
/// component is exempt; everything else fails the run.
const NONZERO_BUILD_EXEMPT: &str = "tes3mp";

/// Returns true when the component's compile/install exit codes are not fatal.
pub fn tolerates_nonzero_build(spec: &DependencySpec) -> bool {
  spec.name == NONZERO_BUILD_EXEMPT
}

/// The skip invariant: the check-file is a regular file and the component is not forced.
pub fn is_satisfied(spec: &DependencySpec, force: bool) -> bool {
  !force && spec.check_file.is_file()
}

/// Runs recipes against one layout, one at a time.
pub struct Runner<'a, E> {
  executor: &'a E,
  layout: &'a Layout,
  jobs: usize,
}

impl<'a, E: Executor> Runner<'a, E> {
  pub fn new(executor: &'a E, layout: &'a Layout, jobs: usize) -> Self {
    Self { executor, layout, jobs }
  }

  pub fn layout(&self) -> &Layout {
    self.layout
  }

  /// Execute the full lifecycle for `spec`.
  ///
  /// Returns [`RecipeOutcome::Skipped`] without touching the filesystem when the
  /// check-file exists and `force` is false.
  pub async fn run(&self, spec: &DependencySpec, env: &BuildEnv, force: bool) -> Result<RecipeOutcome, RecipeError> {
    let name = spec.name.as_str();

    if is_satisfied(spec, force) {
      info!(component = name, check_file = %spec.check_file.display(), "found, skipping");
      return Ok(RecipeOutcome::Skipped);
    }

    info!(component = name, "building now");

    let src = self.layout.source_dir(spec);
    if !src.exists() {
      self.clone_source(spec, &src).await?;
    }

    if force {
      self.remove_prior_install(spec)?;
    }

    self.reset_source(spec, &src).await?;

    if let Some(patch) = &spec.patch {
      self.apply_patch(spec, &src, patch).await?;
    }

    match &spec.strategy {
      BuildStrategy::CMake { args } => self.build_cmake(spec, &src, args, env).await?,
      BuildStrategy::ConfigureMake { args } => self.build_configure_make(spec, &src, args, env).await?,
      BuildStrategy::None => debug!(component = name, "nothing to build"),
    }

    Ok(RecipeOutcome::Built)
  }

  async fn exec(&self, invocation: Invocation) -> Result<Completed, RecipeError> {
    Ok(self.executor.run(&invocation).await?)
  }

  async fn clone_source(&self, spec: &DependencySpec, src: &Path) -> Result<(), RecipeError> {
    info!(component = %spec.name, url = %spec.url, "source directory not found, cloning");

    let mut clone = Invocation::new("git").arg("clone");
    if let Some(branch) = &spec.clone_branch {
      clone = clone.arg("-b").arg(branch);
    }
    let clone = clone
      .arg(&spec.url)
      .arg(&spec.clone_dest)
      .current_dir(&self.layout.src_root);

    let done = self.exec(clone).await?;
    if !done.success() {
      log_output(&spec.name, &done);
    }

    // git's exit code alone is not trusted; the tree has to be there
    if !src.is_dir() {
      return Err(RecipeError::Clone {
        name: spec.name.clone(),
        url: spec.url.clone(),
      });
    }

    Ok(())
  }

  fn remove_prior_install(&self, spec: &DependencySpec) -> Result<(), RecipeError> {
    let install_dir = self.layout.install_dir(spec);
    if !install_dir.exists() {
      return Ok(());
    }

    info!(component = %spec.name, path = %install_dir.display(), "forcing removal of previous install");
    std::fs::remove_dir_all(&install_dir).map_err(|source| RecipeError::RemoveInstall {
      name: spec.name.clone(),
      path: install_dir,
      source,
    })
  }

  /// Discard local changes and pin the tree to the spec's revision. Best-effort.
  async fn reset_source(&self, spec: &DependencySpec, src: &Path) -> Result<(), RecipeError> {
    info!(component = %spec.name, "executing source clean");

    let steps = [
      Invocation::new("git").args(["checkout", "--", "."]),
      Invocation::new("git").args(["clean", "-df"]),
    ];
    for step in steps {
      self.best_effort(&spec.name, step.current_dir(src)).await?;
    }

    info!(component = %spec.name, rev = %spec.revision, "resetting source to the desired rev");
    let steps = [
      Invocation::new("git").arg("checkout").arg(&spec.revision),
      Invocation::new("git").args(["reset", "--hard"]).arg(&spec.revision),
    ];
    for step in steps {
      self.best_effort(&spec.name, step.current_dir(src)).await?;
    }

    Ok(())
  }

  async fn best_effort(&self, name: &str, invocation: Invocation) -> Result<(), RecipeError> {
    let done = self.exec(invocation.clone()).await?;
    if !done.success() {
      warn!(component = name, cmd = %invocation, code = ?done.code, "step exited nonzero, continuing");
    }
    Ok(())
  }

  async fn apply_patch(&self, spec: &DependencySpec, src: &Path, patch: &Path) -> Result<(), RecipeError> {
    info!(component = %spec.name, patch = %patch.display(), "applying patch");

    let done = self
      .exec(
        Invocation::new("patch")
          .arg("-p1")
          .arg("-i")
          .arg(patch.to_string_lossy())
          .current_dir(src),
      )
      .await?;

    if !done.success() {
      log_output(&spec.name, &done);
      return Err(RecipeError::Patch {
        name: spec.name.clone(),
        patch: patch.to_path_buf(),
      });
    }
    Ok(())
  }

  async fn build_cmake(
    &self,
    spec: &DependencySpec,
    src: &Path,
    args: &[String],
    env: &BuildEnv,
  ) -> Result<(), RecipeError> {
    info!(component = %spec.name, "building with cmake");

    let build_dir = src.join("build");
    let build_dir_err = |source| RecipeError::BuildDir {
      name: spec.name.clone(),
      path: build_dir.clone(),
      source,
    };
    if build_dir.is_dir() {
      debug!(path = %build_dir.display(), "removing stale build directory");
      std::fs::remove_dir_all(&build_dir).map_err(build_dir_err)?;
    }
    std::fs::create_dir_all(&build_dir).map_err(build_dir_err)?;

    info!(component = %spec.name, "running cmake");
    let configure = Invocation::new("cmake")
      .arg(format!("-DCMAKE_INSTALL_PREFIX={}", self.layout.install_dir(spec).display()))
      .args(args.iter().cloned())
      .arg("..")
      .current_dir(&build_dir)
      .envs(env.vars());

    let done = self.exec(configure).await?;
    if !done.success() {
      log_output(&spec.name, &done);
      return Err(RecipeError::Configure {
        name: spec.name.clone(),
        tool: "cmake".to_string(),
        code: done.code,
      });
    }

    self.compile_and_install(spec, &build_dir, env).await
  }

  async fn build_configure_make(
    &self,
    spec: &DependencySpec,
    src: &Path,
    args: &[String],
    env: &BuildEnv,
  ) -> Result<(), RecipeError> {
    info!(component = %spec.name, "building with configure and make");

    self
      .best_effort(&spec.name, Invocation::new("make").arg("clean").current_dir(src).envs(env.vars()))
      .await?;

    let configure = Invocation::new("./configure")
      .arg(format!("--prefix={}", self.layout.install_dir(spec).display()))
      .args(args.iter().cloned())
      .current_dir(src)
      .envs(env.vars());

    let done = self.exec(configure).await?;
    if !done.success() {
      log_output(&spec.name, &done);
      return Err(RecipeError::Configure {
        name: spec.name.clone(),
        tool: "configure".to_string(),
        code: done.code,
      });
    }

    self.compile_and_install(spec, src, env).await
  }

  async fn compile_and_install(&self, spec: &DependencySpec, dir: &Path, env: &BuildEnv) -> Result<(), RecipeError> {
    info!(component = %spec.name, jobs = self.jobs, "running make (this will take a while)");

    let compile = Invocation::new("make")
      .arg(format!("-j{}", self.jobs))
      .current_dir(dir)
      .envs(env.vars());

    let done = self.exec(compile).await?;
    if !done.success() {
      if tolerates_nonzero_build(spec) {
        warn!(component = %spec.name, code = ?done.code, "make exited nonzero, tolerated for this component");
      } else {
        log_output(&spec.name, &done);
        return Err(RecipeError::Compile {
          name: spec.name.clone(),
          code: done.code,
        });
      }
    }

    if !spec.install {
      return Ok(());
    }

    info!(component = %spec.name, "running make install");
    let install = Invocation::new("make").arg("install").current_dir(dir).envs(env.vars());

    let done = self.exec(install).await?;
    if !done.success() {
      if tolerates_nonzero_build(spec) {
        warn!(component = %spec.name, code = ?done.code, "make install exited nonzero, tolerated for this component");
      } else {
        log_output(&spec.name, &done);
        return Err(RecipeError::Install {
          name: spec.name.clone(),
          code: done.code,
        });
      }
    }

    info!(component = %spec.name, "installed successfully");
    Ok(())
  }
}

fn log_output(name: &str, done: &Completed) {
  let detail = done.diagnostic();
  if !detail.is_empty() {
    error!(component = name, "{detail}");
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::util::testutil::FakeExecutor;
  use std::fs;
  use std::path::PathBuf;
  use tempfile::TempDir;
  use tracing_test::traced_test;

  struct Fixture {
    _temp: TempDir,
    layout: Layout,
  }

  impl Fixture {
    fn new() -> Self {
      let temp = TempDir::new().unwrap();
      let prefix = temp.path().join("prefix");
      let src = prefix.join("src");
      fs::create_dir_all(&src).unwrap();
      Self {
        layout: Layout::new(prefix, src),
        _temp: temp,
      }
    }

    fn spec(&self, name: &str) -> DependencySpec {
      let check = self.layout.prefix_join(name).join("lib").join(format!("lib{name}.so"));
      DependencySpec::cmake(name, &format!("https://example.invalid/{name}.git"), "v1", check)
        .with_cmake_args(["-DFOO=on"])
    }

    fn touch(&self, path: &Path) {
      fs::create_dir_all(path.parent().unwrap()).unwrap();
      fs::write(path, "").unwrap();
    }
  }

  /// Recursively lists every path below `root`.
  fn snapshot(root: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
      for entry in fs::read_dir(&dir).unwrap() {
        let path = entry.unwrap().path();
        if path.is_dir() {
          stack.push(path.clone());
        }
        out.push(path);
      }
    }
    out.sort();
    out
  }

  #[tokio::test]
  async fn existing_check_file_skips_without_side_effects() {
    let fx = Fixture::new();
    let spec = fx.spec("bullet");
    fx.touch(&spec.check_file);
    let before = snapshot(&fx.layout.install_prefix);

    let exec = FakeExecutor::new();
    let outcome = Runner::new(&exec, &fx.layout, 4)
      .run(&spec, &BuildEnv::new(), false)
      .await
      .unwrap();

    assert_eq!(outcome, RecipeOutcome::Skipped);
    assert!(exec.calls().is_empty());
    assert_eq!(snapshot(&fx.layout.install_prefix), before);
  }

  #[tokio::test]
  async fn check_file_that_is_a_directory_does_not_skip() {
    let fx = Fixture::new();
    let spec = fx.spec("bullet");
    fs::create_dir_all(&spec.check_file).unwrap();

    let exec = FakeExecutor::new();
    let outcome = Runner::new(&exec, &fx.layout, 4)
      .run(&spec, &BuildEnv::new(), false)
      .await
      .unwrap();

    assert_eq!(outcome, RecipeOutcome::Built);
  }

  #[tokio::test]
  async fn fresh_cmake_build_runs_full_lifecycle_in_order() {
    let fx = Fixture::new();
    let spec = fx.spec("mygui");

    let exec = FakeExecutor::new();
    Runner::new(&exec, &fx.layout, 7)
      .run(&spec, &BuildEnv::new(), false)
      .await
      .unwrap();

    let install_dir = fx.layout.install_prefix.join("mygui");
    assert_eq!(
      exec.command_lines(),
      vec![
        "git clone https://example.invalid/mygui.git mygui".to_string(),
        "git checkout -- .".to_string(),
        "git clean -df".to_string(),
        "git checkout v1".to_string(),
        "git reset --hard v1".to_string(),
        format!("cmake -DCMAKE_INSTALL_PREFIX={} -DFOO=on ..", install_dir.display()),
        "make -j7".to_string(),
        "make install".to_string(),
      ]
    );

    let calls = exec.calls();
    assert_eq!(calls[0].cwd.as_deref(), Some(fx.layout.src_root.as_path()));
    let build_dir = fx.layout.src_root.join("mygui").join("build");
    assert_eq!(calls[5].cwd.as_deref(), Some(build_dir.as_path()));
    assert!(build_dir.is_dir());
  }

  #[tokio::test]
  async fn clone_uses_branch_when_given() {
    let fx = Fixture::new();
    let spec = fx.spec("osg-openmw").with_clone_branch("3.6");

    let exec = FakeExecutor::new();
    Runner::new(&exec, &fx.layout, 2)
      .run(&spec, &BuildEnv::new(), false)
      .await
      .unwrap();

    assert!(exec.ran("git clone -b 3.6 https://example.invalid/osg-openmw.git osg-openmw"));
  }

  #[tokio::test]
  async fn existing_tree_is_not_recloned() {
    let fx = Fixture::new();
    let spec = fx.spec("bullet");
    fs::create_dir_all(fx.layout.source_dir(&spec)).unwrap();

    let exec = FakeExecutor::new();
    Runner::new(&exec, &fx.layout, 2)
      .run(&spec, &BuildEnv::new(), false)
      .await
      .unwrap();

    assert!(!exec.ran("git clone"));
  }

  #[tokio::test]
  async fn missing_tree_after_clone_is_fatal() {
    let fx = Fixture::new();
    let spec = fx.spec("unshield");

    let exec = FakeExecutor::new().without_clone_output();
    let err = Runner::new(&exec, &fx.layout, 2)
      .run(&spec, &BuildEnv::new(), false)
      .await
      .unwrap_err();

    assert!(matches!(err, RecipeError::Clone { .. }));
    assert!(!exec.ran("cmake"));
  }

  #[tokio::test]
  async fn force_removes_prior_install_before_rebuilding() {
    let fx = Fixture::new();
    let spec = fx.spec("bullet");
    fx.touch(&spec.check_file);
    let sentinel = fx.layout.install_dir(&spec).join("sentinel");
    fx.touch(&sentinel);

    let exec = FakeExecutor::new();
    let outcome = Runner::new(&exec, &fx.layout, 2)
      .run(&spec, &BuildEnv::new(), true)
      .await
      .unwrap();

    assert_eq!(outcome, RecipeOutcome::Built);
    assert!(!sentinel.exists());
    assert!(!fx.layout.install_dir(&spec).exists());
    assert!(exec.ran("make install"));
  }

  #[tokio::test]
  async fn stale_build_directory_is_recreated() {
    let fx = Fixture::new();
    let spec = fx.spec("bullet");
    let stale = fx.layout.source_dir(&spec).join("build").join("CMakeCache.txt");
    fx.touch(&stale);

    let exec = FakeExecutor::new();
    Runner::new(&exec, &fx.layout, 2)
      .run(&spec, &BuildEnv::new(), false)
      .await
      .unwrap();

    assert!(!stale.exists());
    assert!(fx.layout.source_dir(&spec).join("build").is_dir());
  }

  #[tokio::test]
  async fn reset_failures_are_tolerated() {
    let fx = Fixture::new();
    let spec = fx.spec("bullet");

    let exec = FakeExecutor::new().fail_on("git clean", 128).fail_on("git reset", 128);
    let outcome = Runner::new(&exec, &fx.layout, 2)
      .run(&spec, &BuildEnv::new(), false)
      .await
      .unwrap();

    assert_eq!(outcome, RecipeOutcome::Built);
  }

  #[tokio::test]
  async fn patch_is_applied_after_reset() {
    let fx = Fixture::new();
    let patch = fx.layout.install_prefix.join("fix.patch");
    fx.touch(&patch);
    let spec = fx.spec("openmw").with_patch(Some(patch.clone()));

    let exec = FakeExecutor::new();
    Runner::new(&exec, &fx.layout, 2)
      .run(&spec, &BuildEnv::new(), false)
      .await
      .unwrap();

    let lines = exec.command_lines();
    let reset = lines.iter().position(|l| l.starts_with("git reset")).unwrap();
    let patched = lines
      .iter()
      .position(|l| *l == format!("patch -p1 -i {}", patch.display()))
      .unwrap();
    let cmake = lines.iter().position(|l| l.starts_with("cmake")).unwrap();
    assert!(reset < patched && patched < cmake);
  }

  #[tokio::test]
  async fn failed_patch_is_fatal() {
    let fx = Fixture::new();
    let spec = fx.spec("openmw").with_patch(Some(PathBuf::from("/tmp/bad.patch")));

    let exec = FakeExecutor::new().fail_on("patch -p1", 1);
    let err = Runner::new(&exec, &fx.layout, 2)
      .run(&spec, &BuildEnv::new(), false)
      .await
      .unwrap_err();

    assert!(matches!(err, RecipeError::Patch { .. }));
    assert!(!exec.ran("cmake"));
  }

  #[tokio::test]
  async fn failed_configure_is_fatal() {
    let fx = Fixture::new();
    let spec = fx.spec("mygui");

    let exec = FakeExecutor::new().fail_on("cmake", 1);
    let err = Runner::new(&exec, &fx.layout, 2)
      .run(&spec, &BuildEnv::new(), false)
      .await
      .unwrap_err();

    assert!(matches!(err, RecipeError::Configure { code: Some(1), .. }));
    assert!(!exec.ran("make -j"));
  }

  #[tokio::test]
  async fn failed_compile_is_fatal() {
    let fx = Fixture::new();
    let spec = fx.spec("mygui");

    let exec = FakeExecutor::new().fail_on("make -j", 2);
    let err = Runner::new(&exec, &fx.layout, 2)
      .run(&spec, &BuildEnv::new(), false)
      .await
      .unwrap_err();

    assert!(matches!(err, RecipeError::Compile { code: Some(2), .. }));
    assert!(!exec.ran("make install"));
  }

  #[tokio::test]
  async fn failed_install_is_fatal() {
    let fx = Fixture::new();
    let spec = fx.spec("mygui");

    let exec = FakeExecutor::new().fail_on("make install", 2);
    let err = Runner::new(&exec, &fx.layout, 2)
      .run(&spec, &BuildEnv::new(), false)
      .await
      .unwrap_err();

    assert!(matches!(err, RecipeError::Install { .. }));
  }

  #[tokio::test]
  #[traced_test]
  async fn tes3mp_tolerates_nonzero_compile_and_install() {
    let fx = Fixture::new();
    let spec = fx.spec("tes3mp");
    assert!(tolerates_nonzero_build(&spec));

    let exec = FakeExecutor::new().fail_on("make -j", 2).fail_on("make install", 2);
    let outcome = Runner::new(&exec, &fx.layout, 2)
      .run(&spec, &BuildEnv::new(), false)
      .await
      .unwrap();

    assert_eq!(outcome, RecipeOutcome::Built);
    assert!(exec.ran("make install"));
    assert!(logs_contain("make exited nonzero, tolerated for this component"));
  }

  #[tokio::test]
  async fn tes3mp_configure_failure_is_still_fatal() {
    let fx = Fixture::new();
    let spec = fx.spec("tes3mp");

    let exec = FakeExecutor::new().fail_on("cmake", 1);
    let err = Runner::new(&exec, &fx.layout, 2)
      .run(&spec, &BuildEnv::new(), false)
      .await
      .unwrap_err();

    assert!(matches!(err, RecipeError::Configure { .. }));
  }

  #[tokio::test]
  async fn install_step_is_skipped_when_disabled() {
    let fx = Fixture::new();
    let spec = fx.spec("raknet").with_install(false);

    let exec = FakeExecutor::new();
    Runner::new(&exec, &fx.layout, 2)
      .run(&spec, &BuildEnv::new(), false)
      .await
      .unwrap();

    assert!(exec.ran("make -j2"));
    assert!(!exec.ran("make install"));
  }

  #[tokio::test]
  async fn build_env_is_passed_to_build_steps() {
    let fx = Fixture::new();
    let spec = fx.spec("openmw");
    let env = BuildEnv::new().with_ldflags("-lz -lbz2");

    let exec = FakeExecutor::new();
    Runner::new(&exec, &fx.layout, 2).run(&spec, &env, false).await.unwrap();

    let cmake = exec.calls().into_iter().find(|c| c.program == "cmake").unwrap();
    assert_eq!(cmake.env.get("LDFLAGS").map(String::as_str), Some("-lz -lbz2"));
    let git = exec.calls().into_iter().find(|c| c.program == "git").unwrap();
    assert!(git.env.is_empty());
  }

  #[tokio::test]
  async fn configure_make_strategy_tolerates_failed_clean() {
    let fx = Fixture::new();
    let spec = fx
      .spec("unshield")
      .with_strategy(BuildStrategy::ConfigureMake {
        args: vec!["--disable-static".to_string()],
      });

    let exec = FakeExecutor::new().fail_on("make clean", 2);
    Runner::new(&exec, &fx.layout, 3)
      .run(&spec, &BuildEnv::new(), false)
      .await
      .unwrap();

    let src = fx.layout.source_dir(&spec);
    let configure = exec.calls().into_iter().find(|c| c.program == "./configure").unwrap();
    assert_eq!(configure.cwd.as_deref(), Some(src.as_path()));
    assert_eq!(
      configure.args,
      vec![
        format!("--prefix={}", fx.layout.install_dir(&spec).display()),
        "--disable-static".to_string()
      ]
    );
    assert!(exec.ran("make -j3"));
    assert!(exec.ran("make install"));
    assert!(!src.join("build").exists());
  }

  #[tokio::test]
  async fn configure_make_strategy_fails_on_configure() {
    let fx = Fixture::new();
    let spec = fx.spec("unshield").with_strategy(BuildStrategy::ConfigureMake { args: vec![] });

    let exec = FakeExecutor::new().fail_on("./configure", 1);
    let err = Runner::new(&exec, &fx.layout, 3)
      .run(&spec, &BuildEnv::new(), false)
      .await
      .unwrap_err();

    assert!(matches!(err, RecipeError::Configure { ref tool, .. } if tool == "configure"));
  }

  #[tokio::test]
  async fn source_only_strategy_stops_after_reset() {
    let fx = Fixture::new();
    let spec = fx.spec("scripts").with_strategy(BuildStrategy::None);

    let exec = FakeExecutor::new();
    Runner::new(&exec, &fx.layout, 3)
      .run(&spec, &BuildEnv::new(), false)
      .await
      .unwrap();

    assert!(exec.ran("git reset --hard v1"));
    assert!(!exec.ran("make -j"));
    assert!(!exec.ran("cmake"));
  }
}
