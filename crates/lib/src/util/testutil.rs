//! Test utilities for omwbuild-lib.
//!
//! Provides a shell helper for tests that spawn real processes, and
//! [`FakeExecutor`], a recording stand-in for the tools a build would run.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::exec::{Completed, ExecError, Executor, Invocation};

/// Returns the shell command and args to execute a shell script.
pub fn shell_cmd(script: &str) -> (&'static str, Vec<String>) {
  ("/bin/sh", vec!["-c".to_string(), script.to_string()])
}

/// Run `git` in `dir` with a throwaway identity, panicking on failure.
pub fn git(dir: &Path, args: &[&str]) -> String {
  let out = Command::new("git")
    .args(["-c", "user.name=build-openmw", "-c", "user.email=build-openmw@localhost"])
    .args(["-c", "init.defaultBranch=master", "-c", "commit.gpgsign=false"])
    .args(args)
    .current_dir(dir)
    .output()
    .expect("git should run");
  assert!(out.status.success(), "git {args:?} failed: {}", String::from_utf8_lossy(&out.stderr));
  String::from_utf8_lossy(&out.stdout).trim().to_string()
}

/// Create a git repository at `dir` with a single commit.
pub fn init_git_repo(dir: &Path) {
  std::fs::create_dir_all(dir).unwrap();
  git(dir, &["init", "-q"]);
  std::fs::write(dir.join("CMakeLists.txt"), "project(fixture)\n").unwrap();
  git(dir, &["add", "."]);
  git(dir, &["commit", "-q", "-m", "initial"]);
}

/// Records every invocation and answers with scripted results.
///
/// - `git clone ... <dest>` creates `<cwd>/<dest>` unless `clone_creates_dir` is off
/// - a rule added with [`FakeExecutor::fail_on`] makes matching command lines exit nonzero
/// - a rule added with [`FakeExecutor::stdout_for`] sets stdout for matching command lines
pub struct FakeExecutor {
  calls: RefCell<Vec<Invocation>>,
  failures: Vec<(String, i32)>,
  outputs: Vec<(String, String)>,
  clone_creates_dir: bool,
}

impl Default for FakeExecutor {
  fn default() -> Self {
    Self::new()
  }
}

impl FakeExecutor {
  pub fn new() -> Self {
    Self {
      calls: RefCell::new(Vec::new()),
      failures: Vec::new(),
      outputs: Vec::new(),
      clone_creates_dir: true,
    }
  }

  /// Command lines containing `needle` exit with `code`.
  pub fn fail_on(mut self, needle: &str, code: i32) -> Self {
    self.failures.push((needle.to_string(), code));
    self
  }

  /// Command lines containing `needle` print `stdout`.
  pub fn stdout_for(mut self, needle: &str, stdout: &str) -> Self {
    self.outputs.push((needle.to_string(), stdout.to_string()));
    self
  }

  /// `git clone` succeeds without producing the destination directory.
  pub fn without_clone_output(mut self) -> Self {
    self.clone_creates_dir = false;
    self
  }

  pub fn calls(&self) -> Vec<Invocation> {
    self.calls.borrow().clone()
  }

  pub fn command_lines(&self) -> Vec<String> {
    self.calls.borrow().iter().map(Invocation::command_line).collect()
  }

  /// True if any recorded command line contains `needle`.
  pub fn ran(&self, needle: &str) -> bool {
    self.command_lines().iter().any(|line| line.contains(needle))
  }
}

impl Executor for FakeExecutor {
  async fn run(&self, invocation: &Invocation) -> Result<Completed, ExecError> {
    self.calls.borrow_mut().push(invocation.clone());
    let line = invocation.command_line();

    if let Some((_, code)) = self.failures.iter().find(|(needle, _)| line.contains(needle.as_str())) {
      return Ok(Completed {
        code: Some(*code),
        stdout: String::new(),
        stderr: format!("scripted failure: {line}"),
      });
    }

    let is_clone = invocation.program == "git" && invocation.args.first().map(String::as_str) == Some("clone");
    if is_clone && self.clone_creates_dir {
      if let Some(dest) = invocation.args.last() {
        let base = invocation.cwd.clone().unwrap_or_else(|| PathBuf::from("."));
        std::fs::create_dir_all(base.join(dest))?;
      }
    }

    let stdout = self
      .outputs
      .iter()
      .find(|(needle, _)| line.contains(needle.as_str()))
      .map(|(_, out)| out.clone())
      .unwrap_or_default();

    Ok(Completed {
      code: Some(0),
      stdout,
      stderr: String::new(),
    })
  }
}
