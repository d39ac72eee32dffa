//! Shared helpers for the git-backed tests.

use std::path::Path;
use std::process::Command;

/// Run `git` in `dir` with a throwaway identity and return trimmed stdout.
pub fn git(dir: &Path, args: &[&str]) -> String {
  let out = Command::new("git")
    .args(["-c", "user.name=build-openmw", "-c", "user.email=build-openmw@localhost"])
    .args(["-c", "init.defaultBranch=master", "-c", "commit.gpgsign=false"])
    .args(args)
    .current_dir(dir)
    .output()
    .unwrap();
  assert!(
    out.status.success(),
    "git {args:?} failed: {}",
    String::from_utf8_lossy(&out.stderr)
  );
  String::from_utf8_lossy(&out.stdout).trim().to_string()
}

/// Commit `content` to `file` and return the full commit id.
pub fn commit_file(repo: &Path, file: &str, content: &str) -> String {
  std::fs::write(repo.join(file), content).unwrap();
  git(repo, &["add", file]);
  git(repo, &["commit", "-q", "-m", &format!("update {file}")]);
  git(repo, &["rev-parse", "HEAD"])
}

/// An upstream repository with two commits, the first tagged `v1`.
pub struct Upstream {
  pub first: String,
  pub second: String,
}

pub fn upstream(dir: &Path) -> Upstream {
  std::fs::create_dir_all(dir).unwrap();
  git(dir, &["init", "-q"]);
  let first = commit_file(dir, "VERSION", "1\n");
  git(dir, &["tag", "v1"]);
  let second = commit_file(dir, "VERSION", "2\n");
  Upstream { first, second }
}
