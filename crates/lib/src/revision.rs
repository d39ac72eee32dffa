//! The Revision Tracker.
//!
//! Pins a working tree to a git reference and reports the abbreviated commit
//! hash of the result. The hash names install directories (`<app>-<hash>`) and,
//! once a build finishes, [`promote`] renames the fresh directory into that form
//! and repoints the stable `<app>` symlink at it.
//!
//! Checkout and reset go through the `git` CLI; the hash is read with `gix`.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::exec::{ExecError, Executor, Invocation};

/// Abbreviated commit hash of a working tree's HEAD.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ShortHash(pub String);

impl ShortHash {
  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for ShortHash {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

#[derive(Debug, Error)]
pub enum RevisionError {
  #[error("failed to open repository at '{}': {source}", path.display())]
  Open {
    path: PathBuf,
    #[source]
    source: Box<gix::open::Error>,
  },

  #[error("failed to resolve HEAD in '{}': {message}", path.display())]
  ResolveHead { path: PathBuf, message: String },

  #[error("failed to rename '{}' to '{}': {source}", from.display(), to.display())]
  Rename {
    from: PathBuf,
    to: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to update symlink '{}': {source}", path.display())]
  Link {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error(transparent)]
  Exec(#[from] ExecError),
}

/// Resolves working trees to short hashes.
pub struct RevisionTracker<'a, E> {
  executor: &'a E,
}

impl<'a, E: Executor> RevisionTracker<'a, E> {
  pub fn new(executor: &'a E) -> Self {
    Self { executor }
  }

  /// Pin `tree` to `reference` and return the short hash of the result.
  ///
  /// Returns `Ok(None)` when the tree does not exist yet; callers fall back to an
  /// unqualified name. Fetch, checkout, and reset are best-effort: a nonzero exit
  /// is logged and the hash of whatever HEAD ends up at is returned.
  pub async fn resolve(&self, tree: &Path, reference: &str, fetch: bool) -> Result<Option<ShortHash>, RevisionError> {
    if !tree.exists() {
      debug!(tree = %tree.display(), "working tree not found, no revision yet");
      return Ok(None);
    }

    if fetch {
      info!(tree = %tree.display(), "fetching latest sources");
      self.git(tree, ["fetch", "--all"]).await?;
    }

    self.git(tree, ["checkout", reference]).await?;
    self.git(tree, ["reset", "--hard", reference]).await?;

    let hash = read_short_hash(tree)?;
    debug!(tree = %tree.display(), reference, hash = %hash, "resolved revision");
    Ok(Some(hash))
  }

  async fn git<const N: usize>(&self, tree: &Path, args: [&str; N]) -> Result<(), RevisionError> {
    let invocation = Invocation::new("git").args(args).current_dir(tree);
    let done = self.executor.run(&invocation).await?;
    if !done.success() {
      warn!(cmd = %invocation, code = ?done.code, detail = done.diagnostic(), "git exited nonzero");
    }
    Ok(())
  }
}

/// Read the abbreviated hash of HEAD in `tree`.
pub fn read_short_hash(tree: &Path) -> Result<ShortHash, RevisionError> {
  let repo = gix::open(tree).map_err(|e| RevisionError::Open {
    path: tree.to_path_buf(),
    source: Box::new(e),
  })?;

  let head = repo.head_id().map_err(|e| RevisionError::ResolveHead {
    path: tree.to_path_buf(),
    message: e.to_string(),
  })?;

  Ok(ShortHash(head.shorten_or_id().to_string()))
}

/// Directory name for an application build: `<app>-<hash>`, or `<app>` before
/// the source has been cloned.
pub fn install_name(app: &str, hash: Option<&ShortHash>) -> String {
  match hash {
    Some(hash) => versioned_name(app, hash),
    None => app.to_string(),
  }
}

pub fn versioned_name(app: &str, hash: &ShortHash) -> String {
  format!("{app}-{hash}")
}

/// Finalize a build under `install_prefix`.
///
/// If the build went into `install_name` rather than `<app>-<hash>`, that
/// directory is renamed. Then any existing `<app>` symlink is removed and a new
/// one pointing at `<app>-<hash>` (relative) is created. Returns the versioned
/// directory.
pub fn promote(install_prefix: &Path, app: &str, install_name: &str, hash: &ShortHash) -> Result<PathBuf, RevisionError> {
  let versioned = versioned_name(app, hash);
  let target = install_prefix.join(&versioned);

  if install_name != versioned {
    let from = install_prefix.join(install_name);
    if is_real_dir(&from) {
      info!(from = %from.display(), to = %target.display(), "renaming build directory");
      std::fs::rename(&from, &target).map_err(|source| RevisionError::Rename {
        from,
        to: target.clone(),
        source,
      })?;
    }
  }

  let link = install_prefix.join(app);
  let link_err = |source| RevisionError::Link {
    path: link.clone(),
    source,
  };

  if is_symlink(&link) {
    std::fs::remove_file(&link).map_err(link_err)?;
  }

  if !target.exists() {
    warn!(target = %target.display(), "symlink target does not exist");
  }

  symlink_dir(Path::new(&versioned), &link).map_err(link_err)?;
  info!(link = %link.display(), target = %versioned, "updated symlink");

  Ok(target)
}

fn is_symlink(path: &Path) -> bool {
  path
    .symlink_metadata()
    .map(|m| m.file_type().is_symlink())
    .unwrap_or(false)
}

fn is_real_dir(path: &Path) -> bool {
  path.symlink_metadata().map(|m| m.is_dir()).unwrap_or(false)
}

#[cfg(unix)]
fn symlink_dir(target: &Path, link: &Path) -> std::io::Result<()> {
  std::os::unix::fs::symlink(target, link)
}

#[cfg(not(unix))]
fn symlink_dir(_target: &Path, _link: &Path) -> std::io::Result<()> {
  Err(std::io::Error::new(
    std::io::ErrorKind::Unsupported,
    "symlinked installs are only supported on unix",
  ))
}
