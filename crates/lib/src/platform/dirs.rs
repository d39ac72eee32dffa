//! Directory creation with a one-shot sudo fallback.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

use super::{current_ids, is_elevated};
use crate::exec::{Executor, Invocation};

#[derive(Debug, Error)]
pub enum DirError {
  #[error("{} exists and is not a directory", path.display())]
  NotADirectory { path: PathBuf },

  #[error("could not create {}: {source}", path.display())]
  Create {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("{} is still unavailable after trying with sudo", path.display())]
  Escalation { path: PathBuf },
}

/// Make sure `path` exists as a directory owned by the current user.
///
/// When it can't be created directly and we are not root, retries exactly
/// once through `sudo mkdir -p` followed by `sudo chown <uid>:<gid>`.
pub async fn ensure_dir<E: Executor>(executor: &E, path: &Path) -> Result<(), DirError> {
  if path.is_dir() {
    return Ok(());
  }
  if path.exists() {
    return Err(DirError::NotADirectory {
      path: path.to_path_buf(),
    });
  }

  let source = match std::fs::create_dir_all(path) {
    Ok(()) => return Ok(()),
    Err(e) => e,
  };

  if is_elevated() || source.kind() != io::ErrorKind::PermissionDenied {
    return Err(DirError::Create {
      path: path.to_path_buf(),
      source,
    });
  }

  info!(path = %path.display(), "creating directory with sudo");
  let ids = current_ids();
  let owner = format!("{}:{}", ids.uid, ids.gid);
  let display = path.display().to_string();
  let steps = [
    Invocation::new("sudo").args(["mkdir", "-p", display.as_str()]),
    Invocation::new("sudo").args(["chown", owner.as_str(), display.as_str()]),
  ];
  for step in &steps {
    match executor.run(step).await {
      Ok(done) if done.success() => {}
      Ok(done) => warn!(cmd = %step, code = ?done.code, "{}", done.diagnostic()),
      Err(e) => warn!(cmd = %step, error = %e, "could not run"),
    }
  }

  if path.is_dir() {
    Ok(())
  } else {
    Err(DirError::Escalation {
      path: path.to_path_buf(),
    })
  }
}
