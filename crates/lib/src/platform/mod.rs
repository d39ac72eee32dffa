//! Host facts and host preparation.

mod dirs;

pub use dirs::{DirError, ensure_dir};

/// Numeric user and group of the running process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ids {
  pub uid: u32,
  pub gid: u32,
}

/// Returns true when running as root.
#[cfg(unix)]
pub fn is_elevated() -> bool {
  rustix::process::geteuid().is_root()
}

#[cfg(not(unix))]
pub fn is_elevated() -> bool {
  false
}

/// The effective uid and gid, used to hand directories created with sudo back to the user.
#[cfg(unix)]
pub fn current_ids() -> Ids {
  Ids {
    uid: rustix::process::geteuid().as_raw(),
    gid: rustix::process::getegid().as_raw(),
  }
}

#[cfg(not(unix))]
pub fn current_ids() -> Ids {
  Ids { uid: 0, gid: 0 }
}
