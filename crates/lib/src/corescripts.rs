//! TES3MP server CoreScripts installation.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

use crate::consts::{CORESCRIPTS_URL, TES3MP_CORESCRIPTS_VERSION};
use crate::exec::{ExecError, Executor, Invocation};

/// Server configuration shipped with TES3MP, next to the scripts directory.
pub const SERVER_CONFIG: &str = "tes3mp-server-default.cfg";

const DEFAULT_HOME: &str = "home = ./server";

#[derive(Debug, Error)]
pub enum CorescriptsError {
  #[error("could not clone CoreScripts into {}", path.display())]
  Clone { path: PathBuf },

  #[error("failed to prepare {}: {source}", path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error(transparent)]
  Exec(#[from] ExecError),
}

/// `<tes3mp-install>/etc/openmw/server`
pub fn scripts_dir(tes3mp_install: &Path) -> PathBuf {
  tes3mp_install.join("etc/openmw/server")
}

/// Clone CoreScripts next to the TES3MP server config, check out the pinned
/// version, and point the config's `home` at the clone.
///
/// Returns the scripts directory.
pub async fn install<E: Executor>(executor: &E, tes3mp_install: &Path) -> Result<PathBuf, CorescriptsError> {
  let scripts = scripts_dir(tes3mp_install);
  let etc = tes3mp_install.join("etc/openmw");
  std::fs::create_dir_all(&etc).map_err(|source| CorescriptsError::Io {
    path: etc.clone(),
    source,
  })?;

  if !scripts.is_dir() {
    let clone = Invocation::new("git")
      .args(["clone", CORESCRIPTS_URL, "server"])
      .current_dir(&etc);
    let done = executor.run(&clone).await?;
    if !done.success() || !scripts.is_dir() {
      return Err(CorescriptsError::Clone { path: scripts });
    }
  }

  let checkout = Invocation::new("git")
    .args(["checkout", TES3MP_CORESCRIPTS_VERSION])
    .current_dir(&scripts);
  let done = executor.run(&checkout).await?;
  if !done.success() {
    warn!(version = TES3MP_CORESCRIPTS_VERSION, "CoreScripts checkout failed: {}", done.diagnostic());
  }
  info!(path = %scripts.display(), "server core scripts installed");

  let config = etc.join(SERVER_CONFIG);
  if config.is_file() {
    let io_err = |source| CorescriptsError::Io {
      path: config.clone(),
      source,
    };
    let original = std::fs::read_to_string(&config).map_err(io_err)?;
    std::fs::write(&config, rewrite_home(&original, &scripts)).map_err(io_err)?;
  } else {
    warn!(path = %config.display(), "server config not found, 'home' left unset");
  }

  Ok(scripts)
}

/// Replace every line mentioning `home = ./server` with an absolute `home`.
pub fn rewrite_home(config: &str, scripts: &Path) -> String {
  config
    .split_inclusive('\n')
    .map(|line| {
      if line.contains(DEFAULT_HOME) {
        format!("home = {}\n", scripts.display())
      } else {
        line.to_string()
      }
    })
    .collect()
}
