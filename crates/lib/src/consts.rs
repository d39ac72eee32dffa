//! Pinned upstream versions, source locations, and default paths.

/// Default install prefix (`/opt/build-openmw`).
pub const DEFAULT_INSTALL_PREFIX: &str = "/opt/build-openmw";

/// Name of the source root below the install prefix.
pub const SRC_SUBDIR: &str = "src";

pub const BULLET_VERSION: &str = "3.06";
pub const MYGUI_VERSION: &str = "3.2.2";
pub const UNSHIELD_VERSION: &str = "1.4.2";
pub const RAKNET_VERSION: &str = "origin/master";

/// Branch of the OpenMW OSG fork. Cloned with `-b` and pinned to its remote tip.
pub const OPENMW_OSG_BRANCH: &str = "3.6";

pub const TES3MP_CORESCRIPTS_VERSION: &str = "0.7.0";

/// TES3MP source revision known to build against the pinned dependencies.
pub const TES3MP_VERSION: &str = "abc4090a0fe1e0cc04cef598a598744d53f3ef6f";

/// Branch built when no revision is selected.
pub const DEFAULT_BRANCH: &str = "master";

pub const OSG_URL: &str = "https://github.com/OpenMW/osg.git";
pub const BULLET_URL: &str = "https://github.com/bulletphysics/bullet3.git";
pub const UNSHIELD_URL: &str = "https://github.com/twogood/unshield.git";
pub const MYGUI_URL: &str = "https://github.com/MyGUI/mygui.git";
pub const RAKNET_URL: &str = "https://github.com/TES3MP/RakNet.git";
pub const OPENMW_URL: &str = "https://github.com/OpenMW/openmw.git";
pub const TES3MP_URL: &str = "https://github.com/TES3MP/openmw-tes3mp.git";
pub const CORESCRIPTS_URL: &str = "https://github.com/TES3MP/CoreScripts.git";

/// Default parallelism handed to `make -j`: one more than the CPU count.
pub fn default_jobs() -> usize {
  std::thread::available_parallelism().map(|p| p.get()).unwrap_or(4) + 1
}
