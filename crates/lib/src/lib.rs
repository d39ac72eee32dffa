//! omwbuild-lib: build OpenMW (or TES3MP) and its dependencies from source.
//!
//! The crate is organised around two pieces:
//! - [`recipe`]: the Recipe Runner, which takes one [`recipe::DependencySpec`]
//!   through clone, reset, patch, build, and install
//! - [`revision`]: the Revision Tracker, which pins a working tree to a git
//!   reference and names install directories after the resulting short hash
//!
//! [`driver`] strings them together in a fixed order, after [`distro`] and
//! [`packages`] have prepared the host.

pub mod catalog;
pub mod consts;
pub mod corescripts;
pub mod distro;
pub mod driver;
pub mod env;
pub mod exec;
pub mod packages;
pub mod platform;
pub mod recipe;
pub mod revision;
pub mod util;
