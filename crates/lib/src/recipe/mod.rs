//! The Recipe Runner.
//!
//! A recipe takes one [`DependencySpec`] through a fixed lifecycle:
//!
//! 1. **Skip** if the check-file exists and the component is not forced
//! 2. **Clone** the source tree if it is missing
//! 3. **Remove** the previous install when forced
//! 4. **Reset** the tree: drop local changes, checkout and hard-reset to the pinned revision
//! 5. **Patch** the tree when a patch file is supplied
//! 6. **Build** with the spec's [`BuildStrategy`], then install
//!
//! Every failure except a reset hiccup is fatal and surfaces as a [`RecipeError`].

mod runner;
mod types;

pub use runner::{Runner, is_satisfied, tolerates_nonzero_build};
pub use types::*;
