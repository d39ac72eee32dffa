//! Subordinate process execution.
//!
//! Every external tool the driver touches (git, cmake, make, patch, sudo, the
//! distro package manager) runs through an [`Executor`], one at a time.

mod system;
mod types;

pub use system::SystemExecutor;
pub use types::*;

/// Runs an [`Invocation`] to completion.
#[allow(async_fn_in_trait)]
pub trait Executor {
  async fn run(&self, invocation: &Invocation) -> Result<Completed, ExecError>;
}
