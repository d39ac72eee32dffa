//! Executor backed by real child processes.

use std::process::Stdio;

use tokio::process::Command;
use tracing::debug;

use super::{Completed, ExecError, Executor, Invocation};

/// Spawns real processes with `tokio::process`.
///
/// Output is captured unless `verbose` is set, in which case the child inherits
/// the terminal and output is streamed live. Captured invocations are always piped.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemExecutor {
  pub verbose: bool,
}

impl SystemExecutor {
  pub fn new(verbose: bool) -> Self {
    Self { verbose }
  }
}

impl Executor for SystemExecutor {
  async fn run(&self, invocation: &Invocation) -> Result<Completed, ExecError> {
    debug!(cmd = %invocation, cwd = ?invocation.cwd, "executing command");

    let mut command = Command::new(&invocation.program);
    command
      .args(&invocation.args)
      .envs(&invocation.env)
      .stdin(Stdio::null())
      // children die with an interrupted run
      .kill_on_drop(true);

    if let Some(cwd) = &invocation.cwd {
      command.current_dir(cwd);
    }

    let spawn_err = |source| ExecError::Spawn {
      program: invocation.program.clone(),
      source,
    };

    if self.verbose && !invocation.capture {
      let status = command
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .await
        .map_err(spawn_err)?;

      return Ok(Completed {
        code: status.code(),
        ..Default::default()
      });
    }

    let output = command
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .output()
      .await
      .map_err(spawn_err)?;

    let completed = Completed {
      code: output.status.code(),
      stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
      stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    };

    if !completed.success() && !completed.stderr.is_empty() {
      debug!(stderr = %completed.stderr, "command stderr");
    }

    Ok(completed)
  }
}
