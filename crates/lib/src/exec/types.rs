//! Types for subordinate process execution.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors that prevent a process from producing an exit status at all.
///
/// A process that runs and exits nonzero is not an error at this layer; see
/// [`Completed::success`].
#[derive(Debug, Error)]
pub enum ExecError {
  /// The program could not be started (missing binary, bad cwd, ...).
  #[error("failed to run '{program}': {source}")]
  Spawn {
    program: String,
    #[source]
    source: std::io::Error,
  },

  /// I/O error while waiting on the process.
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

/// One program invocation: argv, working directory, and environment overrides.
///
/// The child inherits the parent's environment; `env` entries are layered on top.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invocation {
  pub program: String,
  pub args: Vec<String>,
  pub cwd: Option<PathBuf>,
  pub env: BTreeMap<String, String>,
  /// Output is read by the caller and must be captured even when streaming.
  pub capture: bool,
}

impl Invocation {
  pub fn new(program: impl Into<String>) -> Self {
    Self {
      program: program.into(),
      ..Default::default()
    }
  }

  pub fn arg(mut self, arg: impl Into<String>) -> Self {
    self.args.push(arg.into());
    self
  }

  pub fn args<I, S>(mut self, args: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.args.extend(args.into_iter().map(Into::into));
    self
  }

  pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
    self.cwd = Some(dir.as_ref().to_path_buf());
    self
  }

  pub fn envs(mut self, env: &BTreeMap<String, String>) -> Self {
    self.env.extend(env.iter().map(|(k, v)| (k.clone(), v.clone())));
    self
  }

  pub fn captured(mut self) -> Self {
    self.capture = true;
    self
  }

  /// Space-joined argv, used for logging and diagnostics.
  pub fn command_line(&self) -> String {
    std::iter::once(self.program.as_str())
      .chain(self.args.iter().map(String::as_str))
      .collect::<Vec<_>>()
      .join(" ")
  }
}

impl fmt::Display for Invocation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.command_line())
  }
}

/// Exit status and captured output of a finished process.
///
/// In verbose mode output is streamed to the terminal and both buffers are empty,
/// unless the invocation asked for [`Invocation::captured`] output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completed {
  /// Exit code, `None` when the process was killed by a signal.
  pub code: Option<i32>,
  pub stdout: String,
  pub stderr: String,
}

impl Completed {
  pub fn success(&self) -> bool {
    self.code == Some(0)
  }

  /// Captured stderr, falling back to stdout when stderr is empty.
  pub fn diagnostic(&self) -> &str {
    if self.stderr.trim().is_empty() {
      self.stdout.trim()
    } else {
      self.stderr.trim()
    }
  }
}
