//! Build environment handed to child build processes.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const CMAKE_PREFIX_PATH: &str = "CMAKE_PREFIX_PATH";
pub const LDFLAGS: &str = "LDFLAGS";

/// Environment overrides for one recipe invocation.
///
/// Children inherit the parent environment; these entries are layered on top.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildEnv {
  vars: BTreeMap<String, String>,
}

impl BuildEnv {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
    self.vars.insert(key.into(), value.into());
  }

  pub fn get(&self, key: &str) -> Option<&str> {
    self.vars.get(key).map(String::as_str)
  }

  pub fn vars(&self) -> &BTreeMap<String, String> {
    &self.vars
  }

  /// Sets `CMAKE_PREFIX_PATH` to the `:`-joined list of prefixes.
  ///
  /// Leaves the variable unset when the list is empty.
  pub fn with_prefix_path<I, P>(mut self, prefixes: I) -> Self
  where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
  {
    let joined = join_paths(prefixes);
    if !joined.is_empty() {
      self.set(CMAKE_PREFIX_PATH, joined);
    }
    self
  }

  pub fn with_ldflags(mut self, flags: &str) -> Self {
    self.set(LDFLAGS, flags);
    self
  }
}

fn join_paths<I, P>(paths: I) -> String
where
  I: IntoIterator<Item = P>,
  P: AsRef<Path>,
{
  paths
    .into_iter()
    .map(|p| p.as_ref().to_string_lossy().into_owned())
    .collect::<Vec<_>>()
    .join(":")
}

/// Install prefixes of the dependencies built this run, in build order.
#[derive(Debug, Clone, Default)]
pub struct PrefixPath(Vec<PathBuf>);

impl PrefixPath {
  pub fn push(&mut self, prefix: impl Into<PathBuf>) {
    self.0.push(prefix.into());
  }

  pub fn paths(&self) -> &[PathBuf] {
    &self.0
  }
}
