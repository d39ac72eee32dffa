use std::fs;

use tempfile::TempDir;

use omwbuild_lib::env::BuildEnv;
use omwbuild_lib::exec::SystemExecutor;
use omwbuild_lib::recipe::{BuildStrategy, DependencySpec, Layout, RecipeError, RecipeOutcome, Runner};
use omwbuild_lib::revision::read_short_hash;

use super::common::{git, upstream};

fn source_only(name: &str, url: &str, revision: &str, layout: &Layout) -> DependencySpec {
  DependencySpec::cmake(name, url, revision, layout.prefix_join(name).join("done"))
    .with_strategy(BuildStrategy::None)
}

#[tokio::test]
async fn clones_and_pins_a_missing_tree() {
  let temp = TempDir::new().unwrap();
  let up_dir = temp.path().join("upstream");
  let up = upstream(&up_dir);
  let layout = Layout::new(temp.path().join("prefix"), temp.path().join("prefix/src"));
  fs::create_dir_all(&layout.src_root).unwrap();
  let spec = source_only("unshield", up_dir.to_str().unwrap(), "v1", &layout);

  let exec = SystemExecutor::default();
  let outcome = Runner::new(&exec, &layout, 1)
    .run(&spec, &BuildEnv::new(), false)
    .await
    .unwrap();

  let tree = layout.source_dir(&spec);
  assert_eq!(outcome, RecipeOutcome::Built);
  assert_eq!(fs::read_to_string(tree.join("VERSION")).unwrap(), "1\n");
  assert!(up.first.starts_with(read_short_hash(&tree).unwrap().as_str()));
}

#[tokio::test]
async fn reset_removes_untracked_files() {
  let temp = TempDir::new().unwrap();
  let up_dir = temp.path().join("upstream");
  upstream(&up_dir);
  let layout = Layout::new(temp.path().join("prefix"), temp.path().join("prefix/src"));
  fs::create_dir_all(&layout.src_root).unwrap();
  git(&layout.src_root, &["clone", "-q", up_dir.to_str().unwrap(), "mygui"]);
  let tree = layout.src_root.join("mygui");
  fs::write(tree.join("stray.o"), "").unwrap();
  fs::write(tree.join("VERSION"), "dirty\n").unwrap();

  let spec = source_only("mygui", up_dir.to_str().unwrap(), "origin/master", &layout);
  let exec = SystemExecutor::default();
  Runner::new(&exec, &layout, 1)
    .run(&spec, &BuildEnv::new(), false)
    .await
    .unwrap();

  assert!(!tree.join("stray.o").exists());
  assert_eq!(fs::read_to_string(tree.join("VERSION")).unwrap(), "2\n");
}

#[tokio::test]
async fn unreachable_url_is_a_clone_error() {
  let temp = TempDir::new().unwrap();
  let layout = Layout::new(temp.path().join("prefix"), temp.path().join("prefix/src"));
  fs::create_dir_all(&layout.src_root).unwrap();
  let missing = temp.path().join("no-such-upstream");
  let spec = source_only("bullet", missing.to_str().unwrap(), "3.06", &layout);

  let exec = SystemExecutor::default();
  let err = Runner::new(&exec, &layout, 1)
    .run(&spec, &BuildEnv::new(), false)
    .await
    .unwrap_err();

  assert!(matches!(err, RecipeError::Clone { ref name, .. } if name == "bullet"));
}
