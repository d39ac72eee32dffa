use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use omwbuild_lib::exec::SystemExecutor;
use omwbuild_lib::revision::{RevisionTracker, install_name, promote, read_short_hash};

use super::common::{git, upstream};

fn clone(upstream: &Path, dest: &Path) {
  let parent = dest.parent().unwrap();
  fs::create_dir_all(parent).unwrap();
  git(
    parent,
    &["clone", "-q", upstream.to_str().unwrap(), dest.file_name().unwrap().to_str().unwrap()],
  );
}

#[tokio::test]
async fn resolving_twice_without_fetch_is_stable() {
  let temp = TempDir::new().unwrap();
  let up = upstream(&temp.path().join("upstream"));
  let tree = temp.path().join("src/openmw");
  clone(&temp.path().join("upstream"), &tree);

  let exec = SystemExecutor::default();
  let tracker = RevisionTracker::new(&exec);
  let first = tracker.resolve(&tree, "origin/master", false).await.unwrap().unwrap();
  let second = tracker.resolve(&tree, "origin/master", false).await.unwrap().unwrap();

  assert_eq!(first, second);
  assert!(up.second.starts_with(first.as_str()));
}

#[tokio::test]
async fn resolve_pins_tree_to_tag() {
  let temp = TempDir::new().unwrap();
  let up = upstream(&temp.path().join("upstream"));
  let tree = temp.path().join("src/openmw");
  clone(&temp.path().join("upstream"), &tree);

  let exec = SystemExecutor::default();
  let hash = RevisionTracker::new(&exec)
    .resolve(&tree, "v1", true)
    .await
    .unwrap()
    .unwrap();

  assert!(up.first.starts_with(hash.as_str()));
  assert_eq!(fs::read_to_string(tree.join("VERSION")).unwrap(), "1\n");
}

#[tokio::test]
async fn resolve_discards_local_edits() {
  let temp = TempDir::new().unwrap();
  upstream(&temp.path().join("upstream"));
  let tree = temp.path().join("src/openmw");
  clone(&temp.path().join("upstream"), &tree);
  fs::write(tree.join("VERSION"), "local edit\n").unwrap();

  let exec = SystemExecutor::default();
  RevisionTracker::new(&exec)
    .resolve(&tree, "origin/master", false)
    .await
    .unwrap();

  assert_eq!(fs::read_to_string(tree.join("VERSION")).unwrap(), "2\n");
}

#[tokio::test]
async fn symlink_points_at_tracker_hash() {
  let temp = TempDir::new().unwrap();
  upstream(&temp.path().join("upstream"));
  let prefix = temp.path().join("prefix");
  let tree = prefix.join("src/openmw");
  clone(&temp.path().join("upstream"), &tree);

  let exec = SystemExecutor::default();
  let tracker = RevisionTracker::new(&exec);

  // first build went to the unqualified name
  fs::create_dir_all(prefix.join("openmw/bin")).unwrap();
  let hash = tracker.resolve(&tree, "origin/master", false).await.unwrap().unwrap();
  let target = promote(&prefix, "openmw", &install_name("openmw", None), &hash).unwrap();

  assert_eq!(hash, read_short_hash(&tree).unwrap());
  assert_eq!(target, prefix.join(format!("openmw-{hash}")));
  assert_eq!(
    fs::read_link(prefix.join("openmw")).unwrap(),
    PathBuf::from(format!("openmw-{hash}"))
  );
  assert!(prefix.join("openmw/bin").is_dir());
}
