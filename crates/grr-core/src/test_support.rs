//! Temporary repositories for unit tests.
//!
//! Commits are assembled directly with git2 on top of arbitrary parents, which
//! makes it easy to replay "the same change" onto a different base.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use git2::Signature;
use grr_git::{Oid, Repository};
use tempfile::TempDir;

pub struct TestRepo {
    _temp: TempDir,
    pub repo: Repository,
}

impl TestRepo {
    pub fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp dir");
        git2::Repository::init(temp.path()).expect("Failed to init git repo");
        let repo = Repository::open(temp.path()).unwrap();
        Self { _temp: temp, repo }
    }

    /// Commit `files` on top of `parent`'s tree (flat paths only).
    pub fn commit(&self, parent: Option<Oid>, files: &[(&str, &str)], message: &str) -> Oid {
        let inner = self.repo.inner();
        let sig = Signature::now("Test User", "test@example.com").unwrap();
        let parent = parent.map(|p| inner.find_commit(p).unwrap());
        let base_tree = parent.as_ref().map(|p| p.tree().unwrap());
        let mut builder = inner.treebuilder(base_tree.as_ref()).unwrap();
        for (path, content) in files {
            let blob = inner.blob(content.as_bytes()).unwrap();
            builder.insert(path, blob, 0o100_644).unwrap();
        }
        let tree = inner.find_tree(builder.write().unwrap()).unwrap();
        let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();
        inner
            .commit(None, &sig, &sig, message, &tree, &parents)
            .unwrap()
    }

    /// Point `refs/heads/<name>` at `oid`.
    pub fn branch(&self, name: &str, oid: Oid) {
        self.repo
            .inner()
            .reference(&format!("refs/heads/{name}"), oid, true, "test")
            .unwrap();
    }
}
