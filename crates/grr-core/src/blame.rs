//! Asynchronous, memoized line attribution.
//!
//! Each `(commit, path)` pair is blamed at most once per [`BlameCache`]. The
//! load runs as a spawned task and is stored as a shared future, so every
//! requester of the same file awaits the same `git blame` run.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use futures::FutureExt;
use futures::future::{self, BoxFuture, Shared};
use grr_git::{Commit, Oid, Repository, blame_revision};
use tokio::runtime::Handle;
use tracing::{debug, trace, warn};

use crate::config::BlameConfig;
use crate::error::{Error, Result};

/// Outcome of a blame load. Errors are flattened to text so the result can
/// be cloned for every waiter.
type BlameLoad = Shared<BoxFuture<'static, std::result::Result<Arc<[Commit]>, String>>>;

/// Attribution of every line of one file at one commit.
#[derive(Clone)]
pub struct BlameInfo {
    commit: Oid,
    path: String,
    load: BlameLoad,
}

impl BlameInfo {
    /// Commit that last touched the 0-based `line`, waiting for the load if needed.
    ///
    /// # Errors
    /// Returns `BlameFailed` if the load failed, `BlameLineOutOfRange` if the
    /// file has no such line.
    pub async fn commit_at(&self, line: usize) -> Result<Commit> {
        let lines = self.lines().await?;
        lines
            .get(line)
            .cloned()
            .ok_or_else(|| Error::BlameLineOutOfRange {
                commit: self.commit,
                path: self.path.clone(),
                line,
                len: lines.len(),
            })
    }

    /// Attribution of every line, in file order.
    ///
    /// # Errors
    /// Returns `BlameFailed` if the load failed.
    pub async fn lines(&self) -> Result<Arc<[Commit]>> {
        self.load.clone().await.map_err(|message| Error::BlameFailed {
            commit: self.commit,
            path: self.path.clone(),
            message,
        })
    }

    /// Commit the file was blamed at.
    #[must_use]
    pub const fn commit(&self) -> Oid {
        self.commit
    }

    /// Blamed path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl std::fmt::Debug for BlameInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlameInfo")
            .field("commit", &self.commit)
            .field("path", &self.path)
            .field("loaded", &self.load.peek().is_some())
            .finish()
    }
}

/// Memo of blame loads keyed by `(commit, path)`.
///
/// Loads are spawned on the tokio runtime [`Self::get`] is called from.
#[derive(Debug)]
pub struct BlameCache {
    location: PathBuf,
    yield_every: usize,
    entries: Mutex<HashMap<(Oid, String), BlameInfo>>,
}

impl BlameCache {
    #[must_use]
    pub fn new(repo: &Repository, settings: &BlameConfig) -> Self {
        Self {
            location: repo.location(),
            yield_every: settings.yield_every,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Blame of `path` at `commit`, starting the load on first request.
    ///
    /// The load is spawned on the current tokio runtime. Without one, the
    /// returned entry fails with `BlameFailed` and nothing is memoized.
    pub fn get(&self, commit: Oid, path: &str) -> BlameInfo {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        let key = (commit, path.to_owned());
        if let Some(info) = entries.get(&key) {
            return info.clone();
        }

        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                warn!(%commit, path, "no tokio runtime for blame load");
                return BlameInfo {
                    commit,
                    path: path.to_owned(),
                    load: future::ready(Err(format!("cannot start blame load: {e}")))
                        .boxed()
                        .shared(),
                };
            }
        };

        trace!(%commit, path, "starting blame load");
        let task = handle.spawn(load(
            self.location.clone(),
            commit,
            path.to_owned(),
            self.yield_every,
        ));
        let load = async move {
            match task.await {
                Ok(result) => result,
                Err(e) => Err(format!("blame task failed: {e}")),
            }
        }
        .boxed()
        .shared();

        let info = BlameInfo {
            commit,
            path: path.to_owned(),
            load,
        };
        entries.insert(key, info.clone());
        info
    }

    /// Start loading the blame of every pre-existing file `commit` touches,
    /// as seen from its first parent.
    ///
    /// Root commits have nothing to attribute and are skipped.
    ///
    /// # Errors
    /// Returns error if the commit's diff cannot be computed.
    pub fn preload(&self, repo: &Repository, commit: &Commit) -> Result<()> {
        let Some(parent) = commit.first_parent() else {
            debug!(commit = %commit.id, "root commit, nothing to preload");
            return Ok(());
        };

        for path in repo.touched_paths(commit.id)? {
            self.get(parent, &path);
        }
        Ok(())
    }

    /// Number of loads started so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().map_or(0, |entries| entries.len())
    }

    /// Whether no load was started yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

async fn load(
    location: PathBuf,
    commit: Oid,
    path: String,
    yield_every: usize,
) -> std::result::Result<Arc<[Commit]>, String> {
    let repo = Repository::open(&location).map_err(|e| e.to_string())?;

    let output = tokio::process::Command::from(repo.blame_command(commit, &path))
        .output()
        .await
        .map_err(|e| format!("failed to run git blame: {e}"))?;
    if !output.status.success() {
        return Err(String::from_utf8_lossy(&output.stderr).trim().to_owned());
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let mut resolved: HashMap<String, Commit> = HashMap::new();
    let mut lines = Vec::new();

    for (idx, line) in stdout.lines().enumerate() {
        let revision = blame_revision(line).map_err(|e| e.to_string())?;
        let attributed = match resolved.get(revision) {
            Some(attributed) => attributed.clone(),
            None => {
                let attributed = repo
                    .resolve(revision)
                    .and_then(|oid| repo.commit(oid))
                    .map_err(|e| e.to_string())?;
                resolved.insert(revision.to_owned(), attributed.clone());
                attributed
            }
        };
        lines.push(attributed);

        if yield_every > 0 && (idx + 1) % yield_every == 0 {
            tokio::task::yield_now().await;
        }
    }

    trace!(%commit, path, lines = lines.len(), "blame loaded");
    Ok(lines.into())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_support::TestRepo;

    fn settings(yield_every: usize) -> BlameConfig {
        BlameConfig { yield_every }
    }

    #[tokio::test]
    async fn test_commit_at_attributes_lines() {
        let test = TestRepo::new();
        let first = test.commit(None, &[("f.txt", "one\ntwo\nthree\n")], "first");
        let second = test.commit(Some(first), &[("f.txt", "one\nTWO\nthree\n")], "second");

        let cache = BlameCache::new(&test.repo, &settings(1));
        let info = cache.get(second, "f.txt");

        assert_eq!(info.commit_at(0).await.unwrap().id, first);
        assert_eq!(info.commit_at(1).await.unwrap().id, second);
        assert_eq!(info.commit_at(2).await.unwrap().id, first);
        assert_eq!(info.lines().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_out_of_range_line() {
        let test = TestRepo::new();
        let first = test.commit(None, &[("f.txt", "only\n")], "first");

        let cache = BlameCache::new(&test.repo, &settings(100));
        let err = cache.get(first, "f.txt").commit_at(5).await.unwrap_err();

        assert!(matches!(
            err,
            Error::BlameLineOutOfRange { line: 5, len: 1, .. }
        ));
    }

    #[tokio::test]
    async fn test_missing_file_fails_load() {
        let test = TestRepo::new();
        let first = test.commit(None, &[("f.txt", "only\n")], "first");

        let cache = BlameCache::new(&test.repo, &settings(100));
        let err = cache.get(first, "missing.txt").commit_at(0).await.unwrap_err();

        assert!(matches!(err, Error::BlameFailed { path, .. } if path == "missing.txt"));
    }

    #[tokio::test]
    async fn test_loads_are_memoized() {
        let test = TestRepo::new();
        let first = test.commit(None, &[("f.txt", "a\nb\n")], "first");

        let cache = BlameCache::new(&test.repo, &settings(100));
        let a = cache.get(first, "f.txt");
        let b = cache.get(first, "f.txt");
        assert_eq!(cache.len(), 1);

        let (left, right) = tokio::join!(a.lines(), b.lines());
        assert!(Arc::ptr_eq(&left.unwrap(), &right.unwrap()));
    }

    #[tokio::test]
    async fn test_preload_keys_by_parent_and_old_path() {
        let test = TestRepo::new();
        let base = test.commit(None, &[("a.txt", "a\n"), ("b.txt", "b\n")], "base");
        let change = test.commit(Some(base), &[("a.txt", "A\n"), ("new.txt", "n\n")], "change");
        let commit = test.repo.commit(change).unwrap();

        let cache = BlameCache::new(&test.repo, &settings(100));
        cache.preload(&test.repo, &commit).unwrap();

        // Only the modified file is loaded; the added one has no history.
        assert_eq!(cache.len(), 1);
        let info = cache.get(base, "a.txt");
        assert_eq!(cache.len(), 1);
        assert_eq!(info.commit_at(0).await.unwrap().id, base);
    }

    #[tokio::test]
    async fn test_preload_skips_root_commit() {
        let test = TestRepo::new();
        let root = test.commit(None, &[("a.txt", "a\n")], "root");
        let commit = test.repo.commit(root).unwrap();

        let cache = BlameCache::new(&test.repo, &settings(100));
        cache.preload(&test.repo, &commit).unwrap();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_get_outside_runtime_fails_instead_of_panicking() {
        let test = TestRepo::new();
        let first = test.commit(None, &[("f.txt", "only\n")], "first");

        let cache = BlameCache::new(&test.repo, &settings(100));
        let info = cache.get(first, "f.txt");
        let err = futures::executor::block_on(info.commit_at(0)).unwrap_err();

        assert!(matches!(err, Error::BlameFailed { path, .. } if path == "f.txt"));
        assert!(cache.is_empty());

        let second = test.commit(Some(first), &[("f.txt", "changed\n")], "second");
        let commit = test.repo.commit(second).unwrap();
        assert!(cache.preload(&test.repo, &commit).is_ok());
        assert!(cache.is_empty());
    }
}
