//! Parallel patch id resolution with a persistent cache.
//!
//! Every commit is resolved independently, so the work is split across a
//! pool of scoped threads. Each worker opens its own repository handle and
//! returns its results; the caller owns the merged map.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::path::Path;
use std::thread;

use grr_git::{Oid, Repository};
use tracing::{debug, warn};

use crate::cache::CachePolicy;
use crate::error::{Error, Result};
use crate::traits::PatchIdCache;

/// Patch ids of a set of commits.
#[derive(Debug, Clone, Default)]
pub struct PatchIds {
    /// Patch id of every requested commit.
    pub by_commit: HashMap<Oid, Oid>,
    /// Commits answered from the cache.
    pub cache_hits: usize,
    /// Commits whose patch id had to be computed.
    pub computed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Cache,
    Computed,
}

/// Resolve the patch id of every commit in `commits`.
///
/// Root commits are a precondition violation: callers must leave them out.
///
/// # Errors
/// Returns `NoParent` for a root commit, or the first git error a worker
/// hit while computing. Cache write failures are logged and ignored.
pub fn resolve_patch_ids(
    repo: &Repository,
    commits: &[Oid],
    policy: CachePolicy,
    cache: &dyn PatchIdCache,
) -> Result<PatchIds> {
    let mut patch_ids = PatchIds::default();
    if commits.is_empty() {
        return Ok(patch_ids);
    }

    let workers = thread::available_parallelism()
        .map_or(1, NonZeroUsize::get)
        .min(commits.len());
    let chunk_size = commits.len().div_ceil(workers);
    let location = repo.location();
    debug!(commits = commits.len(), workers, ?policy, "resolving patch ids");

    let results = thread::scope(|scope| {
        let handles: Vec<_> = commits
            .chunks(chunk_size)
            .map(|chunk| {
                let location = location.as_path();
                scope.spawn(move || resolve_chunk(location, chunk, policy, cache))
            })
            .collect();

        handles
            .into_iter()
            .map(|handle| handle.join().map_err(|_| Error::WorkerPanicked)?)
            .collect::<Result<Vec<_>>>()
    })?;

    for (commit, patch_id, source) in results.into_iter().flatten() {
        match source {
            Source::Cache => patch_ids.cache_hits += 1,
            Source::Computed => patch_ids.computed += 1,
        }
        patch_ids.by_commit.insert(commit, patch_id);
    }

    debug!(
        cache_hits = patch_ids.cache_hits,
        computed = patch_ids.computed,
        "patch ids resolved"
    );
    Ok(patch_ids)
}

fn resolve_chunk(
    location: &Path,
    chunk: &[Oid],
    policy: CachePolicy,
    cache: &dyn PatchIdCache,
) -> Result<Vec<(Oid, Oid, Source)>> {
    let repo = Repository::open(location)?;
    chunk
        .iter()
        .map(|&commit| {
            let (patch_id, source) = resolve_one(&repo, commit, policy, cache)?;
            Ok((commit, patch_id, source))
        })
        .collect()
}

fn resolve_one(
    repo: &Repository,
    commit: Oid,
    policy: CachePolicy,
    cache: &dyn PatchIdCache,
) -> Result<(Oid, Source)> {
    if policy.read {
        match cache.read(repo, commit) {
            Ok(Some(patch_id)) => return Ok((patch_id, Source::Cache)),
            Ok(None) => {}
            Err(e) => warn!(%commit, error = %e, "patch id cache read failed, recomputing"),
        }
    }

    let patch_id = repo.patch_id(commit)?;

    if policy.write {
        if let Err(e) = cache.write(repo, commit, patch_id) {
            warn!(%commit, error = %e, "failed to cache patch id");
        }
    }

    Ok((patch_id, Source::Computed))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cache::{MemoryPatchIdCache, RefPatchIdCache};
    use crate::test_support::TestRepo;

    /// Cache whose writes always fail.
    struct ReadOnlyCache;

    impl PatchIdCache for ReadOnlyCache {
        fn read(&self, _repo: &Repository, _commit: Oid) -> Result<Option<Oid>> {
            Ok(None)
        }

        fn write(&self, _repo: &Repository, _commit: Oid, _patch_id: Oid) -> Result<()> {
            Err(Error::Io(std::io::Error::other("read-only")))
        }
    }

    fn linear_history(test: &TestRepo, count: usize) -> Vec<Oid> {
        let mut parent = test.commit(None, &[("base.txt", "base\n")], "base");
        let mut commits = vec![];
        for i in 0..count {
            let file = format!("f{i}.txt");
            let content = format!("{i}\n");
            parent = test.commit(
                Some(parent),
                &[(file.as_str(), content.as_str())],
                &format!("commit {i}"),
            );
            commits.push(parent);
        }
        commits
    }

    #[test]
    fn test_resolves_every_commit() {
        let test = TestRepo::new();
        let commits = linear_history(&test, 6);

        let patch_ids =
            resolve_patch_ids(&test.repo, &commits, CachePolicy::DISABLED, &RefPatchIdCache)
                .unwrap();

        assert_eq!(patch_ids.by_commit.len(), 6);
        assert_eq!(patch_ids.computed, 6);
        assert_eq!(patch_ids.cache_hits, 0);
        for commit in &commits {
            assert_eq!(
                patch_ids.by_commit[commit],
                test.repo.patch_id(*commit).unwrap()
            );
        }
    }

    #[test]
    fn test_cache_roundtrip_skips_recomputation() {
        let test = TestRepo::new();
        let commits = linear_history(&test, 4);
        let cache = MemoryPatchIdCache::default();

        let first = resolve_patch_ids(&test.repo, &commits, CachePolicy::ENABLED, &cache).unwrap();
        assert_eq!(first.computed, 4);
        assert_eq!(cache.writes(), 4);

        let second =
            resolve_patch_ids(&test.repo, &commits, CachePolicy::ENABLED, &cache).unwrap();
        assert_eq!(second.computed, 0);
        assert_eq!(second.cache_hits, 4);
        assert_eq!(second.by_commit, first.by_commit);
        assert_eq!(cache.writes(), 4);
    }

    #[test]
    fn test_ref_cache_roundtrip() {
        let test = TestRepo::new();
        let commits = linear_history(&test, 3);

        let written =
            resolve_patch_ids(&test.repo, &commits, CachePolicy::ENABLED, &RefPatchIdCache)
                .unwrap();
        let read =
            resolve_patch_ids(&test.repo, &commits, CachePolicy::ENABLED, &RefPatchIdCache)
                .unwrap();

        assert_eq!(read.cache_hits, 3);
        assert_eq!(read.by_commit, written.by_commit);
    }

    #[test]
    fn test_read_disabled_ignores_cache() {
        let test = TestRepo::new();
        let commits = linear_history(&test, 2);
        let cache = MemoryPatchIdCache::default();
        let write_only = CachePolicy {
            read: false,
            write: true,
        };

        resolve_patch_ids(&test.repo, &commits, write_only, &cache).unwrap();
        let again = resolve_patch_ids(&test.repo, &commits, write_only, &cache).unwrap();

        assert_eq!(again.computed, 2);
        assert_eq!(cache.reads(), 0);
    }

    #[test]
    fn test_failed_cache_write_still_returns_value() {
        let test = TestRepo::new();
        let commits = linear_history(&test, 3);

        let patch_ids =
            resolve_patch_ids(&test.repo, &commits, CachePolicy::ENABLED, &ReadOnlyCache).unwrap();
        assert_eq!(patch_ids.by_commit.len(), 3);
    }

    #[test]
    fn test_root_commit_is_fatal() {
        let test = TestRepo::new();
        let root = test.commit(None, &[("a.txt", "1\n")], "root");

        let err = resolve_patch_ids(&test.repo, &[root], CachePolicy::DISABLED, &RefPatchIdCache)
            .unwrap_err();
        assert!(matches!(err, Error::Git(grr_git::Error::NoParent(oid)) if oid == root));
    }

    #[test]
    fn test_empty_input() {
        let test = TestRepo::new();
        let patch_ids =
            resolve_patch_ids(&test.repo, &[], CachePolicy::ENABLED, &RefPatchIdCache).unwrap();
        assert!(patch_ids.by_commit.is_empty());
    }
}
