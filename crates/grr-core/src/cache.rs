//! Patch id cache implementations and cache policy.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use grr_git::{Oid, Repository};
use tracing::debug;

use crate::error::Result;
use crate::traits::PatchIdCache;

/// Which directions of the cache an invocation may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    /// Consult the cache before computing.
    pub read: bool,
    /// Persist freshly computed values.
    pub write: bool,
}

impl CachePolicy {
    /// Read and write the cache.
    pub const ENABLED: Self = Self {
        read: true,
        write: true,
    };

    /// Never touch the cache.
    pub const DISABLED: Self = Self {
        read: false,
        write: false,
    };

    /// Both flags set or both cleared, from a single "use cache" preference.
    #[must_use]
    pub const fn from_preference(use_cache: bool) -> Self {
        if use_cache {
            Self::ENABLED
        } else {
            Self::DISABLED
        }
    }
}

/// Reference holding the cached patch id of `commit`.
///
/// Sharded by the first two pairs of hex digits:
/// `refs/patchids/from_revision/XX/YY/rest`.
#[must_use]
pub fn cached_patch_id_ref(commit: Oid) -> String {
    let hex = commit.to_string();
    format!(
        "refs/patchids/from_revision/{}/{}/{}",
        &hex[..2],
        &hex[2..4],
        &hex[4..]
    )
}

/// Cache stored in the repository's own reference namespace.
///
/// Each entry is a ref pointing at a blob whose content is the raw patch id.
#[derive(Debug, Clone, Copy, Default)]
pub struct RefPatchIdCache;

impl PatchIdCache for RefPatchIdCache {
    fn read(&self, repo: &Repository, commit: Oid) -> Result<Option<Oid>> {
        let name = cached_patch_id_ref(commit);
        let Some(content) = repo.read_ref_blob(&name)? else {
            return Ok(None);
        };

        match Oid::from_bytes(&content) {
            Ok(patch_id) => Ok(Some(patch_id)),
            Err(_) => {
                debug!(%commit, len = content.len(), "ignoring malformed cache entry");
                Ok(None)
            }
        }
    }

    fn write(&self, repo: &Repository, commit: Oid, patch_id: Oid) -> Result<()> {
        repo.write_ref_blob(&cached_patch_id_ref(commit), patch_id.as_bytes())?;
        Ok(())
    }
}

/// Process-local cache, counting how often it is consulted.
#[derive(Debug, Default)]
pub struct MemoryPatchIdCache {
    entries: Mutex<HashMap<Oid, Oid>>,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl MemoryPatchIdCache {
    /// Number of `read` calls so far.
    #[must_use]
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }

    /// Number of `write` calls so far.
    #[must_use]
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }

    /// Number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().map_or(0, |entries| entries.len())
    }

    /// Whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PatchIdCache for MemoryPatchIdCache {
    fn read(&self, _repo: &Repository, commit: Oid) -> Result<Option<Oid>> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        Ok(self
            .entries
            .lock()
            .ok()
            .and_then(|entries| entries.get(&commit).copied()))
    }

    fn write(&self, _repo: &Repository, commit: Oid, patch_id: Oid) -> Result<()> {
        self.writes.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut entries) = self.entries.lock() {
            entries.entry(commit).or_insert(patch_id);
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_support::TestRepo;

    #[test]
    fn test_cached_patch_id_ref_shape() {
        let oid = Oid::from_str("0123456789abcdef0123456789abcdef01234567").unwrap();
        assert_eq!(
            cached_patch_id_ref(oid),
            "refs/patchids/from_revision/01/23/456789abcdef0123456789abcdef01234567"
        );
    }

    #[test]
    fn test_policy_from_preference() {
        assert_eq!(CachePolicy::from_preference(true), CachePolicy::ENABLED);
        assert_eq!(CachePolicy::from_preference(false), CachePolicy::DISABLED);
    }

    #[test]
    fn test_ref_cache_roundtrip() {
        let test = TestRepo::new();
        let commit = test.commit(None, &[("a.txt", "1\n")], "base");
        let patch_id = Oid::from_bytes(&[7; 20]).unwrap();

        let cache = RefPatchIdCache;
        assert_eq!(cache.read(&test.repo, commit).unwrap(), None);
        cache.write(&test.repo, commit, patch_id).unwrap();
        assert_eq!(cache.read(&test.repo, commit).unwrap(), Some(patch_id));

        // Entries are written once and never replaced.
        let other = Oid::from_bytes(&[9; 20]).unwrap();
        cache.write(&test.repo, commit, other).unwrap();
        assert_eq!(cache.read(&test.repo, commit).unwrap(), Some(patch_id));
    }

    #[test]
    fn test_ref_cache_ignores_malformed_entry() {
        let test = TestRepo::new();
        let commit = test.commit(None, &[("a.txt", "1\n")], "base");
        test.repo
            .write_ref_blob(&cached_patch_id_ref(commit), b"short")
            .unwrap();

        assert_eq!(RefPatchIdCache.read(&test.repo, commit).unwrap(), None);
    }

    #[test]
    fn test_memory_cache_counts() {
        let test = TestRepo::new();
        let cache = MemoryPatchIdCache::default();
        let commit = Oid::from_bytes(&[1; 20]).unwrap();
        let patch_id = Oid::from_bytes(&[2; 20]).unwrap();

        assert_eq!(cache.read(&test.repo, commit).unwrap(), None);
        cache.write(&test.repo, commit, patch_id).unwrap();
        assert_eq!(cache.read(&test.repo, commit).unwrap(), Some(patch_id));
        assert_eq!(cache.reads(), 2);
        assert_eq!(cache.writes(), 1);
        assert_eq!(cache.len(), 1);
    }
}
