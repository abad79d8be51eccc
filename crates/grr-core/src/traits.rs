//! Trait abstractions for the patch id cache.
//!
//! The resolver only talks to [`PatchIdCache`], so the ref-namespace store
//! can be replaced (in-memory for tests, a file store, ...) without
//! touching the resolution logic.

use grr_git::{Oid, Repository};

use crate::Result;

/// Persistent `commit id -> patch id` store.
///
/// Implementations are shared by every patch id worker, so they must be
/// `Sync`. Each worker passes its own repository handle.
#[allow(clippy::missing_errors_doc)]
pub trait PatchIdCache: Sync {
    /// Look up the cached patch id of `commit`. A miss is `Ok(None)`.
    fn read(&self, repo: &Repository, commit: Oid) -> Result<Option<Oid>>;

    /// Persist the patch id of `commit`. Existing entries are never replaced.
    fn write(&self, repo: &Repository, commit: Oid, patch_id: Oid) -> Result<()>;
}
