//! Indexed view of one side of the rebase.
//!
//! A [`BranchRange`] walks `start..end` once and indexes every commit by id,
//! by title and by patch id. It also remembers which commits were introduced
//! by the rebase under review (the rebased subset), as opposed to commits of
//! the new upstream that the walk crosses when a merge base is supplied.

use std::collections::{HashMap, HashSet};

use grr_git::{Commit, Oid, Repository};
use tracing::debug;

use crate::cache::CachePolicy;
use crate::error::Result;
use crate::patch_id::resolve_patch_ids;
use crate::traits::PatchIdCache;

/// Commits of a `start..end` range with lookup indices.
///
/// Immutable once built; rebuilding means constructing a new instance.
#[derive(Debug, Clone)]
pub struct BranchRange {
    start: String,
    start_id: Oid,
    end: String,
    end_id: Oid,
    merge_base: Option<Oid>,
    /// Walked commits, most ancestral first.
    commits: Vec<Commit>,
    by_id: HashMap<Oid, usize>,
    by_title: HashMap<String, usize>,
    by_patch_id: HashMap<Oid, usize>,
    patch_id_by_commit: HashMap<Oid, Oid>,
    rebased: HashSet<Oid>,
}

impl BranchRange {
    /// Walk and index the range `start..end`.
    ///
    /// When `merge_base` is given and `start` is not one of its ancestors, the
    /// walk starts from the merge base instead, and only the commits after
    /// `start` form the rebased subset.
    ///
    /// # Errors
    /// Returns error if a revision does not resolve or the walk fails.
    pub fn build(
        repo: &Repository,
        start: &str,
        end: &str,
        policy: CachePolicy,
        cache: &dyn PatchIdCache,
        merge_base: Option<Oid>,
    ) -> Result<Self> {
        let start_id = repo.resolve(start)?;
        let end_id = repo.resolve(end)?;

        let merge_base = match merge_base {
            Some(base) if !repo.is_ancestor(start_id, base)? => Some(base),
            _ => None,
        };
        let effective_start = merge_base.unwrap_or(start_id);

        let commits = repo
            .range_log(effective_start, end_id)?
            .into_iter()
            .map(|oid| repo.commit(oid))
            .collect::<grr_git::Result<Vec<_>>>()?;

        let rebased: HashSet<Oid> = if merge_base.is_some() {
            repo.range_log(start_id, end_id)?.into_iter().collect()
        } else {
            commits.iter().map(|c| c.id).collect()
        };

        // Root commits have no first-parent diff and thus no patch id.
        let with_parent: Vec<Oid> = commits
            .iter()
            .filter(|c| c.first_parent().is_some())
            .map(|c| c.id)
            .collect();
        let patch_ids = resolve_patch_ids(repo, &with_parent, policy, cache)?;

        debug!(
            range = %format!("{start}..{end}"),
            merge_base = ?merge_base,
            commits = commits.len(),
            "indexed branch range"
        );

        Ok(Self::index(
            (start.to_owned(), start_id),
            (end.to_owned(), end_id),
            merge_base,
            commits,
            &rebased,
            patch_ids.by_commit,
        ))
    }

    /// Index already resolved commits.
    ///
    /// `commits` must be in walk order (most ancestral first). Entries of
    /// `rebased` and `patch_ids` that do not belong to `commits` are ignored.
    #[must_use]
    pub fn from_parts(
        commits: Vec<Commit>,
        rebased: &HashSet<Oid>,
        patch_ids: HashMap<Oid, Oid>,
    ) -> Self {
        let start_id = commits
            .first()
            .and_then(Commit::first_parent)
            .unwrap_or_else(Oid::zero);
        let end_id = commits.last().map_or_else(Oid::zero, |c| c.id);
        Self::index(
            (start_id.to_string(), start_id),
            (end_id.to_string(), end_id),
            None,
            commits,
            rebased,
            patch_ids,
        )
    }

    fn index(
        (start, start_id): (String, Oid),
        (end, end_id): (String, Oid),
        merge_base: Option<Oid>,
        commits: Vec<Commit>,
        rebased: &HashSet<Oid>,
        mut patch_ids: HashMap<Oid, Oid>,
    ) -> Self {
        let mut by_id = HashMap::with_capacity(commits.len());
        let mut by_title = HashMap::with_capacity(commits.len());
        let mut by_patch_id = HashMap::with_capacity(commits.len());

        // Later commits overwrite earlier ones on title or patch id collisions.
        for (idx, commit) in commits.iter().enumerate() {
            by_id.insert(commit.id, idx);
            by_title.insert(commit.title.clone(), idx);
            if let Some(patch_id) = patch_ids.get(&commit.id) {
                by_patch_id.insert(*patch_id, idx);
            }
        }
        patch_ids.retain(|commit, _| by_id.contains_key(commit));
        let rebased = rebased
            .iter()
            .filter(|oid| by_id.contains_key(oid))
            .copied()
            .collect();

        Self {
            start,
            start_id,
            end,
            end_id,
            merge_base,
            commits,
            by_id,
            by_title,
            by_patch_id,
            patch_id_by_commit: patch_ids,
            rebased,
        }
    }

    /// Revision expression the range starts from.
    #[must_use]
    pub fn start(&self) -> &str {
        &self.start
    }

    /// Resolved id of [`Self::start`].
    #[must_use]
    pub const fn start_id(&self) -> Oid {
        self.start_id
    }

    /// Revision expression the range ends at.
    #[must_use]
    pub fn end(&self) -> &str {
        &self.end
    }

    /// Resolved id of [`Self::end`].
    #[must_use]
    pub const fn end_id(&self) -> Oid {
        self.end_id
    }

    /// Merge base the walk started from, if one was in effect.
    #[must_use]
    pub const fn merge_base(&self) -> Option<Oid> {
        self.merge_base
    }

    /// Every walked commit, most ancestral first.
    #[must_use]
    pub fn commits(&self) -> &[Commit] {
        &self.commits
    }

    /// Number of walked commits.
    #[must_use]
    pub fn len(&self) -> usize {
        self.commits.len()
    }

    /// Whether the range is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }

    /// Look up a commit by id.
    #[must_use]
    pub fn by_id(&self, oid: Oid) -> Option<&Commit> {
        self.by_id.get(&oid).map(|&idx| &self.commits[idx])
    }

    /// Look up the last commit carrying `title`.
    #[must_use]
    pub fn by_title(&self, title: &str) -> Option<&Commit> {
        self.by_title.get(title).map(|&idx| &self.commits[idx])
    }

    /// Look up the commit that produced `patch_id`.
    #[must_use]
    pub fn by_patch_id(&self, patch_id: Oid) -> Option<&Commit> {
        self.by_patch_id.get(&patch_id).map(|&idx| &self.commits[idx])
    }

    /// Patch id of one of the range's commits. Root commits have none.
    #[must_use]
    pub fn patch_id_of(&self, commit: Oid) -> Option<Oid> {
        self.patch_id_by_commit.get(&commit).copied()
    }

    /// Whether `commit` was introduced by the rebase.
    #[must_use]
    pub fn is_rebased(&self, commit: Oid) -> bool {
        self.rebased.contains(&commit)
    }

    /// Commits introduced by the rebase, most ancestral first.
    pub fn rebased_subset(&self) -> impl Iterator<Item = &Commit> {
        self.commits.iter().filter(|c| self.rebased.contains(&c.id))
    }
}
