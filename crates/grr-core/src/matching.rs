//! Pairing of left-hand commits with their right-hand counterparts.

use std::collections::HashSet;

use grr_git::{Commit, Oid};
use serde::Serialize;

use crate::branch_range::BranchRange;
use crate::flags::MatchFlags;
use crate::state::ReviewLedger;

/// One row of the rebase review: a left commit, its right counterpart, or both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitMatch {
    pub left: Option<Commit>,
    pub right: Option<Commit>,
    pub flags: MatchFlags,
}

impl CommitMatch {
    /// Id of the left commit, if any.
    #[must_use]
    pub fn left_id(&self) -> Option<Oid> {
        self.left.as_ref().map(|c| c.id)
    }

    /// Id of the right commit, if any.
    #[must_use]
    pub fn right_id(&self) -> Option<Oid> {
        self.right.as_ref().map(|c| c.id)
    }
}

/// Ordered match records for two ranges.
///
/// Added commits come first in right walk order, followed by every left
/// commit in left walk order.
#[derive(Debug, Clone, Default)]
pub struct CommitMatches {
    records: Vec<CommitMatch>,
}

/// Number of records carrying each flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MatchSummary {
    pub total: usize,
    pub same_commit: usize,
    pub loose_match: usize,
    pub present_in_rebase_onto: usize,
    pub dropped: usize,
    pub added: usize,
    pub reviewed: usize,
}

impl CommitMatches {
    /// Match every commit of `left` against `right`.
    ///
    /// Per left commit, the first rule that finds a right commit wins:
    /// identical id, then identical patch id, then identical title.
    #[must_use]
    pub fn compute(left: &BranchRange, right: &BranchRange) -> Self {
        let mut selected: HashSet<Oid> = HashSet::new();
        let mut left_records = Vec::with_capacity(left.len());

        for left_commit in left.commits() {
            let mut flags = MatchFlags::empty();

            let mut right_commit = right.by_id(left_commit.id);
            if right_commit.is_some() {
                flags |= MatchFlags::SAME_COMMIT;
            } else {
                right_commit = left
                    .patch_id_of(left_commit.id)
                    .and_then(|patch_id| right.by_patch_id(patch_id));
            }

            if right_commit.is_none() {
                right_commit = right.by_title(&left_commit.title);
                if right_commit.is_some() {
                    flags |= MatchFlags::LOOSE_MATCH;
                }
            }

            match right_commit {
                Some(found) => {
                    if !right.is_rebased(found.id) {
                        flags |= MatchFlags::PRESENT_IN_REBASE_ONTO;
                    }
                    selected.insert(found.id);
                }
                None => flags |= MatchFlags::DROPPED,
            }

            left_records.push(CommitMatch {
                left: Some(left_commit.clone()),
                right: right_commit.cloned(),
                flags,
            });
        }

        let mut records: Vec<CommitMatch> = right
            .rebased_subset()
            .filter(|c| !selected.contains(&c.id))
            .map(|c| CommitMatch {
                left: None,
                right: Some(c.clone()),
                flags: MatchFlags::ADDED,
            })
            .collect();
        records.extend(left_records);

        Self { records }
    }

    /// All records in display order.
    #[must_use]
    pub fn records(&self) -> &[CommitMatch] {
        &self.records
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether there are no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Set `REVIEWED` on every pair recorded in the ledger.
    ///
    /// Only the `REVIEWED` flag is touched; matching results are unchanged.
    pub fn apply_reviewed(&mut self, ledger: &ReviewLedger) {
        for record in &mut self.records {
            let reviewed = ledger.is_reviewed(record.left_id(), record.right_id());
            record.flags.set(MatchFlags::REVIEWED, reviewed);
        }
    }

    /// Find a record by 1-based position or by commit id prefix on either side.
    #[must_use]
    pub fn find(&self, target: &str) -> Option<&CommitMatch> {
        if let Ok(position) = target.parse::<usize>() {
            if let Some(record) = position.checked_sub(1).and_then(|i| self.records.get(i)) {
                return Some(record);
            }
        }

        let prefix = target.to_ascii_lowercase();
        if prefix.len() < 4 || !prefix.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let matches_prefix =
            |commit: Option<&Commit>| commit.is_some_and(|c| c.id.to_string().starts_with(&prefix));
        self.records
            .iter()
            .find(|r| matches_prefix(r.left.as_ref()) || matches_prefix(r.right.as_ref()))
    }

    /// Count records per flag.
    #[must_use]
    pub fn summary(&self) -> MatchSummary {
        let count = |flag| self.records.iter().filter(|r| r.flags.contains(flag)).count();
        MatchSummary {
            total: self.records.len(),
            same_commit: count(MatchFlags::SAME_COMMIT),
            loose_match: count(MatchFlags::LOOSE_MATCH),
            present_in_rebase_onto: count(MatchFlags::PRESENT_IN_REBASE_ONTO),
            dropped: count(MatchFlags::DROPPED),
            added: count(MatchFlags::ADDED),
            reviewed: count(MatchFlags::REVIEWED),
        }
    }
}

impl<'a> IntoIterator for &'a CommitMatches {
    type Item = &'a CommitMatch;
    type IntoIter = std::slice::Iter<'a, CommitMatch>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
