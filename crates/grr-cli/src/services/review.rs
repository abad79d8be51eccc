//! Review service: loads both ranges, matches them and keeps the ledger.
//!
//! Separated from the commands so presentation (table, JSON, diff rows)
//! stays out of the matching and persistence flow.

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use grr_core::{
    BranchRange, CachePolicy, CommitMatch, CommitMatches, MatchFilter, MatchSummary,
    PatchIdCache, ReviewLedger, State,
};
use grr_git::{Commit, Oid, Repository};
use serde::Serialize;
use tracing::debug;

/// Split a `base..tip` range expression.
pub fn parse_range(range: &str) -> Result<(String, String)> {
    let Some((base, tip)) = range.split_once("..") else {
        bail!("invalid range '{range}': expected <base>..<tip>");
    };
    if base.is_empty() || tip.is_empty() || tip.starts_with('.') {
        bail!("invalid range '{range}': expected <base>..<tip>");
    }
    Ok((base.to_owned(), tip.to_owned()))
}

/// Both sides of a rebase and how their commits pair up.
#[derive(Debug)]
pub struct Review {
    pub left: BranchRange,
    pub right: BranchRange,
    pub matches: CommitMatches,
    pub ledger: ReviewLedger,
}

/// Service for matching ranges and recording reviews.
pub struct ReviewService<'a> {
    repo: &'a Repository,
    state: &'a State,
    cache: &'a dyn PatchIdCache,
}

impl<'a> ReviewService<'a> {
    /// Create a new review service.
    pub const fn new(repo: &'a Repository, state: &'a State, cache: &'a dyn PatchIdCache) -> Self {
        Self { repo, state, cache }
    }

    /// Build both ranges and match them.
    ///
    /// The right range is walked from the merge base of both tips so that
    /// commits already picked up by the new upstream can be recognized.
    pub fn load(&self, left: &str, right: &str, policy: CachePolicy) -> Result<Review> {
        let (left_start, left_end) = parse_range(left)?;
        let (right_start, right_end) = parse_range(right)?;

        let left = BranchRange::build(self.repo, &left_start, &left_end, policy, self.cache, None)
            .with_context(|| format!("Failed to load range {left}"))?;

        let right_tip = self.repo.resolve(&right_end)?;
        let merge_base = match self.repo.merge_base(left.end_id(), right_tip) {
            Ok(base) => Some(base),
            Err(e) => {
                debug!(error = %e, "no merge base between the two tips");
                None
            }
        };

        let right = BranchRange::build(
            self.repo,
            &right_start,
            &right_end,
            policy,
            self.cache,
            merge_base,
        )
        .with_context(|| format!("Failed to load range {right}"))?;

        let mut matches = CommitMatches::compute(&left, &right);
        let ledger = self.state.load_ledger()?;
        matches.apply_reviewed(&ledger);

        Ok(Review {
            left,
            right,
            matches,
            ledger,
        })
    }

    /// Mark or unmark a pair as reviewed. Returns false if nothing changed.
    pub fn set_reviewed(&self, record: &CommitMatch, reviewed: bool) -> Result<bool> {
        let mut ledger = self.state.load_ledger()?;
        let changed = if reviewed {
            ledger.mark(record.left_id(), record.right_id())
        } else {
            ledger.unmark(record.left_id(), record.right_id())
        };
        if changed {
            self.state.save_ledger(&ledger)?;
        }
        Ok(changed)
    }
}

/// One side of a record in the JSON report.
#[derive(Debug, Clone, Serialize)]
pub struct CommitInfo {
    pub id: String,
    pub title: String,
}

impl From<&Commit> for CommitInfo {
    fn from(commit: &Commit) -> Self {
        Self {
            id: commit.id.to_string(),
            title: commit.title.clone(),
        }
    }
}

/// One record of the JSON report.
#[derive(Debug, Clone, Serialize)]
pub struct RecordInfo {
    /// 1-based position, usable as a `<target>`.
    pub index: usize,
    pub left: Option<CommitInfo>,
    pub right: Option<CommitInfo>,
    pub flags: Vec<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewed_at: Option<DateTime<Utc>>,
}

/// Machine-readable match report.
#[derive(Debug, Clone, Serialize)]
pub struct MatchReport {
    pub left_range: String,
    pub right_range: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merge_base: Option<String>,
    pub summary: MatchSummary,
    pub records: Vec<RecordInfo>,
}

impl MatchReport {
    /// Report the records `filter` accepts. Summary counts cover every record.
    pub fn new(review: &Review, filter: &MatchFilter) -> Self {
        let records = indexed(&review.matches, filter)
            .map(|(index, record)| RecordInfo {
                index,
                left: record.left.as_ref().map(CommitInfo::from),
                right: record.right.as_ref().map(CommitInfo::from),
                flags: record.flags.names(),
                reviewed_at: reviewed_at(&review.ledger, record.left_id(), record.right_id()),
            })
            .collect();

        Self {
            left_range: format!("{}..{}", review.left.start(), review.left.end()),
            right_range: format!("{}..{}", review.right.start(), review.right.end()),
            merge_base: review.right.merge_base().map(|oid| oid.to_string()),
            summary: review.matches.summary(),
            records,
        }
    }
}

/// Records accepted by `filter`, with their 1-based position in the full list.
pub fn indexed<'m>(
    matches: &'m CommitMatches,
    filter: &'m MatchFilter,
) -> impl Iterator<Item = (usize, &'m CommitMatch)> {
    matches
        .into_iter()
        .enumerate()
        .map(|(idx, record)| (idx + 1, record))
        .filter(move |(_, record)| filter.accepts(record))
}

fn reviewed_at(ledger: &ReviewLedger, left: Option<Oid>, right: Option<Oid>) -> Option<DateTime<Utc>> {
    ledger
        .reviewed
        .get(&ReviewLedger::key(left, right))
        .map(|entry| entry.reviewed_at)
}
