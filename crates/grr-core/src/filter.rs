//! Narrowing the match list down by flag and free-text terms.

use std::collections::BTreeMap;

use grr_git::Commit;

use crate::flags::MatchFlags;
use crate::matching::CommitMatch;

/// Constraint a filter puts on one flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterType {
    #[default]
    NoFilter,
    /// Keep only records carrying the flag.
    With,
    /// Keep only records lacking the flag.
    Without,
}

/// Flag constraints plus search terms, all of which a record must satisfy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchFilter {
    pub flags: BTreeMap<MatchFlags, FilterType>,
    pub terms: Vec<String>,
}

impl MatchFilter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `flag` to be set.
    #[must_use]
    pub fn with(mut self, flag: MatchFlags) -> Self {
        self.flags.insert(flag, FilterType::With);
        self
    }

    /// Require `flag` to be cleared.
    #[must_use]
    pub fn without(mut self, flag: MatchFlags) -> Self {
        self.flags.insert(flag, FilterType::Without);
        self
    }

    /// Add the space-separated terms of `search`.
    #[must_use]
    pub fn search(mut self, search: &str) -> Self {
        self.terms
            .extend(search.split(' ').filter(|t| !t.is_empty()).map(str::to_owned));
        self
    }

    /// Whether the filter constrains nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty() && self.flags.values().all(|f| *f == FilterType::NoFilter)
    }

    /// Check `record` against every constraint.
    #[must_use]
    pub fn accepts(&self, record: &CommitMatch) -> bool {
        let flags_ok = self.flags.iter().all(|(flag, filter)| match filter {
            FilterType::NoFilter => true,
            FilterType::With => record.flags.contains(*flag),
            FilterType::Without => !record.flags.contains(*flag),
        });
        if !flags_ok {
            return false;
        }

        let left = cell_text(record.left.as_ref());
        let right = cell_text(record.right.as_ref());
        self.terms
            .iter()
            .all(|term| left.contains(term.as_str()) || right.contains(term.as_str()))
    }
}

/// Text a commit is displayed as in the match list.
#[must_use]
pub fn cell_text(commit: Option<&Commit>) -> String {
    commit.map_or_else(String::new, |c| format!("{} {}", c.abbrev(), c.title))
}
