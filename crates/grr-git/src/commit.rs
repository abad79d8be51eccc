//! Owned commit snapshot.

use git2::Oid;

/// Immutable snapshot of the commit fields the review engine needs.
///
/// Unlike [`git2::Commit`], this type does not borrow the repository, so it
/// can be shared across tasks and stored in indices.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Commit {
    /// Commit id.
    pub id: Oid,
    /// First line of the commit message.
    pub title: String,
    /// Parent ids, first parent first.
    pub parents: Vec<Oid>,
    /// Root tree id.
    pub tree: Oid,
}

impl Commit {
    /// Id of the first parent, if any.
    #[must_use]
    pub fn first_parent(&self) -> Option<Oid> {
        self.parents.first().copied()
    }

    /// Abbreviated id as shown in tables.
    #[must_use]
    pub fn abbrev(&self) -> String {
        abbrev(self.id)
    }
}

impl From<&git2::Commit<'_>> for Commit {
    fn from(commit: &git2::Commit<'_>) -> Self {
        Self {
            id: commit.id(),
            title: commit_title(commit.message().unwrap_or_default()).to_owned(),
            parents: commit.parent_ids().collect(),
            tree: commit.tree_id(),
        }
    }
}

/// First line of a commit message.
#[must_use]
pub fn commit_title(message: &str) -> &str {
    message.lines().next().unwrap_or_default()
}

/// Abbreviate an id to 12 hex characters.
#[must_use]
pub fn abbrev(oid: Oid) -> String {
    let hex = oid.to_string();
    hex.get(..12).unwrap_or(&hex).to_owned()
}
