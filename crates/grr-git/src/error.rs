//! Error types for grr-git.

use git2::Oid;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during git operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Not inside a git repository.
    #[error("not a git repository")]
    NotARepository,

    /// Revision expression did not resolve to a commit.
    #[error("revision not found: {0}")]
    RevisionNotFound(String),

    /// Commit has no parent, but one is structurally required.
    #[error("commit {0} has no parent")]
    NoParent(Oid),

    /// Blame output line could not be parsed.
    #[error("unexpected blame output: {0:?}")]
    MalformedBlameLine(String),

    /// Underlying git2 error.
    #[error("git error: {0}")]
    Git2(#[from] git2::Error),
}
