//! # grr-git
//!
//! Repository access layer for git-review-rebase, built on git2-rs.
//! Resolves revisions, walks commit ranges, computes patch ids and
//! prepares the `git show` / `git blame` subprocesses the diff view uses.

mod blame;
mod commit;
mod error;
mod repository;

pub use blame::blame_revision;
pub use commit::{Commit, abbrev, commit_title};
pub use error::{Error, Result};
pub use git2::Oid;
pub use repository::Repository;
