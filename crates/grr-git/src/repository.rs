//! Repository wrapper providing the history queries the review engine needs.

use std::path::{Path, PathBuf};
use std::process::Command;

use git2::{Delta, ErrorCode, Oid, Sort};
use tracing::{debug, trace};

use crate::commit::Commit;
use crate::error::{Error, Result};

/// High-level wrapper around a git repository.
pub struct Repository {
    inner: git2::Repository,
}

impl Repository {
    /// Open a repository at the given path.
    ///
    /// # Errors
    /// Returns error if no repository found at path or any parent.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let inner = git2::Repository::discover(path).map_err(|e| {
            if e.code() == ErrorCode::NotFound {
                Error::NotARepository
            } else {
                Error::Git2(e)
            }
        })?;
        Ok(Self { inner })
    }

    /// Open the repository containing the current directory.
    ///
    /// # Errors
    /// Returns error if not inside a git repository.
    pub fn open_current() -> Result<Self> {
        Self::open(".")
    }

    /// Get the path to the repository root (workdir).
    #[must_use]
    pub fn workdir(&self) -> Option<&Path> {
        self.inner.workdir()
    }

    /// Get the path to the .git directory.
    #[must_use]
    pub fn git_dir(&self) -> &Path {
        self.inner.path()
    }

    /// Directory `git` subprocesses and worker handles are pointed at.
    ///
    /// The workdir for regular repositories, the git dir for bare ones.
    #[must_use]
    pub fn location(&self) -> PathBuf {
        self.workdir()
            .unwrap_or_else(|| self.git_dir())
            .to_path_buf()
    }

    // === Revisions ===

    /// Resolve a human revision expression (`HEAD`, a branch, a sha) to a commit id.
    ///
    /// # Errors
    /// Returns `RevisionNotFound` if the expression does not name a commit.
    pub fn resolve(&self, revision: &str) -> Result<Oid> {
        let object = self
            .inner
            .revparse_single(revision)
            .map_err(|_| Error::RevisionNotFound(revision.into()))?;
        let commit = object
            .peel_to_commit()
            .map_err(|_| Error::RevisionNotFound(revision.into()))?;
        Ok(commit.id())
    }

    /// Get an owned snapshot of a commit.
    ///
    /// # Errors
    /// Returns error if commit not found.
    pub fn commit(&self, oid: Oid) -> Result<Commit> {
        let commit = self.inner.find_commit(oid)?;
        Ok(Commit::from(&commit))
    }

    /// Get the merge base between two commits.
    ///
    /// # Errors
    /// Returns error if the commits share no history.
    pub fn merge_base(&self, one: Oid, two: Oid) -> Result<Oid> {
        Ok(self.inner.merge_base(one, two)?)
    }

    /// Check if a commit is an ancestor of (or equal to) another commit.
    ///
    /// # Errors
    /// Returns error if the check fails.
    pub fn is_ancestor(&self, ancestor: Oid, descendant: Oid) -> Result<bool> {
        if ancestor == descendant {
            return Ok(true);
        }
        Ok(self.inner.graph_descendant_of(descendant, ancestor)?)
    }

    /// Commits reachable from `tip` but not from `hide`, most ancestral first.
    ///
    /// # Errors
    /// Returns error if revwalk fails.
    pub fn range_log(&self, hide: Oid, tip: Oid) -> Result<Vec<Oid>> {
        let mut revwalk = self.inner.revwalk()?;
        revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::REVERSE)?;
        revwalk.push(tip)?;
        revwalk.hide(hide)?;

        let oids = revwalk.collect::<std::result::Result<Vec<_>, _>>()?;
        debug!(%hide, %tip, count = oids.len(), "walked range");
        Ok(oids)
    }

    // === Diffs ===

    fn first_parent_diff(&self, oid: Oid) -> Result<git2::Diff<'_>> {
        let commit = self.inner.find_commit(oid)?;
        if commit.parent_count() == 0 {
            return Err(Error::NoParent(oid));
        }
        let parent_tree = commit.parent(0)?.tree()?;
        let tree = commit.tree()?;
        Ok(self
            .inner
            .diff_tree_to_tree(Some(&parent_tree), Some(&tree), None)?)
    }

    /// Compute the patch id of a commit's diff against its first parent.
    ///
    /// # Errors
    /// Returns `NoParent` for root commits.
    pub fn patch_id(&self, oid: Oid) -> Result<Oid> {
        let patch_id = self.first_parent_diff(oid)?.patchid(None)?;
        trace!(commit = %oid, %patch_id, "computed patch id");
        Ok(patch_id)
    }

    /// Old-side paths of every file a commit touches relative to its first parent.
    ///
    /// Files added by the commit are skipped since the parent has nothing to
    /// attribute for them.
    ///
    /// # Errors
    /// Returns `NoParent` for root commits.
    pub fn touched_paths(&self, oid: Oid) -> Result<Vec<String>> {
        let diff = self.first_parent_diff(oid)?;
        let paths = diff
            .deltas()
            .filter(|delta| delta.status() != Delta::Added)
            .filter_map(|delta| {
                delta
                    .old_file()
                    .path()
                    .map(|p| p.to_string_lossy().into_owned())
            })
            .collect();
        Ok(paths)
    }

    // === Blob references ===

    /// Read the content of the blob a reference points at.
    ///
    /// Returns `None` if the reference does not exist.
    ///
    /// # Errors
    /// Returns error if the reference exists but its target cannot be read.
    pub fn read_ref_blob(&self, name: &str) -> Result<Option<Vec<u8>>> {
        let reference = match self.inner.find_reference(name) {
            Ok(reference) => reference,
            Err(e) if e.code() == ErrorCode::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let blob = reference.peel_to_blob()?;
        Ok(Some(blob.content().to_vec()))
    }

    /// Store `content` as a blob and point a new reference at it.
    ///
    /// An existing reference is left untouched.
    ///
    /// # Errors
    /// Returns error if the blob or reference cannot be written.
    pub fn write_ref_blob(&self, name: &str, content: &[u8]) -> Result<()> {
        let blob = self.inner.blob(content)?;
        match self
            .inner
            .reference(name, blob, false, "git-review-rebase: cache entry")
        {
            Ok(_) => Ok(()),
            Err(e) if e.code() == ErrorCode::Exists => {
                debug!(name, "reference already present, not overwriting");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    // === Subprocesses ===

    fn git(&self) -> Command {
        let mut cmd = Command::new("git");
        cmd.arg("-C").arg(self.location());
        cmd
    }

    /// Build a `git show` command printing the commit header and its patch.
    ///
    /// With `function_context`, hunks are widened to whole functions (`-W`).
    #[must_use]
    pub fn show_command(&self, oid: Oid, function_context: bool) -> Command {
        let mut cmd = self.git();
        cmd.args(["show", "--no-color", "--src-prefix=a/", "--dst-prefix=b/"]);
        if function_context {
            cmd.arg("-W");
        }
        cmd.arg(oid.to_string());
        cmd
    }

    /// Build a `git blame` command attributing every line of `path` at `commit`.
    ///
    /// Uses `-l` so every line starts with a full commit id.
    #[must_use]
    pub fn blame_command(&self, commit: Oid, path: &str) -> Command {
        let mut cmd = self.git();
        cmd.args(["blame", "-l", &commit.to_string(), "--", path]);
        cmd
    }

    // === Low-level access ===

    /// Get a reference to the underlying git2 repository.
    ///
    /// Use sparingly - prefer high-level methods.
    #[must_use]
    pub fn inner(&self) -> &git2::Repository {
        &self.inner
    }
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("path", &self.git_dir())
            .finish()
    }
}
