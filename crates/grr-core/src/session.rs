//! The currently displayed commit pair and its side-by-side rows.

use grr_git::{Commit, Repository};
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::blame::BlameCache;
use crate::config::BlameConfig;
use crate::error::Result;
use crate::render::{DiffRow, RowRenderer};
use crate::side_by_side::{DiffSettings, SideBySide};

#[derive(Debug, Default)]
struct Loaded {
    left: Option<Commit>,
    right: Option<Commit>,
    side_by_side: SideBySide,
}

/// Diff view state shared between reloads and renders.
///
/// A reload holds the write lock for its whole duration, renders share the
/// read lock, and renders are additionally serialized among themselves.
#[derive(Debug)]
pub struct DiffSession {
    repo: Repository,
    blame: BlameCache,
    yield_every: usize,
    loaded: RwLock<Loaded>,
    render_lock: Mutex<()>,
}

impl DiffSession {
    #[must_use]
    pub fn new(repo: Repository, settings: &BlameConfig) -> Self {
        let blame = BlameCache::new(&repo, settings);
        Self {
            repo,
            blame,
            yield_every: settings.yield_every,
            loaded: RwLock::new(Loaded::default()),
            render_lock: Mutex::new(()),
        }
    }

    /// Load a new pair, replacing the current one.
    ///
    /// Blame loads for both commits are started before the layout is built.
    /// With neither side given, the session is cleared.
    ///
    /// # Errors
    /// Returns error if the commit diffs or the side-by-side layout fail.
    pub async fn reload(
        &self,
        left: Option<Commit>,
        right: Option<Commit>,
        settings: &DiffSettings,
    ) -> Result<()> {
        let mut loaded = self.loaded.write().await;

        if left.is_none() && right.is_none() {
            *loaded = Loaded::default();
            return Ok(());
        }

        for commit in left.iter().chain(right.iter()) {
            self.blame.preload(&self.repo, commit)?;
        }

        let side_by_side = SideBySide::generate(
            &self.repo,
            left.as_ref().map(|c| c.id),
            right.as_ref().map(|c| c.id),
            settings,
        )
        .await?;

        debug!(
            left = ?left.as_ref().map(Commit::abbrev),
            right = ?right.as_ref().map(Commit::abbrev),
            rows = side_by_side.lines().len(),
            "diff session reloaded"
        );
        *loaded = Loaded {
            left,
            right,
            side_by_side,
        };
        Ok(())
    }

    /// Render every row of the loaded pair.
    ///
    /// # Errors
    /// Returns error if a row cannot be parsed or blamed.
    pub async fn render(&self, search: Option<&str>, blame: bool) -> Result<Vec<DiffRow>> {
        let _render = self.render_lock.lock().await;
        let loaded = self.loaded.read().await;

        let mut renderer = RowRenderer::new(
            &loaded.side_by_side,
            loaded.left.clone(),
            loaded.right.clone(),
            blame.then_some(&self.blame),
            search.map(str::to_owned),
        );

        let lines = loaded.side_by_side.lines();
        let mut rows = Vec::with_capacity(lines.len());
        for (idx, line) in lines.iter().enumerate() {
            rows.push(renderer.render_line(line).await?);
            if self.yield_every > 0 && (idx + 1) % self.yield_every == 0 {
                tokio::task::yield_now().await;
            }
        }
        Ok(rows)
    }

    /// Currently loaded commits.
    pub async fn pair(&self) -> (Option<Commit>, Option<Commit>) {
        let loaded = self.loaded.read().await;
        (loaded.left.clone(), loaded.right.clone())
    }

    /// Repository the session reads from.
    #[must_use]
    pub const fn repo(&self) -> &Repository {
        &self.repo
    }
}
