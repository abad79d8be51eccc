//! `git-review-rebase review` command - Record that a pair was inspected.

use std::path::Path;

use anyhow::Result;
use grr_core::RefPatchIdCache;

use super::{RangeArgs, utils};
use crate::output;
use crate::services::ReviewService;

/// Run the review command.
pub fn run(path: Option<&Path>, range: &RangeArgs, target: Option<&str>, undo: bool) -> Result<()> {
    let (repo, state) = utils::open_repo_and_state(path)?;
    let config = state.load_config()?;
    let policy = utils::cache_policy(range.no_cache, &config);
    let cache = RefPatchIdCache;
    let service = ReviewService::new(&repo, &state, &cache);

    let review = {
        let _spinner = output::Spinner::new("Matching commits...");
        service.load(&range.left, &range.right, policy)?
    };
    let (index, record) = utils::select_target(&review.matches, target)?;
    let line = output::record_line(index, record);

    match (service.set_reviewed(record, !undo)?, undo) {
        (true, false) => output::success(&format!("Marked as reviewed: {line}")),
        (true, true) => output::success(&format!("Cleared review mark: {line}")),
        (false, false) => output::info(&format!("Already reviewed: {line}")),
        (false, true) => output::info(&format!("Not marked as reviewed: {line}")),
    }
    Ok(())
}
