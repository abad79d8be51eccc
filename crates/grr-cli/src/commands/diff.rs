//! `git-review-rebase diff` command - Show a matched pair side by side.

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use console::Term;
use grr_core::{DiffSession, DiffSettings, RefPatchIdCache, column_widths};

use super::{RangeArgs, utils};
use crate::output;
use crate::services::ReviewService;

/// Width used when stdout is not a terminal and none is configured.
const FALLBACK_WIDTH: usize = 160;

/// Display options of the diff command.
#[derive(Debug, Default)]
pub struct DiffOptions<'a> {
    pub blame: bool,
    pub width: Option<usize>,
    pub no_function_context: bool,
    pub search: Option<&'a str>,
}

/// Run the diff command.
pub async fn run(
    path: Option<&Path>,
    range: &RangeArgs,
    target: Option<&str>,
    options: &DiffOptions<'_>,
) -> Result<()> {
    let (repo, state) = utils::open_repo_and_state(path)?;
    let config = state.load_config()?;
    let policy = utils::cache_policy(range.no_cache, &config);
    let cache = RefPatchIdCache;

    let review = {
        let _spinner = output::Spinner::new("Matching commits...");
        ReviewService::new(&repo, &state, &cache).load(&range.left, &range.right, policy)?
    };
    let (index, record) = utils::select_target(&review.matches, target)?;

    let mut diff_config = config.diff.clone();
    if options.width.is_some() {
        diff_config.width = options.width;
    }
    if options.no_function_context {
        diff_config.function_context = false;
    }
    let settings = DiffSettings::from_config(&diff_config, terminal_width());
    let blame = options.blame || config.diff.blame;

    let session = DiffSession::new(repo, &config.blame);
    session
        .reload(record.left.clone(), record.right.clone(), &settings)
        .await
        .context("Failed to lay out the diff")?;
    let rows = session
        .render(options.search, blame)
        .await
        .context("Failed to render the diff")?;

    println!("{}", output::record_line(index, record).bold());
    output::hr();
    let (left_column, right_column) = column_widths(settings.width);
    let left_width = output::left_width(&rows).min(left_column);
    for row in &rows {
        output::detail(&output::diff_row(row, left_width, right_column, blame));
    }
    Ok(())
}

fn terminal_width() -> usize {
    Term::stdout()
        .size_checked()
        .map_or(FALLBACK_WIDTH, |(_, columns)| usize::from(columns))
}
