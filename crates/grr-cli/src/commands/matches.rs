//! `git-review-rebase matches` command - List how both ranges pair up.

use std::path::Path;

use anyhow::Result;
use colored::Colorize;
use console::measure_text_width;
use grr_core::{MatchFilter, MatchFlags, MatchSummary, RefPatchIdCache, cell_text};

use super::{RangeArgs, utils};
use crate::output;
use crate::services::{MatchReport, Review, ReviewService, indexed};

/// Which records to list.
#[derive(Debug, Default)]
pub struct ListOptions<'a> {
    pub json: bool,
    pub with: &'a [MatchFlags],
    pub without: &'a [MatchFlags],
    pub search: &'a [String],
}

impl ListOptions<'_> {
    fn filter(&self) -> MatchFilter {
        let filter = self.with.iter().fold(MatchFilter::new(), |f, flag| f.with(*flag));
        let filter = self.without.iter().fold(filter, |f, flag| f.without(*flag));
        self.search.iter().fold(filter, |f, term| f.search(term))
    }
}

/// Run the matches command.
pub fn run(path: Option<&Path>, range: &RangeArgs, options: &ListOptions<'_>) -> Result<()> {
    let (repo, state) = utils::open_repo_and_state(path)?;
    let config = state.load_config()?;
    let policy = utils::cache_policy(range.no_cache, &config);
    let cache = RefPatchIdCache;

    let review = {
        let _spinner = output::Spinner::new("Matching commits...");
        ReviewService::new(&repo, &state, &cache).load(&range.left, &range.right, policy)?
    };

    let filter = options.filter();
    if options.json {
        let report = MatchReport::new(&review, &filter);
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_table(&review, &filter);
    }
    Ok(())
}

fn print_table(review: &Review, filter: &MatchFilter) {
    if review.matches.is_empty() {
        output::info("Both ranges are empty.");
        return;
    }

    let rows: Vec<_> = indexed(&review.matches, filter).collect();
    let left_width = rows
        .iter()
        .map(|(_, record)| measure_text_width(&cell_text(record.left.as_ref())))
        .max()
        .unwrap_or(0);

    println!();
    println!(
        "  {} {} {}",
        format!("{}..{}", review.left.start(), review.left.end()).bold(),
        "→".dimmed(),
        format!("{}..{}", review.right.start(), review.right.end()).bold()
    );
    output::hr();

    if rows.is_empty() {
        output::info("No record matches the filter.");
    }
    for (index, record) in &rows {
        output::detail(&output::record_row(*index, record, left_width));
    }

    output::hr();
    output::detail(&summary_line(&review.matches.summary()));
    println!();
}

fn summary_line(summary: &MatchSummary) -> String {
    let mut parts = vec![format!("{} records", summary.total)];
    let counts = [
        (summary.same_commit, "unchanged"),
        (summary.loose_match, "loosely matched"),
        (summary.present_in_rebase_onto, "in new upstream"),
        (summary.dropped, "dropped"),
        (summary.added, "added"),
        (summary.reviewed, "reviewed"),
    ];
    parts.extend(
        counts
            .iter()
            .filter(|(count, _)| *count > 0)
            .map(|(count, label)| format!("{count} {label}")),
    );
    parts.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_line_skips_zero_counts() {
        let summary = MatchSummary {
            total: 4,
            same_commit: 2,
            dropped: 1,
            added: 1,
            ..MatchSummary::default()
        };
        assert_eq!(
            summary_line(&summary),
            "4 records, 2 unchanged, 1 dropped, 1 added"
        );
    }

    #[test]
    fn test_options_build_filter() {
        let search = vec!["parser".to_owned()];
        let options = ListOptions {
            with: &[MatchFlags::LOOSE_MATCH],
            without: &[MatchFlags::REVIEWED],
            search: &search,
            ..ListOptions::default()
        };
        let filter = MatchFilter::new()
            .with(MatchFlags::LOOSE_MATCH)
            .without(MatchFlags::REVIEWED)
            .search("parser");
        assert_eq!(options.filter(), filter);
        assert!(ListOptions::default().filter().is_empty());
    }
}
