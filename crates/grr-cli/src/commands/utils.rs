use std::fmt;
use std::io::IsTerminal;
use std::path::Path;

use anyhow::{Context, Result, bail};
use grr_core::{CachePolicy, CommitMatch, CommitMatches, Config, MatchFilter, State};
use grr_git::Repository;
use inquire::Select;

use crate::output;
use crate::services::indexed;

/// Helper to open repo and state, from `path` or the current directory.
pub fn open_repo_and_state(path: Option<&Path>) -> Result<(Repository, State)> {
    let repo = match path {
        Some(path) => Repository::open(path),
        None => Repository::open_current(),
    }
    .context("Not inside a git repository")?;
    let state = State::new(repo.git_dir())?;
    Ok((repo, state))
}

/// `--no-cache` disables the cache; otherwise the config decides.
pub const fn cache_policy(no_cache: bool, config: &Config) -> CachePolicy {
    CachePolicy::from_preference(!no_cache && config.general.cache)
}

/// A record offered in the interactive picker.
struct Choice {
    index: usize,
    label: String,
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

/// Resolve `<target>` to a record and its 1-based index, prompting for it
/// when omitted on a terminal.
pub fn select_target<'m>(
    matches: &'m CommitMatches,
    target: Option<&str>,
) -> Result<(usize, &'m CommitMatch)> {
    if let Some(target) = target {
        let record = matches
            .find(target)
            .with_context(|| format!("No record matches '{target}'"))?;
        let index = matches
            .records()
            .iter()
            .position(|r| std::ptr::eq(r, record))
            .map_or(0, |i| i + 1);
        return Ok((index, record));
    }

    if matches.is_empty() {
        bail!("Both ranges are empty, nothing to select");
    }
    if !std::io::stdin().is_terminal() {
        bail!("No target given - pass a record index or commit id");
    }

    let filter = MatchFilter::new();
    let choices: Vec<Choice> = indexed(matches, &filter)
        .map(|(index, record)| Choice {
            index,
            label: output::record_line(index, record),
        })
        .collect();

    let choice = Select::new("Select a commit pair:", choices)
        .with_page_size(15)
        .prompt()
        .context("Failed to get target selection")?;

    let record = choice
        .index
        .checked_sub(1)
        .and_then(|i| matches.records().get(i))
        .context("Selected record disappeared")?;
    Ok((choice.index, record))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_policy() {
        let mut config = Config::default();
        assert_eq!(cache_policy(false, &config), CachePolicy::ENABLED);
        assert_eq!(cache_policy(true, &config), CachePolicy::DISABLED);

        config.general.cache = false;
        assert_eq!(cache_policy(false, &config), CachePolicy::DISABLED);
    }
}
