//! Command-line surface of `git-review-rebase`.

use std::path::PathBuf;

use anyhow::{Result, anyhow};
use clap::{ArgAction, Args, Parser, Subcommand};
use clap_complete::Shell;
use grr_core::MatchFlags;
use tracing::Level;

pub mod completions;
pub mod diff;
pub mod legend;
pub mod matches;
pub mod review;
pub mod utils;

/// Review a rebased branch commit by commit.
#[derive(Debug, Parser)]
#[command(name = "git-review-rebase", version, about)]
pub struct Cli {
    /// Verbosity level (repeat for more, up to -vvvv)
    #[arg(short, action = ArgAction::Count, global = true)]
    pub v: u8,

    /// Run as if started in <path>
    #[arg(short = 'C', value_name = "path", global = true)]
    pub path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Install the stderr tracing subscriber for the requested verbosity.
    ///
    /// # Errors
    /// Returns error if a global subscriber is already installed.
    pub fn init_tracing(&self) -> Result<()> {
        let subscriber = tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_max_level(match self.v {
                0 => Level::ERROR,
                1 => Level::WARN,
                2 => Level::INFO,
                3 => Level::DEBUG,
                _ => Level::TRACE,
            })
            .finish();

        tracing::subscriber::set_global_default(subscriber).map_err(|e| anyhow!(e))
    }
}

/// The two ranges every review command compares.
#[derive(Debug, Clone, Args)]
pub struct RangeArgs {
    /// Range before the rebase (<base>..<tip>)
    pub left: String,

    /// Range after the rebase (<base>..<tip>)
    pub right: String,

    /// Neither read nor write the patch id cache
    #[arg(long)]
    pub no_cache: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List how the commits of both ranges pair up
    #[command(alias = "m")]
    Matches {
        #[command(flatten)]
        range: RangeArgs,

        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// Only show records carrying FLAG
        #[arg(long, value_name = "FLAG", value_parser = parse_flag)]
        with: Vec<MatchFlags>,

        /// Only show records lacking FLAG
        #[arg(long, value_name = "FLAG", value_parser = parse_flag)]
        without: Vec<MatchFlags>,

        /// Only show records whose id or title contains TERM
        #[arg(long, value_name = "TERM")]
        search: Vec<String>,
    },

    /// Show a matched pair side by side
    #[command(alias = "d")]
    Diff {
        #[command(flatten)]
        range: RangeArgs,

        /// Record to show: 1-based index or commit id prefix
        target: Option<String>,

        /// Prefix lines with the commit that last touched them
        #[arg(long)]
        blame: bool,

        /// Total row width (defaults to the terminal width)
        #[arg(long, value_name = "N")]
        width: Option<usize>,

        /// Do not widen hunks to whole functions
        #[arg(long)]
        no_function_context: bool,

        /// Highlight TERM in both columns
        #[arg(long, value_name = "TERM")]
        search: Option<String>,
    },

    /// Mark a matched pair as reviewed
    #[command(alias = "r")]
    Review {
        #[command(flatten)]
        range: RangeArgs,

        /// Record to mark: 1-based index or commit id prefix
        target: Option<String>,

        /// Clear the reviewed mark instead
        #[arg(long)]
        undo: bool,
    },

    /// Explain the markers used in the match list
    Legend,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Parse a flag name such as `loose-match` or `DROPPED`.
fn parse_flag(value: &str) -> Result<MatchFlags, String> {
    let name = value.trim().to_ascii_uppercase().replace('-', "_");
    MatchFlags::from_name(&name).ok_or_else(|| {
        let known: Vec<&str> = MatchFlags::all().names();
        format!("unknown flag '{value}' (expected one of {})", known.join(", "))
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_flag_accepts_loose_spelling() {
        assert_eq!(parse_flag("dropped").unwrap(), MatchFlags::DROPPED);
        assert_eq!(parse_flag("loose-match").unwrap(), MatchFlags::LOOSE_MATCH);
        assert_eq!(
            parse_flag("PRESENT_IN_REBASE_ONTO").unwrap(),
            MatchFlags::PRESENT_IN_REBASE_ONTO
        );
        assert!(parse_flag("bogus").unwrap_err().contains("SAME_COMMIT"));
    }

    #[test]
    fn test_global_options_after_subcommand() {
        let cli = Cli::try_parse_from([
            "git-review-rebase",
            "matches",
            "a..b",
            "c..d",
            "-vv",
            "--with",
            "added",
            "--with",
            "dropped",
        ])
        .unwrap();

        assert_eq!(cli.v, 2);
        let Commands::Matches { range, with, .. } = cli.command else {
            panic!("expected matches");
        };
        assert_eq!(range.left, "a..b");
        assert_eq!(with, vec![MatchFlags::ADDED, MatchFlags::DROPPED]);
    }
}
