//! Side-by-side rendering of two commits' `git show` output.
//!
//! Each side is written to a temporary file and the two are laid out by
//! `diff -y`, which also decides the gutter marker of every row. The full
//! `git show` lines are kept next to the rows, since `diff -y` truncates
//! them to the column width.

use std::io::Write;
use std::process::Stdio;

use grr_git::{Oid, Repository};
use tempfile::NamedTempFile;
use tokio::process::Command;
use tracing::debug;

use crate::config::DiffConfig;
use crate::error::{Error, Result};

/// Narrowest layout that still leaves room for a gutter and two columns.
pub const MIN_WIDTH: usize = 8;

/// Layout options of one side-by-side generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffSettings {
    /// Total row width, gutter included.
    pub width: usize,
    /// Widen hunks to whole functions.
    pub function_context: bool,
}

impl DiffSettings {
    /// Settings from the config, using `terminal_width` when no width is set.
    #[must_use]
    pub fn from_config(config: &DiffConfig, terminal_width: usize) -> Self {
        Self {
            width: config.width.unwrap_or(terminal_width).max(MIN_WIDTH),
            function_context: config.function_context,
        }
    }
}

/// Output of `diff -y` for a pair of commits, one entry per row, plus the
/// untruncated `git show` output of each side.
#[derive(Debug, Clone, Default)]
pub struct SideBySide {
    lines: Vec<String>,
    width: usize,
    left_show: Vec<String>,
    right_show: Vec<String>,
}

impl SideBySide {
    /// Lay out `git show` of `left` and `right` next to each other.
    ///
    /// An absent side is rendered as an empty file.
    ///
    /// # Errors
    /// Returns `SideBySideFailed` if `git show` or `diff` fail.
    pub async fn generate(
        repo: &Repository,
        left: Option<Oid>,
        right: Option<Oid>,
        settings: &DiffSettings,
    ) -> Result<Self> {
        let width = settings.width.max(MIN_WIDTH);
        let (left_file, left_show) = show_to_file(repo, left, settings.function_context).await?;
        let (right_file, right_show) =
            show_to_file(repo, right, settings.function_context).await?;

        let output = Command::new("diff")
            .arg("-y")
            .arg(format!("-W{width}"))
            .arg("-t")
            .arg(left_file.path())
            .arg(right_file.path())
            .stdin(Stdio::null())
            .output()
            .await?;

        // Exit status 1 only means the inputs differ.
        if !matches!(output.status.code(), Some(0 | 1)) {
            return Err(Error::SideBySideFailed(
                String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            ));
        }

        let lines: Vec<String> = String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::to_owned)
            .collect();
        debug!(?left, ?right, width, rows = lines.len(), "side-by-side generated");

        Ok(Self {
            lines,
            width,
            left_show,
            right_show,
        })
    }

    #[cfg(test)]
    pub(crate) fn from_parts(
        lines: Vec<String>,
        width: usize,
        left_show: Vec<String>,
        right_show: Vec<String>,
    ) -> Self {
        Self {
            lines,
            width,
            left_show,
            right_show,
        }
    }

    /// Rows in display order.
    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Width the rows were laid out for.
    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    /// Full `git show` lines of the left commit, empty when absent.
    #[must_use]
    pub fn left_show(&self) -> &[String] {
        &self.left_show
    }

    /// Full `git show` lines of the right commit, empty when absent.
    #[must_use]
    pub fn right_show(&self) -> &[String] {
        &self.right_show
    }
}

/// `git show` of `commit` written to a temp file, along with its lines.
async fn show_to_file(
    repo: &Repository,
    commit: Option<Oid>,
    function_context: bool,
) -> Result<(NamedTempFile, Vec<String>)> {
    let mut file = NamedTempFile::new()?;
    let Some(commit) = commit else {
        return Ok((file, Vec::new()));
    };

    let output = Command::from(repo.show_command(commit, function_context))
        .stdin(Stdio::null())
        .output()
        .await?;
    if !output.status.success() {
        return Err(Error::SideBySideFailed(format!(
            "git show {commit}: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    file.write_all(&output.stdout)?;
    file.flush()?;
    let lines = String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::to_owned)
        .collect();
    Ok((file, lines))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_support::TestRepo;

    #[test]
    fn test_settings_from_config() {
        let config = DiffConfig::default();
        let settings = DiffSettings::from_config(&config, 120);
        assert_eq!(settings.width, 120);
        assert!(settings.function_context);

        let config = DiffConfig {
            width: Some(3),
            function_context: false,
            blame: false,
        };
        let settings = DiffSettings::from_config(&config, 120);
        assert_eq!(settings.width, MIN_WIDTH);
        assert!(!settings.function_context);
    }

    #[tokio::test]
    async fn test_generate_marks_changed_rows() {
        let test = TestRepo::new();
        let base = test.commit(None, &[("f.txt", "one\ntwo\n")], "base");
        let left = test.commit(Some(base), &[("f.txt", "one\nleft\n")], "change");
        let right = test.commit(Some(base), &[("f.txt", "one\nright\n")], "change");

        let settings = DiffSettings {
            width: 80,
            function_context: false,
        };
        let sbs = SideBySide::generate(&test.repo, Some(left), Some(right), &settings)
            .await
            .unwrap();

        assert_eq!(sbs.width(), 80);
        assert!(!sbs.lines().is_empty());
        let changed = sbs
            .lines()
            .iter()
            .find(|line| line.starts_with("+left"))
            .unwrap();
        assert!(changed.contains("+right"));
        assert_eq!(changed.chars().nth(39), Some('|'));
    }

    #[tokio::test]
    async fn test_generate_single_side() {
        let test = TestRepo::new();
        let base = test.commit(None, &[("f.txt", "one\n")], "base");
        let right = test.commit(Some(base), &[("g.txt", "new\n")], "add g");

        let settings = DiffSettings {
            width: 61,
            function_context: true,
        };
        let sbs = SideBySide::generate(&test.repo, None, Some(right), &settings)
            .await
            .unwrap();

        // Every row only exists on the right.
        assert!(sbs.lines().iter().all(|line| line.chars().nth(30) == Some('>')));
        assert!(sbs.left_show().is_empty());
        assert_eq!(sbs.right_show().len(), sbs.lines().len());
    }

    #[tokio::test]
    async fn test_generate_keeps_untruncated_show_lines() {
        let test = TestRepo::new();
        let path = "a_reasonably_long_source_file_name_here.rs";
        let base = test.commit(None, &[(path, "one\n")], "base");
        let change = test.commit(Some(base), &[(path, "two\n")], "change");

        let settings = DiffSettings {
            width: 40,
            function_context: false,
        };
        let sbs = SideBySide::generate(&test.repo, Some(change), Some(change), &settings)
            .await
            .unwrap();

        let header = format!("+++ b/{path}");
        assert!(sbs.left_show().contains(&header));
        assert!(sbs.right_show().contains(&header));
        assert!(!sbs.lines().iter().any(|line| line.contains(&header)));
    }
}
