//! Terminal output formatting utilities.

use std::time::Duration;

use colored::{ColoredString, Colorize};
use console::{Alignment, measure_text_width, pad_str, truncate_str};
use grr_core::{Cell, CommitMatch, DiffRow, LineKind, MARKERS, MatchFlags, RowMarker, cell_text};
use grr_git::Commit;
use indicatif::{ProgressBar, ProgressStyle};

/// Print a success message.
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print an error message (always prints to stderr).
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a warning message (always prints to stderr).
pub fn warn(msg: &str) {
    eprintln!("{} {}", "!".yellow(), msg);
}

/// Print an info message.
pub fn info(msg: &str) {
    println!("{} {}", "→".blue(), msg);
}

/// Print a detail line without prefix.
pub fn detail(msg: &str) {
    println!("{msg}");
}

/// Print a horizontal line.
pub fn hr() {
    println!("{}", "─".repeat(50).dimmed());
}

/// Spinner shown on stderr while ranges load. Hidden when stderr is not a terminal.
pub struct Spinner {
    pb: ProgressBar,
}

impl Spinner {
    pub fn new(message: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]));
        }
        pb.set_message(message.to_owned());
        pb.enable_steady_tick(Duration::from_millis(100));
        Self { pb }
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        self.pb.finish_and_clear();
    }
}

fn paint_marker(flag: MatchFlags, text: &str) -> ColoredString {
    if flag == MatchFlags::SAME_COMMIT || flag == MatchFlags::ADDED {
        text.green()
    } else if flag == MatchFlags::LOOSE_MATCH {
        text.yellow()
    } else if flag == MatchFlags::PRESENT_IN_REBASE_ONTO {
        text.blue()
    } else if flag == MatchFlags::DROPPED {
        text.red()
    } else {
        text.cyan()
    }
}

/// One fixed column per marker, blank where the flag is cleared.
#[must_use]
pub fn markers(flags: MatchFlags) -> String {
    MARKERS
        .iter()
        .map(|m| {
            if flags.contains(m.flag) {
                paint_marker(m.flag, &m.character.to_string()).to_string()
            } else {
                " ".to_owned()
            }
        })
        .collect()
}

/// Legend line for a single marker.
#[must_use]
pub fn legend_line(flag: MatchFlags, character: char, definition: &str) -> String {
    format!(
        "{}  {:<24} {}",
        paint_marker(flag, &character.to_string()),
        flag.names().join("|"),
        definition.dimmed()
    )
}

/// Colored `abbrev title` cell, empty for a missing side.
#[must_use]
pub fn commit_cell(commit: Option<&Commit>) -> String {
    commit.map_or_else(String::new, |c| {
        format!("{} {}", c.abbrev().yellow(), c.title)
    })
}

/// Plain one-line description of a record, used by the target picker.
#[must_use]
pub fn record_line(index: usize, record: &CommitMatch) -> String {
    let markers: String = MARKERS
        .iter()
        .map(|m| if record.flags.contains(m.flag) { m.character } else { ' ' })
        .collect();
    let side = |commit: Option<&Commit>| {
        let text = cell_text(commit);
        if text.is_empty() { "-".to_owned() } else { text }
    };
    format!(
        "{index:>3} {markers} {} → {}",
        side(record.left.as_ref()),
        side(record.right.as_ref())
    )
}

/// Match table row; `left_width` is the display width of the widest left cell.
#[must_use]
pub fn record_row(index: usize, record: &CommitMatch, left_width: usize) -> String {
    let left = commit_cell(record.left.as_ref());
    format!(
        "{:>3} {} {} {} {}",
        index.to_string().dimmed(),
        markers(record.flags),
        pad_str(&left, left_width, Alignment::Left, None),
        "│".dimmed(),
        commit_cell(record.right.as_ref())
    )
}

fn paint_segment(kind: LineKind, text: &str, token: bool, hit: bool) -> String {
    let mut painted = match kind {
        LineKind::Added => text.green(),
        LineKind::Removed => text.red(),
        LineKind::Meta => text.bold(),
        LineKind::Context | LineKind::Empty => text.normal(),
    };
    if token {
        painted = painted.underline();
    }
    if hit {
        painted = painted.reversed();
    }
    painted.to_string()
}

fn covers(ranges: &[std::ops::Range<usize>], at: usize) -> bool {
    ranges.iter().any(|r| r.contains(&at))
}

/// Cell text with changed words underlined and search hits reversed.
#[must_use]
pub fn styled_text(cell: &Cell) -> String {
    let text = cell.text.as_str();
    let mut out = String::new();
    let mut start = 0;
    let mut current: Option<(bool, bool)> = None;

    for (at, _) in text.char_indices() {
        let style = (covers(&cell.tokens, at), covers(&cell.matches, at));
        if current != Some(style) {
            if let Some((token, hit)) = current {
                out.push_str(&paint_segment(cell.kind, &text[start..at], token, hit));
            }
            start = at;
            current = Some(style);
        }
    }
    if let Some((token, hit)) = current {
        out.push_str(&paint_segment(cell.kind, &text[start..], token, hit));
    }
    out
}

fn blame_prefix(cell: &Cell) -> String {
    cell.blame.as_ref().map_or_else(
        || " ".repeat(13),
        |commit| format!("{:<12} ", commit.abbrev()).dimmed().to_string(),
    )
}

/// Side-by-side row. Cell text is padded or cut to `left_width` on the left
/// and cut to `right_width` on the right.
#[must_use]
pub fn diff_row(row: &DiffRow, left_width: usize, right_width: usize, blame: bool) -> String {
    let left_text = styled_text(&row.left);
    let right_text = styled_text(&row.right);
    let left = pad_str(&left_text, left_width, Alignment::Left, Some(""));
    let right = truncate_str(&right_text, right_width, "");
    let marker = row.marker.as_char().to_string();
    let marker = match row.marker {
        RowMarker::Common => marker.normal(),
        RowMarker::Changed => marker.yellow(),
        RowMarker::LeftOnly => marker.red(),
        RowMarker::RightOnly => marker.green(),
    };

    if blame {
        format!(
            "{}{} {} {}{}",
            blame_prefix(&row.left),
            left,
            marker,
            blame_prefix(&row.right),
            right
        )
    } else {
        format!("{left} {marker} {right}")
    }
}

/// Widest left cell of `rows`, for column alignment.
#[must_use]
pub fn left_width(rows: &[DiffRow]) -> usize {
    rows.iter()
        .map(|row| measure_text_width(&row.left.text))
        .max()
        .unwrap_or(0)
}
