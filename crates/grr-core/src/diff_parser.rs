//! Incremental unified diff position tracking.
//!
//! Lines are fed one at a time, in the order `git show` prints them, and the
//! parser keeps track of which old and new file line the last one maps to.

use crate::error::{Error, Result};

/// Where the most recently parsed line sits in the old and new files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffPosition {
    pub new_file: Option<String>,
    pub new_line: usize,
    pub old_file: Option<String>,
    pub old_line: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Hunk {
    old_start: usize,
    new_start: usize,
}

/// Line-by-line unified diff state machine.
#[derive(Debug, Default)]
pub struct DiffParser {
    last_line_was_header: bool,
    hunk: Option<Hunk>,
    old_file: Option<String>,
    new_file: Option<String>,
    old_index: usize,
    new_index: usize,
}

impl DiffParser {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next diff line.
    ///
    /// # Errors
    /// Returns `MalformedHunkHeader` for an `@@` line outside the hunk header grammar.
    pub fn parse_line(&mut self, line: &str) -> Result<()> {
        self.last_line_was_header = is_diff_header(line);

        if self.last_line_was_header {
            self.hunk = None;
            return self.record_header(line);
        }

        match line.chars().next() {
            // "\ No newline at end of file" annotates the previous line.
            None | Some('\\') => {}
            Some('+') => self.new_index += 1,
            Some('-') => self.old_index += 1,
            Some(_) => {
                self.old_index += 1;
                self.new_index += 1;
            }
        }
        Ok(())
    }

    fn record_header(&mut self, line: &str) -> Result<()> {
        if line.starts_with("---") {
            self.old_file = header_path(line);
        } else if line.starts_with("+++") {
            self.new_file = header_path(line);
        } else if line.starts_with("@@") {
            let ((old_start, _), (new_start, _)) = parse_hunk_header(line)
                .ok_or_else(|| Error::MalformedHunkHeader(line.to_owned()))?;
            self.hunk = Some(Hunk {
                old_start: old_start.saturating_sub(1),
                new_start: new_start.saturating_sub(1),
            });
            self.old_index = 0;
            self.new_index = 0;
        }
        Ok(())
    }

    /// Whether the last parsed line is a content line of a hunk.
    #[must_use]
    pub const fn within_hunk(&self) -> bool {
        self.hunk.is_some() && !self.last_line_was_header
    }

    /// Position of the last parsed line.
    ///
    /// # Errors
    /// Returns `PositionUnavailable` if no hunk is active.
    pub fn position(&self) -> Result<DiffPosition> {
        let hunk = self.hunk.ok_or(Error::PositionUnavailable)?;
        Ok(DiffPosition {
            new_file: self.new_file.clone(),
            new_line: hunk.new_start + self.new_index,
            old_file: self.old_file.clone(),
            old_line: hunk.old_start + self.old_index,
        })
    }

    /// Path from the last `---` header.
    #[must_use]
    pub fn old_file(&self) -> Option<&str> {
        self.old_file.as_deref()
    }

    /// Path from the last `+++` header.
    #[must_use]
    pub fn new_file(&self) -> Option<&str> {
        self.new_file.as_deref()
    }
}

fn is_diff_header(line: &str) -> bool {
    ["diff", "index", "---", "+++", "@@", "new file mode"]
        .iter()
        .any(|prefix| line.starts_with(prefix))
}

/// Path named by a `--- a/<path>` or `+++ b/<path>` header. `/dev/null`
/// stands for a missing side and yields `None`.
fn header_path(line: &str) -> Option<String> {
    let path = line.get(4..)?.trim();
    if path == "/dev/null" {
        return None;
    }
    let path = path
        .strip_prefix("a/")
        .or_else(|| path.strip_prefix("b/"))
        .unwrap_or(path);
    Some(path.to_owned())
}

/// Parse a hunk header line like "@@ -1,3 +1,4 @@" or "@@ -1 +1,2 @@".
fn parse_hunk_header(line: &str) -> Option<((usize, usize), (usize, usize))> {
    let ranges = line.strip_prefix("@@ ")?;
    let (ranges, _context) = ranges.split_once(" @@")?;

    let mut parts = ranges.split(' ');
    let old = parse_range(parts.next()?.strip_prefix('-')?)?;
    let new = parse_range(parts.next()?.strip_prefix('+')?)?;
    if parts.next().is_some() {
        return None;
    }

    Some((old, new))
}

/// Parse a range like "1,3" or "1" into (start, count).
fn parse_range(s: &str) -> Option<(usize, usize)> {
    if let Some((start, count)) = s.split_once(',') {
        Some((start.parse().ok()?, count.parse().ok()?))
    } else {
        Some((s.parse().ok()?, 1))
    }
}
