//! Turning `diff -y` rows into structured, annotated cells.

use std::ops::Range;

use grr_git::{Commit, Error as GitError};
use similar::{ChangeTag, TextDiff};

use crate::blame::BlameCache;
use crate::diff_parser::DiffParser;
use crate::error::{Error, Result};
use crate::side_by_side::SideBySide;

/// Gutter character `diff -y` puts between the two columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowMarker {
    /// Identical on both sides.
    Common,
    /// Present on both sides with different content (`|`).
    Changed,
    /// Only on the left (`<`).
    LeftOnly,
    /// Only on the right (`>`).
    RightOnly,
}

impl RowMarker {
    #[must_use]
    pub const fn from_char(c: char) -> Self {
        match c {
            '|' => Self::Changed,
            '<' => Self::LeftOnly,
            '>' => Self::RightOnly,
            _ => Self::Common,
        }
    }

    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            Self::Common => ' ',
            Self::Changed => '|',
            Self::LeftOnly => '<',
            Self::RightOnly => '>',
        }
    }

    const fn feeds_left(self) -> bool {
        !matches!(self, Self::RightOnly)
    }

    const fn feeds_right(self) -> bool {
        !matches!(self, Self::LeftOnly)
    }
}

/// What a cell's line is in its side's `git show` output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Added,
    Removed,
    Context,
    /// Commit header, message or diff metadata.
    Meta,
    Empty,
}

/// One side of a row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    /// Full line text, tabs expanded and trailing whitespace removed.
    pub text: String,
    pub kind: LineKind,
    /// The row differs between the two commits.
    pub changed: bool,
    /// Byte ranges of `text` holding words that differ from the other side.
    pub tokens: Vec<Range<usize>>,
    /// Byte ranges of `text` matching the search term.
    pub matches: Vec<Range<usize>>,
    /// Commit that last touched the line.
    pub blame: Option<Commit>,
}

impl Cell {
    fn empty() -> Self {
        Self {
            text: String::new(),
            kind: LineKind::Empty,
            changed: false,
            tokens: Vec::new(),
            matches: Vec::new(),
            blame: None,
        }
    }
}

/// One rendered row of the side-by-side view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffRow {
    pub left: Cell,
    pub marker: RowMarker,
    pub right: Cell,
}

/// Where `diff -y` cuts a row into columns for a given layout width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Columns {
    middle: usize,
    right_start: usize,
}

impl Columns {
    const fn for_width(width: usize) -> Self {
        let middle = (width + 1) / 2 - 1;
        let gap = if width % 2 == 1 { 2 } else { 3 };
        Self {
            middle,
            right_start: middle + gap,
        }
    }

    /// Gutter character of `line`, blank when the row stops short of it.
    fn marker(self, line: &str) -> RowMarker {
        RowMarker::from_char(line.chars().nth(self.middle).unwrap_or(' '))
    }
}

/// Display widths of the left and right text columns of a `width` layout.
#[must_use]
pub const fn column_widths(width: usize) -> (usize, usize) {
    let columns = Columns::for_width(if width < 2 { 2 } else { width });
    (columns.middle, width.saturating_sub(columns.right_start))
}

/// Side being rendered.
struct Side<'a> {
    commit: Option<&'a Commit>,
    parser: &'a DiffParser,
}

/// Full lines of one side's `git show` output and how far rendering got.
struct ShowCursor<'a> {
    lines: &'a [String],
    next: usize,
}

impl<'a> ShowCursor<'a> {
    const fn new(lines: &'a [String]) -> Self {
        Self { lines, next: 0 }
    }

    /// Take the next line. Running past the end yields an empty line.
    fn advance(&mut self) -> &'a str {
        let line = self.lines.get(self.next).map_or("", String::as_str);
        self.next += 1;
        line
    }
}

/// Stateful renderer for the rows of one side-by-side generation.
///
/// Rows must be rendered in order: the gutter marker of each `diff -y` row
/// says which sides consume their next full `git show` line, and each side
/// keeps a [`DiffParser`] that tracks where in its file that line is.
pub struct RowRenderer<'a> {
    left: Option<Commit>,
    right: Option<Commit>,
    left_show: ShowCursor<'a>,
    right_show: ShowCursor<'a>,
    left_parser: DiffParser,
    right_parser: DiffParser,
    blame: Option<&'a BlameCache>,
    search: Option<String>,
    columns: Columns,
}

impl<'a> RowRenderer<'a> {
    #[must_use]
    pub fn new(
        side_by_side: &'a SideBySide,
        left: Option<Commit>,
        right: Option<Commit>,
        blame: Option<&'a BlameCache>,
        search: Option<String>,
    ) -> Self {
        Self {
            left,
            right,
            left_show: ShowCursor::new(side_by_side.left_show()),
            right_show: ShowCursor::new(side_by_side.right_show()),
            left_parser: DiffParser::new(),
            right_parser: DiffParser::new(),
            blame,
            search: search.filter(|term| !term.is_empty()),
            columns: Columns::for_width(side_by_side.width().max(2)),
        }
    }

    /// Render the next `diff -y` row.
    ///
    /// # Errors
    /// Returns error on a malformed hunk header, or if blame cannot be
    /// resolved for an in-hunk line.
    pub async fn render_line(&mut self, line: &str) -> Result<DiffRow> {
        let marker = self.columns.marker(line);
        let left_line = marker.feeds_left().then(|| self.left_show.advance());
        let right_line = marker.feeds_right().then(|| self.right_show.advance());

        if let Some(full) = left_line {
            self.left_parser.parse_line(full)?;
        }
        if let Some(full) = right_line {
            self.right_parser.parse_line(full)?;
        }

        let changed = marker != RowMarker::Common && self.left.is_some() && self.right.is_some();
        let mut left = make_cell(left_line, &self.left_parser, changed);
        let mut right = make_cell(right_line, &self.right_parser, changed);

        if marker == RowMarker::Changed
            && self.left_parser.within_hunk()
            && self.right_parser.within_hunk()
        {
            (left.tokens, right.tokens) = token_changes(&left.text, &right.text);
        }

        if let Some(blame) = self.blame {
            if let Some(full) = left_line {
                let side = Side {
                    commit: self.left.as_ref(),
                    parser: &self.left_parser,
                };
                left.blame = blame_line(blame, side, full).await?;
            }
            if let Some(full) = right_line {
                let side = Side {
                    commit: self.right.as_ref(),
                    parser: &self.right_parser,
                };
                right.blame = blame_line(blame, side, full).await?;
            }
        }

        if let Some(term) = &self.search {
            left.matches = find_all(&left.text, term);
            right.matches = find_all(&right.text, term);
        }

        Ok(DiffRow {
            left,
            marker,
            right,
        })
    }
}

fn make_cell(full: Option<&str>, parser: &DiffParser, changed: bool) -> Cell {
    let Some(full) = full else {
        return Cell {
            changed,
            ..Cell::empty()
        };
    };

    let text = expand_tabs(full.trim_end());
    let kind = if parser.within_hunk() {
        match full.chars().next() {
            Some('+') => LineKind::Added,
            Some('-') => LineKind::Removed,
            Some('\\') => LineKind::Meta,
            _ => LineKind::Context,
        }
    } else if text.is_empty() {
        LineKind::Empty
    } else {
        LineKind::Meta
    };

    Cell {
        text,
        kind,
        changed,
        ..Cell::empty()
    }
}

/// Replace tabs with spaces up to the next multiple of eight columns, as
/// `diff -t` lays them out.
fn expand_tabs(line: &str) -> String {
    const TAB_STOP: usize = 8;

    if !line.contains('\t') {
        return line.to_owned();
    }
    let mut out = String::with_capacity(line.len() + TAB_STOP);
    let mut column = 0;
    for c in line.chars() {
        if c == '\t' {
            let pad = TAB_STOP - column % TAB_STOP;
            out.extend(std::iter::repeat_n(' ', pad));
            column += pad;
        } else {
            out.push(c);
            column += 1;
        }
    }
    out
}

/// Attribution of the line a side's parser just consumed.
///
/// Added lines belong to the side's own commit; every other in-hunk line is
/// looked up in the blame of the commit's first parent.
async fn blame_line(blame: &BlameCache, side: Side<'_>, text: &str) -> Result<Option<Commit>> {
    let Some(commit) = side.commit else {
        return Ok(None);
    };
    if !side.parser.within_hunk() {
        return Ok(None);
    }
    if text.starts_with('+') {
        return Ok(Some(commit.clone()));
    }
    if text.starts_with('\\') {
        return Ok(None);
    }

    let position = side.parser.position()?;
    let parent = commit
        .first_parent()
        .ok_or(Error::Git(GitError::NoParent(commit.id)))?;
    let (Some(old_file), Some(line)) = (position.old_file, position.old_line.checked_sub(1))
    else {
        return Err(Error::PositionUnavailable);
    };

    blame.get(parent, &old_file).commit_at(line).await.map(Some)
}

/// Word-level differences between the bodies of two in-hunk lines.
///
/// The leading `+`/`-`/` ` column is excluded from the comparison.
fn token_changes(left: &str, right: &str) -> (Vec<Range<usize>>, Vec<Range<usize>>) {
    let (left_offset, left_body) = body(left);
    let (right_offset, right_body) = body(right);

    let diff = TextDiff::from_words(left_body, right_body);
    let mut left_ranges: Vec<Range<usize>> = Vec::new();
    let mut right_ranges: Vec<Range<usize>> = Vec::new();
    let (mut left_pos, mut right_pos) = (left_offset, right_offset);

    for change in diff.iter_all_changes() {
        let len = change.value().len();
        match change.tag() {
            ChangeTag::Equal => {
                left_pos += len;
                right_pos += len;
            }
            ChangeTag::Delete => {
                push_range(&mut left_ranges, left_pos..left_pos + len, left);
                left_pos += len;
            }
            ChangeTag::Insert => {
                push_range(&mut right_ranges, right_pos..right_pos + len, right);
                right_pos += len;
            }
        }
    }

    (left_ranges, right_ranges)
}

/// Byte offset and text after the first character.
fn body(text: &str) -> (usize, &str) {
    let offset = text.chars().next().map_or(0, char::len_utf8);
    (offset, &text[offset..])
}

/// Append `range`, merging with the previous one when adjacent. Whitespace
/// on its own is not highlighted.
fn push_range(ranges: &mut Vec<Range<usize>>, range: Range<usize>, text: &str) {
    if text[range.clone()].trim().is_empty() {
        return;
    }
    match ranges.last_mut() {
        Some(last) if text[last.end..range.start].trim().is_empty() => last.end = range.end,
        _ => ranges.push(range),
    }
}

fn find_all(text: &str, term: &str) -> Vec<Range<usize>> {
    text.match_indices(term)
        .map(|(start, found)| start..start + found.len())
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::BlameConfig;
    use crate::test_support::TestRepo;

    /// `diff -y` rows built by hand, with the full lines behind them.
    struct Layout {
        width: usize,
        rows: Vec<String>,
        left: Vec<String>,
        right: Vec<String>,
    }

    impl Layout {
        fn new(width: usize) -> Self {
            Self {
                width,
                rows: Vec::new(),
                left: Vec::new(),
                right: Vec::new(),
            }
        }

        fn row(mut self, left: Option<&str>, marker: char, right: Option<&str>) -> Self {
            let columns = Columns::for_width(self.width);
            let cut = |text: &str, n: usize| text.chars().take(n).collect::<String>();

            let shown = left.map(|l| cut(l, columns.middle)).unwrap_or_default();
            let mut line = format!("{shown:<width$}", width = columns.middle);
            line.push(marker);
            if let Some(right) = right {
                line.push_str(&" ".repeat(columns.right_start - columns.middle - 1));
                line.push_str(&cut(right, self.width - columns.right_start));
            }
            self.rows.push(line.trim_end().to_owned());

            self.left.extend(left.map(str::to_owned));
            self.right.extend(right.map(str::to_owned));
            self
        }

        fn same(self, line: &str) -> Self {
            self.row(Some(line), ' ', Some(line))
        }

        fn build(self) -> SideBySide {
            SideBySide::from_parts(self.rows, self.width, self.left, self.right)
        }
    }

    async fn render_all(renderer: &mut RowRenderer<'_>, sbs: &SideBySide) -> Vec<DiffRow> {
        let mut rows = Vec::new();
        for line in sbs.lines() {
            rows.push(renderer.render_line(line).await.unwrap());
        }
        rows
    }

    fn commit(byte: u8) -> Commit {
        let id = grr_git::Oid::from_bytes(&[byte; 20]).unwrap();
        Commit {
            id,
            title: format!("commit {byte}"),
            parents: vec![grr_git::Oid::from_bytes(&[byte + 1; 20]).unwrap()],
            tree: grr_git::Oid::zero(),
        }
    }

    #[test]
    fn test_column_split_points() {
        assert_eq!(
            Columns::for_width(80),
            Columns {
                middle: 39,
                right_start: 42
            }
        );
        assert_eq!(
            Columns::for_width(61),
            Columns {
                middle: 30,
                right_start: 32
            }
        );
        assert_eq!(column_widths(80), (39, 38));
        assert_eq!(column_widths(61), (30, 29));

        let layout = Layout::new(80).row(Some("left"), '|', Some("right")).build();
        assert_eq!(Columns::for_width(80).marker(&layout.lines()[0]), RowMarker::Changed);
    }

    #[test]
    fn test_marker_of_short_line() {
        let columns = Columns::for_width(80);
        assert_eq!(columns.marker("short"), RowMarker::Common);
        assert_eq!(columns.marker(""), RowMarker::Common);
    }

    #[test]
    fn test_expand_tabs() {
        assert_eq!(expand_tabs("\tx"), format!("{}x", " ".repeat(8)));
        assert_eq!(expand_tabs("+ab\tc"), "+ab     c");
        assert_eq!(expand_tabs("plain"), "plain");
    }

    #[test]
    fn test_token_changes() {
        let (left, right) = token_changes("-let x = foo(1);", "+let x = bar(1);");
        assert_eq!(left.len(), 1);
        assert_eq!(right.len(), 1);
        assert!(&"-let x = foo(1);"[left[0].clone()].contains("foo"));
        assert!(&"+let x = bar(1);"[right[0].clone()].contains("bar"));
    }

    #[test]
    fn test_token_changes_identical_bodies() {
        let (left, right) = token_changes("-same words", "+same words");
        assert!(left.is_empty());
        assert!(right.is_empty());
    }

    #[tokio::test]
    async fn test_render_rows() {
        let sbs = Layout::new(80)
            .same("commit abc")
            .same("--- a/f")
            .same("+++ b/f")
            .same("@@ -1,2 +1,2 @@")
            .same(" ctx")
            .row(Some("-old"), '|', Some("+new"))
            .row(None, '>', Some("+more"))
            .build();
        let mut renderer =
            RowRenderer::new(&sbs, Some(commit(1)), Some(commit(3)), None, Some("x".into()));
        let rows = render_all(&mut renderer, &sbs).await;

        let header = &rows[0];
        assert_eq!(header.marker, RowMarker::Common);
        assert_eq!(header.left.kind, LineKind::Meta);
        assert!(!header.left.changed);

        let context = &rows[4];
        assert_eq!(context.left.kind, LineKind::Context);
        assert_eq!(context.left.text, " ctx");
        assert_eq!(context.left.matches, vec![3..4]);

        let changed = &rows[5];
        assert_eq!(changed.marker, RowMarker::Changed);
        assert_eq!(changed.left.kind, LineKind::Removed);
        assert_eq!(changed.right.kind, LineKind::Added);
        assert!(changed.left.changed && changed.right.changed);
        assert_eq!(changed.left.tokens, vec![1..4]);
        assert_eq!(changed.right.tokens, vec![1..4]);

        let only_right = &rows[6];
        assert_eq!(only_right.left.kind, LineKind::Empty);
        assert_eq!(only_right.right.kind, LineKind::Added);
        assert_eq!(only_right.right.text, "+more");
    }

    #[tokio::test]
    async fn test_unfed_side_keeps_its_position() {
        let sbs = Layout::new(60)
            .same("--- a/f")
            .same("+++ b/f")
            .same("@@ -1,3 +1,3 @@")
            .row(None, '>', Some("+extra"))
            .same(" a")
            .build();
        let mut renderer = RowRenderer::new(&sbs, Some(commit(1)), Some(commit(3)), None, None);
        render_all(&mut renderer, &sbs).await;

        assert_eq!(renderer.left_parser.position().unwrap().old_line, 1);
        assert_eq!(renderer.right_parser.position().unwrap().new_line, 2);
    }

    #[tokio::test]
    async fn test_blank_common_row_advances_both_sides() {
        let sbs = Layout::new(60)
            .row(Some("commit aaa"), '|', Some("commit bbb"))
            .same("")
            .same("    message")
            .build();
        let mut renderer = RowRenderer::new(&sbs, Some(commit(1)), Some(commit(3)), None, None);
        let rows = render_all(&mut renderer, &sbs).await;

        assert_eq!(rows[1].left.kind, LineKind::Empty);
        assert_eq!(rows[2].left.text, "    message");
        assert_eq!(rows[2].right.text, "    message");
    }

    #[tokio::test]
    async fn test_narrow_rows_parse_full_lines() {
        let removed = "-    let value = compute(1);";
        let added = "+    let value = compute(2);";
        let sbs = Layout::new(20)
            .same("--- a/src/deeply/nested/module.rs")
            .same("+++ b/src/deeply/nested/module.rs")
            .same("@@ -118,3 +118,3 @@ fn something()")
            .same(" context")
            .row(Some(removed), '|', Some(added))
            .build();
        assert!(!sbs.lines()[2].contains("@@ -118,3 +118,3 @@"));

        let mut renderer =
            RowRenderer::new(&sbs, Some(commit(1)), Some(commit(3)), None, Some("(2)".into()));
        let rows = render_all(&mut renderer, &sbs).await;

        let position = renderer.left_parser.position().unwrap();
        assert_eq!(position.old_file.as_deref(), Some("src/deeply/nested/module.rs"));
        assert_eq!(position.old_line, 119);
        assert_eq!(renderer.right_parser.position().unwrap().new_line, 119);

        let changed = &rows[4];
        assert_eq!(changed.left.text, removed);
        assert_eq!(changed.right.text, added);
        assert!(&removed[changed.left.tokens[0].clone()].contains('1'));
        assert_eq!(changed.right.matches, vec![24..27]);
    }

    #[tokio::test]
    async fn test_render_with_blame() {
        let test = TestRepo::new();
        let base = test.commit(None, &[("f.txt", "one\ntwo\n")], "base");
        let change = test.commit(Some(base), &[("f.txt", "one\nTWO\n")], "change");
        let change_commit = test.repo.commit(change).unwrap();
        let cache = BlameCache::new(&test.repo, &BlameConfig::default());

        let mut layout = Layout::new(80);
        for line in ["--- a/f.txt", "+++ b/f.txt", "@@ -1,2 +1,2 @@", " one", "-two", "+TWO"] {
            layout = layout.row(None, '>', Some(line));
        }
        let sbs = layout.build();
        let mut renderer = RowRenderer::new(&sbs, None, Some(change_commit.clone()), Some(&cache), None);
        let rows = render_all(&mut renderer, &sbs).await;

        let context = &rows[3];
        assert_eq!(context.right.blame.as_ref().map(|c| c.id), Some(base));
        assert_eq!(context.left.blame, None);
        assert!(!context.right.changed);

        let removed = &rows[4];
        assert_eq!(removed.right.blame.as_ref().map(|c| c.id), Some(base));

        let added = &rows[5];
        assert_eq!(added.right.blame.as_ref(), Some(&change_commit));
    }
}
