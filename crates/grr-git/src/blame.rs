//! Parsing of `git blame` output.

use crate::error::{Error, Result};

/// Marker git prints in front of lines attributed to a boundary commit.
const BOUNDARY_MARKER: char = '^';

/// Extract the attributed revision from one line of `git blame` output.
///
/// Lines look like `<sha> (<author> <date> <line>) <content>`. Boundary
/// attributions carry a leading `^` and a shortened sha, so the returned
/// revision may be an abbreviation that still needs resolving.
///
/// # Errors
/// Returns `MalformedBlameLine` if the line does not start with a hex revision.
pub fn blame_revision(line: &str) -> Result<&str> {
    let token = line.split(' ').next().unwrap_or_default();
    let revision = token.strip_prefix(BOUNDARY_MARKER).unwrap_or(token);

    if revision.is_empty() || !revision.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(Error::MalformedBlameLine(line.into()));
    }
    Ok(revision)
}
