//! `git-review-rebase legend` command - Explain the match list markers.

use grr_core::MARKERS;

use crate::output;

/// Print one line per marker.
#[allow(clippy::unnecessary_wraps)]
pub fn run() -> anyhow::Result<()> {
    for marker in &MARKERS {
        output::detail(&output::legend_line(
            marker.flag,
            marker.character,
            marker.definition,
        ));
    }
    Ok(())
}
