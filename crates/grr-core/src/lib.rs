//! # grr-core
//!
//! Review engine for git-review-rebase: pairs the commits of a branch
//! before and after a rebase, classifies every pair, and renders the
//! side-by-side diff of a pair with optional blame attribution.

mod blame;
mod branch_range;
mod cache;
mod config;
mod diff_parser;
mod error;
mod filter;
mod flags;
mod matching;
mod patch_id;
mod render;
mod session;
mod side_by_side;
mod state;
#[cfg(test)]
mod test_support;
mod traits;

pub use blame::{BlameCache, BlameInfo};
pub use branch_range::BranchRange;
pub use cache::{CachePolicy, MemoryPatchIdCache, RefPatchIdCache, cached_patch_id_ref};
pub use config::{BlameConfig, Config, DiffConfig, GeneralConfig};
pub use diff_parser::{DiffParser, DiffPosition};
pub use error::{Error, Result};
pub use filter::{FilterType, MatchFilter, cell_text};
pub use flags::{MARKERS, Marker, MatchFlags};
pub use matching::{CommitMatch, CommitMatches, MatchSummary};
pub use patch_id::{PatchIds, resolve_patch_ids};
pub use render::{Cell, DiffRow, LineKind, RowMarker, RowRenderer, column_widths};
pub use session::DiffSession;
pub use side_by_side::{DiffSettings, MIN_WIDTH, SideBySide};
pub use state::{ReviewEntry, ReviewLedger, State};
pub use traits::PatchIdCache;
