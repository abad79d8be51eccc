//! Error types for grr-core.

use std::path::PathBuf;

use grr_git::Oid;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in grr-core operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Not inside a Git repository.
    #[error("not a git repository (or any parent up to mount point)")]
    NotARepository,

    /// A line announced itself as a hunk header but does not follow the grammar.
    #[error("\"{0}\" does not match the hunk header grammar")]
    MalformedHunkHeader(String),

    /// Diff position was queried before any hunk header was seen.
    #[error("cannot get the current diff position outside of a hunk")]
    PositionUnavailable,

    /// Blame was asked for a line the file does not have.
    #[error("line {line} out of range for {path} at {commit} ({len} lines)")]
    BlameLineOutOfRange {
        commit: Oid,
        path: String,
        line: usize,
        len: usize,
    },

    /// Blame could not be computed for a file.
    #[error("blame failed for {path} at {commit}: {message}")]
    BlameFailed {
        commit: Oid,
        path: String,
        message: String,
    },

    /// Producing the side-by-side diff failed.
    #[error("side-by-side diff failed: {0}")]
    SideBySideFailed(String),

    /// A patch id worker thread panicked.
    #[error("patch id worker panicked")]
    WorkerPanicked,

    /// State file parsing error.
    #[error("failed to parse {file}: {message}")]
    StateParseError { file: PathBuf, message: String },

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error.
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Git operation error.
    #[error("git error: {0}")]
    Git(#[from] grr_git::Error),
}
