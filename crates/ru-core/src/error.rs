//! Error types for rooutil

use thiserror::Error;

use crate::kind::BranchKind;

/// rooutil error type
#[derive(Error, Debug)]
pub enum Error {
    /// Branch was never created for the requested type.
    #[error("unknown branch '{name}' ({kind})")]
    UnknownBranch {
        /// Branch name.
        name: String,
        /// Kind the caller asked for.
        kind: BranchKind,
    },

    /// Branch name already exists in the tree.
    #[error("branch '{name}' already exists ({kind})")]
    DuplicateBranch {
        /// Branch name.
        name: String,
        /// Kind of the existing branch.
        kind: BranchKind,
    },

    /// Branch exists, but with a different type.
    #[error("branch '{name}' is {found}, requested as {expected}")]
    TypeMismatch {
        /// Branch name.
        name: String,
        /// Kind the caller asked for.
        expected: BranchKind,
        /// Kind the branch was created with.
        found: BranchKind,
    },

    /// Entry index past the end of the tree.
    #[error("entry {entry} out of range (tree has {entries} entries)")]
    EntryOutOfRange {
        /// Requested entry.
        entry: u64,
        /// Number of entries in the tree.
        entries: u64,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Arrow error
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Parquet read/write error
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
