//! Error types for reference operations.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during reference operations.
#[derive(Debug, Error)]
pub enum RefError {
    /// The reference was not found.
    #[error("ref not found: {name}")]
    NotFound { name: String },

    /// HEAD, or the branch it names, does not point at a commit yet.
    #[error("no commits yet")]
    NoCommits,

    /// The branch name is invalid.
    #[error("invalid branch name: {name:?}: {reason}")]
    InvalidBranchName { name: String, reason: String },

    /// Cannot delete the currently checked-out branch.
    #[error("cannot delete current branch: {name}")]
    DeleteCurrentBranch { name: String },

    /// A ref or HEAD file exists but does not parse.
    #[error("malformed ref file {}: {reason}", path.display())]
    Malformed { path: PathBuf, reason: String },

    /// An in-memory lock was poisoned by a panicking writer.
    #[error("ref store lock poisoned")]
    Poisoned,

    /// I/O error during file-based ref operations.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for ref operations.
pub type Result<T> = std::result::Result<T, RefError>;
