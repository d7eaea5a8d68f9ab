//! Error types for the index crate.

/// Errors that can occur during index operations.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// The path does not exist in the working directory.
    #[error("path not found: {0}")]
    NotFound(String),

    /// The path is not tracked by the index.
    #[error("path not in index: {0}")]
    PathNotFound(String),

    /// A line of the index file does not parse.
    #[error("malformed index line {line}: {reason}")]
    Malformed { line: usize, reason: String },

    /// An invalid path was provided (absolute, escaping, or empty).
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// Store operation failed.
    #[error("store error: {0}")]
    Store(#[from] fit_store::StoreError),

    /// I/O error reading the index or the working directory.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias for index results.
pub type IndexResult<T> = Result<T, IndexError>;
