//! Error types for commit graph operations.

/// Errors that can occur during graph walks and garbage collection.
#[derive(Debug, thiserror::Error)]
pub enum DagError {
    /// Reading or decoding an object failed.
    #[error("store error: {0}")]
    Store(#[from] fit_store::StoreError),

    /// Reading refs failed.
    #[error("ref error: {0}")]
    Ref(#[from] fit_refs::RefError),
}

/// Convenience alias for DAG results.
pub type DagResult<T> = Result<T, DagError>;
