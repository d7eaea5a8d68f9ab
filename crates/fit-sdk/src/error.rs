use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("not a fit repository (or any parent): {}", .0.display())]
    NotInitialized(PathBuf),

    #[error("repository already exists at {}", .0.display())]
    AlreadyInitialized(PathBuf),

    #[error("branch not found: {0}")]
    BranchNotFound(String),

    #[error("branch already exists: {0}")]
    BranchExists(String),

    #[error("unknown revision: {0}")]
    UnknownRevision(String),

    #[error("ambiguous revision {prefix}: {matches} objects match")]
    AmbiguousRevision { prefix: String, matches: usize },

    #[error("{0} is not a commit")]
    NotACommit(String),

    #[error("no commits yet")]
    NoCommits,

    #[error("working tree has {0} uncommitted change(s)")]
    DirtyWorkingTree(usize),

    #[error("another gc holds the lock {}", .0.display())]
    Locked(PathBuf),

    #[error("refusing to write outside the working tree: {0}")]
    UnsafePath(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("store error: {0}")]
    Store(#[from] fit_store::StoreError),

    #[error("ref error: {0}")]
    Ref(#[from] fit_refs::RefError),

    #[error("index error: {0}")]
    Index(#[from] fit_index::IndexError),

    #[error("graph error: {0}")]
    Dag(#[from] fit_dag::DagError),

    #[error("sync error: {0}")]
    Sync(#[from] fit_sync::SyncError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SdkResult<T> = Result<T, SdkError>;
