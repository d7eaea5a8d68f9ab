//! High-level API for fit repositories.
//!
//! [`Repository`] ties the object store, refs, index and working tree of one
//! on-disk repository together and exposes the operations the `fit` binary
//! offers: commit and history, branches and checkout, restore, push, pull,
//! clone, and garbage collection.

pub mod commit;
pub mod config;
pub mod error;
pub mod repository;
pub mod workdir;

pub use commit::{BranchInfo, CheckoutTarget, CommitResult, LogEntry, RepoStatus};
pub use config::{CoreConfig, RemoteConfig, RepoConfig, UserConfig};
pub use error::{SdkError, SdkResult};
pub use repository::{Repository, DEFAULT_BRANCH, DEFAULT_LOG_LIMIT, FIT_DIR};

// Re-export key types
pub use fit_dag::{GcOptions, GcReport};
pub use fit_index::{FileStatus, StatusEntry, TreeLayout, WorkdirStatus};
pub use fit_store::{EntryMode, ObjectKind, ObjectStore};
pub use fit_sync::{PullResult, PushResult, Remote};
pub use fit_types::ObjectId;
