//! Branch references and HEAD for fit.
//!
//! Branches are named, mutable pointers to commit ids stored under
//! `refs/heads/`. HEAD either names a branch (symbolic) or holds a commit id
//! directly (detached); there is exactly one level of indirection.
//!
//! # Modules
//!
//! - [`error`] -- Error types for ref operations
//! - [`types`] -- Core ref types: [`Ref`], [`Head`]
//! - [`traits`] -- The [`RefStore`] trait defining the storage interface
//! - [`names`] -- Branch name validation
//! - [`fs`] -- On-disk [`FsRefStore`] rooted at a repository directory
//! - [`memory`] -- In-memory [`InMemoryRefStore`] for tests

pub mod error;
pub mod fs;
pub mod memory;
pub mod names;
pub mod traits;
pub mod types;

pub use error::{RefError, Result};
pub use fs::FsRefStore;
pub use memory::InMemoryRefStore;
pub use names::{validate_branch_name, MAX_BRANCH_NAME_LEN};
pub use traits::RefStore;
pub use types::{Head, Ref, HEADS_PREFIX};
