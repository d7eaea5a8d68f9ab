//! Staging index for fit.
//!
//! The index is the ordered list of `(path, blob id, mode)` triples that
//! becomes the tree of the next commit. It is persisted as a text file, one
//! entry per line, and rewritten in full on every save.
//!
//! # Key Types
//!
//! - [`Index`] -- The staging area (insertion-ordered, unique by path)
//! - [`IndexEntry`] -- A tracked file entry
//! - [`TreeLayout`] -- Nested or flat tree construction
//! - [`WorkdirStatus`] -- Result of status computation
//! - [`FileStatus`] -- Kind of change (New, Modified, Deleted)

pub mod entry;
pub mod error;
pub mod index;
pub mod status;
pub mod tree;

pub use entry::IndexEntry;
pub use error::{IndexError, IndexResult};
pub use index::Index;
pub use status::{FileStatus, StatusEntry, WorkdirStatus};
pub use tree::{build_tree, flatten_tree, TreeLayout};
