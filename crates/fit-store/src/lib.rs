//! Content-addressed object storage for fit.
//!
//! This crate implements a hash-keyed object store analogous to git's
//! `.git/objects/` directory. Every object -- blob, tree, commit -- is stored
//! as an immutable, zstd-compressed frame `"<kind> <len>\0<payload>"`
//! identified by the BLAKE3 hash of that uncompressed frame.
//!
//! # Object Types
//!
//! - [`Blob`] -- raw content (file contents, arbitrary data)
//! - [`Tree`] -- ordered directory listing mapping names to object ids
//! - [`Commit`] -- tree, parent, author, timestamp, and message
//!
//! # Storage Backends
//!
//! All backends implement the [`ObjectStore`] trait:
//!
//! - [`LooseObjectStore`] -- one compressed file per object under `objects/`
//! - [`InMemoryObjectStore`] -- `HashMap`-based store for tests
//!
//! # Design Rules
//!
//! 1. Objects are immutable once written (content-addressing guarantees this).
//! 2. Writing identical content twice is a harmless no-op.
//! 3. Objects are only ever deleted by garbage collection.
//! 4. Missing objects surface as [`StoreError::NotFound`]; dangling references
//!    are a legitimate state, not a panic.

pub mod commit;
pub mod error;
pub mod loose;
pub mod memory;
pub mod object;
pub mod traits;
pub mod tree;

pub use commit::Commit;
pub use error::{StoreError, StoreResult};
pub use loose::{LooseObjectStore, DEFAULT_COMPRESSION_LEVEL};
pub use memory::InMemoryObjectStore;
pub use object::{Blob, FrameHeader, ObjectKind, StoredObject};
pub use traits::ObjectStore;
pub use tree::{EntryMode, Tree, TreeEntry};
