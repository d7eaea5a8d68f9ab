//! Commit graph operations for fit.
//!
//! Commits form a linear, acyclic chain through their `parent` field, and
//! each commit reaches a tree of subtrees and blobs. This crate walks that
//! graph: history listing, the object closure a transfer needs, and the
//! mark-and-sweep garbage collector.
//!
//! Dangling references are a legal state. A missing commit ends a walk and a
//! missing tree or blob is skipped; neither is an error here.

pub mod closure;
pub mod error;
pub mod gc;
pub mod history;

pub use closure::{object_closure, transfer_set};
pub use error::{DagError, DagResult};
pub use gc::{collect_garbage, mark_reachable, GcOptions, GcReport};
pub use history::{walk_chain, ChainEntry, MAX_CHAIN_LENGTH};
