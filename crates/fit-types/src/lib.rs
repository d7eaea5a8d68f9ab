//! Foundation types for fit.
//!
//! Every other fit crate depends on `fit-types`. The only identity in the
//! system is the [`ObjectId`]: a BLAKE3 digest of an object's framed
//! content, which doubles as its on-disk address.

pub mod error;
pub mod object;

pub use error::TypeError;
pub use object::{ObjectId, HASH_HEX_LEN, HASH_LEN};
