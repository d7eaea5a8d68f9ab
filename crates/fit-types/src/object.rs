use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Width of a raw object hash in bytes.
pub const HASH_LEN: usize = 32;

/// Width of the canonical hex form of an object hash.
pub const HASH_HEX_LEN: usize = HASH_LEN * 2;

/// Content-addressed identifier for any stored object.
///
/// An `ObjectId` is the BLAKE3 hash of an object's framed content. Identical
/// frames always produce the same `ObjectId`, which makes objects
/// deduplicatable and lets the hash double as the filesystem address.
///
/// The all-zero id is reserved as the "no object" sentinel (a commit without
/// a parent records it in its parent slot).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId([u8; HASH_LEN]);

impl ObjectId {
    /// Hash raw bytes.
    pub fn digest(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// Create an `ObjectId` from a pre-computed hash.
    pub const fn from_hash(hash: [u8; HASH_LEN]) -> Self {
        Self(hash)
    }

    /// The null object ID (all zeros). Represents "no object".
    pub const fn null() -> Self {
        Self([0u8; HASH_LEN])
    }

    /// Returns `true` if this is the null object ID.
    pub fn is_null(&self) -> bool {
        self.0 == [0u8; HASH_LEN]
    }

    /// The raw 32-byte hash.
    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }

    /// Build from a slice that must be exactly 32 bytes long.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, TypeError> {
        let arr: [u8; HASH_LEN] = bytes.try_into().map_err(|_| TypeError::InvalidLength {
            expected: HASH_LEN,
            actual: bytes.len(),
        })?;
        Ok(Self(arr))
    }

    /// Lowercase hex representation (64 characters).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short hex representation (first 8 characters).
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..4])
    }

    /// Parse from a 64-character hex string.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        if s.len() != HASH_HEX_LEN {
            return Err(TypeError::InvalidLength {
                expected: HASH_HEX_LEN,
                actual: s.len(),
            });
        }
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        Self::from_slice(&bytes)
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.short_hex())
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for ObjectId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl From<[u8; HASH_LEN]> for ObjectId {
    fn from(bytes: [u8; HASH_LEN]) -> Self {
        Self(bytes)
    }
}

impl From<ObjectId> for [u8; HASH_LEN] {
    fn from(id: ObjectId) -> Self {
        id.0
    }
}
