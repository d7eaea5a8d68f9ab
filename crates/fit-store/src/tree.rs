use fit_types::{ObjectId, HASH_LEN};

use crate::error::{StoreError, StoreResult};
use crate::object::{ObjectKind, StoredObject};
use crate::traits::ObjectStore;

/// File mode for a tree entry.
///
/// Only four modes exist. Any other mode read from a tree, the index or the
/// filesystem is folded onto one of them: `100664` and `100600` become
/// `Regular`, any mode with an execute bit becomes `Executable`. Writing an
/// entry back therefore emits the canonical octal from [`mode_bits`], which
/// may differ from the bytes that were read.
///
/// [`mode_bits`]: EntryMode::mode_bits
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntryMode {
    /// Normal file (0o100644).
    Regular,
    /// Executable file (0o100755).
    Executable,
    /// Symbolic link (0o120000).
    Symlink,
    /// Subtree / directory (0o040000).
    Directory,
}

impl EntryMode {
    /// Octal mode value as written to trees and the index.
    pub fn mode_bits(&self) -> u32 {
        match self {
            Self::Regular => 0o100644,
            Self::Executable => 0o100755,
            Self::Symlink => 0o120000,
            Self::Directory => 0o040000,
        }
    }

    /// Classify raw `st_mode`-style bits by their file-type bits.
    pub fn from_mode_bits(bits: u32) -> Self {
        match bits & 0o170000 {
            0o040000 => Self::Directory,
            0o120000 => Self::Symlink,
            _ if bits & 0o111 != 0 => Self::Executable,
            _ => Self::Regular,
        }
    }

    /// Parse an octal mode string such as `"100644"`. Non-canonical modes
    /// are folded as described on [`EntryMode`].
    pub fn parse_octal(s: &str) -> Option<Self> {
        u32::from_str_radix(s, 8).ok().map(Self::from_mode_bits)
    }

    /// Whether the entry names a subtree.
    pub fn is_dir(&self) -> bool {
        matches!(self, Self::Directory)
    }
}

impl std::fmt::Display for EntryMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:o}", self.mode_bits())
    }
}

/// A single entry in a tree object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeEntry {
    /// File mode (regular, executable, symlink, directory).
    pub mode: EntryMode,
    /// Entry name. Must not contain a NUL byte.
    pub name: String,
    /// Content-addressed ID of the referenced object.
    pub object_id: ObjectId,
}

impl TreeEntry {
    /// Create a new tree entry.
    pub fn new(mode: EntryMode, name: impl Into<String>, object_id: ObjectId) -> Self {
        Self {
            mode,
            name: name.into(),
            object_id,
        }
    }
}

/// Directory listing object (analogous to git tree).
///
/// Entry order is part of the hashed content: two trees listing the same
/// entries in a different order have different ids. Nothing here sorts.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Tree {
    pub entries: Vec<TreeEntry>,
}

impl Tree {
    /// Create a tree with entries in the given order.
    pub fn new(entries: Vec<TreeEntry>) -> Self {
        Self { entries }
    }

    /// Create an empty tree.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Serialize: `"<octal-mode> <name>\0" + 32-byte hash` per entry.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for entry in &self.entries {
            out.extend_from_slice(format!("{} {}", entry.mode, entry.name).as_bytes());
            out.push(0);
            out.extend_from_slice(entry.object_id.as_bytes());
        }
        out
    }

    /// Parse entries until the buffer is exhausted.
    pub fn decode(data: &[u8]) -> StoreResult<Self> {
        let mut entries = Vec::new();
        let mut rest = data;
        while !rest.is_empty() {
            let nul = rest
                .iter()
                .position(|&b| b == 0)
                .ok_or_else(|| StoreError::malformed(ObjectKind::Tree, "entry without NUL"))?;
            let head = std::str::from_utf8(&rest[..nul])
                .map_err(|_| StoreError::malformed(ObjectKind::Tree, "entry name is not UTF-8"))?;
            let (mode, name) = head.split_once(' ').ok_or_else(|| {
                StoreError::malformed(ObjectKind::Tree, format!("entry {head:?} has no mode"))
            })?;
            let mode = EntryMode::parse_octal(mode).ok_or_else(|| {
                StoreError::malformed(ObjectKind::Tree, format!("invalid mode {mode:?}"))
            })?;

            let hash_start = nul + 1;
            let hash_end = hash_start + HASH_LEN;
            if rest.len() < hash_end {
                return Err(StoreError::malformed(
                    ObjectKind::Tree,
                    format!("entry {name:?} truncated before its hash"),
                ));
            }
            let object_id = ObjectId::from_slice(&rest[hash_start..hash_end])
                .map_err(|e| StoreError::malformed(ObjectKind::Tree, e.to_string()))?;

            entries.push(TreeEntry::new(mode, name, object_id));
            rest = &rest[hash_end..];
        }
        Ok(Self { entries })
    }

    /// Convert into a `StoredObject` for storage.
    pub fn to_stored_object(&self) -> StoredObject {
        StoredObject::new(ObjectKind::Tree, self.encode())
    }

    /// Decode from a `StoredObject`.
    pub fn from_stored_object(id: &ObjectId, obj: StoredObject) -> StoreResult<Self> {
        obj.expect_kind(id, ObjectKind::Tree)?;
        Self::decode(&obj.data)
    }

    /// Write this tree to `store`.
    pub fn write_to(&self, store: &dyn ObjectStore) -> StoreResult<ObjectId> {
        store.write(&self.to_stored_object())
    }

    /// Read and decode the tree `id` from `store`.
    pub fn read_from(store: &dyn ObjectStore, id: &ObjectId) -> StoreResult<Self> {
        Self::from_stored_object(id, store.read(id)?)
    }

    /// Look up an entry by name.
    pub fn get(&self, name: &str) -> Option<&TreeEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the tree has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
