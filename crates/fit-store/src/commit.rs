use fit_types::ObjectId;

use crate::error::{StoreError, StoreResult};
use crate::object::{ObjectKind, StoredObject};
use crate::traits::ObjectStore;

/// A snapshot: root tree, optional parent, author line, and message.
///
/// The text form is a run of `key value` header lines, a blank line, then the
/// message bytes verbatim:
///
/// ```text
/// tree <hex>
/// parent <hex>          (omitted for a root commit)
/// author <name> <unix-seconds>
///
/// <message>
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Commit {
    /// Root tree of the snapshot.
    pub tree: ObjectId,
    /// Previous commit, or [`ObjectId::null`] for a root commit.
    pub parent: ObjectId,
    /// Author name. May contain spaces.
    pub author: String,
    /// Seconds since the Unix epoch.
    pub timestamp: i64,
    /// Message bytes, stored verbatim.
    pub message: Vec<u8>,
}

impl Commit {
    pub fn new(
        tree: ObjectId,
        parent: ObjectId,
        author: impl Into<String>,
        timestamp: i64,
        message: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            tree,
            parent,
            author: author.into(),
            timestamp,
            message: message.into(),
        }
    }

    /// Whether this commit has a parent.
    pub fn has_parent(&self) -> bool {
        !self.parent.is_null()
    }

    /// The message as text, replacing invalid UTF-8.
    pub fn message_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.message)
    }

    /// First line of the message.
    pub fn summary(&self) -> String {
        self.message_str().lines().next().unwrap_or_default().to_string()
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = format!("tree {}\n", self.tree).into_bytes();
        if self.has_parent() {
            out.extend_from_slice(format!("parent {}\n", self.parent).as_bytes());
        }
        out.extend_from_slice(format!("author {} {}\n\n", self.author, self.timestamp).as_bytes());
        out.extend_from_slice(&self.message);
        out
    }

    /// Parse the text form. Unknown header keys are ignored.
    pub fn decode(data: &[u8]) -> StoreResult<Self> {
        let mut tree = None;
        let mut parent = ObjectId::null();
        let mut author = String::new();
        let mut timestamp = 0i64;

        let mut rest = data;
        loop {
            let Some(nl) = rest.iter().position(|&b| b == b'\n') else {
                // Headers ran to the end without a blank line: no message.
                if !rest.is_empty() {
                    Self::apply_header(rest, &mut tree, &mut parent, &mut author, &mut timestamp)?;
                }
                rest = &[];
                break;
            };
            let line = &rest[..nl];
            rest = &rest[nl + 1..];
            if line.is_empty() {
                break;
            }
            Self::apply_header(line, &mut tree, &mut parent, &mut author, &mut timestamp)?;
        }

        let tree = tree.ok_or_else(|| StoreError::malformed(ObjectKind::Commit, "missing tree"))?;
        Ok(Self {
            tree,
            parent,
            author,
            timestamp,
            message: rest.to_vec(),
        })
    }

    fn apply_header(
        line: &[u8],
        tree: &mut Option<ObjectId>,
        parent: &mut ObjectId,
        author: &mut String,
        timestamp: &mut i64,
    ) -> StoreResult<()> {
        let line = std::str::from_utf8(line)
            .map_err(|_| StoreError::malformed(ObjectKind::Commit, "header is not UTF-8"))?;
        let (key, value) = line.split_once(' ').unwrap_or((line, ""));
        match key {
            "tree" => *tree = Some(parse_id("tree", value)?),
            "parent" => *parent = parse_id("parent", value)?,
            "author" => {
                let (name, ts) = value.rsplit_once(' ').ok_or_else(|| {
                    StoreError::malformed(ObjectKind::Commit, "author line has no timestamp")
                })?;
                *timestamp = ts.parse().map_err(|_| {
                    StoreError::malformed(ObjectKind::Commit, format!("invalid timestamp {ts:?}"))
                })?;
                *author = name.to_string();
            }
            _ => {}
        }
        Ok(())
    }

    pub fn to_stored_object(&self) -> StoredObject {
        StoredObject::new(ObjectKind::Commit, self.encode())
    }

    pub fn from_stored_object(id: &ObjectId, obj: StoredObject) -> StoreResult<Self> {
        obj.expect_kind(id, ObjectKind::Commit)?;
        Self::decode(&obj.data)
    }

    /// Write this commit to `store`.
    pub fn write_to(&self, store: &dyn ObjectStore) -> StoreResult<ObjectId> {
        store.write(&self.to_stored_object())
    }

    /// Read and decode the commit `id` from `store`.
    pub fn read_from(store: &dyn ObjectStore, id: &ObjectId) -> StoreResult<Self> {
        Self::from_stored_object(id, store.read(id)?)
    }
}

fn parse_id(field: &str, value: &str) -> StoreResult<ObjectId> {
    ObjectId::from_hex(value)
        .map_err(|e| StoreError::malformed(ObjectKind::Commit, format!("bad {field} hash: {e}")))
}
