use fit_types::ObjectId;

use crate::error::{StoreError, StoreResult};

/// Longest frame header we accept: `"commit "` plus a 20-digit length.
pub(crate) const MAX_HEADER_LEN: usize = 32;

/// The kind of object stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    /// Raw content (file contents, arbitrary data).
    Blob,
    /// Directory listing: ordered entries mapping names to object ids.
    Tree,
    /// Snapshot metadata: tree, parent, author, message.
    Commit,
}

impl ObjectKind {
    /// The type name written into the object frame.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Blob => "blob",
            Self::Tree => "tree",
            Self::Commit => "commit",
        }
    }

    /// Parse a frame type name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "blob" => Some(Self::Blob),
            "tree" => Some(Self::Tree),
            "commit" => Some(Self::Commit),
            _ => None,
        }
    }
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The `"<kind> <len>"` prefix of an object frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameHeader {
    pub kind: ObjectKind,
    pub len: u64,
}

impl FrameHeader {
    /// Render the header including its NUL terminator.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = format!("{} {}", self.kind, self.len).into_bytes();
        out.push(0);
        out
    }

    /// Parse a header (without the NUL terminator).
    pub fn parse(header: &[u8]) -> Result<Self, String> {
        let text = std::str::from_utf8(header).map_err(|_| "header is not UTF-8".to_string())?;
        let (name, len) = text
            .split_once(' ')
            .ok_or_else(|| format!("header {text:?} has no length"))?;
        let kind =
            ObjectKind::from_name(name).ok_or_else(|| format!("unknown object type {name:?}"))?;
        let len = len
            .parse::<u64>()
            .map_err(|_| format!("invalid object length {len:?}"))?;
        Ok(Self { kind, len })
    }
}

/// A stored object: kind tag + payload.
///
/// `StoredObject` is the unit of storage. The store never interprets the
/// payload; typed views ([`Blob`], [`crate::Tree`], [`crate::Commit`]) are
/// layered on top.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredObject {
    /// The type of this object.
    pub kind: ObjectKind,
    /// The raw payload.
    pub data: Vec<u8>,
}

impl StoredObject {
    /// Create a new stored object from kind and data.
    pub fn new(kind: ObjectKind, data: Vec<u8>) -> Self {
        Self { kind, data }
    }

    /// Size of the payload in bytes.
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    /// The frame header for this object.
    pub fn header(&self) -> FrameHeader {
        FrameHeader {
            kind: self.kind,
            len: self.size(),
        }
    }

    /// The full uncompressed frame: `"<kind> <len>\0" + payload`.
    pub fn frame(&self) -> Vec<u8> {
        let mut frame = self.header().encode();
        frame.extend_from_slice(&self.data);
        frame
    }

    /// Compute the content-addressed ID for this object.
    ///
    /// The hash covers the frame, so a blob and a tree with identical payload
    /// bytes still get different ids.
    pub fn compute_id(&self) -> ObjectId {
        ObjectId::digest(&self.frame())
    }

    /// Parse a complete uncompressed frame. `id` is only used for errors.
    pub fn parse_frame(id: &ObjectId, frame: &[u8]) -> StoreResult<Self> {
        let corrupt = |reason: String| StoreError::CorruptObject { id: *id, reason };
        let nul = frame
            .iter()
            .take(MAX_HEADER_LEN + 1)
            .position(|&b| b == 0)
            .ok_or_else(|| corrupt("frame header is not NUL-terminated".into()))?;
        let header = FrameHeader::parse(&frame[..nul]).map_err(corrupt)?;
        let payload = &frame[nul + 1..];
        if payload.len() as u64 != header.len {
            return Err(corrupt(format!(
                "payload length mismatch: declared {}, found {}",
                header.len,
                payload.len()
            )));
        }
        Ok(Self::new(header.kind, payload.to_vec()))
    }

    /// Fail with `CorruptObject` unless this object has the expected kind.
    pub fn expect_kind(&self, id: &ObjectId, kind: ObjectKind) -> StoreResult<()> {
        if self.kind != kind {
            return Err(StoreError::CorruptObject {
                id: *id,
                reason: format!("expected {kind}, got {}", self.kind),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Blob
// ---------------------------------------------------------------------------

/// Raw content object (analogous to git blob).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Blob {
    pub data: Vec<u8>,
}

impl Blob {
    /// Create a new blob from raw bytes.
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// Convert into a `StoredObject` for storage.
    pub fn to_stored_object(&self) -> StoredObject {
        StoredObject::new(ObjectKind::Blob, self.data.clone())
    }

    /// Decode from a `StoredObject`.
    pub fn from_stored_object(id: &ObjectId, obj: StoredObject) -> StoreResult<Self> {
        obj.expect_kind(id, ObjectKind::Blob)?;
        Ok(Self { data: obj.data })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_layout() {
        let obj = StoredObject::new(ObjectKind::Blob, b"hi".to_vec());
        assert_eq!(obj.frame(), b"blob 2\0hi");
    }

    #[test]
    fn id_is_hash_of_frame() {
        let obj = StoredObject::new(ObjectKind::Commit, b"payload".to_vec());
        assert_eq!(obj.compute_id(), ObjectId::digest(b"commit 7\0payload"));
    }

    #[test]
    fn different_kinds_produce_different_ids() {
        let data = b"same data".to_vec();
        let blob = StoredObject::new(ObjectKind::Blob, data.clone());
        let tree = StoredObject::new(ObjectKind::Tree, data);
        assert_ne!(blob.compute_id(), tree.compute_id());
    }

    #[test]
    fn header_parse_roundtrip() {
        let header = FrameHeader {
            kind: ObjectKind::Tree,
            len: 1234,
        };
        let encoded = header.encode();
        assert_eq!(encoded.last(), Some(&0));
        let parsed = FrameHeader::parse(&encoded[..encoded.len() - 1]).unwrap();
        assert_eq!(parsed, header);
    }

    #[test]
    fn header_parse_rejects_garbage() {
        assert!(FrameHeader::parse(b"blob").is_err());
        assert!(FrameHeader::parse(b"blob x").is_err());
        assert!(FrameHeader::parse(b"snapshot 3").is_err());
        assert!(FrameHeader::parse(&[0xff, b' ', b'1']).is_err());
    }

    #[test]
    fn parse_frame_inverts_frame() {
        let obj = StoredObject::new(ObjectKind::Commit, b"a\0b".to_vec());
        let id = obj.compute_id();
        assert_eq!(StoredObject::parse_frame(&id, &obj.frame()).unwrap(), obj);
    }

    #[test]
    fn parse_frame_rejects_bad_frames() {
        let id = ObjectId::null();
        for frame in [&b"blob 5\0abc"[..], b"blob 3abc", b"tag 1\0x", b""] {
            assert!(matches!(
                StoredObject::parse_frame(&id, frame),
                Err(StoreError::CorruptObject { .. })
            ));
        }
    }

    #[test]
    fn blob_kind_mismatch() {
        let stored = StoredObject::new(ObjectKind::Tree, b"not a blob".to_vec());
        let id = stored.compute_id();
        let err = Blob::from_stored_object(&id, stored).unwrap_err();
        assert!(matches!(err, StoreError::CorruptObject { .. }));
    }

    #[test]
    fn object_kind_names() {
        for kind in [ObjectKind::Blob, ObjectKind::Tree, ObjectKind::Commit] {
            assert_eq!(ObjectKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(ObjectKind::from_name("pack"), None);
    }
}
