use fit_store::ObjectKind;
use fit_types::{ObjectId, HASH_LEN};

use crate::error::{PackError, PackResult};

/// Leading magic of every pack stream.
pub const PACK_MAGIC: [u8; 4] = *b"FPAK";

/// The only pack version understood.
pub const PACK_VERSION: u32 = 1;

/// Size of `magic | version | count`.
pub const PACK_HEADER_LEN: usize = 12;

/// Size of `type | rawlen | hash | complen` preceding each payload.
pub const ENTRY_HEADER_LEN: usize = 4 + 4 + HASH_LEN + 4;

/// Wire tag for an object kind.
pub fn type_tag(kind: ObjectKind) -> u32 {
    match kind {
        ObjectKind::Blob => 1,
        ObjectKind::Tree => 2,
        ObjectKind::Commit => 3,
    }
}

/// Object kind for a wire tag.
pub fn kind_from_tag(tag: u32) -> Option<ObjectKind> {
    match tag {
        1 => Some(ObjectKind::Blob),
        2 => Some(ObjectKind::Tree),
        3 => Some(ObjectKind::Commit),
        _ => None,
    }
}

/// Header of a single pack record. All integers are big-endian on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EntryHeader {
    pub kind: ObjectKind,
    /// Uncompressed payload length.
    pub raw_len: u32,
    /// Id claimed by the sender.
    pub id: ObjectId,
    /// Compressed payload length.
    pub comp_len: u32,
}

impl EntryHeader {
    pub fn encode(&self) -> [u8; ENTRY_HEADER_LEN] {
        let mut out = [0u8; ENTRY_HEADER_LEN];
        out[0..4].copy_from_slice(&type_tag(self.kind).to_be_bytes());
        out[4..8].copy_from_slice(&self.raw_len.to_be_bytes());
        out[8..8 + HASH_LEN].copy_from_slice(self.id.as_bytes());
        out[8 + HASH_LEN..].copy_from_slice(&self.comp_len.to_be_bytes());
        out
    }

    pub fn decode(buf: &[u8; ENTRY_HEADER_LEN]) -> PackResult<Self> {
        let tag = read_u32(&buf[0..4]);
        let kind = kind_from_tag(tag)
            .ok_or_else(|| PackError::bad(format!("unknown object type tag {tag}")))?;
        let mut hash = [0u8; HASH_LEN];
        hash.copy_from_slice(&buf[8..8 + HASH_LEN]);
        Ok(Self {
            kind,
            raw_len: read_u32(&buf[4..8]),
            id: ObjectId::from_hash(hash),
            comp_len: read_u32(&buf[8 + HASH_LEN..]),
        })
    }
}

/// Big-endian u32 from a 4-byte slice.
pub(crate) fn read_u32(bytes: &[u8]) -> u32 {
    let mut arr = [0u8; 4];
    arr.copy_from_slice(&bytes[..4]);
    u32::from_be_bytes(arr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_tags() {
        for (kind, tag) in [
            (ObjectKind::Blob, 1),
            (ObjectKind::Tree, 2),
            (ObjectKind::Commit, 3),
        ] {
            assert_eq!(type_tag(kind), tag);
            assert_eq!(kind_from_tag(tag), Some(kind));
        }
        assert_eq!(kind_from_tag(0), None);
        assert_eq!(kind_from_tag(4), None);
    }

    #[test]
    fn entry_header_layout() {
        let header = EntryHeader {
            kind: ObjectKind::Tree,
            raw_len: 0x0102_0304,
            id: ObjectId::from_hash([9; 32]),
            comp_len: 7,
        };
        let bytes = header.encode();
        assert_eq!(&bytes[0..4], &[0, 0, 0, 2]);
        assert_eq!(&bytes[4..8], &[1, 2, 3, 4]);
        assert_eq!(&bytes[8..40], &[9; 32]);
        assert_eq!(&bytes[40..44], &[0, 0, 0, 7]);
        assert_eq!(EntryHeader::decode(&bytes).unwrap(), header);
    }

    #[test]
    fn unknown_tag_is_bad_pack() {
        let mut bytes = [0u8; ENTRY_HEADER_LEN];
        bytes[3] = 9;
        assert!(matches!(
            EntryHeader::decode(&bytes),
            Err(PackError::BadPack(_))
        ));
    }
}
