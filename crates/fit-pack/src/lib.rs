//! Pack stream format for fit.
//!
//! A pack bundles objects for transfer. It is a flat, sequential stream, so
//! it can be produced straight into a socket or a temp file:
//!
//! ```text
//! magic "FPAK" | version:u32 = 1 | count:u32
//! { type:u32 | rawlen:u32 | hash[32] | complen:u32 | zstd bytes } * count
//! ```
//!
//! All integers are big-endian. Each payload is compressed on its own; there
//! is no delta encoding and no trailer checksum. Receivers recompute every
//! object id on insertion rather than trusting the transmitted hash.

pub mod entry;
pub mod error;
pub mod reader;
pub mod writer;

use std::io::{Read, Write};

use fit_store::ObjectStore;
use fit_types::ObjectId;
use tracing::{debug, info, warn};

pub use entry::{kind_from_tag, type_tag, EntryHeader, PACK_MAGIC, PACK_VERSION};
pub use error::{PackError, PackResult};
pub use reader::{PackReader, PackRecord};
pub use writer::{PackWriter, DEFAULT_PACK_LEVEL};

/// Outcome of [`pack`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PackSummary {
    /// Records written.
    pub objects: usize,
    /// Requested ids absent from the store.
    pub skipped: usize,
}

/// Outcome of [`unpack`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UnpackSummary {
    /// Ids under which objects were stored, in pack order.
    pub ids: Vec<ObjectId>,
    /// Records whose transmitted hash differed from the recomputed one.
    pub mismatched: usize,
}

impl UnpackSummary {
    /// Number of records inserted.
    pub fn objects(&self) -> usize {
        self.ids.len()
    }
}

/// Write the objects named by `ids`, in order, as a pack into `sink`.
///
/// Ids missing from the store are skipped; the header count reflects the
/// records actually written.
pub fn pack<W: Write>(store: &dyn ObjectStore, ids: &[ObjectId], sink: W) -> PackResult<PackSummary> {
    let mut present = Vec::with_capacity(ids.len());
    for id in ids {
        if store.exists(id)? {
            present.push(*id);
        } else {
            debug!(id = %id.short_hex(), "skipping missing object");
        }
    }
    let count = u32::try_from(present.len())
        .map_err(|_| PackError::bad("too many objects for one pack"))?;

    let mut writer = PackWriter::new(sink, count)?;
    for id in &present {
        let object = store.read(id)?;
        writer.write_object(id, &object)?;
    }
    writer.finish()?;

    let summary = PackSummary {
        objects: present.len(),
        skipped: ids.len() - present.len(),
    };
    info!(objects = summary.objects, skipped = summary.skipped, "wrote pack");
    Ok(summary)
}

/// Insert every record of the pack read from `source` into `store`.
///
/// Objects are re-hashed on insertion. A transmitted hash that disagrees is
/// logged and counted; the object is kept under its real id.
pub fn unpack<R: Read>(store: &dyn ObjectStore, source: R) -> PackResult<UnpackSummary> {
    let reader = PackReader::new(source)?;
    let mut summary = UnpackSummary::default();
    for record in reader {
        let record = record?;
        let id = store.write(&record.object)?;
        if id != record.header.id {
            warn!(
                claimed = %record.header.id.short_hex(),
                actual = %id.short_hex(),
                "pack record hash mismatch"
            );
            summary.mismatched += 1;
        }
        summary.ids.push(id);
    }
    info!(
        objects = summary.objects(),
        mismatched = summary.mismatched,
        "unpacked pack"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fit_store::{Blob, Commit, InMemoryObjectStore, LooseObjectStore, ObjectKind, StoredObject, Tree};

    fn seed(store: &dyn ObjectStore) -> Vec<ObjectId> {
        let blob = store
            .write(&Blob::new(b"file contents".to_vec()).to_stored_object())
            .unwrap();
        let tree = Tree::empty().write_to(store).unwrap();
        let commit = Commit::new(tree, ObjectId::null(), "t", 1, "msg")
            .write_to(store)
            .unwrap();
        vec![commit, tree, blob]
    }

    #[test]
    fn pack_unpack_roundtrip() {
        let src = InMemoryObjectStore::new();
        let ids = seed(&src);
        let mut buf = Vec::new();
        let summary = pack(&src, &ids, &mut buf).unwrap();
        assert_eq!(summary, PackSummary { objects: 3, skipped: 0 });

        let dst = InMemoryObjectStore::new();
        let unpacked = unpack(&dst, buf.as_slice()).unwrap();
        assert_eq!(unpacked.ids, ids);
        assert_eq!(unpacked.mismatched, 0);
        for id in &ids {
            assert_eq!(dst.read(id).unwrap(), src.read(id).unwrap());
        }
    }

    #[test]
    fn missing_ids_are_skipped_and_counted() {
        let src = InMemoryObjectStore::new();
        let mut ids = seed(&src);
        ids.insert(1, ObjectId::digest(b"absent"));
        let mut buf = Vec::new();
        let summary = pack(&src, &ids, &mut buf).unwrap();
        assert_eq!(summary, PackSummary { objects: 3, skipped: 1 });
        assert_eq!(&buf[8..12], &3u32.to_be_bytes());
    }

    #[test]
    fn unpack_is_idempotent() {
        let src = InMemoryObjectStore::new();
        let ids = seed(&src);
        let mut buf = Vec::new();
        pack(&src, &ids, &mut buf).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let dst = LooseObjectStore::new(dir.path().join("objects"));
        dst.init().unwrap();
        unpack(&dst, buf.as_slice()).unwrap();
        unpack(&dst, buf.as_slice()).unwrap();
        assert_eq!(dst.list().unwrap().len(), 3);
    }

    #[test]
    fn empty_pack_unpacks_to_nothing() {
        let src = InMemoryObjectStore::new();
        let mut buf = Vec::new();
        pack(&src, &[], &mut buf).unwrap();
        let dst = InMemoryObjectStore::new();
        assert_eq!(unpack(&dst, buf.as_slice()).unwrap().objects(), 0);
        assert!(dst.is_empty());
    }

    #[test]
    fn mismatched_hash_is_stored_under_real_id() {
        let obj = StoredObject::new(ObjectKind::Blob, b"payload".to_vec());
        let liar = ObjectId::digest(b"not the payload");
        let mut writer = PackWriter::new(Vec::new(), 1).unwrap();
        writer.write_object(&liar, &obj).unwrap();
        let buf = writer.finish().unwrap();

        let dst = InMemoryObjectStore::new();
        let summary = unpack(&dst, buf.as_slice()).unwrap();
        assert_eq!(summary.mismatched, 1);
        assert_eq!(summary.ids, vec![obj.compute_id()]);
        assert!(!dst.exists(&liar).unwrap());
    }

    #[test]
    fn garbage_is_rejected() {
        let dst = InMemoryObjectStore::new();
        assert!(matches!(
            unpack(&dst, &b"GIT!\0\0\0\x01\0\0\0\0"[..]),
            Err(PackError::InvalidMagic { .. })
        ));
        assert!(matches!(
            unpack(&dst, &b""[..]),
            Err(PackError::BadPack(_))
        ));
    }
}
