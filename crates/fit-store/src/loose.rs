//! Filesystem-backed object store.
//!
//! Each object lives in its own file under `objects/<hh>/<rest>`, where
//! `<hh>` is the first two hex characters of its id and `<rest>` the
//! remaining 62. File contents are the zstd-compressed object frame.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};

use fit_types::{ObjectId, HASH_HEX_LEN};
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};
use crate::object::{FrameHeader, StoredObject, MAX_HEADER_LEN};
use crate::traits::ObjectStore;

/// Default zstd compression level.
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 3;

/// Up-front allocation cap when reading a payload; larger payloads grow the
/// buffer as bytes actually arrive.
const PREALLOC_LIMIT: u64 = 1 << 20;

/// Loose-object store rooted at an `objects/` directory.
#[derive(Clone, Debug)]
pub struct LooseObjectStore {
    objects_dir: PathBuf,
    compression_level: i32,
}

impl LooseObjectStore {
    /// Create a store rooted at `objects_dir`. Nothing is touched on disk.
    pub fn new(objects_dir: impl Into<PathBuf>) -> Self {
        Self {
            objects_dir: objects_dir.into(),
            compression_level: DEFAULT_COMPRESSION_LEVEL,
        }
    }

    /// Override the zstd compression level used for new objects.
    pub fn with_compression_level(mut self, level: i32) -> Self {
        self.compression_level = level;
        self
    }

    /// Create the `objects/` directory if it does not exist.
    pub fn init(&self) -> StoreResult<()> {
        fs::create_dir_all(&self.objects_dir)?;
        Ok(())
    }

    /// The root `objects/` directory.
    pub fn objects_dir(&self) -> &Path {
        &self.objects_dir
    }

    /// Path of the file holding `id`.
    pub fn object_path(&self, id: &ObjectId) -> PathBuf {
        let hex = id.to_hex();
        self.objects_dir.join(&hex[..2]).join(&hex[2..])
    }

    fn corrupt(id: &ObjectId, reason: impl Into<String>) -> StoreError {
        StoreError::CorruptObject {
            id: *id,
            reason: reason.into(),
        }
    }

    fn decode_file(id: &ObjectId, file: File) -> StoreResult<StoredObject> {
        let decoder = zstd::stream::read::Decoder::new(file)
            .map_err(|e| Self::corrupt(id, format!("decompression failed: {e}")))?;
        let mut reader = BufReader::new(decoder);

        let mut header = Vec::with_capacity(MAX_HEADER_LEN);
        reader
            .by_ref()
            .take(MAX_HEADER_LEN as u64 + 1)
            .read_until(0, &mut header)
            .map_err(|e| Self::corrupt(id, format!("decompression failed: {e}")))?;
        if header.pop() != Some(0) {
            return Err(Self::corrupt(id, "frame header is not NUL-terminated"));
        }
        let header = FrameHeader::parse(&header).map_err(|reason| Self::corrupt(id, reason))?;

        // The declared length, not the compressed size, bounds the payload.
        let mut data = Vec::with_capacity(header.len.min(PREALLOC_LIMIT) as usize);
        reader
            .take(header.len)
            .read_to_end(&mut data)
            .map_err(|e| Self::corrupt(id, format!("decompression failed: {e}")))?;
        if (data.len() as u64) != header.len {
            return Err(Self::corrupt(
                id,
                format!("payload truncated: declared {}, found {}", header.len, data.len()),
            ));
        }

        Ok(StoredObject::new(header.kind, data))
    }
}

impl ObjectStore for LooseObjectStore {
    fn read(&self, id: &ObjectId) -> StoreResult<StoredObject> {
        let path = self.object_path(id);
        let file = match File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(*id));
            }
            Err(e) => return Err(e.into()),
        };
        Self::decode_file(id, file)
    }

    fn write(&self, object: &StoredObject) -> StoreResult<ObjectId> {
        let frame = object.frame();
        let id = ObjectId::digest(&frame);
        let hex = id.to_hex();
        let dir = self.objects_dir.join(&hex[..2]);
        let path = dir.join(&hex[2..]);
        if path.exists() {
            debug!(id = %id.short_hex(), "object already stored");
            return Ok(id);
        }

        let compressed = zstd::encode_all(frame.as_slice(), self.compression_level)?;

        fs::create_dir_all(&dir)?;

        // Write-then-rename so readers never observe a partial object.
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(&compressed)?;
        tmp.persist(&path).map_err(|e| StoreError::Io(e.error))?;

        debug!(
            id = %id.short_hex(),
            kind = %object.kind,
            size = object.size(),
            compressed = compressed.len(),
            "wrote object"
        );
        Ok(id)
    }

    fn exists(&self, id: &ObjectId) -> StoreResult<bool> {
        Ok(self.object_path(id).is_file())
    }

    fn delete(&self, id: &ObjectId) -> StoreResult<bool> {
        let path = self.object_path(id);
        match fs::remove_file(&path) {
            Ok(()) => {
                if let Some(dir) = path.parent() {
                    // Only succeeds once the fan-out directory is empty.
                    let _ = fs::remove_dir(dir);
                }
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn list(&self) -> StoreResult<Vec<ObjectId>> {
        if !self.objects_dir.exists() {
            return Ok(Vec::new());
        }

        let mut ids = Vec::new();
        for entry in walkdir::WalkDir::new(&self.objects_dir).min_depth(1) {
            let entry = entry.map_err(std::io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let file_name = entry.file_name().to_string_lossy();
            let fan_out = path
                .parent()
                .and_then(|p| p.file_name())
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let hex = format!("{fan_out}{file_name}");

            match (hex.len() == HASH_HEX_LEN, ObjectId::from_hex(&hex)) {
                (true, Ok(id)) if entry.depth() == 2 => ids.push(id),
                _ => warn!(path = %path.display(), "skipping stray file in object store"),
            }
        }
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{Blob, ObjectKind};
    use proptest::prelude::*;

    fn make_store() -> (tempfile::TempDir, LooseObjectStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = LooseObjectStore::new(dir.path().join("objects"));
        store.init().unwrap();
        (dir, store)
    }

    #[test]
    fn write_read_roundtrip() {
        let (_dir, store) = make_store();
        let obj = Blob::new(b"hello world".to_vec()).to_stored_object();
        let id = store.write(&obj).unwrap();
        assert_eq!(id, obj.compute_id());
        assert_eq!(store.read(&id).unwrap(), obj);
    }

    #[test]
    fn object_path_uses_two_level_split() {
        let (_dir, store) = make_store();
        let id = store
            .write(&StoredObject::new(ObjectKind::Blob, b"x".to_vec()))
            .unwrap();
        let hex = id.to_hex();
        let path = store.object_path(&id);
        assert!(path.is_file());
        assert_eq!(path.file_name().unwrap().to_str().unwrap(), &hex[2..]);
        assert_eq!(
            path.parent().unwrap().file_name().unwrap().to_str().unwrap(),
            &hex[..2]
        );
    }

    #[test]
    fn empty_and_nul_payloads_roundtrip() {
        let (_dir, store) = make_store();
        for data in [Vec::new(), vec![0u8; 5], b"a\0b\0\0c".to_vec()] {
            let obj = StoredObject::new(ObjectKind::Blob, data);
            let id = store.write(&obj).unwrap();
            assert_eq!(store.read(&id).unwrap(), obj);
        }
    }

    #[test]
    fn highly_compressible_payload_roundtrips() {
        let (_dir, store) = make_store();
        let obj = StoredObject::new(ObjectKind::Blob, vec![b'a'; 4 * 1024 * 1024]);
        let id = store.write(&obj).unwrap();
        let compressed = fs::metadata(store.object_path(&id)).unwrap().len();
        assert!(compressed * 10 < obj.size());
        assert_eq!(store.read(&id).unwrap().data.len(), 4 * 1024 * 1024);
    }

    #[test]
    fn rewrite_is_harmless() {
        let (_dir, store) = make_store();
        let obj = StoredObject::new(ObjectKind::Tree, Vec::new());
        let id1 = store.write(&obj).unwrap();
        let id2 = store.write(&obj).unwrap();
        assert_eq!(id1, id2);
        assert_eq!(store.list().unwrap(), vec![id1]);
    }

    #[test]
    fn missing_object_is_not_found() {
        let (_dir, store) = make_store();
        let id = ObjectId::digest(b"absent");
        assert!(matches!(store.read(&id), Err(StoreError::NotFound(_))));
        assert!(!store.exists(&id).unwrap());
    }

    #[test]
    fn garbage_file_is_corrupt() {
        let (_dir, store) = make_store();
        let id = ObjectId::digest(b"garbage");
        let path = store.object_path(&id);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"definitely not zstd").unwrap();
        assert!(matches!(
            store.read(&id),
            Err(StoreError::CorruptObject { .. })
        ));
    }

    #[test]
    fn unknown_type_is_corrupt() {
        let (_dir, store) = make_store();
        let id = ObjectId::digest(b"weird");
        let path = store.object_path(&id);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, zstd::encode_all(&b"tag 3\0abc"[..], 3).unwrap()).unwrap();
        assert!(matches!(
            store.read(&id),
            Err(StoreError::CorruptObject { .. })
        ));
    }

    #[test]
    fn truncated_payload_is_corrupt() {
        let (_dir, store) = make_store();
        let id = ObjectId::digest(b"short");
        let path = store.object_path(&id);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, zstd::encode_all(&b"blob 10\0abc"[..], 3).unwrap()).unwrap();
        assert!(matches!(
            store.read(&id),
            Err(StoreError::CorruptObject { .. })
        ));
    }

    #[test]
    fn delete_removes_file() {
        let (_dir, store) = make_store();
        let id = store
            .write(&StoredObject::new(ObjectKind::Blob, b"bye".to_vec()))
            .unwrap();
        assert!(store.delete(&id).unwrap());
        assert!(!store.exists(&id).unwrap());
        assert!(!store.delete(&id).unwrap());
    }

    #[test]
    fn list_skips_stray_files() {
        let (_dir, store) = make_store();
        let id = store
            .write(&StoredObject::new(ObjectKind::Blob, b"keep".to_vec()))
            .unwrap();
        fs::write(store.objects_dir().join("README"), b"stray").unwrap();
        fs::create_dir_all(store.objects_dir().join("zz")).unwrap();
        fs::write(store.objects_dir().join("zz").join("nothex"), b"stray").unwrap();
        assert_eq!(store.list().unwrap(), vec![id]);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn arbitrary_payload_roundtrip(data in proptest::collection::vec(any::<u8>(), 0..2048)) {
            let (_dir, store) = make_store();
            let obj = StoredObject::new(ObjectKind::Blob, data);
            let id = store.write(&obj).unwrap();
            prop_assert_eq!(store.read(&id).unwrap(), obj);
        }
    }
}
