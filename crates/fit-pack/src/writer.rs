use std::io::Write;

use fit_store::StoredObject;
use fit_types::ObjectId;
use tracing::debug;

use crate::entry::{EntryHeader, PACK_MAGIC, PACK_VERSION};
use crate::error::{PackError, PackResult};

/// Default zstd level for pack records.
pub const DEFAULT_PACK_LEVEL: i32 = 3;

/// Streams a pack to any `Write` sink.
///
/// The record count is part of the header, so it must be known up front;
/// [`PackWriter::finish`] checks that exactly that many records were written.
pub struct PackWriter<W: Write> {
    sink: W,
    declared: u32,
    written: u32,
    level: i32,
}

impl<W: Write> PackWriter<W> {
    /// Write the pack header announcing `count` records.
    pub fn new(sink: W, count: u32) -> PackResult<Self> {
        Self::with_level(sink, count, DEFAULT_PACK_LEVEL)
    }

    /// Like [`PackWriter::new`] with an explicit zstd level.
    pub fn with_level(mut sink: W, count: u32, level: i32) -> PackResult<Self> {
        sink.write_all(&PACK_MAGIC)?;
        sink.write_all(&PACK_VERSION.to_be_bytes())?;
        sink.write_all(&count.to_be_bytes())?;
        Ok(Self {
            sink,
            declared: count,
            written: 0,
            level,
        })
    }

    /// Append one record. Each payload is compressed independently.
    pub fn write_object(&mut self, id: &ObjectId, object: &StoredObject) -> PackResult<()> {
        if self.written == self.declared {
            return Err(PackError::bad(format!(
                "more records than the {} declared",
                self.declared
            )));
        }
        let raw_len = u32::try_from(object.data.len())
            .map_err(|_| PackError::bad(format!("object {id} exceeds 4 GiB")))?;
        let compressed = zstd::encode_all(object.data.as_slice(), self.level)?;
        let comp_len = u32::try_from(compressed.len())
            .map_err(|_| PackError::bad(format!("object {id} compresses past 4 GiB")))?;

        let header = EntryHeader {
            kind: object.kind,
            raw_len,
            id: *id,
            comp_len,
        };
        self.sink.write_all(&header.encode())?;
        self.sink.write_all(&compressed)?;
        self.written += 1;
        debug!(id = %id.short_hex(), kind = %object.kind, raw_len, comp_len, "packed object");
        Ok(())
    }

    /// Records written so far.
    pub fn written(&self) -> u32 {
        self.written
    }

    /// Flush and return the sink.
    pub fn finish(mut self) -> PackResult<W> {
        if self.written != self.declared {
            return Err(PackError::bad(format!(
                "declared {} records, wrote {}",
                self.declared, self.written
            )));
        }
        self.sink.flush()?;
        Ok(self.sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{ENTRY_HEADER_LEN, PACK_HEADER_LEN};
    use fit_store::ObjectKind;

    #[test]
    fn empty_pack_is_just_a_header() {
        let bytes = PackWriter::new(Vec::new(), 0).unwrap().finish().unwrap();
        assert_eq!(bytes, b"FPAK\0\0\0\x01\0\0\0\0");
    }

    #[test]
    fn record_follows_header() {
        let obj = StoredObject::new(ObjectKind::Blob, b"hello".to_vec());
        let id = obj.compute_id();
        let mut writer = PackWriter::new(Vec::new(), 1).unwrap();
        writer.write_object(&id, &obj).unwrap();
        let bytes = writer.finish().unwrap();

        assert_eq!(&bytes[8..12], &1u32.to_be_bytes());
        let rec = &bytes[PACK_HEADER_LEN..];
        assert_eq!(&rec[0..4], &1u32.to_be_bytes());
        assert_eq!(&rec[4..8], &5u32.to_be_bytes());
        assert_eq!(&rec[8..40], id.as_bytes());
        let comp_len = u32::from_be_bytes(rec[40..44].try_into().unwrap()) as usize;
        assert_eq!(rec.len(), ENTRY_HEADER_LEN + comp_len);
        assert_eq!(zstd::decode_all(&rec[44..]).unwrap(), b"hello");
    }

    #[test]
    fn count_mismatch_is_rejected() {
        let obj = StoredObject::new(ObjectKind::Blob, b"x".to_vec());
        let id = obj.compute_id();

        let short = PackWriter::new(Vec::new(), 2).unwrap();
        assert!(matches!(short.finish(), Err(PackError::BadPack(_))));

        let mut over = PackWriter::new(Vec::new(), 0).unwrap();
        assert!(over.write_object(&id, &obj).is_err());
    }
}
