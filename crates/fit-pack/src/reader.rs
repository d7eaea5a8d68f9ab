use std::io::{ErrorKind, Read};

use fit_store::StoredObject;
use tracing::debug;

use crate::entry::{read_u32, EntryHeader, ENTRY_HEADER_LEN, PACK_HEADER_LEN, PACK_MAGIC, PACK_VERSION};
use crate::error::{PackError, PackResult};

/// One decoded pack record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackRecord {
    pub header: EntryHeader,
    pub object: StoredObject,
}

/// Reads records sequentially from a pack stream.
pub struct PackReader<R: Read> {
    source: R,
    count: u32,
    read: u32,
    failed: bool,
}

impl<R: Read> PackReader<R> {
    /// Read and validate the pack header.
    pub fn new(mut source: R) -> PackResult<Self> {
        let mut header = [0u8; PACK_HEADER_LEN];
        read_exact_or_bad(&mut source, &mut header, "pack header")?;
        if header[0..4] != PACK_MAGIC {
            let mut actual = [0u8; 4];
            actual.copy_from_slice(&header[0..4]);
            return Err(PackError::InvalidMagic { actual });
        }
        let version = read_u32(&header[4..8]);
        if version != PACK_VERSION {
            return Err(PackError::UnsupportedVersion(version));
        }
        Ok(Self {
            source,
            count: read_u32(&header[8..12]),
            read: 0,
            failed: false,
        })
    }

    /// Record count announced by the header.
    pub fn declared_count(&self) -> u32 {
        self.count
    }

    /// Decode the next record, or `None` once `count` records were read.
    ///
    /// The payload is decompressed with `raw_len` as an exact bound: a
    /// payload that inflates to more or fewer bytes is a bad pack.
    pub fn next_record(&mut self) -> PackResult<Option<PackRecord>> {
        let Some(header) = self.next_header()? else {
            return Ok(None);
        };

        let mut compressed = Vec::new();
        (&mut self.source)
            .take(u64::from(header.comp_len))
            .read_to_end(&mut compressed)?;
        if compressed.len() != header.comp_len as usize {
            return Err(PackError::bad(format!(
                "record {} truncated: expected {} compressed bytes, got {}",
                header.id,
                header.comp_len,
                compressed.len()
            )));
        }

        let decoder = zstd::stream::read::Decoder::new(compressed.as_slice())?;
        let mut data = Vec::with_capacity(header.raw_len as usize);
        decoder
            .take(u64::from(header.raw_len) + 1)
            .read_to_end(&mut data)
            .map_err(|e| PackError::bad(format!("record {}: {e}", header.id)))?;
        if data.len() != header.raw_len as usize {
            return Err(PackError::bad(format!(
                "record {}: declared {} bytes, inflated to {}",
                header.id,
                header.raw_len,
                data.len()
            )));
        }

        Ok(Some(PackRecord {
            object: StoredObject::new(header.kind, data),
            header,
        }))
    }

    fn next_header(&mut self) -> PackResult<Option<EntryHeader>> {
        if self.read == self.count {
            return Ok(None);
        }
        let mut buf = [0u8; ENTRY_HEADER_LEN];
        read_exact_or_bad(&mut self.source, &mut buf, "record header")?;
        self.read += 1;
        EntryHeader::decode(&buf).map(Some)
    }

    /// Header of the first record of a pack, if it has one.
    pub fn first_record(source: R) -> PackResult<Option<EntryHeader>> {
        let mut reader = Self::new(source)?;
        let header = reader.next_header()?;
        debug!(count = reader.count, first = ?header.map(|h| h.id), "peeked pack");
        Ok(header)
    }
}

impl<R: Read> Iterator for PackReader<R> {
    type Item = PackResult<PackRecord>;

    /// Yields each record; stops for good after the first error.
    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let item = self.next_record().transpose();
        self.failed = matches!(item, Some(Err(_)));
        item
    }
}

fn read_exact_or_bad<R: Read>(source: &mut R, buf: &mut [u8], what: &str) -> PackResult<()> {
    source.read_exact(buf).map_err(|e| {
        if e.kind() == ErrorKind::UnexpectedEof {
            PackError::bad(format!("truncated {what}"))
        } else {
            PackError::Io(e)
        }
    })
}
