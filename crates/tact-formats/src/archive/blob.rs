//! Archive blobs: opaque concatenations of BLTE-encoded records, addressed by
//! the `(offset, size)` pairs an [`super::index::IndexFile`] resolves from an `EKey`.

use std::io::{Read, Seek, SeekFrom, Write};

use tact_crypto::KeyService;

use crate::blte::BlteReader;

use super::error::ArchiveResult;

/// Random-access reader over one archive blob.
pub struct ArchiveBlobReader<R> {
    inner: R,
}

impl<R: Read + Seek> ArchiveBlobReader<R> {
    /// Wrap an existing reader (a `File`, a `Cursor<&[u8]>`, a memory map cast
    /// to bytes, ...).
    pub const fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Read the raw (still BLTE-encoded) bytes of one record.
    pub fn read_raw(&mut self, offset: u64, size: u32) -> ArchiveResult<Vec<u8>> {
        self.inner.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; size as usize];
        self.inner.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Read one record and decode it to plaintext, consulting `keys` for any
    /// encrypted frames.
    pub fn read_decoded(
        &mut self,
        offset: u64,
        size: u32,
        keys: Option<&dyn KeyService>,
    ) -> ArchiveResult<Vec<u8>> {
        let raw = self.read_raw(offset, size)?;
        let mut reader = BlteReader::open(&raw, keys)?;
        Ok(reader.into_plaintext()?)
    }
}

/// Sequential writer building up one archive blob, tracking the byte offset
/// each appended record landed at.
pub struct ArchiveBlobWriter<W> {
    inner: W,
    offset: u64,
}

impl<W: Write> ArchiveBlobWriter<W> {
    /// Wrap a fresh writer; `offset` starts at zero.
    pub const fn new(inner: W) -> Self {
        Self { inner, offset: 0 }
    }

    /// Current length of the blob written so far.
    pub const fn len(&self) -> u64 {
        self.offset
    }

    /// Whether nothing has been written yet.
    pub const fn is_empty(&self) -> bool {
        self.offset == 0
    }

    /// Append already-BLTE-encoded bytes, returning the offset they were
    /// written at.
    pub fn append(&mut self, encoded: &[u8]) -> ArchiveResult<u64> {
        let offset = self.offset;
        self.inner.write_all(encoded)?;
        self.offset += encoded.len() as u64;
        Ok(offset)
    }

    /// Unwrap the inner writer, e.g. to flush and close a file.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use crate::blte::encode;
    use crate::espec::ESpec;

    use super::*;

    #[test]
    fn writer_tracks_offsets_and_reader_reads_them_back() {
        let record_a = encode(b"hello world", &ESpec::None).expect("encodes");
        let record_b = encode(b"second record", &ESpec::ZLib { level: Some(6) }).expect("encodes");

        let mut writer = ArchiveBlobWriter::new(Vec::new());
        let offset_a = writer.append(&record_a).expect("appends");
        let offset_b = writer.append(&record_b).expect("appends");
        assert_eq!(offset_a, 0);
        assert_eq!(offset_b, record_a.len() as u64);

        let blob = writer.into_inner();
        let mut reader = ArchiveBlobReader::new(Cursor::new(blob));

        let decoded_a = reader
            .read_decoded(offset_a, record_a.len() as u32, None)
            .expect("decodes");
        assert_eq!(decoded_a, b"hello world");

        let decoded_b = reader
            .read_decoded(offset_b, record_b.len() as u32, None)
            .expect("decodes");
        assert_eq!(decoded_b, b"second record");
    }
}
