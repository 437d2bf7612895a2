//! Paged, sorted `.index` format: `EKey -> (offset, size)` within one archive blob.
//!
//! Laid out for mmap-style random access: a TOC of `(last_EKey, page_checksum)`
//! pairs lets [`IndexFile::try_get`] binary-search to a single 4 KiB page
//! before binary-searching within it.

use tact_crypto::EKey;

use super::error::{ArchiveError, ArchiveResult};

/// Page size in bytes (`page_size_kb = 4`).
pub const PAGE_SIZE: usize = 4096;
/// On-disk size of one [`IndexEntry`]: 16-byte `EKey` + 4-byte size + 4-byte offset.
pub const ENTRY_SIZE: usize = 24;
/// Entries per page, given [`PAGE_SIZE`] and [`ENTRY_SIZE`].
pub const ENTRIES_PER_PAGE: usize = PAGE_SIZE / ENTRY_SIZE;

const FORMAT_VERSION: u8 = 1;
const KEY_SIZE: u8 = 16;
const CHECKSUM_SIZE: u8 = 8;
const FOOTER_SIZE: usize = 8 + 1 + 1 + 1 + 1 + 1 + 2 + 4 + 16;

/// Bit in `flags_0` marking this index as a group index: an aggregate over
/// several archives' per-archive indices, never consulted by `try_get`.
const FLAG_GROUP_INDEX: u8 = 0x01;

/// One entry of an index page: where a record sits within its archive blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    /// Encoding key identifying the record.
    pub ekey: EKey,
    /// Size of the record's encoded bytes within the archive blob.
    pub size: u32,
    /// Byte offset of the record within the archive blob.
    pub offset: u32,
}

impl IndexEntry {
    fn write_to(self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.ekey.as_bytes());
        out.extend_from_slice(&self.size.to_be_bytes());
        out.extend_from_slice(&self.offset.to_be_bytes());
    }

    fn read_from(bytes: &[u8]) -> Self {
        let mut ekey_bytes = [0u8; 16];
        ekey_bytes.copy_from_slice(&bytes[0..16]);
        let size = u32::from_be_bytes(bytes[16..20].try_into().expect("4 bytes"));
        let offset = u32::from_be_bytes(bytes[20..24].try_into().expect("4 bytes"));
        Self {
            ekey: EKey::from_bytes(ekey_bytes),
            size,
            offset,
        }
    }
}

/// A parsed `.index` file: a sorted, paged `EKey -> IndexEntry` map.
#[derive(Debug, Clone)]
pub struct IndexFile {
    pages: Vec<Vec<IndexEntry>>,
    page_checksums: Vec<[u8; 8]>,
    is_group_index: bool,
}

impl IndexFile {
    /// Build an index file from entries already sorted and deduplicated by `EKey`.
    ///
    /// Returns [`ArchiveError::UnsortedEntries`] if the invariant doesn't hold.
    pub fn build(entries: &[IndexEntry], is_group_index: bool) -> ArchiveResult<Self> {
        if !entries.windows(2).all(|w| w[0].ekey < w[1].ekey) {
            return Err(ArchiveError::UnsortedEntries);
        }

        let pages: Vec<Vec<IndexEntry>> = entries
            .chunks(ENTRIES_PER_PAGE)
            .map(<[IndexEntry]>::to_vec)
            .collect();
        let page_checksums = pages.iter().map(|p| page_checksum(p)).collect();

        Ok(Self {
            pages,
            page_checksums,
            is_group_index,
        })
    }

    /// Whether this index is a group index (aggregate footer only; never
    /// consulted by [`Self::try_get`]).
    pub const fn is_group_index(&self) -> bool {
        self.is_group_index
    }

    /// Total number of entries across all pages.
    pub fn len(&self) -> usize {
        self.pages.iter().map(Vec::len).sum()
    }

    /// Whether the index has no entries.
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Look up an `EKey`. Always `None` for a group index — callers should
    /// check [`Self::is_group_index`] before calling, but this is also safe
    /// to call directly since a group index is built with no searchable pages
    /// wired into the caller's active set.
    pub fn try_get(&self, ekey: EKey) -> Option<IndexEntry> {
        let page_index = self
            .pages
            .iter()
            .position(|page| page.last().is_some_and(|e| e.ekey >= ekey))?;
        let page = &self.pages[page_index];
        page.binary_search_by_key(&ekey, |e| e.ekey)
            .ok()
            .map(|i| page[i])
    }

    /// Serialize to the on-disk `.index` byte layout.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.pages.len() * PAGE_SIZE + FOOTER_SIZE);

        for page in &self.pages {
            let start = out.len();
            for entry in page {
                entry.write_to(&mut out);
            }
            out.resize(start + PAGE_SIZE, 0);
        }

        let mut toc = Vec::with_capacity(self.pages.len() * 24);
        for (page, checksum) in self.pages.iter().zip(&self.page_checksums) {
            let last = page.last().expect("pages are never empty");
            toc.extend_from_slice(last.ekey.as_bytes());
            toc.extend_from_slice(checksum);
        }
        let toc_checksum = md5_truncated8(&toc);
        out.extend_from_slice(&toc);

        let mut footer = Vec::with_capacity(FOOTER_SIZE);
        footer.extend_from_slice(&toc_checksum);
        footer.push(FORMAT_VERSION);
        footer.push(KEY_SIZE);
        footer.push(CHECKSUM_SIZE);
        footer.push(u8::from(self.is_group_index) * FLAG_GROUP_INDEX);
        footer.push(0); // flags_1, reserved
        #[allow(clippy::cast_possible_truncation)]
        footer.extend_from_slice(&((PAGE_SIZE / 1024) as u16).to_le_bytes());
        #[allow(clippy::cast_possible_truncation)]
        footer.extend_from_slice(&(self.pages.len() as u32).to_le_bytes());
        let footer_checksum: [u8; 16] = md5::compute(&footer).into();
        footer.extend_from_slice(&footer_checksum);

        out.extend_from_slice(&footer);
        out
    }

    /// Parse an on-disk `.index` file, validating the footer, TOC, and every
    /// page checksum. A mismatch at any level fails the whole file — this is
    /// the unit of `Corrupt` in the surrounding engine (§4.5).
    pub fn parse(data: &[u8]) -> ArchiveResult<Self> {
        if data.len() < FOOTER_SIZE {
            return Err(ArchiveError::TruncatedFooter(data.len()));
        }

        let footer_start = data.len() - FOOTER_SIZE;
        let footer = &data[footer_start..];

        let recorded_checksum = &footer[FOOTER_SIZE - 16..];
        let computed_checksum: [u8; 16] = md5::compute(&footer[..FOOTER_SIZE - 16]).into();
        if recorded_checksum != computed_checksum {
            return Err(ArchiveError::FooterChecksum);
        }

        let toc_checksum: [u8; 8] = footer[0..8].try_into().expect("8 bytes");
        let version = footer[8];
        if version != FORMAT_VERSION {
            return Err(ArchiveError::UnsupportedVersion(version));
        }
        let key_size = footer[9];
        if key_size != KEY_SIZE {
            return Err(ArchiveError::InvalidKeySize(key_size));
        }
        let checksum_size = footer[10];
        if checksum_size != CHECKSUM_SIZE {
            return Err(ArchiveError::InvalidChecksumSize(checksum_size));
        }
        let flags_0 = footer[11];
        let is_group_index = flags_0 & FLAG_GROUP_INDEX != 0;
        let num_pages =
            u32::from_le_bytes(footer[14..18].try_into().expect("4 bytes")) as usize;

        let toc_size = num_pages * 24;
        if footer_start < toc_size {
            return Err(ArchiveError::TruncatedFooter(data.len()));
        }
        let toc_start = footer_start - toc_size;
        let toc = &data[toc_start..footer_start];
        if md5_truncated8(toc) != toc_checksum {
            return Err(ArchiveError::TocChecksum);
        }

        if toc_start < num_pages * PAGE_SIZE {
            return Err(ArchiveError::TruncatedFooter(data.len()));
        }

        let mut pages = Vec::with_capacity(num_pages);
        let mut page_checksums = Vec::with_capacity(num_pages);
        let mut last_ekey: Option<EKey> = None;

        for page_index in 0..num_pages {
            let page_start = page_index * PAGE_SIZE;
            let page_bytes = &data[page_start..page_start + PAGE_SIZE];

            let toc_entry = &toc[page_index * 24..(page_index + 1) * 24];
            let recorded_page_checksum: [u8; 8] = toc_entry[16..24].try_into().expect("8 bytes");
            let actual_page_checksum = md5_truncated8(page_bytes);
            if actual_page_checksum != recorded_page_checksum {
                return Err(ArchiveError::PageChecksum { page: page_index });
            }

            let mut entries = Vec::with_capacity(ENTRIES_PER_PAGE);
            for chunk_start in (0..PAGE_SIZE).step_by(ENTRY_SIZE) {
                let chunk = &page_bytes[chunk_start..chunk_start + ENTRY_SIZE];
                if chunk.iter().all(|&b| b == 0) {
                    break;
                }
                entries.push(IndexEntry::read_from(chunk));
            }

            if !entries.windows(2).all(|w| w[0].ekey < w[1].ekey) {
                return Err(ArchiveError::UnsortedEntries);
            }
            if let (Some(last), Some(first)) = (last_ekey, entries.first()) {
                if last >= first.ekey {
                    return Err(ArchiveError::UnsortedEntries);
                }
            }
            last_ekey = entries.last().map(|e| e.ekey);

            pages.push(entries);
            page_checksums.push(recorded_page_checksum);
        }

        Ok(Self {
            pages,
            page_checksums,
            is_group_index,
        })
    }
}

fn page_checksum(page: &[IndexEntry]) -> [u8; 8] {
    let mut bytes = Vec::with_capacity(PAGE_SIZE);
    for entry in page {
        entry.write_to(&mut bytes);
    }
    bytes.resize(PAGE_SIZE, 0);
    md5_truncated8(&bytes)
}

fn md5_truncated8(data: &[u8]) -> [u8; 8] {
    let full: [u8; 16] = md5::compute(data).into();
    let mut out = [0u8; 8];
    out.copy_from_slice(&full[0..8]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(byte: u8, size: u32, offset: u32) -> IndexEntry {
        IndexEntry {
            ekey: EKey::from_bytes([byte; 16]),
            size,
            offset,
        }
    }

    #[test]
    fn round_trips_single_page() {
        let entries = vec![entry(1, 100, 0), entry(2, 200, 100), entry(3, 50, 300)];
        let index = IndexFile::build(&entries, false).expect("builds");
        let bytes = index.to_bytes();

        let parsed = IndexFile::parse(&bytes).expect("parses");
        assert_eq!(parsed.len(), 3);
        assert_eq!(
            parsed.try_get(EKey::from_bytes([2; 16])),
            Some(entry(2, 200, 100))
        );
        assert_eq!(parsed.try_get(EKey::from_bytes([9; 16])), None);
    }

    #[test]
    fn round_trips_multiple_pages() {
        let entries: Vec<IndexEntry> = (0..400u32)
            .map(|i| {
                let mut bytes = [0u8; 16];
                bytes[0..4].copy_from_slice(&i.to_be_bytes());
                IndexEntry {
                    ekey: EKey::from_bytes(bytes),
                    size: i,
                    offset: i * 10,
                }
            })
            .collect();
        let index = IndexFile::build(&entries, false).expect("builds");
        assert!(index.pages.len() > 1);

        let bytes = index.to_bytes();
        let parsed = IndexFile::parse(&bytes).expect("parses");
        assert_eq!(parsed.len(), 400);

        for entry in &entries {
            assert_eq!(parsed.try_get(entry.ekey), Some(*entry));
        }
    }

    #[test]
    fn rejects_unsorted_entries() {
        let entries = vec![entry(2, 1, 0), entry(1, 1, 1)];
        assert!(matches!(
            IndexFile::build(&entries, false),
            Err(ArchiveError::UnsortedEntries)
        ));
    }

    #[test]
    fn detects_corrupted_page() {
        let entries = vec![entry(1, 100, 0), entry(2, 200, 100)];
        let index = IndexFile::build(&entries, false).expect("builds");
        let mut bytes = index.to_bytes();
        bytes[17] ^= 0xFF;

        let err = IndexFile::parse(&bytes).expect_err("corruption detected");
        assert!(matches!(err, ArchiveError::PageChecksum { page: 0 }));
    }

    #[test]
    fn group_index_flag_round_trips() {
        let entries = vec![entry(1, 1, 0)];
        let index = IndexFile::build(&entries, true).expect("builds");
        let bytes = index.to_bytes();
        let parsed = IndexFile::parse(&bytes).expect("parses");
        assert!(parsed.is_group_index());
    }
}
