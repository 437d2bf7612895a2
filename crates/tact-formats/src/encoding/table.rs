//! The encoding table: a two-section paged map translating content keys to
//! their equivalent encodings and encoding keys to their `ESpec` (§4.4).

use tact_crypto::{CKey, EKey};

use super::entry::{CKeyEntry, EKeyEntry};
use super::error::{EncodingError, EncodingResult};
use super::espec_pool::EspecPool;

const MAGIC: [u8; 2] = *b"EN";
const FORMAT_VERSION: u8 = 1;
const KEY_SIZE: u8 = 16;
const HEADER_SIZE: usize = 22;
const PAGE_INDEX_ENTRY_SIZE: usize = 32; // first_key(16) + page_md5(16)

/// Default page size for both sections (4 KiB), matching §4.4 and the
/// archive engine's page size.
pub const DEFAULT_PAGE_SIZE_KB: u16 = 4;

struct Page<E> {
    first_key_bytes: [u8; 16],
    entries: Vec<E>,
}

/// A parsed (or freshly built) encoding table.
pub struct EncodingTable {
    ckey_page_size: usize,
    ekey_page_size: usize,
    ckey_pages: Vec<Page<CKeyEntry>>,
    ekey_pages: Vec<Page<EKeyEntry>>,
    espec_pool: EspecPool,
}

impl EncodingTable {
    /// Resolve a content key to its equivalent encodings.
    pub fn try_get_ckey(&self, ckey: CKey) -> Option<CKeyEntry> {
        let target = *ckey.as_bytes();
        let page = find_page(&self.ckey_pages, target)?;
        page.entries.iter().find(|e| *e.ckey.as_bytes() == target).cloned()
    }

    /// Resolve an encoding key's `ESpec`, used by writers re-encoding with
    /// the same block schedule.
    pub fn try_get_espec(&self, ekey: EKey) -> Option<crate::espec::ESpec> {
        let entry = self.try_get_ekey(ekey)?;
        let raw = self.espec_pool.get(entry.espec_index)?;
        crate::espec::ESpec::parse(raw).ok()
    }

    /// Resolve an encoding key's full page record.
    pub fn try_get_ekey(&self, ekey: EKey) -> Option<EKeyEntry> {
        let target = *ekey.as_bytes();
        let page = find_page(&self.ekey_pages, target)?;
        page.entries.iter().copied().find(|e| *e.ekey.as_bytes() == target)
    }

    /// Serialize to the on-disk encoding-table byte layout (§4.4).
    pub fn to_bytes(&self) -> Vec<u8> {
        let espec_block = self.espec_pool.to_bytes();

        let mut out = Vec::new();
        out.extend_from_slice(&MAGIC);
        out.push(FORMAT_VERSION);
        out.push(KEY_SIZE);
        out.push(KEY_SIZE);
        #[allow(clippy::cast_possible_truncation)]
        out.extend_from_slice(&((self.ckey_page_size / 1024) as u16).to_be_bytes());
        #[allow(clippy::cast_possible_truncation)]
        out.extend_from_slice(&((self.ekey_page_size / 1024) as u16).to_be_bytes());
        #[allow(clippy::cast_possible_truncation)]
        out.extend_from_slice(&(self.ckey_pages.len() as u32).to_be_bytes());
        #[allow(clippy::cast_possible_truncation)]
        out.extend_from_slice(&(self.ekey_pages.len() as u32).to_be_bytes());
        out.push(0);
        #[allow(clippy::cast_possible_truncation)]
        out.extend_from_slice(&(espec_block.len() as u32).to_be_bytes());
        out.extend_from_slice(&espec_block);

        let ckey_bodies: Vec<Vec<u8>> = self
            .ckey_pages
            .iter()
            .map(|p| pad_page(render_ckey_page(p), self.ckey_page_size))
            .collect();
        write_page_index(&mut out, &self.ckey_pages, &ckey_bodies);
        for body in &ckey_bodies {
            out.extend_from_slice(body);
        }

        let ekey_bodies: Vec<Vec<u8>> = self
            .ekey_pages
            .iter()
            .map(|p| pad_page(render_ekey_page(p), self.ekey_page_size))
            .collect();
        write_page_index(&mut out, &self.ekey_pages, &ekey_bodies);
        for body in &ekey_bodies {
            out.extend_from_slice(body);
        }

        out
    }

    /// Parse an on-disk encoding table, validating the header and every
    /// page checksum.
    pub fn parse(data: &[u8]) -> EncodingResult<Self> {
        if data.len() < HEADER_SIZE {
            return Err(EncodingError::Truncated(data.len()));
        }
        if data[0..2] != MAGIC {
            return Err(EncodingError::InvalidMagic([data[0], data[1]]));
        }
        let version = data[2];
        if version != FORMAT_VERSION {
            return Err(EncodingError::UnsupportedVersion(version));
        }
        let ckey_key_size = data[3];
        let ekey_key_size = data[4];
        if ckey_key_size != KEY_SIZE {
            return Err(EncodingError::InvalidKeySize(ckey_key_size));
        }
        if ekey_key_size != KEY_SIZE {
            return Err(EncodingError::InvalidKeySize(ekey_key_size));
        }
        let ckey_page_size = u16::from_be_bytes([data[5], data[6]]) as usize * 1024;
        let ekey_page_size = u16::from_be_bytes([data[7], data[8]]) as usize * 1024;
        let ckey_page_count = u32::from_be_bytes([data[9], data[10], data[11], data[12]]) as usize;
        let ekey_page_count =
            u32::from_be_bytes([data[13], data[14], data[15], data[16]]) as usize;
        let espec_block_size =
            u32::from_be_bytes([data[18], data[19], data[20], data[21]]) as usize;

        let mut pos = HEADER_SIZE;
        let espec_bytes = data
            .get(pos..pos + espec_block_size)
            .ok_or(EncodingError::Truncated(data.len()))?;
        let espec_pool = EspecPool::from_bytes(espec_bytes)?;
        pos += espec_block_size;

        let (ckey_pages, pos) =
            read_section(data, pos, ckey_page_count, ckey_page_size, "ckey", parse_ckey_page)?;
        let (ekey_pages, _pos) =
            read_section(data, pos, ekey_page_count, ekey_page_size, "ekey", parse_ekey_page)?;

        Ok(Self {
            ckey_page_size,
            ekey_page_size,
            ckey_pages,
            ekey_pages,
            espec_pool,
        })
    }
}

/// Binary-searches a sorted page list for the page whose key range could
/// contain `target`.
fn find_page<E>(pages: &[Page<E>], target: [u8; 16]) -> Option<&Page<E>> {
    let idx = pages.partition_point(|p| p.first_key_bytes <= target);
    if idx == 0 {
        return None;
    }
    Some(&pages[idx - 1])
}

fn render_ckey_page(page: &Page<CKeyEntry>) -> Vec<u8> {
    let mut body = Vec::new();
    for entry in &page.entries {
        entry.write_to(&mut body);
    }
    body
}

fn render_ekey_page(page: &Page<EKeyEntry>) -> Vec<u8> {
    let mut body = Vec::new();
    for entry in &page.entries {
        entry.write_to(&mut body);
    }
    body
}

fn pad_page(mut body: Vec<u8>, page_size: usize) -> Vec<u8> {
    body.resize(page_size, 0);
    body
}

fn write_page_index<E>(out: &mut Vec<u8>, pages: &[Page<E>], bodies: &[Vec<u8>]) {
    for (page, body) in pages.iter().zip(bodies) {
        out.extend_from_slice(&page.first_key_bytes);
        let checksum: [u8; 16] = md5::compute(body).into();
        out.extend_from_slice(&checksum);
    }
}

#[allow(clippy::too_many_arguments)]
fn read_section<E>(
    data: &[u8],
    mut pos: usize,
    page_count: usize,
    page_size: usize,
    section: &'static str,
    parse_page: fn(&[u8]) -> Vec<E>,
) -> EncodingResult<(Vec<Page<E>>, usize)> {
    let index_size = page_count * PAGE_INDEX_ENTRY_SIZE;
    let index_bytes = data
        .get(pos..pos + index_size)
        .ok_or(EncodingError::Truncated(data.len()))?;
    pos += index_size;

    let mut pages = Vec::with_capacity(page_count);
    for page_num in 0..page_count {
        let idx_entry = &index_bytes[page_num * PAGE_INDEX_ENTRY_SIZE..(page_num + 1) * PAGE_INDEX_ENTRY_SIZE];
        let mut first_key_bytes = [0u8; 16];
        first_key_bytes.copy_from_slice(&idx_entry[0..16]);
        let expected_checksum = &idx_entry[16..32];

        let body = data
            .get(pos..pos + page_size)
            .ok_or(EncodingError::Truncated(data.len()))?;
        let actual_checksum: [u8; 16] = md5::compute(body).into();
        if actual_checksum != expected_checksum {
            return Err(EncodingError::PageChecksum {
                section,
                page: page_num,
            });
        }

        pages.push(Page {
            first_key_bytes,
            entries: parse_page(body),
        });
        pos += page_size;
    }

    Ok((pages, pos))
}

fn parse_ckey_page(body: &[u8]) -> Vec<CKeyEntry> {
    let mut entries = Vec::new();
    let mut pos = 0;
    while pos < body.len() {
        match CKeyEntry::read_from(&body[pos..]) {
            Some((entry, consumed)) => {
                entries.push(entry);
                pos += consumed;
            }
            None => break,
        }
    }
    entries
}

fn parse_ekey_page(body: &[u8]) -> Vec<EKeyEntry> {
    let mut entries = Vec::new();
    let mut pos = 0;
    while pos + EKeyEntry::BYTE_LEN <= body.len() {
        match EKeyEntry::read_from(&body[pos..]) {
            Some(entry) => {
                entries.push(entry);
                pos += EKeyEntry::BYTE_LEN;
            }
            None => break,
        }
    }
    entries
}

pub(super) fn build(
    ckey_pages: Vec<Vec<CKeyEntry>>,
    ekey_pages: Vec<Vec<EKeyEntry>>,
    ckey_page_size: usize,
    ekey_page_size: usize,
    espec_pool: EspecPool,
) -> EncodingTable {
    let ckey_pages = ckey_pages
        .into_iter()
        .map(|entries| Page {
            first_key_bytes: entries
                .first()
                .map(|e| *e.ckey.as_bytes())
                .unwrap_or([0; 16]),
            entries,
        })
        .collect();
    let ekey_pages = ekey_pages
        .into_iter()
        .map(|entries| Page {
            first_key_bytes: entries
                .first()
                .map(|e| *e.ekey.as_bytes())
                .unwrap_or([0; 16]),
            entries,
        })
        .collect();
    EncodingTable {
        ckey_page_size,
        ekey_page_size,
        ckey_pages,
        ekey_pages,
        espec_pool,
    }
}

#[cfg(test)]
mod tests {
    use super::super::builder::EncodingBuilder;
    use super::*;

    #[test]
    fn round_trips_through_bytes() {
        let mut builder = EncodingBuilder::new();
        builder.add(
            CKey::from_bytes([1; 16]),
            100,
            vec![(EKey::from_bytes([10; 16]), 80)],
            "z",
        );
        builder.add(
            CKey::from_bytes([2; 16]),
            200,
            vec![
                (EKey::from_bytes([20; 16]), 200),
                (EKey::from_bytes([21; 16]), 201),
            ],
            "n",
        );
        let table = builder.build();
        let bytes = table.to_bytes();

        let parsed = EncodingTable::parse(&bytes).expect("parses");
        let entry = parsed.try_get_ckey(CKey::from_bytes([1; 16])).expect("found");
        assert_eq!(entry.plain_size, 100);
        assert_eq!(entry.ekeys, vec![EKey::from_bytes([10; 16])]);

        let espec = parsed.try_get_espec(EKey::from_bytes([20; 16])).expect("found");
        assert_eq!(espec, crate::espec::ESpec::None);

        assert!(parsed.try_get_ckey(CKey::from_bytes([9; 16])).is_none());
    }

    #[test]
    fn detects_page_corruption() {
        let mut builder = EncodingBuilder::new();
        builder.add(
            CKey::from_bytes([1; 16]),
            1,
            vec![(EKey::from_bytes([1; 16]), 1)],
            "n",
        );
        let table = builder.build();
        let mut bytes = table.to_bytes();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;

        let err = EncodingTable::parse(&bytes).expect_err("corruption detected");
        assert!(matches!(
            err,
            EncodingError::PageChecksum {
                section: "ekey",
                ..
            }
        ));
    }
}
