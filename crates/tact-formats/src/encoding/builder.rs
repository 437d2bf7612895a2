//! In-memory staging for the encoding table: accumulates `add`ed records and
//! renders them into pages on [`EncodingBuilder::build`] (§4.4, §4.4.1).

use std::collections::BTreeMap;

use tact_crypto::{CKey, EKey};

use super::entry::{CKeyEntry, EKeyEntry};
use super::espec_pool::EspecPool;
use super::table::{self, EncodingTable, DEFAULT_PAGE_SIZE_KB};

/// Builds an [`EncodingTable`] from staged `(CKey, EKey...)` records.
///
/// Entries are kept in a sorted map so `build()` never needs to sort; the
/// `ESpec` pool interns strings in first-seen order across every `add` call
/// (§4.4.1), making repeated builds from an unchanged staging set
/// byte-for-byte reproducible.
#[derive(Default)]
pub struct EncodingBuilder {
    ckey_entries: BTreeMap<[u8; 16], CKeyEntry>,
    ekey_entries: BTreeMap<[u8; 16], EKeyEntry>,
    espec_pool: EspecPool,
    ckey_page_size: usize,
    ekey_page_size: usize,
}

impl EncodingBuilder {
    /// A builder using the default 4 KiB page size for both sections.
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE_KB, DEFAULT_PAGE_SIZE_KB)
    }

    /// A builder using explicit page sizes, in KiB, for each section.
    pub fn with_page_size(ckey_page_size_kb: u16, ekey_page_size_kb: u16) -> Self {
        Self {
            ckey_entries: BTreeMap::new(),
            ekey_entries: BTreeMap::new(),
            espec_pool: EspecPool::new(),
            ckey_page_size: ckey_page_size_kb as usize * 1024,
            ekey_page_size: ekey_page_size_kb as usize * 1024,
        }
    }

    /// Stage a content-key record: `ckey` decodes to `plain_size` bytes via
    /// any of `ekeys`, each paired with its own encoded byte length. `espec`
    /// is interned (or reused) in the string pool and associated with every
    /// `EKey` in this call.
    pub fn add(&mut self, ckey: CKey, plain_size: u64, ekeys: Vec<(EKey, u64)>, espec: &str) {
        let espec_index = self.espec_pool.intern(espec);

        self.ckey_entries.entry(*ckey.as_bytes()).or_insert_with(|| CKeyEntry {
            plain_size,
            ckey,
            ekeys: ekeys.iter().map(|(ekey, _)| *ekey).collect(),
        });

        for (ekey, encoded_size) in ekeys {
            self.ekey_entries
                .entry(*ekey.as_bytes())
                .or_insert(EKeyEntry {
                    ekey,
                    espec_index,
                    encoded_size,
                });
        }
    }

    /// Number of staged content-key records.
    pub fn len(&self) -> usize {
        self.ckey_entries.len()
    }

    /// Whether nothing has been staged yet.
    pub fn is_empty(&self) -> bool {
        self.ckey_entries.is_empty()
    }

    /// Render the staged entries into pages and build the final table.
    pub fn build(self) -> EncodingTable {
        let ckey_entries: Vec<CKeyEntry> = self.ckey_entries.into_values().collect();
        let ckey_pages = paginate_ckey(&ckey_entries, self.ckey_page_size);

        let ekey_entries: Vec<EKeyEntry> = self.ekey_entries.into_values().collect();
        let ekey_pages = paginate_ekey(&ekey_entries, self.ekey_page_size);

        table::build(
            ckey_pages,
            ekey_pages,
            self.ckey_page_size,
            self.ekey_page_size,
            self.espec_pool,
        )
    }
}

fn paginate_ckey(entries: &[CKeyEntry], page_size: usize) -> Vec<Vec<CKeyEntry>> {
    let mut pages = Vec::new();
    let mut current = Vec::new();
    let mut current_len = 0usize;

    for entry in entries {
        let entry_len = entry.byte_len();
        if current_len + entry_len > page_size && !current.is_empty() {
            pages.push(std::mem::take(&mut current));
            current_len = 0;
        }
        current_len += entry_len;
        current.push(entry.clone());
    }
    if !current.is_empty() {
        pages.push(current);
    }
    pages
}

fn paginate_ekey(entries: &[EKeyEntry], page_size: usize) -> Vec<Vec<EKeyEntry>> {
    let per_page = (page_size / EKeyEntry::BYTE_LEN).max(1);
    entries.chunks(per_page).map(<[EKeyEntry]>::to_vec).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_is_idempotent_for_repeated_ckeys() {
        let mut builder = EncodingBuilder::new();
        builder.add(
            CKey::from_bytes([1; 16]),
            10,
            vec![(EKey::from_bytes([1; 16]), 9)],
            "n",
        );
        builder.add(
            CKey::from_bytes([1; 16]),
            999,
            vec![(EKey::from_bytes([2; 16]), 9)],
            "z",
        );
        assert_eq!(builder.len(), 1);
        let table = builder.build();
        let entry = table.try_get_ckey(CKey::from_bytes([1; 16])).expect("found");
        assert_eq!(entry.plain_size, 10);
    }

    #[test]
    fn espec_pool_reuses_indices_across_adds() {
        let mut builder = EncodingBuilder::new();
        builder.add(
            CKey::from_bytes([1; 16]),
            1,
            vec![(EKey::from_bytes([1; 16]), 1)],
            "z",
        );
        builder.add(
            CKey::from_bytes([2; 16]),
            1,
            vec![(EKey::from_bytes([2; 16]), 1)],
            "z",
        );
        assert_eq!(builder.espec_pool.len(), 1);
    }

    #[test]
    fn large_ckey_set_spans_multiple_pages() {
        let mut builder = EncodingBuilder::with_page_size(1, 1);
        for i in 0..200u8 {
            builder.add(
                CKey::from_bytes([i; 16]),
                u64::from(i),
                vec![(EKey::from_bytes([i; 16]), u64::from(i))],
                "n",
            );
        }
        let table = builder.build();
        assert!(table.try_get_ckey(CKey::from_bytes([150; 16])).is_some());
    }
}
