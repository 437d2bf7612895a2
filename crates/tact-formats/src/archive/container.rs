//! The index & archive engine: a set of loaded `.index` files backing
//! `EKey -> (archive, offset, size)` lookups, plus a staging map that packs
//! newly written records into freshly sealed archives.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tact_crypto::{EKey, Hash};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::blob::{ArchiveBlobReader, ArchiveBlobWriter};
use super::error::{ArchiveError, ArchiveResult};
use super::index::{IndexEntry, IndexFile};

/// Cap on one archive blob's size (§3 invariant 5).
pub const ARCHIVE_MAX_BYTES: u64 = 256_000_000;

/// Which CDN content tree an archive/index pair lives under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    /// `<root>/data/...`
    Data,
    /// `<root>/patch/...`
    Patch,
}

impl ArchiveKind {
    const fn dir_name(self) -> &'static str {
        match self {
            Self::Data => "data",
            Self::Patch => "patch",
        }
    }
}

/// Configuration for the archive engine: size cap and page size. Defaults
/// match §4.3 exactly.
#[derive(Debug, Clone, Copy)]
pub struct ArchiveConfig {
    /// Maximum archive blob size before sealing and starting a new one.
    pub max_bytes: u64,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            max_bytes: ARCHIVE_MAX_BYTES,
        }
    }
}

/// The two-leading-hex-pair CDN path for a hash under `<root>/<kind>/`.
fn layout_path(root: &Path, kind: ArchiveKind, hash: Hash, extension: Option<&str>) -> PathBuf {
    let hex = hash.to_hex();
    let mut path = root
        .join(kind.dir_name())
        .join(&hex[0..2])
        .join(&hex[2..4]);
    path.push(match extension {
        Some(ext) => format!("{hex}.{ext}"),
        None => hex,
    });
    path
}

struct LoadedIndex {
    archive_hash: Hash,
    blob_path: PathBuf,
    index: IndexFile,
}

/// A loaded set of `.index` files for one CDN content kind, plus a staging
/// map of records awaiting their next `save`.
pub struct IndexContainer {
    kind: ArchiveKind,
    indices: Vec<LoadedIndex>,
    staging: Mutex<BTreeMap<EKey, Vec<u8>>>,
}

impl IndexContainer {
    /// Scan `<dir>/<kind>/**/*.index`, mapping and validating each file.
    /// A corrupt file is logged and skipped rather than aborting the scan
    /// (§4.3: "does not abort the directory scan").
    pub fn open(dir: &Path, kind: ArchiveKind) -> ArchiveResult<Self> {
        let kind_dir = dir.join(kind.dir_name());
        let mut indices = Vec::new();

        if !kind_dir.exists() {
            return Ok(Self {
                kind,
                indices,
                staging: Mutex::new(BTreeMap::new()),
            });
        }

        for entry in WalkDir::new(&kind_dir).into_iter().filter_map(Result::ok) {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("index") {
                continue;
            }

            match load_index(path) {
                Ok((archive_hash, index)) => {
                    if index.is_group_index() {
                        debug!(path = %path.display(), "skipping group index");
                        continue;
                    }
                    let blob_path = path.with_extension("");
                    info!(path = %path.display(), entries = index.len(), "loaded index");
                    indices.push(LoadedIndex {
                        archive_hash,
                        blob_path,
                        index,
                    });
                }
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "skipping corrupt index");
                }
            }
        }

        Ok(Self {
            kind,
            indices,
            staging: Mutex::new(BTreeMap::new()),
        })
    }

    /// Resolve an `EKey` to the archive it lives in and its slice within it.
    /// Binary search within each loaded index is O(log P + log K); scanning
    /// across loaded archives themselves is linear (no archive-group index
    /// is consulted here, per §4.3's note that group indices are produced
    /// by a companion step).
    pub fn try_get(&self, ekey: EKey) -> Option<(Hash, IndexEntry)> {
        self.indices
            .iter()
            .find_map(|loaded| loaded.index.try_get(ekey).map(|e| (loaded.archive_hash, e)))
    }

    /// Open the archive blob named `archive_hash` for reading.
    pub fn open_blob(&self, archive_hash: Hash) -> ArchiveResult<ArchiveBlobReader<File>> {
        let loaded = self
            .indices
            .iter()
            .find(|l| l.archive_hash == archive_hash)
            .ok_or(ArchiveError::ArchiveNotLoaded)?;
        Ok(ArchiveBlobReader::new(File::open(&loaded.blob_path)?))
    }

    /// Enqueue a record for the next `save`. First write wins: if `ekey` is
    /// already staged, `encoded` is discarded (§5's commutative `enqueue`).
    pub fn enqueue(&self, ekey: EKey, encoded: Vec<u8>) {
        let mut staging = self.staging.lock();
        staging.entry(ekey).or_insert(encoded);
    }

    /// Number of records currently staged.
    pub fn staged_len(&self) -> usize {
        self.staging.lock().len()
    }

    /// Pack the staging map into newly sealed archives under `dir`, write
    /// their indices, then rescan to pick up the new state. `cancel` is
    /// polled between records; a cancellation mid-save may leave `*.tmp`
    /// files behind for the next `open` to ignore (`.tmp` is never matched
    /// by the `*.index` scan).
    pub fn save(
        &mut self,
        dir: &Path,
        config: &ArchiveConfig,
        cancel: &dyn Fn() -> bool,
    ) -> ArchiveResult<()> {
        let staged = std::mem::take(&mut *self.staging.lock());
        if staged.is_empty() {
            return Ok(());
        }

        let kind_dir = dir.join(self.kind.dir_name());
        fs::create_dir_all(&kind_dir)?;

        let partitions = partition(&staged, config.max_bytes);
        for partition in partitions {
            if cancel() {
                return Err(ArchiveError::Cancelled);
            }
            write_partition(dir, self.kind, &partition)?;
        }

        *self = Self::open(dir, self.kind)?;
        Ok(())
    }
}

fn load_index(path: &Path) -> ArchiveResult<(Hash, IndexFile)> {
    let file = File::open(path)?;
    // SAFETY: the mapped file is not concurrently truncated by this process;
    // external mutation races are the same risk any mmap-based reader takes.
    let map = unsafe { memmap2::Mmap::map(&file)? };
    let index = IndexFile::parse(&map)?;
    let archive_hash = Hash::from_bytes(md5::compute(&map[..]).into());
    Ok((archive_hash, index))
}

/// Greedily partitions sorted, deduplicated staged records into archives no
/// larger than `max_bytes`, per §4.3's packing rule.
fn partition(staged: &BTreeMap<EKey, Vec<u8>>, max_bytes: u64) -> Vec<Vec<(EKey, Vec<u8>)>> {
    let mut partitions = Vec::new();
    let mut current: Vec<(EKey, Vec<u8>)> = Vec::new();
    let mut current_size: u64 = 0;

    for (ekey, encoded) in staged {
        let size = encoded.len() as u64;
        if current_size > 0 && current_size + size > max_bytes {
            partitions.push(std::mem::take(&mut current));
            current_size = 0;
        }
        current_size += size;
        current.push((*ekey, encoded.clone()));
    }
    if !current.is_empty() {
        partitions.push(current);
    }
    partitions
}

fn write_partition(
    dir: &Path,
    kind: ArchiveKind,
    partition: &[(EKey, Vec<u8>)],
) -> ArchiveResult<()> {
    let mut blob_bytes = Vec::new();
    let mut writer = ArchiveBlobWriter::new(&mut blob_bytes);
    let mut entries = Vec::with_capacity(partition.len());

    for (ekey, encoded) in partition {
        let offset = writer.append(encoded)?;
        entries.push(IndexEntry {
            ekey: *ekey,
            #[allow(clippy::cast_possible_truncation)]
            size: encoded.len() as u32,
            #[allow(clippy::cast_possible_truncation)]
            offset: offset as u32,
        });
    }

    let archive_hash = Hash::from_data(&blob_bytes);
    let index = IndexFile::build(&entries, false)?;
    let index_bytes = index.to_bytes();
    let index_hash = Hash::from_data(&index_bytes);

    let blob_path = layout_path(dir, kind, archive_hash, None);
    let index_path = layout_path(dir, kind, index_hash, Some("index"));
    if let Some(parent) = blob_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let blob_tmp = blob_path.with_extension("tmp");
    fs::write(&blob_tmp, &blob_bytes)?;
    fs::rename(&blob_tmp, &blob_path)?;

    let index_tmp = index_path.with_extension("index.tmp");
    fs::write(&index_tmp, &index_bytes)?;
    fs::rename(&index_tmp, &index_path)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use crate::blte::encode;
    use crate::espec::ESpec;

    use super::*;

    #[test]
    fn enqueue_save_open_round_trips() {
        let dir = tempdir().expect("tempdir");
        let mut container = IndexContainer::open(dir.path(), ArchiveKind::Data).expect("opens");
        assert_eq!(container.staged_len(), 0);

        let encoded_a = encode(b"record a", &ESpec::None).expect("encodes");
        let encoded_b = encode(b"record b", &ESpec::None).expect("encodes");
        let ekey_a = EKey::from_data(&encoded_a);
        let ekey_b = EKey::from_data(&encoded_b);

        container.enqueue(ekey_a, encoded_a.clone());
        container.enqueue(ekey_b, encoded_b.clone());
        assert_eq!(container.staged_len(), 2);

        container
            .save(dir.path(), &ArchiveConfig::default(), &|| false)
            .expect("saves");
        assert_eq!(container.staged_len(), 0);

        let (archive_hash, entry) = container.try_get(ekey_a).expect("found");
        let mut blob = container.open_blob(archive_hash).expect("opens blob");
        let decoded = blob
            .read_decoded(u64::from(entry.offset), entry.size, None)
            .expect("decodes");
        assert_eq!(decoded, b"record a");
    }

    #[test]
    fn enqueue_is_first_write_wins() {
        let dir = tempdir().expect("tempdir");
        let container = IndexContainer::open(dir.path(), ArchiveKind::Data).expect("opens");
        let ekey = EKey::from_bytes([1; 16]);
        container.enqueue(ekey, vec![1, 2, 3]);
        container.enqueue(ekey, vec![9, 9, 9]);
        assert_eq!(container.staging.lock().get(&ekey), Some(&vec![1, 2, 3]));
    }

    #[test]
    fn packing_seals_archives_at_the_size_cap() {
        let record = vec![0u8; 10];
        let mut staged = BTreeMap::new();
        for i in 0..5u8 {
            staged.insert(EKey::from_bytes([i; 16]), record.clone());
        }
        let partitions = partition(&staged, 25);
        assert_eq!(partitions.len(), 3);
        assert_eq!(partitions[0].len(), 2);
        assert_eq!(partitions[1].len(), 2);
        assert_eq!(partitions[2].len(), 1);
    }

    #[test]
    fn oversized_record_gets_its_own_archive() {
        let mut staged = BTreeMap::new();
        staged.insert(EKey::from_bytes([1; 16]), vec![0u8; 40]);
        staged.insert(EKey::from_bytes([2; 16]), vec![0u8; 5]);
        let partitions = partition(&staged, 25);
        assert_eq!(partitions.len(), 2);
        assert_eq!(partitions[0].len(), 1);
        assert_eq!(partitions[0][0].1.len(), 40);
    }
}
