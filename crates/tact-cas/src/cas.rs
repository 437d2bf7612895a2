//! `CasReader`/`CasWriter` (§6): the exposed surface an embedding caller
//! drives. Orchestrates the archive/index engine, the encoding table, and
//! whichever `BlobSource`/`KeyService`/`ManifestView` collaborators it was
//! built with.

use std::path::Path;
use std::sync::Arc;

use tact_crypto::{CKey, EKey, KeyService};
use tact_formats::archive::{ArchiveConfig, ArchiveKind, IndexContainer};
use tact_formats::encoding::{EncodingBuilder, EncodingTable};
use tact_formats::espec::ESpec;
use tracing::{debug, info};

use crate::cancel::CancelToken;
use crate::config::CasConfig;
use crate::error::{CasError, CasResult};
use crate::interfaces::ManifestView;

/// Reads content by `CKey` (via the encoding table) or directly by `EKey`.
pub struct CasReader {
    archives: IndexContainer,
    encoding_table: EncodingTable,
    keys: Option<Arc<dyn KeyService>>,
}

impl CasReader {
    /// Open the archive/index set under `dir` and load the encoding table
    /// named by `manifest.encoding_ekey()`.
    pub fn open(
        dir: &Path,
        manifest: &dyn ManifestView,
        keys: Option<Arc<dyn KeyService>>,
    ) -> CasResult<Self> {
        let archives = IndexContainer::open(dir, ArchiveKind::Data)?;

        let encoding_ekey = manifest
            .encoding_ekey()
            .ok_or(CasError::ManifestIncomplete("encoding_ekey"))?;
        info!(ekey = %encoding_ekey, "loading encoding table");
        let (archive_hash, entry) = archives
            .try_get(encoding_ekey)
            .ok_or(CasError::EKeyNotFound(encoding_ekey))?;
        let mut blob = archives.open_blob(archive_hash)?;
        let encoding_bytes =
            blob.read_decoded(u64::from(entry.offset), entry.size, keys.as_deref())?;
        let encoding_table = EncodingTable::parse(&encoding_bytes)?;

        Ok(Self {
            archives,
            encoding_table,
            keys,
        })
    }

    /// Resolve `ckey` through the encoding table, then decode the first
    /// equivalent `EKey` to plaintext.
    pub fn open_by_ckey(&self, ckey: CKey) -> CasResult<Vec<u8>> {
        let entry = self
            .encoding_table
            .try_get_ckey(ckey)
            .ok_or(CasError::CKeyNotFound(ckey))?;
        let ekey = *entry.ekeys.first().ok_or(CasError::CKeyNotFound(ckey))?;
        debug!(%ckey, %ekey, "resolved ckey to ekey");
        self.open_by_ekey(ekey)
    }

    /// Decode the archive record addressed by `ekey` directly.
    pub fn open_by_ekey(&self, ekey: EKey) -> CasResult<Vec<u8>> {
        let (archive_hash, entry) = self
            .archives
            .try_get(ekey)
            .ok_or(CasError::EKeyNotFound(ekey))?;
        let mut blob = self.archives.open_blob(archive_hash)?;
        let plaintext =
            blob.read_decoded(u64::from(entry.offset), entry.size, self.keys.as_deref())?;
        Ok(plaintext)
    }
}

/// Stages new content for a future `commit`.
pub struct CasWriter {
    config: CasConfig,
    archives: IndexContainer,
    encoding_builder: EncodingBuilder,
    cancel: CancelToken,
}

impl CasWriter {
    /// Open (or create) the archive/index set under `dir` for staging.
    pub fn open(dir: &Path, config: CasConfig) -> CasResult<Self> {
        let archives = IndexContainer::open(dir, ArchiveKind::Data)?;
        let encoding_builder =
            EncodingBuilder::with_page_size(config.ckey_page_size_kb, config.ekey_page_size_kb);
        Ok(Self {
            config,
            archives,
            encoding_builder,
            cancel: CancelToken::new(),
        })
    }

    /// The cancel token this writer polls during `commit`.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// BLTE-encode `plaintext` per `espec`, enqueue the resulting record,
    /// and stage an encoding-table entry for it. Returns the record's
    /// content and encoding keys.
    pub fn put(&mut self, plaintext: &[u8], espec: &ESpec) -> CasResult<(CKey, EKey)> {
        let ckey = CKey::from_data(plaintext);
        let encoded = tact_formats::blte::encode(plaintext, espec)?;
        let ekey = EKey::from_data(&encoded);

        self.archives.enqueue(ekey, encoded.clone());
        self.encoding_builder.add(
            ckey,
            #[allow(clippy::cast_possible_truncation)]
            plaintext.len() as u64,
            vec![(ekey, encoded.len() as u64)],
            &espec.render(),
        );

        debug!(%ckey, %ekey, bytes = plaintext.len(), "staged record");
        Ok((ckey, ekey))
    }

    /// Pack staged records into sealed archives, then write the encoding
    /// table itself as the final artifact (§5's ordering guarantee #2).
    /// Returns the encoding table's own `EKey`, to be written back into the
    /// caller's build config.
    pub fn commit(&mut self, dir: &Path) -> CasResult<EKey> {
        let archive_config = ArchiveConfig {
            max_bytes: self.config.archive_max_bytes,
        };
        let cancel = self.cancel.clone();
        self.archives
            .save(dir, &archive_config, &move || cancel.is_cancelled())?;

        let builder = std::mem::replace(
            &mut self.encoding_builder,
            EncodingBuilder::with_page_size(
                self.config.ckey_page_size_kb,
                self.config.ekey_page_size_kb,
            ),
        );
        let table = builder.build();
        let table_bytes = table.to_bytes();
        let encoded = tact_formats::blte::encode(&table_bytes, &ESpec::ZLib { level: None })?;
        let encoding_ekey = EKey::from_data(&encoded);

        info!(ekey = %encoding_ekey, "writing encoding table");
        self.archives.enqueue(encoding_ekey, encoded);
        let cancel = self.cancel.clone();
        self.archives
            .save(dir, &archive_config, &move || cancel.is_cancelled())?;

        Ok(encoding_ekey)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use crate::reference::StaticManifestView;

    use super::*;

    #[test]
    fn put_then_commit_then_read_round_trips() {
        let dir = tempdir().expect("tempdir");
        let mut writer = CasWriter::open(dir.path(), CasConfig::default()).expect("opens");

        let (ckey, _ekey) = writer
            .put(b"hello, tact", &ESpec::None)
            .expect("puts");
        let encoding_ekey = writer.commit(dir.path()).expect("commits");

        let manifest = StaticManifestView::new().with_encoding_ekey(encoding_ekey);
        let reader = CasReader::open(dir.path(), &manifest, None).expect("opens");

        let plaintext = reader.open_by_ckey(ckey).expect("reads");
        assert_eq!(plaintext, b"hello, tact");
    }

    #[test]
    fn missing_ckey_surfaces_not_found() {
        let dir = tempdir().expect("tempdir");
        let mut writer = CasWriter::open(dir.path(), CasConfig::default()).expect("opens");
        writer.put(b"present", &ESpec::None).expect("puts");
        let encoding_ekey = writer.commit(dir.path()).expect("commits");

        let manifest = StaticManifestView::new().with_encoding_ekey(encoding_ekey);
        let reader = CasReader::open(dir.path(), &manifest, None).expect("opens");

        let missing = CKey::from_bytes([0xEE; 16]);
        let err = reader.open_by_ckey(missing).expect_err("not found");
        assert!(matches!(err, CasError::CKeyNotFound(k) if k == missing));
    }

    #[test]
    fn cancel_token_stops_commit() {
        let dir = tempdir().expect("tempdir");
        let mut writer = CasWriter::open(dir.path(), CasConfig::default()).expect("opens");
        writer.put(b"data", &ESpec::None).expect("puts");
        writer.cancel_token().cancel();

        let err = writer.commit(dir.path()).expect_err("cancelled");
        assert!(matches!(err, CasError::Archive(tact_formats::archive::ArchiveError::Cancelled)));
    }
}
