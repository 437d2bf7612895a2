//! In-process, file-system-backed reference implementations of the traits
//! in [`crate::interfaces`] (§6.1). None of these are meant to back a live
//! Ribbit/CDN connection; they exist so this crate's own test suite, and an
//! embedding caller's early integration tests, have something concrete to
//! plug in without pulling in HTTP/Ribbit dependencies.

use std::fs::File;
use std::path::PathBuf;

use tact_crypto::{CKey, EKey};

use crate::interfaces::{BlobSource, BlobKind, ManifestView, ReadSeek};

/// Serves blobs from a local directory laid out exactly per §6's CDN
/// layout: `<root>/<kind>/<hash[0:2]>/<hash[2:4]>/<hash>[.index]`.
pub struct DirBlobSource {
    root: PathBuf,
}

impl DirBlobSource {
    /// Point at an existing directory root.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The on-disk path this source would open for `(key_hex, kind, index)`,
    /// without opening it.
    pub fn path_for(&self, key_hex: &str, kind: BlobKind, index: bool) -> PathBuf {
        let lower = key_hex.to_ascii_lowercase();
        let mut path = self
            .root
            .join(kind.dir_name())
            .join(&lower[0..2])
            .join(&lower[2..4]);
        path.push(if index { format!("{lower}.index") } else { lower });
        path
    }
}

impl BlobSource for DirBlobSource {
    fn open(&self, key_hex: &str, kind: BlobKind, index: bool) -> std::io::Result<Box<dyn ReadSeek>> {
        let path = self.path_for(key_hex, kind, index);
        Ok(Box::new(File::open(path)?))
    }
}

/// A builder-populated in-memory [`ManifestView`], sufficient for tests
/// that need to thread an `EncodingEKey`/`RootCKey` through without
/// standing up a real build-config parser.
#[derive(Debug, Clone, Default)]
pub struct StaticManifestView {
    encoding_ekey: Option<EKey>,
    root_ckey: Option<CKey>,
    install_ckey: Option<CKey>,
    download_ckey: Option<CKey>,
}

impl StaticManifestView {
    /// An empty view; every accessor returns `None` until set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the repo's encoding-table `EKey`.
    #[must_use]
    pub const fn with_encoding_ekey(mut self, ekey: EKey) -> Self {
        self.encoding_ekey = Some(ekey);
        self
    }

    /// Set the repo's root-file `CKey`.
    #[must_use]
    pub const fn with_root_ckey(mut self, ckey: CKey) -> Self {
        self.root_ckey = Some(ckey);
        self
    }

    /// Set the repo's install-manifest `CKey`.
    #[must_use]
    pub const fn with_install_ckey(mut self, ckey: CKey) -> Self {
        self.install_ckey = Some(ckey);
        self
    }

    /// Set the repo's download-manifest `CKey`.
    #[must_use]
    pub const fn with_download_ckey(mut self, ckey: CKey) -> Self {
        self.download_ckey = Some(ckey);
        self
    }
}

impl ManifestView for StaticManifestView {
    fn encoding_ekey(&self) -> Option<EKey> {
        self.encoding_ekey
    }

    fn root_ckey(&self) -> Option<CKey> {
        self.root_ckey
    }

    fn install_ckey(&self) -> Option<CKey> {
        self.install_ckey
    }

    fn download_ckey(&self) -> Option<CKey> {
        self.download_ckey
    }
}
