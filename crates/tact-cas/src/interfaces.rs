//! Traits consumed from collaborators outside this crate (§6): a source of
//! raw CDN bytes, a decryption-key lookup, and read-only access to a build's
//! manifest values. This crate only consumes these; Ribbit/CDN fetching,
//! root-name resolution, and manifest parsing remain the embedder's job.

use std::io::{Read, Seek};

pub use tact_crypto::KeyService;
use tact_crypto::{CKey, EKey};

/// Which CDN content tree a blob or index lives under (§6's `<kind>`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobKind {
    /// `<root>/data/...`
    Data,
    /// `<root>/patch/...`
    Patch,
    /// `<root>/config/...`
    Config,
}

impl BlobKind {
    /// Directory name under the CDN root.
    pub const fn dir_name(self) -> &'static str {
        match self {
            Self::Data => "data",
            Self::Patch => "patch",
            Self::Config => "config",
        }
    }
}

/// Object-safe `Read + Seek`.
pub trait ReadSeek: Read + Seek + Send {}
impl<T: Read + Seek + Send> ReadSeek for T {}

/// A source of raw bytes addressed by CDN hash, local directory or HTTP
/// range reader behind the same interface (§6).
pub trait BlobSource: Send + Sync {
    /// Open `key_hex` (lowercase hex of the archive or system-file hash)
    /// under the given content kind, optionally with an `.index` suffix.
    fn open(&self, key_hex: &str, kind: BlobKind, index: bool) -> std::io::Result<Box<dyn ReadSeek>>;
}

/// Read-only access to a build's `BuildConfig`/`CDNConfig` values: the EKeys
/// and CKeys of a repo's system files (§6).
pub trait ManifestView: Send + Sync {
    /// `EKey` of the repo's encoding table.
    fn encoding_ekey(&self) -> Option<EKey>;
    /// `CKey` of the repo's root file.
    fn root_ckey(&self) -> Option<CKey>;
    /// `CKey` of the repo's install manifest, if present.
    fn install_ckey(&self) -> Option<CKey>;
    /// `CKey` of the repo's download manifest, if present.
    fn download_ckey(&self) -> Option<CKey>;
}
