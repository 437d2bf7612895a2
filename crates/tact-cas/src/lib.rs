//! Content-addressed storage engine for TACT repositories: a `CasReader`
//! and `CasWriter` built on top of [`tact_formats`]'s BLTE codec,
//! archive/index engine, and encoding table, wired to a caller-supplied
//! `BlobSource`, `KeyService`, and `ManifestView` (§6).

mod cancel;
mod cas;
mod config;
mod error;
mod interfaces;
mod reference;

pub use cancel::CancelToken;
pub use cas::{CasReader, CasWriter};
pub use config::CasConfig;
pub use error::{CasError, CasResult};
pub use interfaces::{BlobKind, BlobSource, KeyService, ManifestView, ReadSeek};
pub use reference::{DirBlobSource, StaticManifestView};
