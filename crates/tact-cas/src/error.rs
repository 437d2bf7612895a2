//! Top-level error type composing every lower-layer failure a `CasReader`
//! or `CasWriter` call can surface.

use thiserror::Error;
use tact_crypto::{CKey, EKey};

/// Errors raised by the CAS engine. Wraps lower-layer errors by variant
/// rather than boxing a `dyn Error` (§2.1).
#[derive(Debug, Error)]
pub enum CasError {
    /// The requested content key has no encoding-table entry.
    #[error("content key not found: {0}")]
    CKeyNotFound(CKey),

    /// The requested encoding key has no index entry in any loaded archive.
    #[error("encoding key not found: {0}")]
    EKeyNotFound(EKey),

    /// A BLTE `E`-frame referenced a key name no `KeyService` could resolve.
    #[error("missing decryption key for frame")]
    MissingKey,

    /// `CasWriter::put` staged a `CASRecord` whose `EKey` collides with an
    /// already-staged record carrying different bytes.
    #[error("duplicate encoding key with conflicting content: {0}")]
    DuplicateEKey(EKey),

    /// A cooperative cancel token fired mid-operation.
    #[error("operation cancelled")]
    Cancelled,

    /// The supplied `ManifestView` is missing a value this operation needs.
    #[error("manifest view is missing {0}")]
    ManifestIncomplete(&'static str),

    /// Hashing/parsing error from the key layer.
    #[error("hash error: {0}")]
    Hash(#[from] tact_crypto::HashError),

    /// BLTE codec error.
    #[error("BLTE error: {0}")]
    Blte(#[from] tact_formats::blte::BlteError),

    /// Archive/index format error.
    #[error("archive error: {0}")]
    Archive(#[from] tact_formats::archive::ArchiveError),

    /// Encoding-table format error.
    #[error("encoding table error: {0}")]
    Encoding(#[from] tact_formats::encoding::EncodingError),

    /// Underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for CAS operations.
pub type CasResult<T> = Result<T, CasError>;
