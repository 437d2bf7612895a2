//! Error types for the archive blob and index format.

use thiserror::Error;

/// Errors raised while parsing, validating, or writing archive indices and blobs.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Page checksum did not match the TOC entry.
    #[error("page {page} checksum mismatch")]
    PageChecksum {
        /// Index of the offending page.
        page: usize,
    },

    /// TOC checksum did not match the footer.
    #[error("TOC checksum mismatch")]
    TocChecksum,

    /// Footer checksum did not match its own trailing MD5.
    #[error("footer checksum mismatch")]
    FooterChecksum,

    /// Footer was shorter than the fixed footer layout requires.
    #[error("truncated index footer: {0} bytes")]
    TruncatedFooter(usize),

    /// Footer declared an unsupported format version.
    #[error("unsupported index version: {0}")]
    UnsupportedVersion(u8),

    /// Footer declared a key size other than 16 bytes.
    #[error("invalid key size: expected 16, got {0}")]
    InvalidKeySize(u8),

    /// Footer declared a checksum size other than 8 bytes.
    #[error("invalid checksum size: expected 8, got {0}")]
    InvalidChecksumSize(u8),

    /// Entries within a page, or pages within the TOC, were not strictly
    /// increasing by `EKey`.
    #[error("entries not strictly ordered by EKey")]
    UnsortedEntries,

    /// An `EKey` appeared twice while building an index.
    #[error("duplicate EKey in index")]
    DuplicateEKey,

    /// A single record exceeds the archive size cap and cannot be packed
    /// alongside any other record.
    #[error("record of {0} bytes exceeds the archive size cap and must occupy its own archive")]
    RecordExceedsCap(u64),

    /// Underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// BLTE codec error surfaced while reading/writing an archived record.
    #[error("BLTE error: {0}")]
    Blte(#[from] crate::blte::BlteError),

    /// A cooperative cancel token fired mid-scan or mid-save.
    #[error("operation cancelled")]
    Cancelled,

    /// `try_get` named an archive hash this container never loaded an index for.
    #[error("archive not loaded")]
    ArchiveNotLoaded,
}

/// Result type for archive operations.
pub type ArchiveResult<T> = Result<T, ArchiveError>;
