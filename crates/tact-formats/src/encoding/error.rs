//! Error types for the encoding table format.

use thiserror::Error;

/// Errors raised while parsing, validating, or writing the encoding table.
#[derive(Debug, Error)]
pub enum EncodingError {
    /// Header magic was not `"EN"`.
    #[error("invalid encoding magic: {0:?}")]
    InvalidMagic([u8; 2]),

    /// Header declared an unsupported format version.
    #[error("unsupported encoding version: {0}")]
    UnsupportedVersion(u8),

    /// Header declared a key size other than 16 bytes.
    #[error("invalid key size: expected 16, got {0}")]
    InvalidKeySize(u8),

    /// A page's checksum did not match its page index entry.
    #[error("page checksum mismatch ({section}, page {page})")]
    PageChecksum {
        /// Which section the page belongs to.
        section: &'static str,
        /// Index of the offending page.
        page: usize,
    },

    /// Input was shorter than the header or a declared section requires.
    #[error("truncated encoding table: {0} bytes")]
    Truncated(usize),

    /// The ESpec string pool was not null-terminated at its declared size.
    #[error("unterminated ESpec string at pool offset {0}")]
    UnterminatedEspec(usize),

    /// An `ESpec` string in the pool failed to parse.
    #[error("ESpec parse error: {0}")]
    EspecParse(#[from] crate::espec::ParseError),

    /// Underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// BLTE codec error surfaced while reading/writing the stored table.
    #[error("BLTE error: {0}")]
    Blte(#[from] crate::blte::BlteError),
}

/// Result type for encoding-table operations.
pub type EncodingResult<T> = Result<T, EncodingError>;
