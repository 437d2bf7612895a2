//! BLTE error types.

use thiserror::Error;

/// Errors raised while parsing or decoding a BLTE stream.
#[derive(Debug, Error)]
pub enum BlteError {
    /// Magic bytes were not `BLTE`.
    #[error("invalid BLTE magic: expected [42 4C 54 45], got {0:02X?}")]
    InvalidMagic([u8; 4]),

    /// Frame-table flags byte was not `0x0F`.
    #[error("invalid frame-table flags byte: 0x{0:02X}")]
    InvalidFlags(u8),

    /// Frame count in the header did not match the number of frames available.
    #[error("invalid frame count: {0}")]
    InvalidFrameCount(u32),

    /// First byte of an encoded frame was not one of `N`, `Z`, `F`, `E`.
    #[error("unknown frame mode: 0x{0:02X}")]
    UnknownMode(u8),

    /// Encoded-frame MD5 did not match the frame table's checksum entry.
    #[error("checksum mismatch on frame {frame}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// Index of the offending frame.
        frame: usize,
        /// Checksum recorded in the frame table.
        expected: String,
        /// Checksum computed over the actual frame bytes.
        actual: String,
    },

    /// An `E`-mode frame's payload was too short to contain its header.
    #[error("encrypted frame payload too short: {0} bytes")]
    TruncatedEncryptedFrame(usize),

    /// An `E`-mode frame used an encryption type other than `S` or `A`.
    #[error("unknown encryption type: 0x{0:02X}")]
    UnknownEncryptionType(u8),

    /// An `E`-mode frame decrypted to another `E`-mode frame.
    #[error("nested encryption is not supported")]
    NestedEncryption,

    /// An `E`-mode frame referenced a key name with no registered key.
    #[error("missing decryption key: {0}")]
    MissingKey(String),

    /// A single-frame BLTE stream used the `E` frame mode.
    #[error("single-frame BLTE streams cannot be encrypted")]
    SingleFrameEncrypted,

    /// zlib compression or decompression failed.
    #[error("zlib error: {0}")]
    Zlib(String),

    /// A Salsa20/ARC4 stream cipher operation failed.
    #[error("crypto error: {0}")]
    Crypto(#[from] tact_crypto::CryptoError),

    /// Underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Binary layout parsing error.
    #[error("binary parsing error: {0}")]
    BinRw(#[from] binrw::Error),
}

/// Result type for BLTE operations.
pub type BlteResult<T> = Result<T, BlteError>;
