//! Error types for hashing, key parsing, and stream-cipher operations.

use thiserror::Error;

/// Errors raised while constructing or parsing a [`crate::Hash`].
#[derive(Debug, Error)]
pub enum HashError {
    /// Hex string was not exactly 32 characters.
    #[error("bad hash: expected 32 hex characters, got {0}")]
    BadLength(usize),

    /// Hex string contained a non-hex-digit character.
    #[error("bad hash: invalid hex string: {0}")]
    BadHex(#[from] hex::FromHexError),
}

/// Errors raised during Salsa20/ARC4 stream-cipher operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// The stream cipher could not apply its keystream to the buffer.
    #[error("stream cipher error: {0}")]
    StreamCipher(#[from] cipher::StreamCipherError),
}
