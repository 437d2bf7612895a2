//! BLTE frame modes and the frame value type.

use super::error::BlteError;

/// First byte of an encoded BLTE frame, selecting how the remainder decodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameMode {
    /// `N`: raw copy of the plaintext.
    Raw,
    /// `Z`: zlib-deflate of the plaintext.
    ZLib,
    /// `F`: a nested BLTE stream.
    Recursive,
    /// `E`: encrypted payload (Salsa20 or ARC4).
    Encrypted,
}

impl FrameMode {
    /// Parse a mode byte, returning `None` for anything outside `N`/`Z`/`F`/`E`.
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b'N' => Some(Self::Raw),
            b'Z' => Some(Self::ZLib),
            b'F' => Some(Self::Recursive),
            b'E' => Some(Self::Encrypted),
            _ => None,
        }
    }

    /// Render as the on-disk mode byte.
    pub const fn as_byte(self) -> u8 {
        match self {
            Self::Raw => b'N',
            Self::ZLib => b'Z',
            Self::Recursive => b'F',
            Self::Encrypted => b'E',
        }
    }
}

/// One encoded BLTE frame: a mode byte followed by mode-specific payload.
///
/// `encoded` includes the mode byte; this is the slice whose MD5 the frame
/// table checksum is computed over.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Frame mode.
    pub mode: FrameMode,
    /// Encoded bytes, mode byte included.
    pub encoded: Vec<u8>,
}

impl Frame {
    /// Wrap already-encoded bytes (including the mode byte) into a `Frame`.
    pub fn from_encoded(encoded: Vec<u8>) -> Result<Self, BlteError> {
        let mode_byte = *encoded.first().ok_or(BlteError::InvalidFrameCount(0))?;
        let mode = FrameMode::from_byte(mode_byte).ok_or(BlteError::UnknownMode(mode_byte))?;
        Ok(Self { mode, encoded })
    }

    /// Payload bytes, with the mode byte stripped.
    pub fn payload(&self) -> &[u8] {
        &self.encoded[1..]
    }

    /// MD5 of the full encoded frame (mode byte included).
    pub fn checksum(&self) -> [u8; 16] {
        md5::compute(&self.encoded).into()
    }
}
