//! `N`/`Z` frame payload compression and decompression.

use std::io::Read;

use flate2::Compression;
use flate2::read::{ZlibDecoder, ZlibEncoder};

use super::error::BlteError;
use super::frame::FrameMode;

/// Refuse to decompress a single frame into more than this many bytes.
///
/// A corrupt or hostile frame table can claim an arbitrarily large
/// `plain_size`; this bounds the damage a single frame can do before the
/// frame-table's own `plain_size` field is cross-checked by the caller.
pub const MAX_FRAME_PLAIN_SIZE: usize = 1024 * 1024 * 1024;

/// Compress `data` into a frame payload for the given raw/zlib mode.
pub fn compress_payload(data: &[u8], mode: FrameMode) -> Result<Vec<u8>, BlteError> {
    match mode {
        FrameMode::Raw => Ok(data.to_vec()),
        FrameMode::ZLib => {
            let mut encoder = ZlibEncoder::new(data, Compression::default());
            let mut out = Vec::new();
            encoder
                .read_to_end(&mut out)
                .map_err(|e| BlteError::Zlib(e.to_string()))?;
            Ok(out)
        }
        FrameMode::Recursive | FrameMode::Encrypted => Err(BlteError::UnknownMode(mode.as_byte())),
    }
}

/// Decompress a frame payload produced by [`compress_payload`].
pub fn decompress_payload(payload: &[u8], mode: FrameMode) -> Result<Vec<u8>, BlteError> {
    match mode {
        FrameMode::Raw => Ok(payload.to_vec()),
        FrameMode::ZLib => {
            let mut decoder = ZlibDecoder::new(payload);
            let mut out = Vec::new();
            let mut buf = [0u8; 8192];
            loop {
                let n = decoder
                    .read(&mut buf)
                    .map_err(|e| BlteError::Zlib(e.to_string()))?;
                if n == 0 {
                    break;
                }
                if out.len() + n > MAX_FRAME_PLAIN_SIZE {
                    return Err(BlteError::Zlib(format!(
                        "decompressed frame exceeds {MAX_FRAME_PLAIN_SIZE} bytes"
                    )));
                }
                out.extend_from_slice(&buf[..n]);
            }
            Ok(out)
        }
        FrameMode::Recursive | FrameMode::Encrypted => Err(BlteError::UnknownMode(mode.as_byte())),
    }
}
