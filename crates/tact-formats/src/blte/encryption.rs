//! `E`-mode frame payload: `keyname_len | keyname | iv_len | iv | cipher | ciphertext`.

use tact_crypto::{KeyService, decrypt_arc4, decrypt_salsa20, encrypt_arc4, encrypt_salsa20};

use super::compression::decompress_payload;
use super::error::BlteError;
use super::frame::FrameMode;

/// Stream cipher used by an `E`-mode frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipherKind {
    /// Salsa20, BLTE's 16-byte-key variant.
    Salsa20,
    /// ARC4 (RC4-compatible); legacy.
    Arc4,
}

impl CipherKind {
    const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b'S' => Some(Self::Salsa20),
            b'A' => Some(Self::Arc4),
            _ => None,
        }
    }

    const fn as_byte(self) -> u8 {
        match self {
            Self::Salsa20 => b'S',
            Self::Arc4 => b'A',
        }
    }
}

/// A parsed `E`-mode payload, borrowed from the frame's encoded bytes.
struct EncryptedPayload<'a> {
    keyname: [u8; 8],
    iv: [u8; 4],
    cipher: CipherKind,
    ciphertext: &'a [u8],
}

fn parse_encrypted_payload(payload: &[u8]) -> Result<EncryptedPayload<'_>, BlteError> {
    if payload.len() < 15 {
        return Err(BlteError::TruncatedEncryptedFrame(payload.len()));
    }

    let keyname_len = payload[0] as usize;
    if keyname_len != 8 || payload.len() < 1 + keyname_len + 1 {
        return Err(BlteError::TruncatedEncryptedFrame(payload.len()));
    }
    let mut keyname = [0u8; 8];
    keyname.copy_from_slice(&payload[1..1 + keyname_len]);

    let iv_offset = 1 + keyname_len;
    let iv_len = payload[iv_offset] as usize;
    if iv_len != 4 || payload.len() < iv_offset + 1 + iv_len + 1 {
        return Err(BlteError::TruncatedEncryptedFrame(payload.len()));
    }
    let mut iv = [0u8; 4];
    iv.copy_from_slice(&payload[iv_offset + 1..iv_offset + 1 + iv_len]);

    let cipher_offset = iv_offset + 1 + iv_len;
    let cipher = CipherKind::from_byte(payload[cipher_offset])
        .ok_or(BlteError::UnknownEncryptionType(payload[cipher_offset]))?;

    let ciphertext = &payload[cipher_offset + 1..];

    Ok(EncryptedPayload {
        keyname,
        iv,
        cipher,
        ciphertext,
    })
}

/// Build an `E`-mode payload (without the leading `E` mode byte) from already-encrypted bytes.
pub fn build_encrypted_payload(keyname: [u8; 8], iv: [u8; 4], cipher: CipherKind, ciphertext: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(15 + ciphertext.len());
    out.push(8);
    out.extend_from_slice(&keyname);
    out.push(4);
    out.extend_from_slice(&iv);
    out.push(cipher.as_byte());
    out.extend_from_slice(ciphertext);
    out
}

/// Encrypt `plaintext` into an `E`-mode payload (mode byte not included).
pub fn encrypt_payload(
    plaintext: &[u8],
    keyname: [u8; 8],
    iv: [u8; 4],
    cipher: CipherKind,
    key: &[u8; 16],
    frame_index: usize,
) -> Result<Vec<u8>, BlteError> {
    #[allow(clippy::cast_possible_truncation)]
    let block_index = frame_index as u32;
    let mut ciphertext = plaintext.to_vec();
    match cipher {
        CipherKind::Salsa20 => encrypt_salsa20(&mut ciphertext, key, &iv, block_index)?,
        CipherKind::Arc4 => encrypt_arc4(&mut ciphertext, key, &iv, block_index)?,
    }
    Ok(build_encrypted_payload(keyname, iv, cipher, &ciphertext))
}

/// Decrypt and fully decode an `E`-mode frame payload (mode byte not included).
///
/// The decrypted bytes are themselves `[inner_mode_byte, inner_payload...]`;
/// nested `E` frames are rejected, anything else is decompressed recursively.
pub fn decrypt_payload(
    payload: &[u8],
    frame_index: usize,
    keys: &dyn KeyService,
) -> Result<Vec<u8>, BlteError> {
    let parsed = parse_encrypted_payload(payload)?;

    let key = keys
        .lookup(parsed.keyname)
        .ok_or_else(|| BlteError::MissingKey(hex::encode(parsed.keyname)))?;

    #[allow(clippy::cast_possible_truncation)]
    let block_index = frame_index as u32;
    let mut decrypted = parsed.ciphertext.to_vec();
    match parsed.cipher {
        CipherKind::Salsa20 => decrypt_salsa20(&mut decrypted, &key, &parsed.iv, block_index)?,
        CipherKind::Arc4 => decrypt_arc4(&mut decrypted, &key, &parsed.iv, block_index)?,
    }

    let Some(&inner_mode_byte) = decrypted.first() else {
        return Ok(decrypted);
    };
    let Some(inner_mode) = FrameMode::from_byte(inner_mode_byte) else {
        return Ok(decrypted);
    };
    if inner_mode == FrameMode::Encrypted {
        return Err(BlteError::NestedEncryption);
    }
    decompress_payload(&decrypted[1..], inner_mode)
}
