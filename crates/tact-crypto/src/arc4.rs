//! ARC4 (RC4-compatible) stream cipher used by legacy BLTE `E` frames.
//!
//! ARC4 has known cryptographic weaknesses; it is implemented here solely
//! because some older BLTE-encrypted blocks use it instead of Salsa20.
//!
//! BLTE does not key RC4 with the bare 16-byte frame key: the key is
//! extended to base(16) ++ iv(4) ++ block_index little-endian(4), then
//! zero-padded to 32 bytes.

use cipher::StreamCipher;
use generic_array::typenum::U32;
use rc4::{KeyInit, Rc4};

use crate::error::CryptoError;

/// Build BLTE's ARC4 stream cipher: base key (16) ++ IV (4) ++ frame index
/// little-endian (4), zero-padded to 32 bytes total.
pub fn init_arc4(key: &[u8; 16], iv: &[u8; 4], block_index: u32) -> Rc4<U32> {
    let mut arc4_key = [0u8; 32];
    arc4_key[..16].copy_from_slice(key);
    arc4_key[16..20].copy_from_slice(iv);
    arc4_key[20..24].copy_from_slice(&block_index.to_le_bytes());
    Rc4::new(&arc4_key.into())
}

/// Decrypt (or encrypt — same operation) `data` in place with BLTE's ARC4
/// key construction.
pub fn decrypt_arc4(
    data: &mut [u8],
    key: &[u8; 16],
    iv: &[u8; 4],
    block_index: u32,
) -> Result<(), CryptoError> {
    let mut cipher = init_arc4(key, iv, block_index);
    cipher.try_apply_keystream(data)?;
    Ok(())
}

/// Encrypt `data` in place with BLTE's ARC4 variant (same as [`decrypt_arc4`]).
pub fn encrypt_arc4(
    data: &mut [u8],
    key: &[u8; 16],
    iv: &[u8; 4],
    block_index: u32,
) -> Result<(), CryptoError> {
    decrypt_arc4(data, key, iv, block_index)
}
