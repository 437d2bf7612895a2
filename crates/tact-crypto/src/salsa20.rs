//! Salsa20 stream cipher variant used by BLTE `E` frames.
//!
//! - 16-byte key extended to 32 bytes by duplication (yields the "expand
//!   32-byte k" sigma constants, not the 16-byte tau set)
//! - 4-byte IV extended to 8 bytes by duplication, then XORed with the
//!   little-endian frame (block) index
//! - Built on the `salsa20`/`cipher` crates rather than a hand-rolled core

use cipher::{KeyIvInit, StreamCipher};
use salsa20::Salsa20;

use crate::error::CryptoError;

/// Build BLTE's Salsa20 stream cipher for a given key, IV, and frame index.
pub fn init_salsa20(key: &[u8; 16], iv: &[u8; 4], block_index: u32) -> Salsa20 {
    let mut extended_key = [0u8; 32];
    extended_key[..16].copy_from_slice(key);
    extended_key[16..].copy_from_slice(key);

    let mut extended_iv = [0u8; 8];
    extended_iv[..4].copy_from_slice(iv);
    extended_iv[4..].copy_from_slice(iv);

    let block_bytes = block_index.to_le_bytes();
    for i in 0..block_bytes.len() {
        extended_iv[i] ^= block_bytes[i];
    }

    Salsa20::new(&extended_key.into(), &extended_iv.into())
}

/// Decrypt (or encrypt — same operation) `data` in place with BLTE's Salsa20 variant.
pub fn decrypt_salsa20(
    data: &mut [u8],
    key: &[u8; 16],
    iv: &[u8; 4],
    block_index: u32,
) -> Result<(), CryptoError> {
    let mut cipher = init_salsa20(key, iv, block_index);
    cipher.try_apply_keystream(data)?;
    Ok(())
}

/// Encrypt `data` in place with BLTE's Salsa20 variant (same as [`decrypt_salsa20`]).
pub fn encrypt_salsa20(
    data: &mut [u8],
    key: &[u8; 16],
    iv: &[u8; 4],
    block_index: u32,
) -> Result<(), CryptoError> {
    decrypt_salsa20(data, key, iv, block_index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let key = [0x01u8; 16];
        let iv = [0x02, 0x03, 0x04, 0x05];
        let plaintext = b"Hello, World! This is a test message.";
        let mut buf = plaintext.to_vec();

        encrypt_salsa20(&mut buf, &key, &iv, 0).expect("encrypt succeeds");
        assert_ne!(buf, plaintext);

        decrypt_salsa20(&mut buf, &key, &iv, 0).expect("decrypt succeeds");
        assert_eq!(buf, plaintext);
    }

    #[test]
    fn block_index_changes_keystream() {
        let key = [0x42u8; 16];
        let iv = [0x11, 0x22, 0x33, 0x44];
        let plaintext = b"Test data";

        let mut cipher1 = plaintext.to_vec();
        encrypt_salsa20(&mut cipher1, &key, &iv, 0).expect("encrypt succeeds");
        let mut cipher2 = plaintext.to_vec();
        encrypt_salsa20(&mut cipher2, &key, &iv, 1).expect("encrypt succeeds");
        assert_ne!(cipher1, cipher2);
    }

    #[test]
    fn key_extension_round_trips_with_arbitrary_key() {
        let key = [
            0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xAA, 0xBB, 0xCC, 0xDD,
            0xEE, 0xFF,
        ];
        let iv = [0x01, 0x02, 0x03, 0x04];
        let plaintext = b"Test";
        let mut buf = plaintext.to_vec();

        encrypt_salsa20(&mut buf, &key, &iv, 0).expect("encrypt succeeds");
        decrypt_salsa20(&mut buf, &key, &iv, 0).expect("decrypt succeeds");
        assert_eq!(buf, plaintext);
    }
}
