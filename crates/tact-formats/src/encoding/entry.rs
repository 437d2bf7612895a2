//! Fixed-key-size page record layouts (§4.4): one CKey entry maps a content
//! key to its equivalent encodings, one EKey entry maps an encoding key to
//! its `ESpec` and encoded size.

use tact_crypto::{CKey, EKey};

/// `key_count(1B) | plain_size(5B BE) | CKey(16B) | EKey[key_count](16B each)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CKeyEntry {
    /// Decoded plaintext size.
    pub plain_size: u64,
    /// Content key.
    pub ckey: CKey,
    /// Every encoding key this content is equivalently stored as.
    pub ekeys: Vec<EKey>,
}

impl CKeyEntry {
    pub(super) fn write_to(&self, out: &mut Vec<u8>) {
        #[allow(clippy::cast_possible_truncation)]
        out.push(self.ekeys.len() as u8);
        write_u40(out, self.plain_size);
        out.extend_from_slice(self.ckey.as_bytes());
        for ekey in &self.ekeys {
            out.extend_from_slice(ekey.as_bytes());
        }
    }

    /// Number of bytes this entry occupies on the wire.
    pub(super) fn byte_len(&self) -> usize {
        1 + 5 + 16 + self.ekeys.len() * 16
    }

    /// Parse one entry from `bytes`, returning `(entry, bytes_consumed)`.
    /// A leading `0x00` key-count byte marks end-of-page padding: returns
    /// `None`.
    pub(super) fn read_from(bytes: &[u8]) -> Option<(Self, usize)> {
        let key_count = *bytes.first()? as usize;
        if key_count == 0 {
            return None;
        }
        let needed = 1 + 5 + 16 + key_count * 16;
        if bytes.len() < needed {
            return None;
        }
        let plain_size = read_u40(&bytes[1..6]);
        let mut ckey_bytes = [0u8; 16];
        ckey_bytes.copy_from_slice(&bytes[6..22]);
        let ckey = CKey::from_bytes(ckey_bytes);

        let mut ekeys = Vec::with_capacity(key_count);
        let mut pos = 22;
        for _ in 0..key_count {
            let mut ekey_bytes = [0u8; 16];
            ekey_bytes.copy_from_slice(&bytes[pos..pos + 16]);
            ekeys.push(EKey::from_bytes(ekey_bytes));
            pos += 16;
        }

        Some((
            Self {
                plain_size,
                ckey,
                ekeys,
            },
            needed,
        ))
    }
}

/// `EKey(16B) | espec_index(4B BE) | encoded_size(5B BE)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EKeyEntry {
    /// Encoding key.
    pub ekey: EKey,
    /// Index into the `ESpec` string pool.
    pub espec_index: u32,
    /// Size of the encoded (BLTE) byte stream.
    pub encoded_size: u64,
}

impl EKeyEntry {
    pub(super) const BYTE_LEN: usize = 16 + 4 + 5;

    pub(super) fn write_to(self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.ekey.as_bytes());
        out.extend_from_slice(&self.espec_index.to_be_bytes());
        write_u40(out, self.encoded_size);
    }

    /// Parse one entry. An all-zero entry marks end-of-page padding.
    pub(super) fn read_from(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::BYTE_LEN || bytes[..Self::BYTE_LEN].iter().all(|&b| b == 0) {
            return None;
        }
        let mut ekey_bytes = [0u8; 16];
        ekey_bytes.copy_from_slice(&bytes[0..16]);
        let espec_index = u32::from_be_bytes(bytes[16..20].try_into().expect("4 bytes"));
        let encoded_size = read_u40(&bytes[20..25]);
        Some(Self {
            ekey: EKey::from_bytes(ekey_bytes),
            espec_index,
            encoded_size,
        })
    }
}

fn write_u40(out: &mut Vec<u8>, value: u64) {
    let bytes = value.to_be_bytes();
    out.extend_from_slice(&bytes[3..8]);
}

fn read_u40(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf[3..8].copy_from_slice(bytes);
    u64::from_be_bytes(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ckey_entry_round_trips() {
        let entry = CKeyEntry {
            plain_size: 123_456_789,
            ckey: CKey::from_bytes([7; 16]),
            ekeys: vec![EKey::from_bytes([1; 16]), EKey::from_bytes([2; 16])],
        };
        let mut bytes = Vec::new();
        entry.write_to(&mut bytes);
        assert_eq!(bytes.len(), entry.byte_len());

        let (parsed, consumed) = CKeyEntry::read_from(&bytes).expect("parses");
        assert_eq!(consumed, bytes.len());
        assert_eq!(parsed, entry);
    }

    #[test]
    fn ckey_entry_padding_terminates() {
        let padding = [0u8; 32];
        assert!(CKeyEntry::read_from(&padding).is_none());
    }

    #[test]
    fn ekey_entry_round_trips() {
        let entry = EKeyEntry {
            ekey: EKey::from_bytes([9; 16]),
            espec_index: 42,
            encoded_size: 987_654,
        };
        let mut bytes = Vec::new();
        entry.write_to(&mut bytes);
        let parsed = EKeyEntry::read_from(&bytes).expect("parses");
        assert_eq!(parsed, entry);
    }

    #[test]
    fn ekey_entry_padding_terminates() {
        let padding = [0u8; EKeyEntry::BYTE_LEN];
        assert!(EKeyEntry::read_from(&padding).is_none());
    }
}
