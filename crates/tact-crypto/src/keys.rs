//! TACT decryption key lookup for BLTE `E` frames.

use std::collections::HashMap;

/// A TACT encryption key: a 64-bit name paired with its 16-byte key material.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TactKey {
    /// Key name (the `keyname` field of a BLTE `E` frame, as a big-endian u64).
    pub name: u64,
    /// 16-byte key material.
    pub key: [u8; 16],
}

impl TactKey {
    /// Construct a key from its name and raw bytes.
    pub const fn new(name: u64, key: [u8; 16]) -> Self {
        Self { name, key }
    }
}

/// Decryption key lookup consumed by the BLTE codec for `E` frames.
///
/// Implementations are expected to be read-only once constructed: the codec
/// holds no shared mutable state beyond this service (§5 of the spec).
pub trait KeyService: Send + Sync {
    /// Look up the 16-byte key for a given 8-byte key name, if known.
    fn lookup(&self, keyname: [u8; 8]) -> Option<[u8; 16]>;
}

/// In-memory [`KeyService`] reference implementation.
///
/// Suitable for tests and for embedding callers that already resolved their
/// keys out-of-band; a production client typically backs this trait with a
/// keyring or a fetched TACT key list instead.
#[derive(Debug, Clone, Default)]
pub struct StaticKeyService {
    keys: HashMap<[u8; 8], [u8; 16]>,
}

impl StaticKeyService {
    /// An empty key service: every lookup misses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from an iterator of `(name, key)` pairs.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (u64, [u8; 16])>) -> Self {
        let keys = pairs
            .into_iter()
            .map(|(name, key)| (name.to_be_bytes(), key))
            .collect();
        Self { keys }
    }

    /// Insert a key, keyed by its big-endian name bytes.
    pub fn insert(&mut self, name: u64, key: [u8; 16]) {
        self.keys.insert(name.to_be_bytes(), key);
    }
}

impl KeyService for StaticKeyService {
    fn lookup(&self, keyname: [u8; 8]) -> Option<[u8; 16]> {
        self.keys.get(&keyname).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_key_service_round_trips_by_name() {
        let mut svc = StaticKeyService::new();
        svc.insert(0xFA50_5078_126A_CB3E, [0xAB; 16]);

        assert_eq!(
            svc.lookup(0xFA50_5078_126A_CB3Eu64.to_be_bytes()),
            Some([0xAB; 16])
        );
        assert_eq!(svc.lookup([0u8; 8]), None);
    }

    #[test]
    fn from_pairs_builds_lookup_table() {
        let svc = StaticKeyService::from_pairs([(1u64, [1u8; 16]), (2u64, [2u8; 16])]);
        assert_eq!(svc.lookup(1u64.to_be_bytes()), Some([1u8; 16]));
        assert_eq!(svc.lookup(2u64.to_be_bytes()), Some([2u8; 16]));
        assert_eq!(svc.lookup(3u64.to_be_bytes()), None);
    }
}
