//! Fixed 16-byte digests used as content identity (`CKey`) and storage address (`EKey`).

use std::fmt;
use std::str::FromStr;

use crate::error::HashError;

/// A 16-byte MD5-sized digest with lexicographic unsigned-byte ordering.
///
/// `Hash` is the common representation underlying both [`CKey`] and [`EKey`];
/// those newtypes exist so the compiler rejects passing a content key where an
/// encoding key is expected (and vice versa), even though both are plain
/// 16-byte digests on the wire.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Hash([u8; 16]);

impl Hash {
    /// Build a hash from raw bytes.
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Compute the hash as `MD5(data)`.
    pub fn from_data(data: &[u8]) -> Self {
        Self(md5::compute(data).into())
    }

    /// Parse a hash from 32 hex characters (either case).
    pub fn parse(hex_str: &str) -> Result<Self, HashError> {
        let hex_str = hex_str.trim();
        if hex_str.len() != 32 {
            return Err(HashError::BadLength(hex_str.len()));
        }
        let mut bytes = [0u8; 16];
        hex::decode_to_slice(hex_str, &mut bytes)?;
        Ok(Self(bytes))
    }

    /// Raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Render as lowercase hex.
    pub fn to_hex(self) -> String {
        hex::encode(self.0)
    }

    /// The distinguished empty hash (`Value == null` upstream): all-zero bytes.
    ///
    /// Operations that receive an empty hash short-circuit: encoding lookups
    /// report a miss and writers skip emitting a record for it.
    pub const EMPTY: Self = Self([0u8; 16]);

    /// Whether this is the distinguished empty hash.
    pub fn is_empty(&self) -> bool {
        *self == Self::EMPTY
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", self.to_hex())
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for Hash {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<[u8; 16]> for Hash {
    fn from(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }
}

impl From<Hash> for [u8; 16] {
    fn from(hash: Hash) -> Self {
        hash.0
    }
}

macro_rules! key_newtype {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub Hash);

        impl $name {
            /// Build from raw bytes.
            pub const fn from_bytes(bytes: [u8; 16]) -> Self {
                Self(Hash::from_bytes(bytes))
            }

            /// Compute as `MD5(data)`.
            pub fn from_data(data: &[u8]) -> Self {
                Self(Hash::from_data(data))
            }

            /// Parse from 32 hex characters.
            pub fn parse(hex_str: &str) -> Result<Self, HashError> {
                Ok(Self(Hash::parse(hex_str)?))
            }

            /// Raw bytes.
            pub const fn as_bytes(&self) -> &[u8; 16] {
                self.0.as_bytes()
            }

            /// Render as lowercase hex.
            pub fn to_hex(self) -> String {
                self.0.to_hex()
            }

            /// Whether this wraps the distinguished empty hash.
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }

            /// The two leading hex-pair path components used by the CDN layout
            /// (`<hash[0:2]>/<hash[2:4]>`).
            pub fn path_prefix(&self) -> (String, String) {
                let hex = self.to_hex();
                (hex[0..2].to_string(), hex[2..4].to_string())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.to_hex())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.to_hex())
            }
        }

        impl FromStr for $name {
            type Err = HashError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl From<Hash> for $name {
            fn from(hash: Hash) -> Self {
                Self(hash)
            }
        }

        impl From<$name> for Hash {
            fn from(key: $name) -> Self {
                key.0
            }
        }

        impl From<[u8; 16]> for $name {
            fn from(bytes: [u8; 16]) -> Self {
                Self::from_bytes(bytes)
            }
        }
    };
}

key_newtype!(CKey, "Content key: identifies *plaintext* content.");
key_newtype!(
    EKey,
    "Encoding key: identifies *encoded* (BLTE) content; typically the first 16 \
     bytes of the MD5 of the encoded stream."
);
