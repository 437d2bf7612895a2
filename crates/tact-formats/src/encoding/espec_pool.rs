//! The `ESpec` string pool: a block of null-terminated ASCII strings shared
//! by every `EKey` record, addressed by index (§4.4).

use std::collections::HashMap;

use super::error::{EncodingError, EncodingResult};

/// Interns `ESpec` strings in first-seen order (§4.4.1), so repeated `add`
/// calls with an already-known string reuse its index instead of appending
/// a duplicate.
#[derive(Debug, Clone, Default)]
pub struct EspecPool {
    strings: Vec<String>,
    index_of: HashMap<String, u32>,
}

impl EspecPool {
    /// An empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up or intern `espec`, returning its stable index.
    pub fn intern(&mut self, espec: &str) -> u32 {
        if let Some(&index) = self.index_of.get(espec) {
            return index;
        }
        #[allow(clippy::cast_possible_truncation)]
        let index = self.strings.len() as u32;
        self.strings.push(espec.to_string());
        self.index_of.insert(espec.to_string(), index);
        index
    }

    /// Resolve an index back to its string.
    pub fn get(&self, index: u32) -> Option<&str> {
        self.strings.get(index as usize).map(String::as_str)
    }

    /// Number of interned strings.
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// Whether the pool has no entries.
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// Serialize as the header's `espec_block`: each string followed by a
    /// single `0x00` terminator, concatenated in first-seen order.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for s in &self.strings {
            out.extend_from_slice(s.as_bytes());
            out.push(0);
        }
        out
    }

    /// Parse a raw `espec_block` of the given byte length.
    pub fn from_bytes(block: &[u8]) -> EncodingResult<Self> {
        let mut pool = Self::new();
        let mut start = 0usize;
        while start < block.len() {
            let end = block[start..]
                .iter()
                .position(|&b| b == 0)
                .ok_or(EncodingError::UnterminatedEspec(start))?;
            let s = std::str::from_utf8(&block[start..start + end])
                .map_err(|_| EncodingError::UnterminatedEspec(start))?;
            pool.intern(s);
            start += end + 1;
        }
        Ok(pool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_interns_reuse_the_same_index() {
        let mut pool = EspecPool::new();
        assert_eq!(pool.intern("z"), 0);
        assert_eq!(pool.intern("n"), 1);
        assert_eq!(pool.intern("z"), 0);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn round_trips_through_bytes() {
        let mut pool = EspecPool::new();
        pool.intern("z");
        pool.intern("b:{1M=z,*=n}");
        let bytes = pool.to_bytes();
        let parsed = EspecPool::from_bytes(&bytes).expect("parses");
        assert_eq!(parsed.get(0), Some("z"));
        assert_eq!(parsed.get(1), Some("b:{1M=z,*=n}"));
    }

    #[test]
    fn rejects_unterminated_block() {
        let err = EspecPool::from_bytes(b"z").expect_err("unterminated");
        assert!(matches!(err, EncodingError::UnterminatedEspec(0)));
    }
}
