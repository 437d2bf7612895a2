//! Engine configuration: archive size cap, page sizes, directory layout.
//! Defaults match §4 exactly.

use tact_formats::archive::ARCHIVE_MAX_BYTES;
use tact_formats::encoding::DEFAULT_PAGE_SIZE_KB;

/// Tuning knobs for a [`crate::cas::CasWriter`]/[`crate::cas::CasReader`]
/// pair. `Default` matches the on-disk format's own defaults, so most
/// callers never need to construct one explicitly.
#[derive(Debug, Clone, Copy)]
pub struct CasConfig {
    /// Maximum archive blob size before the packer seals and starts a new
    /// one (§3 invariant 5, §4.3's packing rule).
    pub archive_max_bytes: u64,
    /// Page size, in KiB, for the content-key section of the encoding table.
    pub ckey_page_size_kb: u16,
    /// Page size, in KiB, for the encoding-key section of the encoding table.
    pub ekey_page_size_kb: u16,
}

impl Default for CasConfig {
    fn default() -> Self {
        Self {
            archive_max_bytes: ARCHIVE_MAX_BYTES,
            ckey_page_size_kb: DEFAULT_PAGE_SIZE_KB,
            ekey_page_size_kb: DEFAULT_PAGE_SIZE_KB,
        }
    }
}
