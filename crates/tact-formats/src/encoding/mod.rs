//! The encoding table (§4.4): translates a content key to its equivalent
//! encoding keys, and an encoding key to the `ESpec` it was stored with.

mod builder;
mod entry;
mod error;
mod espec_pool;
mod table;

pub use builder::EncodingBuilder;
pub use entry::{CKeyEntry, EKeyEntry};
pub use error::{EncodingError, EncodingResult};
pub use espec_pool::EspecPool;
pub use table::{EncodingTable, DEFAULT_PAGE_SIZE_KB};
