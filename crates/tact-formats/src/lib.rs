//! Binary formats for TACT content-addressed storage: the BLTE streaming
//! codec, the CDN archive/index format, the encoding table, and the `ESpec`
//! grammar that ties a file's storage layout to its BLTE frame schedule.

pub mod archive;
pub mod blte;
pub mod encoding;
pub mod espec;
