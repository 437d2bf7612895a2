//! BLTE container header and frame table.

use binrw::io::{Read, Seek, Write};
use binrw::{BinRead, BinResult, BinWrite};

use super::error::BlteError;

/// BLTE magic bytes.
pub const BLTE_MAGIC: [u8; 4] = *b"BLTE";

/// Flags byte prefixing the frame count; always `0x0F` in this format.
const FRAME_TABLE_FLAGS: u8 = 0x0F;

/// One entry of the BLTE frame table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameInfo {
    /// Size of the encoded frame on disk, including its mode byte.
    pub encoded_size: u32,
    /// Size of the frame's decoded plaintext.
    pub plain_size: u32,
    /// MD5 of the encoded frame bytes (mode byte included).
    pub checksum: [u8; 16],
}

impl BinRead for FrameInfo {
    type Args<'a> = ();

    fn read_options<R: Read + Seek>(
        reader: &mut R,
        _endian: binrw::Endian,
        _args: Self::Args<'_>,
    ) -> BinResult<Self> {
        let encoded_size = u32::read_options(reader, binrw::Endian::Big, ())?;
        let plain_size = u32::read_options(reader, binrw::Endian::Big, ())?;
        let mut checksum = [0u8; 16];
        reader.read_exact(&mut checksum)?;
        Ok(Self {
            encoded_size,
            plain_size,
            checksum,
        })
    }
}

impl BinWrite for FrameInfo {
    type Args<'a> = ();

    fn write_options<W: Write + Seek>(
        &self,
        writer: &mut W,
        _endian: binrw::Endian,
        _args: Self::Args<'_>,
    ) -> BinResult<()> {
        self.encoded_size
            .write_options(writer, binrw::Endian::Big, ())?;
        self.plain_size
            .write_options(writer, binrw::Endian::Big, ())?;
        writer.write_all(&self.checksum)?;
        Ok(())
    }
}

/// BLTE container header.
///
/// `header_size == 0` marks a single-frame stream: the remainder of the file
/// is one raw encoded frame and there is no frame table.
#[derive(Debug, Clone)]
pub struct BlteHeader {
    /// Header size in bytes, as written on disk (0 for single-frame streams).
    pub header_size: u32,
    /// Frame table, present only when `header_size > 0`.
    pub frames: Option<Vec<FrameInfo>>,
}

impl BinRead for BlteHeader {
    type Args<'a> = ();

    fn read_options<R: Read + Seek>(
        reader: &mut R,
        endian: binrw::Endian,
        _args: Self::Args<'_>,
    ) -> BinResult<Self> {
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if magic != BLTE_MAGIC {
            return Err(binrw::Error::Custom {
                pos: 0,
                err: Box::new(BlteError::InvalidMagic(magic)),
            });
        }

        let header_size = u32::read_options(reader, binrw::Endian::Big, ())?;

        let frames = if header_size > 0 {
            let flags = u8::read_options(reader, endian, ())?;
            if flags != FRAME_TABLE_FLAGS {
                return Err(binrw::Error::Custom {
                    pos: 8,
                    err: Box::new(BlteError::InvalidFlags(flags)),
                });
            }

            let mut count_bytes = [0u8; 3];
            reader.read_exact(&mut count_bytes)?;
            let frame_count = u32::from_be_bytes([0, count_bytes[0], count_bytes[1], count_bytes[2]]);

            let mut frames = Vec::with_capacity(frame_count as usize);
            for _ in 0..frame_count {
                frames.push(FrameInfo::read_options(reader, endian, ())?);
            }
            Some(frames)
        } else {
            None
        };

        Ok(Self {
            header_size,
            frames,
        })
    }
}

impl BinWrite for BlteHeader {
    type Args<'a> = ();

    fn write_options<W: Write + Seek>(
        &self,
        writer: &mut W,
        endian: binrw::Endian,
        _args: Self::Args<'_>,
    ) -> BinResult<()> {
        writer.write_all(&BLTE_MAGIC)?;
        self.header_size
            .write_options(writer, binrw::Endian::Big, ())?;

        if let Some(ref frames) = self.frames {
            FRAME_TABLE_FLAGS.write_options(writer, endian, ())?;

            #[allow(clippy::cast_possible_truncation)]
            let count_bytes = [
                (frames.len() >> 16) as u8,
                (frames.len() >> 8) as u8,
                frames.len() as u8,
            ];
            writer.write_all(&count_bytes)?;

            for frame in frames {
                frame.write_options(writer, endian, ())?;
            }
        }

        Ok(())
    }
}

impl BlteHeader {
    /// Header for a single-frame stream.
    pub const fn single_frame() -> Self {
        Self {
            header_size: 0,
            frames: None,
        }
    }

    /// Build a multi-frame header's table from already-encoded frames.
    pub fn multi_frame(frames: Vec<FrameInfo>) -> Result<Self, BlteError> {
        if frames.is_empty() {
            return Err(BlteError::InvalidFrameCount(0));
        }
        if frames.len() > 0xFF_FFFF {
            #[allow(clippy::cast_possible_truncation)]
            return Err(BlteError::InvalidFrameCount(frames.len() as u32));
        }

        // 8-byte preamble + 4-byte (flags + count) + 24 bytes per frame.
        let header_size = 12 + frames.len() * 24;

        Ok(Self {
            #[allow(clippy::cast_possible_truncation)]
            header_size: header_size as u32,
            frames: Some(frames),
        })
    }

    /// Whether this header describes a single-frame stream.
    pub const fn is_single_frame(&self) -> bool {
        self.header_size == 0
    }

    /// Number of frames in the stream.
    pub fn frame_count(&self) -> usize {
        self.frames.as_ref().map_or(1, Vec::len)
    }

    /// Byte offset where frame data begins.
    pub fn data_offset(&self) -> usize {
        if self.is_single_frame() {
            8
        } else {
            self.header_size as usize
        }
    }
}
