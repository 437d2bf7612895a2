//! BLTE (Block Table Encoded) streaming container codec.
//!
//! Every archived object is wrapped in BLTE: a small header plus one or more
//! mode-tagged frames (`N` raw, `Z` zlib, `F` recursive, `E` encrypted). The
//! [`BlteReader`] decodes frames on demand and validates each frame's MD5
//! against the header's frame table as it streams; [`encode`] produces a
//! complete encoded stream from a plaintext and a block-size schedule.

mod compression;
mod encryption;
mod error;
mod frame;
mod header;

pub use compression::{compress_payload, decompress_payload};
pub use encryption::CipherKind;
pub use error::{BlteError, BlteResult};
pub use frame::{Frame, FrameMode};
pub use header::{BlteHeader, FrameInfo, BLTE_MAGIC};

use std::io::{self, Read, Seek, SeekFrom};

use binrw::io::Cursor;
use binrw::{BinRead, BinWrite};
use tact_crypto::KeyService;

use crate::espec::{BlockPart, ESpec};

/// Encode `plaintext` as a complete BLTE byte stream per the given `espec`'s
/// block schedule. Plain `"n"`/`"z"` specs produce a single-frame stream;
/// `"b:{...}"` specs split at the declared block boundaries.
pub fn encode(plaintext: &[u8], espec: &ESpec) -> BlteResult<Vec<u8>> {
    let frames = encode_frames(plaintext, espec)?;

    let mut out = Vec::new();
    if frames.len() == 1 && matches!(espec, ESpec::None | ESpec::ZLib { .. }) {
        BlteHeader::single_frame().write_options(
            &mut Cursor::new(&mut out),
            binrw::Endian::Big,
            (),
        )?;
        out.extend_from_slice(&frames[0].encoded);
        return Ok(out);
    }

    let infos = frames
        .iter()
        .map(|f| FrameInfo {
            #[allow(clippy::cast_possible_truncation)]
            encoded_size: f.encoded.len() as u32,
            #[allow(clippy::cast_possible_truncation)]
            plain_size: frame_plain_size(f) as u32,
            checksum: f.checksum(),
        })
        .collect();
    let header = BlteHeader::multi_frame(infos)?;
    header.write_options(&mut Cursor::new(&mut out), binrw::Endian::Big, ())?;
    for frame in &frames {
        out.extend_from_slice(&frame.encoded);
    }
    Ok(out)
}

fn frame_plain_size(frame: &Frame) -> usize {
    match frame.mode {
        FrameMode::Raw => frame.payload().len(),
        FrameMode::ZLib => decompress_payload(frame.payload(), FrameMode::ZLib)
            .map(|d| d.len())
            .unwrap_or(0),
        FrameMode::Recursive | FrameMode::Encrypted => frame.payload().len(),
    }
}

fn encode_frames(plaintext: &[u8], espec: &ESpec) -> BlteResult<Vec<Frame>> {
    match espec {
        ESpec::None => Ok(vec![encode_frame(plaintext, FrameMode::Raw)?]),
        ESpec::ZLib { .. } => Ok(vec![encode_frame(plaintext, FrameMode::ZLib)?]),
        ESpec::Block(parts) => {
            let mut frames = Vec::new();
            let mut offset = 0usize;
            for part in parts {
                match part {
                    BlockPart::Fixed { size, mode } => {
                        let end = (offset + size).min(plaintext.len());
                        frames.push(encode_frame(&plaintext[offset..end], mode_of(mode))?);
                        offset = end;
                    }
                    BlockPart::Repeated { size, count, mode } => {
                        for _ in 0..*count {
                            let end = (offset + size).min(plaintext.len());
                            frames.push(encode_frame(&plaintext[offset..end], mode_of(mode))?);
                            offset = end;
                        }
                    }
                    BlockPart::Remainder { mode } => {
                        frames.push(encode_frame(&plaintext[offset..], mode_of(mode))?);
                        offset = plaintext.len();
                    }
                }
            }
            if frames.is_empty() {
                return Err(BlteError::InvalidFrameCount(0));
            }
            Ok(frames)
        }
        ESpec::Encrypted { .. } | ESpec::RecursiveBlte => {
            Err(BlteError::UnknownMode(0))
        }
    }
}

fn mode_of(inner: &crate::espec::BlockMode) -> FrameMode {
    match inner {
        crate::espec::BlockMode::None => FrameMode::Raw,
        crate::espec::BlockMode::ZLib { .. } => FrameMode::ZLib,
    }
}

fn encode_frame(plaintext: &[u8], mode: FrameMode) -> BlteResult<Frame> {
    let payload = compress_payload(plaintext, mode)?;
    let mut encoded = Vec::with_capacity(payload.len() + 1);
    encoded.push(mode.as_byte());
    encoded.extend_from_slice(&payload);
    Frame::from_encoded(encoded)
}

/// A streaming BLTE decoder.
///
/// Frames are decoded lazily and cached; decoded bytes are validated against
/// the frame table's checksum the first time each frame is touched.
pub struct BlteReader<'a> {
    header: BlteHeader,
    raw_frames: Vec<Frame>,
    decoded: Vec<Option<Vec<u8>>>,
    plain_offsets: Vec<usize>,
    total_len: usize,
    position: usize,
    keys: Option<&'a dyn KeyService>,
}

impl<'a> BlteReader<'a> {
    /// Parse a complete BLTE stream, splitting it into frames without
    /// decoding them yet. `keys` is consulted lazily, only if an `E`-mode
    /// frame is actually read.
    pub fn open(data: &[u8], keys: Option<&'a dyn KeyService>) -> BlteResult<Self> {
        let mut cursor = Cursor::new(data);
        let header = BlteHeader::read_options(&mut cursor, binrw::Endian::Big, ())?;
        let data_offset = header.data_offset();

        let raw_frames = match &header.frames {
            None => {
                let encoded = data[data_offset..].to_vec();
                vec![Frame::from_encoded(encoded)?]
            }
            Some(infos) => {
                let mut frames = Vec::with_capacity(infos.len());
                let mut offset = data_offset;
                for info in infos {
                    let end = offset + info.encoded_size as usize;
                    let encoded = data
                        .get(offset..end)
                        .ok_or_else(|| BlteError::InvalidFrameCount(infos.len() as u32))?
                        .to_vec();
                    frames.push(Frame::from_encoded(encoded)?);
                    offset = end;
                }
                frames
            }
        };

        if let Some(infos) = &header.frames {
            for (index, (frame, info)) in raw_frames.iter().zip(infos.iter()).enumerate() {
                let actual = frame.checksum();
                if actual != info.checksum {
                    return Err(BlteError::ChecksumMismatch {
                        frame: index,
                        expected: hex::encode(info.checksum),
                        actual: hex::encode(actual),
                    });
                }
            }
        }

        if header.is_single_frame() && raw_frames[0].mode == FrameMode::Encrypted {
            return Err(BlteError::SingleFrameEncrypted);
        }

        let decoded = vec![None; raw_frames.len()];
        Ok(Self {
            header,
            raw_frames,
            decoded,
            plain_offsets: Vec::new(),
            total_len: 0,
            position: 0,
            keys,
        }
        .with_plain_lengths()?)
    }

    fn with_plain_lengths(mut self) -> BlteResult<Self> {
        let mut offsets = Vec::with_capacity(self.raw_frames.len() + 1);
        let mut total = 0usize;
        offsets.push(0);
        for index in 0..self.raw_frames.len() {
            let decoded = self.decode_frame(index)?;
            total += decoded.len();
            offsets.push(total);
        }
        self.plain_offsets = offsets;
        self.total_len = total;
        Ok(self)
    }

    fn decode_frame(&mut self, index: usize) -> BlteResult<&Vec<u8>> {
        if self.decoded[index].is_none() {
            let frame = &self.raw_frames[index];
            let out = match frame.mode {
                FrameMode::Raw => decompress_payload(frame.payload(), FrameMode::Raw)?,
                FrameMode::ZLib => decompress_payload(frame.payload(), FrameMode::ZLib)?,
                FrameMode::Recursive => {
                    let nested = BlteReader::open(frame.payload(), self.keys)?;
                    nested.into_plaintext()?
                }
                FrameMode::Encrypted => {
                    let keys = self
                        .keys
                        .ok_or_else(|| BlteError::MissingKey("no KeyService provided".into()))?;
                    encryption::decrypt_payload(frame.payload(), index, keys)?
                }
            };
            self.decoded[index] = Some(out);
        }
        Ok(self.decoded[index].as_ref().expect("just populated"))
    }

    /// Total decoded plaintext length.
    pub const fn len(&self) -> usize {
        self.total_len
    }

    /// Whether the decoded plaintext is empty.
    pub const fn is_empty(&self) -> bool {
        self.total_len == 0
    }

    /// Decode every frame and return the concatenated plaintext.
    pub fn into_plaintext(mut self) -> BlteResult<Vec<u8>> {
        let mut out = Vec::with_capacity(self.total_len);
        for index in 0..self.raw_frames.len() {
            out.extend_from_slice(self.decode_frame(index)?);
        }
        Ok(out)
    }

    fn locate(&self, plain_pos: usize) -> (usize, usize) {
        match self.plain_offsets.binary_search(&plain_pos) {
            Ok(frame) if frame < self.raw_frames.len() => (frame, 0),
            Ok(frame) => (frame.saturating_sub(1), plain_pos - self.plain_offsets[frame - 1]),
            Err(frame) => (frame - 1, plain_pos - self.plain_offsets[frame - 1]),
        }
    }
}

impl Read for BlteReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.position >= self.total_len {
            return Ok(0);
        }
        let (frame_index, offset_in_frame) = self.locate(self.position);
        let decoded = self
            .decode_frame(frame_index)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let available = &decoded[offset_in_frame..];
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.position += n;
        Ok(n)
    }
}

impl Seek for BlteReader<'_> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        #[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
        let new_pos: i64 = match pos {
            SeekFrom::Start(p) => p as i64,
            SeekFrom::End(p) => self.total_len as i64 + p,
            SeekFrom::Current(p) => self.position as i64 + p,
        };
        if new_pos < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek to negative position",
            ));
        }
        #[allow(clippy::cast_sign_loss)]
        {
            self.position = (new_pos as usize).min(self.total_len);
        }
        Ok(self.position as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::espec::ESpec;
    use tact_crypto::StaticKeyService;

    #[test]
    fn single_frame_raw_round_trips() {
        let plaintext = b"Hello";
        let encoded = encode(plaintext, &ESpec::None).expect("encode succeeds");
        assert_eq!(&encoded[0..8], &[0x42, 0x4C, 0x54, 0x45, 0x00, 0x00, 0x00, 0x00]);
        assert_eq!(&encoded[8..], b"NHello");

        let reader = BlteReader::open(&encoded, None).expect("open succeeds");
        assert_eq!(reader.into_plaintext().expect("decode succeeds"), plaintext);
    }

    #[test]
    fn multi_frame_zlib_round_trips() {
        let plaintext = vec![0x42u8; 3 * 1024 * 1024];
        let espec = ESpec::Block(vec![
            crate::espec::BlockPart::Fixed {
                size: 1024 * 1024,
                mode: crate::espec::BlockMode::ZLib { level: None },
            },
            crate::espec::BlockPart::Fixed {
                size: 1024 * 1024,
                mode: crate::espec::BlockMode::ZLib { level: None },
            },
            crate::espec::BlockPart::Remainder {
                mode: crate::espec::BlockMode::ZLib { level: None },
            },
        ]);
        let encoded = encode(&plaintext, &espec).expect("encode succeeds");
        let reader = BlteReader::open(&encoded, None).expect("open succeeds");
        assert_eq!(reader.len(), plaintext.len());
        assert_eq!(reader.into_plaintext().expect("decode succeeds"), plaintext);
    }

    #[test]
    fn checksum_mismatch_is_detected() {
        let plaintext = vec![0x11u8; 2 * 1024 * 1024];
        let espec = ESpec::Block(vec![
            crate::espec::BlockPart::Fixed {
                size: 1024 * 1024,
                mode: crate::espec::BlockMode::None,
            },
            crate::espec::BlockPart::Remainder {
                mode: crate::espec::BlockMode::None,
            },
        ]);
        let mut encoded = encode(&plaintext, &espec).expect("encode succeeds");
        let last = encoded.len() - 1;
        encoded[last] ^= 0xFF;

        let err = BlteReader::open(&encoded, None).expect_err("checksum mismatch detected");
        assert!(matches!(err, BlteError::ChecksumMismatch { .. }));
    }

    #[test]
    fn encrypted_frame_round_trips() {
        let plaintext = b"secret frame contents";
        let key_name = [0xAAu8; 8];
        let key = [0x11u8; 16];
        let iv = [0x01, 0x02, 0x03, 0x04];

        let payload = compress_payload(plaintext, FrameMode::Raw).expect("compress succeeds");
        let mut tagged = vec![FrameMode::Raw.as_byte()];
        tagged.extend_from_slice(&payload);

        let encrypted_payload =
            encryption::encrypt_payload(&tagged, key_name, iv, CipherKind::Salsa20, &key, 0)
                .expect("encrypt succeeds");
        let mut frame_encoded = vec![FrameMode::Encrypted.as_byte()];
        frame_encoded.extend_from_slice(&encrypted_payload);
        let frame = Frame::from_encoded(frame_encoded).expect("valid frame");

        let header = BlteHeader::multi_frame(vec![FrameInfo {
            #[allow(clippy::cast_possible_truncation)]
            encoded_size: frame.encoded.len() as u32,
            #[allow(clippy::cast_possible_truncation)]
            plain_size: plaintext.len() as u32,
            checksum: frame.checksum(),
        }])
        .expect("header builds");

        let mut stream = Vec::new();
        header
            .write_options(&mut Cursor::new(&mut stream), binrw::Endian::Big, ())
            .expect("write succeeds");
        stream.extend_from_slice(&frame.encoded);

        let mut keys = StaticKeyService::new();
        keys.insert(u64::from_be_bytes(key_name), key);

        let reader = BlteReader::open(&stream, Some(&keys)).expect("open succeeds");
        assert_eq!(reader.into_plaintext().expect("decode succeeds"), plaintext);
    }

    #[test]
    fn missing_key_surfaces_error() {
        let plaintext = b"secret";
        let key_name = [0x01u8; 8];
        let key = [0x22u8; 16];
        let iv = [0x00, 0x00, 0x00, 0x01];

        let payload = compress_payload(plaintext, FrameMode::Raw).expect("compress succeeds");
        let mut tagged = vec![FrameMode::Raw.as_byte()];
        tagged.extend_from_slice(&payload);
        let encrypted_payload =
            encryption::encrypt_payload(&tagged, key_name, iv, CipherKind::Salsa20, &key, 0)
                .expect("encrypt succeeds");
        let mut frame_encoded = vec![FrameMode::Encrypted.as_byte()];
        frame_encoded.extend_from_slice(&encrypted_payload);
        let frame = Frame::from_encoded(frame_encoded).expect("valid frame");

        let header = BlteHeader::multi_frame(vec![FrameInfo {
            #[allow(clippy::cast_possible_truncation)]
            encoded_size: frame.encoded.len() as u32,
            #[allow(clippy::cast_possible_truncation)]
            plain_size: plaintext.len() as u32,
            checksum: frame.checksum(),
        }])
        .expect("header builds");
        let mut stream = Vec::new();
        header
            .write_options(&mut Cursor::new(&mut stream), binrw::Endian::Big, ())
            .expect("write succeeds");
        stream.extend_from_slice(&frame.encoded);

        let empty_keys = StaticKeyService::new();
        let err =
            BlteReader::open(&stream, Some(&empty_keys)).expect_err("missing key surfaces");
        assert!(matches!(err, BlteError::MissingKey(_)));
    }
}
