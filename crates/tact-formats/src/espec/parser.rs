//! Hand-written recursive-descent parser for `ESpec` strings.

use thiserror::Error;

use super::{BlockMode, BlockPart, ESpec};

/// Errors raised while parsing an `ESpec` string.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    /// Input was empty.
    #[error("empty ESpec string")]
    Empty,

    /// Unexpected character at the given byte offset.
    #[error("unexpected character {found:?} at offset {offset}")]
    Unexpected {
        /// Offending character.
        found: char,
        /// Byte offset into the input.
        offset: usize,
    },

    /// Input ended while a construct (e.g. `b:{...}`) was still open.
    #[error("unexpected end of ESpec string")]
    UnexpectedEnd,

    /// A numeric size or count failed to parse.
    #[error("invalid number: {0}")]
    InvalidNumber(String),

    /// Trailing characters after a complete block.
    #[error("trailing characters after ESpec: {0:?}")]
    Trailing(String),
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    const fn new(s: &'a str) -> Self {
        Self {
            bytes: s.as_bytes(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        Some(b)
    }

    fn expect(&mut self, byte: u8) -> Result<(), ParseError> {
        match self.bump() {
            Some(b) if b == byte => Ok(()),
            Some(b) => Err(ParseError::Unexpected {
                found: b as char,
                offset: self.pos - 1,
            }),
            None => Err(ParseError::UnexpectedEnd),
        }
    }

    fn take_digits(&mut self) -> &'a str {
        let start = self.pos;
        while matches!(self.peek(), Some(b) if b.is_ascii_digit()) {
            self.pos += 1;
        }
        std::str::from_utf8(&self.bytes[start..self.pos]).unwrap_or_default()
    }
}

/// Parse a complete `ESpec` string.
pub fn parse(input: &str) -> Result<ESpec, ParseError> {
    if input.is_empty() {
        return Err(ParseError::Empty);
    }
    let mut cursor = Cursor::new(input);
    let spec = parse_top(&mut cursor)?;
    if cursor.pos != cursor.bytes.len() {
        return Err(ParseError::Trailing(input[cursor.pos..].to_string()));
    }
    Ok(spec)
}

fn parse_top(cursor: &mut Cursor<'_>) -> Result<ESpec, ParseError> {
    match cursor.peek() {
        Some(b'n') => {
            cursor.bump();
            Ok(ESpec::None)
        }
        Some(b'f') => {
            cursor.bump();
            Ok(ESpec::RecursiveBlte)
        }
        Some(b'z') => {
            cursor.bump();
            let level = parse_zparams(cursor)?;
            Ok(ESpec::ZLib { level })
        }
        Some(b'e') => {
            cursor.bump();
            cursor.expect(b':')?;
            cursor.expect(b'{')?;
            let start = cursor.pos;
            while matches!(cursor.peek(), Some(b) if b != b'}') {
                cursor.pos += 1;
            }
            let params = std::str::from_utf8(&cursor.bytes[start..cursor.pos])
                .unwrap_or_default()
                .to_string();
            cursor.expect(b'}')?;
            Ok(ESpec::Encrypted { params })
        }
        Some(b'b') => {
            cursor.bump();
            cursor.expect(b':')?;
            cursor.expect(b'{')?;
            let parts = parse_schedule(cursor)?;
            cursor.expect(b'}')?;
            Ok(ESpec::Block(parts))
        }
        Some(found) => Err(ParseError::Unexpected {
            found: found as char,
            offset: cursor.pos,
        }),
        None => Err(ParseError::UnexpectedEnd),
    }
}

fn parse_zparams(cursor: &mut Cursor<'_>) -> Result<Option<u8>, ParseError> {
    if cursor.peek() != Some(b'{') {
        return Ok(None);
    }
    cursor.bump();
    let digits = cursor.take_digits();
    let level = if digits.is_empty() {
        None
    } else {
        Some(
            digits
                .parse::<u8>()
                .map_err(|_| ParseError::InvalidNumber(digits.to_string()))?,
        )
    };
    // Skip an optional `,mpq` suffix; this crate's writer never emits it but
    // round-trips strings that carry it.
    if cursor.peek() == Some(b',') {
        while matches!(cursor.peek(), Some(b) if b != b'}') {
            cursor.pos += 1;
        }
    }
    cursor.expect(b'}')?;
    Ok(level)
}

fn parse_block_mode(cursor: &mut Cursor<'_>) -> Result<BlockMode, ParseError> {
    match cursor.peek() {
        Some(b'n') => {
            cursor.bump();
            Ok(BlockMode::None)
        }
        Some(b'z') => {
            cursor.bump();
            let level = parse_zparams(cursor)?;
            Ok(BlockMode::ZLib { level })
        }
        Some(found) => Err(ParseError::Unexpected {
            found: found as char,
            offset: cursor.pos,
        }),
        None => Err(ParseError::UnexpectedEnd),
    }
}

fn parse_size(cursor: &mut Cursor<'_>) -> Result<usize, ParseError> {
    let digits = cursor.take_digits();
    if digits.is_empty() {
        return Err(ParseError::Unexpected {
            found: cursor.peek().map_or('\0', |b| b as char),
            offset: cursor.pos,
        });
    }
    let base: usize = digits
        .parse()
        .map_err(|_| ParseError::InvalidNumber(digits.to_string()))?;
    match cursor.peek() {
        Some(b'K') => {
            cursor.bump();
            Ok(base * 1024)
        }
        Some(b'M') => {
            cursor.bump();
            Ok(base * 1024 * 1024)
        }
        _ => Ok(base),
    }
}

fn parse_schedule(cursor: &mut Cursor<'_>) -> Result<Vec<BlockPart>, ParseError> {
    let mut parts = Vec::new();
    loop {
        parts.push(parse_part(cursor)?);
        if cursor.peek() == Some(b',') {
            cursor.bump();
            continue;
        }
        break;
    }
    Ok(parts)
}

fn parse_part(cursor: &mut Cursor<'_>) -> Result<BlockPart, ParseError> {
    if cursor.peek() == Some(b'*') {
        cursor.bump();
        cursor.expect(b'=')?;
        let mode = parse_block_mode(cursor)?;
        return Ok(BlockPart::Remainder { mode });
    }

    let size = parse_size(cursor)?;
    match cursor.peek() {
        Some(b'=') => {
            cursor.bump();
            let mode = parse_block_mode(cursor)?;
            Ok(BlockPart::Fixed { size, mode })
        }
        Some(b'*') => {
            cursor.bump();
            let count = parse_size(cursor)?;
            cursor.expect(b'=')?;
            let mode = parse_block_mode(cursor)?;
            Ok(BlockPart::Repeated { size, count, mode })
        }
        Some(found) => Err(ParseError::Unexpected {
            found: found as char,
            offset: cursor.pos,
        }),
        None => Err(ParseError::UnexpectedEnd),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_store() {
        assert_eq!(parse("n").expect("parses"), ESpec::None);
    }

    #[test]
    fn parses_zlib_with_level() {
        assert_eq!(
            parse("z{9}").expect("parses"),
            ESpec::ZLib { level: Some(9) }
        );
    }

    #[test]
    fn parses_zlib_without_params() {
        assert_eq!(parse("z").expect("parses"), ESpec::ZLib { level: None });
    }

    #[test]
    fn parses_block_schedule() {
        let parsed = parse("b:{1M*2=z,*=n}").expect("parses");
        assert_eq!(
            parsed,
            ESpec::Block(vec![
                BlockPart::Repeated {
                    size: 1024 * 1024,
                    count: 2,
                    mode: BlockMode::ZLib { level: None }
                },
                BlockPart::Remainder {
                    mode: BlockMode::None
                }
            ])
        );
    }

    #[test]
    fn rejects_empty_input() {
        assert_eq!(parse(""), Err(ParseError::Empty));
    }

    #[test]
    fn rejects_trailing_garbage() {
        assert!(matches!(parse("n!"), Err(ParseError::Trailing(_))));
    }

    #[test]
    fn rejects_unterminated_block() {
        assert!(matches!(parse("b:{1M=z"), Err(ParseError::UnexpectedEnd)));
    }

    #[test]
    fn round_trips_zlib_mpq_suffix() {
        let parsed = parse("z{6,mpq}").expect("parses");
        assert_eq!(parsed, ESpec::ZLib { level: Some(6) });
    }
}
