//! `ESpec` grammar: the small DSL describing a file's block-size schedule.
//!
//! ```text
//! espec      := block
//! block      := 'n'                    -- store (frame mode N)
//!             | 'z' zparams?           -- zlib (frame mode Z)
//!             | 'b' ':' '{' schedule '}' -- block-size schedule
//! schedule   := part (',' part)*
//! part       := size '=' block
//!             | size '*' count '=' block
//!             | '*' '=' block
//! size       := digits ('K' | 'M')?
//! zparams    := '{' level? (',' 'mpq')? '}'
//! ```

mod parser;

pub use parser::ParseError;

/// The mode a single block-schedule part encodes with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockMode {
    /// `n`: store uncompressed.
    None,
    /// `z{level}`: zlib-deflate.
    ZLib {
        /// Optional explicit compression level (`z{9}`).
        level: Option<u8>,
    },
}

/// One entry of a `b:{...}` block schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockPart {
    /// `size=block`: exactly `size` bytes encoded with `mode`.
    Fixed {
        /// Size in bytes.
        size: usize,
        /// Block mode applied to this slice.
        mode: BlockMode,
    },
    /// `size*count=block`: `count` repetitions of a `size`-byte block.
    Repeated {
        /// Size in bytes of each repetition.
        size: usize,
        /// Number of repetitions.
        count: usize,
        /// Block mode applied to every repetition.
        mode: BlockMode,
    },
    /// `*=block`: everything remaining after the prior parts.
    Remainder {
        /// Block mode applied to the remainder.
        mode: BlockMode,
    },
}

/// A parsed `ESpec` string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ESpec {
    /// `n`
    None,
    /// `z` or `z{level}`
    ZLib {
        /// Optional explicit compression level.
        level: Option<u8>,
    },
    /// `b:{...}`
    Block(Vec<BlockPart>),
    /// `e:{keyname,iv,pattern}` — round-trips strings produced by other
    /// tools; this crate's writer never emits this variant (§4.2.1).
    Encrypted {
        /// Raw parameter string between the braces, preserved verbatim.
        params: String,
    },
    /// `f` — recursive BLTE; round-trip only, never emitted by this writer.
    RecursiveBlte,
}

impl ESpec {
    /// Parse an `ESpec` string.
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        parser::parse(input)
    }

    /// Render back to the canonical `ESpec` string form.
    pub fn render(&self) -> String {
        match self {
            Self::None => "n".to_string(),
            Self::ZLib { level: None } => "z".to_string(),
            Self::ZLib { level: Some(l) } => format!("z{{{l}}}"),
            Self::Block(parts) => {
                let rendered: Vec<String> = parts.iter().map(render_part).collect();
                format!("b:{{{}}}", rendered.join(","))
            }
            Self::Encrypted { params } => format!("e:{{{params}}}"),
            Self::RecursiveBlte => "f".to_string(),
        }
    }
}

fn render_part(part: &BlockPart) -> String {
    match part {
        BlockPart::Fixed { size, mode } => format!("{}={}", render_size(*size), render_mode(mode)),
        BlockPart::Repeated { size, count, mode } => {
            format!("{}*{count}={}", render_size(*size), render_mode(mode))
        }
        BlockPart::Remainder { mode } => format!("*={}", render_mode(mode)),
    }
}

fn render_mode(mode: &BlockMode) -> String {
    match mode {
        BlockMode::None => "n".to_string(),
        BlockMode::ZLib { level: None } => "z".to_string(),
        BlockMode::ZLib { level: Some(l) } => format!("z{{{l}}}"),
    }
}

fn render_size(size: usize) -> String {
    if size % (1024 * 1024) == 0 && size > 0 {
        format!("{}M", size / (1024 * 1024))
    } else if size % 1024 == 0 && size > 0 {
        format!("{}K", size / 1024)
    } else {
        size.to_string()
    }
}
