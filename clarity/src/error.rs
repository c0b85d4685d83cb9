use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClarityError {
    #[error("unexpected end of input at byte {0}")]
    UnexpectedEof(usize),

    #[error("unknown type prefix 0x{0:02x}")]
    UnknownTypePrefix(u8),

    #[error("nesting deeper than {0}")]
    DepthExceeded(usize),

    #[error("{0} trailing bytes after value")]
    TrailingBytes(usize),

    #[error("invalid name: {0}")]
    InvalidName(String),

    #[error("string is not ascii")]
    NotAscii,

    #[error("invalid utf-8 string")]
    InvalidUtf8,

    #[error("invalid hex: {0}")]
    InvalidHex(String),

    #[error("invalid principal: {0}")]
    InvalidPrincipal(#[from] blaze_types::ParseError),
}
