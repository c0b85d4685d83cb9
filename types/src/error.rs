//! Parse errors for the textual forms of core types.

use thiserror::Error;

/// Errors produced when decoding principals, keys, or signatures from text.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid c32 character {0:?}")]
    InvalidC32Char(char),

    #[error("c32check checksum mismatch")]
    ChecksumMismatch,

    #[error("invalid principal: {0}")]
    InvalidPrincipal(String),

    #[error("invalid contract name: {0}")]
    InvalidContractName(String),

    #[error("invalid hex: {0}")]
    InvalidHex(String),

    #[error("invalid length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("unknown network: {0}")]
    UnknownNetwork(String),
}
