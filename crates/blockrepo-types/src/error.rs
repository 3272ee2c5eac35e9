use thiserror::Error;

/// Errors produced while decoding or validating identifiers.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid byte length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("unsupported identifier version: {0}")]
    UnsupportedVersion(u8),

    #[error("unsupported payload codec: 0x{0:02x}")]
    UnsupportedCodec(u8),

    #[error("unknown hash function code: 0x{0:02x}")]
    UnknownHash(u8),

    #[error("unknown hash function name: {0}")]
    UnknownHashName(String),

    #[error("missing multibase prefix 'f' in {0:?}")]
    MissingPrefix(String),

    #[error("storage key outside the block namespace: {0}")]
    ForeignKey(String),
}
