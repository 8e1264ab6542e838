//! Decoding errors
//!
//! Every failure the core can raise while reading the encoded inputs.
//! Load-time variants abort construction; query-time variants only fail
//! the call that hit them. Unknown external identifiers are not errors.

use thiserror::Error;

/// Errors raised while decoding the bit-packed inputs
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("bit read out of range: {bits} bits at position {pos} (buffer holds {len} bits)")]
    OutOfRange { pos: u64, bits: u64, len: u64 },

    #[error("cannot read {bits} bits into a {max}-bit integer")]
    WidthTooLarge { bits: u32, max: u32 },

    #[error("string reads must be byte multiples, got {bits} bits")]
    UnalignedRead { bits: u64 },

    #[error("malformed dictionary: {0}")]
    MalformedDictionary(String),

    #[error("expected {expected} dictionaries, found {found}")]
    DictionaryCount { expected: usize, found: usize },

    #[error("metadata size mismatch: header declares {expected} bits, decoded {actual}")]
    SizeMismatch { expected: u64, actual: u64 },

    #[error("code {code} is not in the {dictionary} dictionary")]
    UnknownCode { dictionary: &'static str, code: u64 },

    #[error("node {node} out of range (graph has {count} nodes)")]
    NodeOutOfRange { node: u64, count: u64 },

    #[error("corrupt encoding: {0}")]
    CorruptEncoding(String),

    #[error("unsupported: {0}")]
    Unsupported(&'static str),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for decoding operations
pub type DecodeResult<T> = Result<T, DecodeError>;

impl DecodeError {
    pub(crate) fn corrupt(msg: impl Into<String>) -> Self {
        DecodeError::CorruptEncoding(msg.into())
    }

    /// True for the variants that mean the blob itself is broken
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            DecodeError::CorruptEncoding(_)
                | DecodeError::SizeMismatch { .. }
                | DecodeError::UnknownCode { .. }
                | DecodeError::OutOfRange { .. }
        )
    }
}
