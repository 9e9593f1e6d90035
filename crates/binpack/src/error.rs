//! Codec error type.

use binpack_buffers::BufferError;
use thiserror::Error;

/// Error type for encode and decode operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BinPackError {
    /// The header carries a protocol version this codec does not speak.
    #[error("protocol version {major}.{minor} is not supported by this implementation")]
    UnsupportedVersion { major: u8, minor: u8 },
    /// A reserved tag, or a byte that is not a tag at all.
    #[error("data type 0x{0:02x} is not supported by this implementation")]
    UnsupportedType(u8),
    /// Structural violation in the input.
    #[error("malformed message: {failure}")]
    Malformed {
        /// The complete input that was being decoded.
        message: Vec<u8>,
        failure: String,
    },
    /// A hard cap was exceeded.
    #[error("exceeded limit: {0}")]
    Limit(String),
}

/// Fieldless discriminant of [`BinPackError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    UnsupportedVersion,
    UnsupportedType,
    Malformed,
    Limit,
}

impl BinPackError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BinPackError::UnsupportedVersion { .. } => ErrorKind::UnsupportedVersion,
            BinPackError::UnsupportedType(_) => ErrorKind::UnsupportedType,
            BinPackError::Malformed { .. } => ErrorKind::Malformed,
            BinPackError::Limit(_) => ErrorKind::Limit,
        }
    }

    pub(crate) fn malformed(message: &[u8], failure: impl Into<String>) -> Self {
        BinPackError::Malformed {
            message: message.to_vec(),
            failure: failure.into(),
        }
    }

    /// Normalizes a reader failure into [`BinPackError::Malformed`].
    pub(crate) fn from_buffer(message: &[u8], err: BufferError) -> Self {
        let failure = match err {
            BufferError::EndOfBuffer => "unexpected end of data",
            BufferError::InvalidUtf8 => "invalid UTF-8 sequence",
        };
        Self::malformed(message, failure)
    }
}
