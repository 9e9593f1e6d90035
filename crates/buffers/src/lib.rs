//! binpack-buffers - cursor-based binary readers and writers.
//!
//! [`Reader`] walks a borrowed byte slice with a single forward cursor and
//! reports out-of-bounds access as [`BufferError`] instead of panicking.
//! [`Writer`] fills a buffer whose final size is known up front.
//!
//! All multi-byte accessors are big-endian unless the method name says
//! otherwise (`*_le`).

mod reader;
mod writer;

pub use reader::Reader;
pub use writer::Writer;

use thiserror::Error;

/// Errors raised by the bounds-checked [`Reader`] accessors.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum BufferError {
    #[error("unexpected end of buffer")]
    EndOfBuffer,
    #[error("invalid UTF-8")]
    InvalidUtf8,
}
