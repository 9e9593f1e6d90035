//! Compact binary codec for value graphs.
//!
//! `binpack` turns an arena-backed [`Graph`] of primitives, strings, byte
//! buffers, lists, maps, sets and records into a versioned byte stream and
//! back. Shared nodes are written once and referenced afterwards, so shared
//! and cyclic structures survive the round trip with their identity intact.
//!
//! # Wire frame
//!
//! ```text
//! [major=2][minor=0][key table size][key table entries...][root value]
//! ```
//!
//! Record property names go into a per-document key table and are referred
//! to by index. Every other value is a tag byte followed by its payload;
//! composites end with a RETURN byte. See [`tag::Tag`] for the byte values.
//!
//! # Example
//!
//! ```
//! use binpack::{decode, encode, Graph, Value};
//!
//! let mut graph = Graph::new();
//! let name = graph.string("binpack");
//! let root = graph.record([("name", name), ("answer", Value::from(42u8))]);
//!
//! let bytes = encode(&graph, root).unwrap();
//! let doc = decode(&bytes).unwrap();
//! assert!(graph.deep_equal(root, &doc.graph, doc.root));
//! ```

mod codec;
mod decoder;
mod diagnostics;
mod encoder;
mod error;
mod value;

pub mod cli;
pub mod json;
pub mod key_table;
pub mod tag;

pub use codec::{decode, encode, BinPack};
pub use decoder::{DecodeOptions, Decoder, MAX_SAFE_INTEGER};
pub use diagnostics::{Diagnostic, Diagnostics};
pub use encoder::Encoder;
pub use error::{BinPackError, ErrorKind};
pub use value::{BytesKind, Document, Graph, MapKey, Node, NodeId, Value};

/// Protocol major version written to and required in every header.
pub const VERSION_MAJOR: u8 = 2;
/// Protocol minor version written to and required in every header.
pub const VERSION_MINOR: u8 = 0;
/// Bytes taken by the version header.
pub const HEADER_LEN: usize = 2;
