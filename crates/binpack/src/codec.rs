//! `BinPack`: combined encoder/decoder pair.

use crate::decoder::{DecodeOptions, Decoder};
use crate::diagnostics::Diagnostics;
use crate::encoder::Encoder;
use crate::error::BinPackError;
use crate::value::{Document, Graph, Value};

/// Codec handle. Holds only configuration, so one instance can be shared
/// freely across threads and reused for any number of calls.
#[derive(Debug, Default, Clone, Copy)]
pub struct BinPack {
    encoder: Encoder,
    decoder: Decoder,
}

impl BinPack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: DecodeOptions) -> Self {
        Self {
            encoder: Encoder::new(),
            decoder: Decoder::with_options(options),
        }
    }

    pub fn encode(&self, graph: &Graph, root: Value) -> Result<Vec<u8>, BinPackError> {
        self.encode_with_diagnostics(graph, root, &mut Diagnostics::new())
    }

    pub fn encode_with_diagnostics(
        &self,
        graph: &Graph,
        root: Value,
        diagnostics: &mut Diagnostics,
    ) -> Result<Vec<u8>, BinPackError> {
        self.encoder.encode(graph, root, diagnostics)
    }

    pub fn decode(&self, bytes: &[u8]) -> Result<Document, BinPackError> {
        self.decode_with_diagnostics(bytes, &mut Diagnostics::new())
    }

    pub fn decode_with_diagnostics(
        &self,
        bytes: &[u8],
        diagnostics: &mut Diagnostics,
    ) -> Result<Document, BinPackError> {
        self.decoder.decode(bytes, diagnostics)
    }
}

/// Encodes with default settings.
pub fn encode(graph: &Graph, root: Value) -> Result<Vec<u8>, BinPackError> {
    BinPack::new().encode(graph, root)
}

/// Decodes with default settings.
pub fn decode(bytes: &[u8]) -> Result<Document, BinPackError> {
    BinPack::new().decode(bytes)
}
