//! Forward-cursor decoder.
//!
//! Containers are tracked on an explicit frame stack rather than the call
//! stack, so nesting depth is bounded only by memory (or by
//! [`DecodeOptions::max_depth`]). Every string, byte buffer and container is
//! appended to the reference table when it is opened, before any of its
//! children, mirroring the encoder's numbering.

use binpack_buffers::{BufferError, Reader};
use indexmap::IndexMap;

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::BinPackError;
use crate::key_table::{KeyMode, KeyTable};
use crate::tag::{BlobKind, Container, Scalar, Shape, Tag};
use crate::value::{BytesKind, Document, Graph, Node, NodeId, Value};
use crate::{VERSION_MAJOR, VERSION_MINOR};

/// Largest blob length accepted from an 8-byte length field (2^53 - 1).
pub const MAX_SAFE_INTEGER: u64 = (1 << 53) - 1;

/// Decoder settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Maximum number of simultaneously open containers. `None` = unbounded.
    pub max_depth: Option<usize>,
}

/// Stateless decoder; every call builds and drops its own tables.
#[derive(Debug, Default, Clone, Copy)]
pub struct Decoder {
    options: DecodeOptions,
}

impl Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: DecodeOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> DecodeOptions {
        self.options
    }

    /// Decodes one complete message.
    ///
    /// The whole input must be consumed by the root value; nothing is
    /// returned unless decoding succeeds.
    pub fn decode(
        &self,
        input: &[u8],
        diagnostics: &mut Diagnostics,
    ) -> Result<Document, BinPackError> {
        let result = Parse::new(input, self.options, diagnostics).run();
        if let Err(err) = &result {
            tracing::debug!(target: "binpack", len = input.len(), error = %err, "decode failed");
        }
        result
    }
}

/// An open container awaiting children.
#[derive(Debug)]
enum Frame<'a> {
    Array(NodeId),
    Set(NodeId),
    Map { id: NodeId, key: Option<Value> },
    Object { id: NodeId, key: Option<&'a str> },
}

fn end_of_data(input: &[u8]) -> impl Fn(BufferError) -> BinPackError + '_ {
    move |err| BinPackError::from_buffer(input, err)
}

struct Parse<'a, 'd> {
    input: &'a [u8],
    reader: Reader<'a>,
    options: DecodeOptions,
    diagnostics: &'d mut Diagnostics,
    graph: Graph,
    refs: Vec<NodeId>,
    frames: Vec<Frame<'a>>,
}

impl<'a, 'd> Parse<'a, 'd> {
    fn new(input: &'a [u8], options: DecodeOptions, diagnostics: &'d mut Diagnostics) -> Self {
        Self {
            input,
            reader: Reader::new(input),
            options,
            diagnostics,
            graph: Graph::new(),
            refs: Vec::new(),
            frames: Vec::new(),
        }
    }

    fn malformed(&self, failure: impl Into<String>) -> BinPackError {
        BinPackError::malformed(self.input, failure)
    }

    fn run(mut self) -> Result<Document, BinPackError> {
        let input = self.input;
        let major = self.reader.u8().map_err(end_of_data(input))?;
        let minor = self.reader.u8().map_err(end_of_data(input))?;
        if (major, minor) != (VERSION_MAJOR, VERSION_MINOR) {
            return Err(BinPackError::UnsupportedVersion { major, minor });
        }
        let keys = KeyTable::read(&mut self.reader).map_err(end_of_data(input))?;

        let root = loop {
            if let Some(&Frame::Object { id, key: None }) = self.frames.last() {
                let next = self.reader.peek().map_err(end_of_data(input))?;
                if next == u8::from(Tag::Return) {
                    self.reader.x += 1;
                    self.frames.pop();
                    match self.deliver(Value::Ref(id)) {
                        Some(root) => break root,
                        None => continue,
                    }
                }
                let key = self.read_key(&keys)?;
                if let Some(Frame::Object { key: slot, .. }) = self.frames.last_mut() {
                    *slot = Some(key);
                }
            }

            let offset = self.reader.x;
            let byte = self.reader.u8().map_err(end_of_data(input))?;
            let tag = Tag::try_from(byte).map_err(BinPackError::UnsupportedType)?;
            let value = match tag.shape() {
                Shape::Control => match tag {
                    Tag::Return => self.close()?,
                    Tag::Unsupported => {
                        self.diagnostics
                            .push(Diagnostic::UnsupportedPlaceholder { offset });
                        continue;
                    }
                    _ => continue,
                },
                Shape::Empty => match tag {
                    Tag::Undefined => Value::Undefined,
                    Tag::Null => Value::Null,
                    Tag::True => Value::Bool(true),
                    Tag::False => Value::Bool(false),
                    Tag::SymbolUnknown => Value::Symbol,
                    _ => Value::Number(f64::NAN),
                },
                Shape::Fixed(scalar) => self.scalar(scalar)?,
                Shape::Reference => {
                    let id = self.reader.u32().map_err(end_of_data(input))?;
                    match self.refs.get(id as usize) {
                        Some(&node) => Value::Ref(node),
                        None => return Err(self.malformed(format!("reference 0x{id:x} is unknown"))),
                    }
                }
                Shape::Blob { kind, width } => self.blob(kind, width)?,
                Shape::Open(container) => {
                    self.open(container)?;
                    continue;
                }
                Shape::Reserved => return Err(BinPackError::UnsupportedType(byte)),
            };
            if let Some(root) = self.deliver(value) {
                break root;
            }
        };

        if !self.reader.is_at_end() {
            return Err(self.malformed(format!(
                "message ({}) is longer than its content {}",
                input.len(),
                self.reader.x
            )));
        }
        tracing::debug!(
            target: "binpack",
            bytes = input.len(),
            keys = keys.len(),
            values = self.refs.len(),
            "decoded document"
        );
        Ok(Document::new(self.graph, root))
    }

    fn read_key(&mut self, keys: &KeyTable<'a>) -> Result<&'a str, BinPackError> {
        let index = match keys.mode() {
            KeyMode::Compact => self.reader.u8().map(u16::from),
            KeyMode::Extended => self.reader.u16_le(),
        }
        .map_err(end_of_data(self.input))?;
        keys.get(index).ok_or_else(|| {
            self.malformed(format!("object key {index} is not included in key table"))
        })
    }

    fn scalar(&mut self, scalar: Scalar) -> Result<Value, BinPackError> {
        let r = &mut self.reader;
        let value = match scalar {
            Scalar::Bool => r.u8().map(|b| Value::Bool(b > 0)),
            Scalar::U8 => r.u8().map(|n| Value::Number(n.into())),
            Scalar::I8 => r.i8().map(|n| Value::Number(n.into())),
            Scalar::U16 => r.u16().map(|n| Value::Number(n.into())),
            Scalar::I16 => r.i16().map(|n| Value::Number(n.into())),
            Scalar::U32 => r.u32().map(|n| Value::Number(n.into())),
            Scalar::I32 => r.i32().map(|n| Value::Number(n.into())),
            Scalar::F32 => r.f32().map(|n| Value::Number(n.into())),
            Scalar::U64 => r.u64().map(|n| Value::BigInt(n.into())),
            Scalar::I64 => r.i64().map(|n| Value::BigInt(n.into())),
            Scalar::F64 => r.f64().map(Value::Number),
        };
        value.map_err(end_of_data(self.input))
    }

    fn blob(&mut self, kind: BlobKind, width: usize) -> Result<Value, BinPackError> {
        let input = self.input;
        let r = &mut self.reader;
        let len = match width {
            1 => r.u8().map(u64::from),
            2 => r.u16().map(u64::from),
            4 => r.u32().map(u64::from),
            _ => r.u64(),
        }
        .map_err(end_of_data(input))?;
        if len > MAX_SAFE_INTEGER {
            return Err(BinPackError::Limit(format!(
                "block data length is bigger than MAX_SAFE_INTEGER ({MAX_SAFE_INTEGER})"
            )));
        }
        let len = usize::try_from(len).map_err(|_| {
            BinPackError::Limit(format!("block data length {len} exceeds address space"))
        })?;
        let node = match kind {
            BlobKind::String => Node::Str(r.utf8(len).map_err(end_of_data(input))?.to_owned()),
            BlobKind::View => Node::Bytes {
                data: r.buf(len).map_err(end_of_data(input))?.to_vec(),
                kind: BytesKind::View,
            },
            BlobKind::Buffer => Node::Bytes {
                data: r.buf(len).map_err(end_of_data(input))?.to_vec(),
                kind: BytesKind::Buffer,
            },
        };
        Ok(Value::Ref(self.register(node)))
    }

    fn register(&mut self, node: Node) -> NodeId {
        let id = self.graph.alloc(node);
        self.refs.push(id);
        id
    }

    fn open(&mut self, container: Container) -> Result<(), BinPackError> {
        if let Some(max) = self.options.max_depth {
            if self.frames.len() >= max {
                return Err(BinPackError::Limit(format!(
                    "max nesting depth ({max}) exceeded"
                )));
            }
        }
        let frame = match container {
            Container::Object => Frame::Object {
                id: self.register(Node::Record(IndexMap::new())),
                key: None,
            },
            Container::Array => Frame::Array(self.register(Node::List(Vec::new()))),
            Container::Map => Frame::Map {
                id: self.register(Node::Map(IndexMap::new())),
                key: None,
            },
            Container::Set => Frame::Set(self.register(Node::Set(IndexMap::new()))),
        };
        self.frames.push(frame);
        Ok(())
    }

    /// Handles a RETURN byte in value position.
    fn close(&mut self) -> Result<Value, BinPackError> {
        match self.frames.pop() {
            Some(Frame::Array(id))
            | Some(Frame::Set(id))
            | Some(Frame::Map { id, key: None })
            | Some(Frame::Object { id, key: None }) => Ok(Value::Ref(id)),
            Some(Frame::Map { key: Some(_), .. }) => Err(self.malformed("map value is invalid")),
            Some(Frame::Object { key: Some(key), .. }) => {
                Err(self.malformed(format!("object value for key '{key}' is missing")))
            }
            None => Err(self.malformed("unexpected return outside of a container")),
        }
    }

    /// Hands a finished value to the innermost open container, or returns it
    /// as the root when none is open.
    fn deliver(&mut self, value: Value) -> Option<Value> {
        match self.frames.last_mut() {
            None => return Some(value),
            Some(Frame::Array(id)) => {
                self.graph.push(*id, value);
            }
            Some(Frame::Set(id)) => {
                self.graph.set_add(*id, value);
            }
            Some(Frame::Map { id, key }) => match key.take() {
                None => *key = Some(value),
                Some(k) => {
                    self.graph.map_insert(*id, k, value);
                }
            },
            Some(Frame::Object { id, key }) => {
                if let Some(k) = key.take() {
                    self.graph.set_property(*id, k, value);
                }
            }
        }
        None
    }
}
