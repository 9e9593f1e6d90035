//! Two-pass encoder.
//!
//! The first pass walks the value graph depth-first with an explicit work
//! stack and stages fragments: tag bytes, small big-endian words, borrowed
//! payload slices, and placeholders for record keys whose final index is
//! not known yet. It also sums the payload size and counts placeholders.
//!
//! The second pass picks the key-table mode, allocates one buffer of the
//! exact output size, and writes the header, the key table and the staged
//! fragments into it.

use std::collections::HashMap;

use binpack_buffers::Writer;

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::BinPackError;
use crate::key_table::{KeyMode, KeyTableBuilder, MAX_KEY_LEN};
use crate::tag::{BlobKind, Tag};
use crate::value::{BytesKind, Graph, Node, NodeId, Value};
use crate::{HEADER_LEN, VERSION_MAJOR, VERSION_MINOR};

/// Stateless encoder; every call builds and drops its own tables.
#[derive(Debug, Default, Clone, Copy)]
pub struct Encoder;

impl Encoder {
    pub fn new() -> Self {
        Self
    }

    /// Encodes the graph reachable from `root`.
    ///
    /// Values without a wire form are dropped and reported through
    /// `diagnostics`. The only failures are hard limits, in which case no
    /// output is produced.
    pub fn encode(
        &self,
        graph: &Graph,
        root: Value,
        diagnostics: &mut Diagnostics,
    ) -> Result<Vec<u8>, BinPackError> {
        let mut stage = Stage::new(graph, diagnostics);
        stage.run(root)?;
        stage.flatten()
    }
}

/// One staged unit of output.
#[derive(Debug, Clone, Copy)]
enum Fragment<'g> {
    Tag(Tag),
    /// Up to eight literal bytes (scalars, length fields, reference ids).
    Word { bytes: [u8; 8], len: u8 },
    /// Payload borrowed from the graph.
    Raw(&'g [u8]),
    /// Key-table position, resolved to a wire index during flattening.
    Key(usize),
}

/// Pending work of the staging pass.
#[derive(Debug, Clone, Copy)]
enum Step<'g> {
    Value(Value),
    Property(&'g str, Value),
    Entry(Value, Value),
    Return,
}

struct Stage<'g, 'd> {
    graph: &'g Graph,
    diagnostics: &'d mut Diagnostics,
    fragments: Vec<Fragment<'g>>,
    data_len: usize,
    key_refs: usize,
    keys: KeyTableBuilder<'g>,
    ids: HashMap<NodeId, u32>,
}

impl<'g, 'd> Stage<'g, 'd> {
    fn new(graph: &'g Graph, diagnostics: &'d mut Diagnostics) -> Self {
        Self {
            graph,
            diagnostics,
            fragments: Vec::new(),
            data_len: 0,
            key_refs: 0,
            keys: KeyTableBuilder::new(),
            ids: HashMap::new(),
        }
    }

    fn tag(&mut self, tag: Tag) {
        self.data_len += 1;
        self.fragments.push(Fragment::Tag(tag));
    }

    fn word(&mut self, src: &[u8]) {
        let mut bytes = [0u8; 8];
        bytes[..src.len()].copy_from_slice(src);
        self.data_len += src.len();
        self.fragments.push(Fragment::Word {
            bytes,
            len: src.len() as u8,
        });
    }

    fn raw(&mut self, bytes: &'g [u8]) {
        self.data_len += bytes.len();
        self.fragments.push(Fragment::Raw(bytes));
    }

    fn key(&mut self, position: usize) {
        self.key_refs += 1;
        self.fragments.push(Fragment::Key(position));
    }

    fn blob(&mut self, kind: BlobKind, bytes: &'g [u8]) {
        let (tag, width) = Tag::for_blob(kind, bytes.len());
        self.tag(tag);
        let len = (bytes.len() as u64).to_be_bytes();
        self.word(&len[8 - width..]);
        self.raw(bytes);
    }

    /// Returns `false` and records a diagnostic for values with no wire form.
    fn check_representable(&mut self, value: Value) -> bool {
        let kind = match value {
            Value::BigInt(_) | Value::Symbol => value.kind_name(),
            Value::Ref(id) if self.graph.get(id).is_none() => "dangling reference",
            _ => return true,
        };
        self.diagnostics.push(Diagnostic::Unrepresentable { kind });
        false
    }

    fn run(&mut self, root: Value) -> Result<(), BinPackError> {
        let root = if self.check_representable(root) {
            root
        } else {
            Value::Undefined
        };
        let mut stack = vec![Step::Value(root)];
        while let Some(step) = stack.pop() {
            match step {
                Step::Return => self.tag(Tag::Return),
                Step::Value(value) => self.visit(value, &mut stack)?,
                Step::Property(key, value) => {
                    if key.len() > MAX_KEY_LEN {
                        self.diagnostics.push(Diagnostic::OversizedKey {
                            key: key.to_owned(),
                            len: key.len(),
                        });
                        continue;
                    }
                    if !self.check_representable(value) {
                        continue;
                    }
                    let position = self.keys.insert(key);
                    self.key(position);
                    stack.push(Step::Value(value));
                }
                Step::Entry(key, value) => {
                    if !self.check_representable(key) || !self.check_representable(value) {
                        continue;
                    }
                    stack.push(Step::Value(value));
                    stack.push(Step::Value(key));
                }
            }
        }
        Ok(())
    }

    fn visit(&mut self, value: Value, stack: &mut Vec<Step<'g>>) -> Result<(), BinPackError> {
        match value {
            Value::Undefined => self.tag(Tag::Undefined),
            Value::Null => self.tag(Tag::Null),
            Value::Bool(true) => self.tag(Tag::True),
            Value::Bool(false) => self.tag(Tag::False),
            Value::Number(n) => self.number(n),
            Value::BigInt(_) | Value::Symbol => {
                self.check_representable(value);
            }
            Value::Ref(id) => {
                let graph = self.graph;
                let Some(node) = graph.get(id) else {
                    self.check_representable(value);
                    return Ok(());
                };
                if let Some(&prior) = self.ids.get(&id) {
                    self.tag(Tag::Ref);
                    self.word(&prior.to_be_bytes());
                    return Ok(());
                }
                let next = u32::try_from(self.ids.len()).map_err(|_| {
                    BinPackError::Limit(format!(
                        "max num of references ({}) exceeded",
                        u64::from(u32::MAX) + 1
                    ))
                })?;
                self.ids.insert(id, next);
                self.node(node, stack);
            }
        }
        Ok(())
    }

    fn number(&mut self, n: f64) {
        if n.is_nan() {
            self.tag(Tag::Nan);
        } else if n.fract() == 0.0 && (0.0..=255.0).contains(&n) {
            self.tag(Tag::U8);
            self.word(&[n as u8]);
        } else {
            self.tag(Tag::F64);
            self.word(&n.to_be_bytes());
        }
    }

    fn node(&mut self, node: &'g Node, stack: &mut Vec<Step<'g>>) {
        match node {
            Node::Str(s) => self.blob(BlobKind::String, s.as_bytes()),
            Node::Bytes { data, kind } => {
                let kind = match kind {
                    BytesKind::View => BlobKind::View,
                    BytesKind::Buffer => BlobKind::Buffer,
                };
                self.blob(kind, data);
            }
            Node::List(items) => {
                self.tag(Tag::Array);
                stack.push(Step::Return);
                stack.extend(items.iter().rev().map(|&item| Step::Value(item)));
            }
            Node::Set(members) => {
                self.tag(Tag::Set);
                stack.push(Step::Return);
                stack.extend(members.values().rev().map(|&member| Step::Value(member)));
            }
            Node::Map(entries) => {
                self.tag(Tag::Map);
                stack.push(Step::Return);
                stack.extend(entries.values().rev().map(|&(k, v)| Step::Entry(k, v)));
            }
            Node::Record(fields) => {
                self.tag(Tag::Object);
                stack.push(Step::Return);
                stack.extend(
                    fields
                        .iter()
                        .rev()
                        .map(|(key, &value)| Step::Property(key.as_str(), value)),
                );
            }
        }
    }

    fn flatten(self) -> Result<Vec<u8>, BinPackError> {
        let mode = self.keys.mode()?;
        let total = HEADER_LEN
            + self.keys.encoded_len(mode)
            + self.data_len
            + self.key_refs * mode.index_width();

        let mut writer = Writer::with_size(total);
        writer.u8(VERSION_MAJOR);
        writer.u8(VERSION_MINOR);
        self.keys.write(&mut writer, mode);

        for fragment in &self.fragments {
            match *fragment {
                Fragment::Tag(tag) => writer.u8(tag.into()),
                Fragment::Word { bytes, len } => writer.buf(&bytes[..len as usize]),
                Fragment::Raw(bytes) => writer.buf(bytes),
                Fragment::Key(position) => {
                    let index = mode.index_of(position);
                    match mode {
                        KeyMode::Compact => writer.u8(index as u8),
                        KeyMode::Extended => writer.u16_le(index),
                    }
                }
            }
        }
        debug_assert!(writer.is_full(), "staged size does not match output");

        tracing::debug!(
            target: "binpack",
            bytes = total,
            keys = self.keys.len(),
            ?mode,
            values = self.ids.len(),
            "encoded document"
        );
        Ok(writer.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(graph: &Graph, root: Value) -> (Vec<u8>, Vec<Diagnostic>) {
        let mut diagnostics = Diagnostics::new();
        let bytes = Encoder::new()
            .encode(graph, root, &mut diagnostics)
            .expect("encode");
        (bytes, diagnostics.into_vec())
    }

    #[test]
    fn small_integer() {
        let (bytes, _) = encode(&Graph::new(), Value::from(5u8));
        assert_eq!(bytes, vec![2, 0, 0, 0x10, 0x05]);
    }

    #[test]
    fn float_payload_is_big_endian() {
        let (bytes, _) = encode(&Graph::new(), Value::Number(0.5));
        let mut expected = vec![2, 0, 0, 0x19];
        expected.extend_from_slice(&0.5f64.to_be_bytes());
        assert_eq!(bytes, expected);
    }

    #[test]
    fn number_classes() {
        let g = Graph::new();
        assert_eq!(encode(&g, Value::Number(255.0)).0[3..], [0x10, 0xff]);
        assert_eq!(encode(&g, Value::Number(-0.0)).0[3..], [0x10, 0x00]);
        assert_eq!(encode(&g, Value::Number(256.0)).0[3], 0x19);
        assert_eq!(encode(&g, Value::Number(-1.0)).0[3], 0x19);
        assert_eq!(encode(&g, Value::Number(1.5)).0[3], 0x19);
        assert_eq!(encode(&g, Value::Number(f64::INFINITY)).0[3], 0x19);
        assert_eq!(encode(&g, Value::Number(f64::NAN)).0, vec![2, 0, 0, 0x2a]);
    }

    #[test]
    fn zero_payload_scalars() {
        let g = Graph::new();
        assert_eq!(encode(&g, Value::Null).0, vec![2, 0, 0, 0x04]);
        assert_eq!(encode(&g, Value::Undefined).0, vec![2, 0, 0, 0x03]);
        assert_eq!(encode(&g, Value::Bool(true)).0, vec![2, 0, 0, 0x07]);
        assert_eq!(encode(&g, Value::Bool(false)).0, vec![2, 0, 0, 0x08]);
    }

    #[test]
    fn map_entry_layout() {
        let mut g = Graph::new();
        let map = g.map([(Value::from(5u8), Value::from(2u8))]);
        let (bytes, _) = encode(&g, map);
        assert_eq!(bytes, vec![2, 0, 0, 0x23, 0x10, 5, 0x10, 2, 0x00]);
    }

    #[test]
    fn string_length_classes() {
        let mut g = Graph::new();
        let short = g.string("abc");
        let medium = g.string("abc".repeat(86));
        let (bytes, _) = encode(&g, short);
        assert_eq!(bytes, vec![2, 0, 0, 0x30, 3, b'a', b'b', b'c']);
        let (bytes, _) = encode(&g, medium);
        assert_eq!(&bytes[3..6], &[0x31, 0x01, 0x02]);
        assert_eq!(bytes.len(), 6 + 258);
    }

    #[test]
    fn repeated_handle_becomes_reference() {
        let mut g = Graph::new();
        let s = g.string("x");
        let list = g.list([s, s]);
        let (bytes, _) = encode(&g, list);
        // list is id 0, the string id 1
        assert_eq!(
            bytes,
            vec![2, 0, 0, 0x21, 0x30, 1, b'x', 0x06, 0, 0, 0, 1, 0x00]
        );
    }

    #[test]
    fn self_reference() {
        let mut g = Graph::new();
        let list = g.list([]);
        g.push(list.node_id().unwrap(), list);
        let (bytes, _) = encode(&g, list);
        assert_eq!(bytes, vec![2, 0, 0, 0x21, 0x06, 0, 0, 0, 0, 0x00]);
    }

    #[test]
    fn record_keys_share_one_table() {
        let mut g = Graph::new();
        let a = g.record([("a", Value::from(5u8))]);
        let b = g.record([("a", Value::from(6u8))]);
        let list = g.list([a, b]);
        let (bytes, _) = encode(&g, list);
        assert_eq!(
            bytes,
            vec![
                2, 0, 1, 1, b'a', // header and key table
                0x21, 0x20, 3, 0x10, 5, 0x00, 0x20, 3, 0x10, 6, 0x00, 0x00,
            ]
        );
    }

    #[test]
    fn oversized_key_drops_property() {
        let mut g = Graph::new();
        let long = "k".repeat(255);
        let ok = "k".repeat(254);
        let record = g.record([
            (long.clone(), Value::Null),
            (ok.clone(), Value::Null),
        ]);
        let (bytes, diagnostics) = encode(&g, record);
        assert_eq!(
            diagnostics,
            vec![Diagnostic::OversizedKey { key: long, len: 255 }]
        );
        assert_eq!(bytes[2], 1);
        assert_eq!(bytes[3], 254);
        assert_eq!(&bytes[4 + 254..], &[0x20, 3, 0x04, 0x00]);
    }

    #[test]
    fn unrepresentable_values_are_dropped() {
        let mut g = Graph::new();
        let list = g.list([Value::Symbol, Value::Null, Value::BigInt(1)]);
        let map = g.map([
            (Value::Symbol, Value::Null),
            (Value::Null, Value::Symbol),
            (Value::from(1u8), Value::from(2u8)),
        ]);
        let record = g.record([("gone", Value::BigInt(7)), ("kept", Value::Null)]);
        let root = g.list([list, map, record]);
        let (bytes, diagnostics) = encode(&g, root);
        assert_eq!(diagnostics.len(), 5);
        assert_eq!(
            bytes,
            vec![
                2, 0, 1, 4, b'k', b'e', b'p', b't', //
                0x21, //
                0x21, 0x04, 0x00, //
                0x23, 0x10, 1, 0x10, 2, 0x00, //
                0x20, 3, 0x04, 0x00, //
                0x00,
            ]
        );
    }

    #[test]
    fn unrepresentable_root_becomes_undefined() {
        let (bytes, diagnostics) = encode(&Graph::new(), Value::Symbol);
        assert_eq!(bytes, vec![2, 0, 0, 0x03]);
        assert_eq!(diagnostics, vec![Diagnostic::Unrepresentable { kind: "symbol" }]);
    }

    #[test]
    fn extended_key_indices_are_little_endian() {
        let mut g = Graph::new();
        let names: Vec<String> = (0..300).map(|i| format!("p{i}")).collect();
        let record = g.record(names.iter().map(|n| (n.clone(), Value::Null)));
        let (bytes, _) = encode(&g, record);
        assert_eq!(&bytes[2..5], &[0xff, 0x01, 0x2c]);
        let table_len: usize = names.iter().map(|n| 1 + n.len()).sum();
        let payload = &bytes[5 + table_len..];
        assert_eq!(payload[0], 0x20);
        // first key: index 3
        assert_eq!(&payload[1..4], &[0x03, 0x00, 0x04]);
        // key at position 253 gets index 0x0101
        let at = 1 + 253 * 3;
        assert_eq!(&payload[at..at + 3], &[0x01, 0x01, 0x04]);
        assert_eq!(*payload.last().unwrap(), 0x00);
    }

    #[test]
    fn key_overflow_is_a_limit_error() {
        let mut g = Graph::new();
        let record = g.record((0..65_536).map(|i| (format!("{i}"), Value::Null)));
        let err = Encoder::new()
            .encode(&g, record, &mut Diagnostics::new())
            .unwrap_err();
        assert!(matches!(err, BinPackError::Limit(_)));
    }
}
