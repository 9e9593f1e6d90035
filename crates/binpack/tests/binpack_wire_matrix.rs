use binpack::tag::Tag;
use binpack::{decode, encode, BytesKind, Diagnostic, Diagnostics, Encoder, Graph, Node, Value};

/// Encodes, checks the root tag when the key table is empty, and asserts the
/// decoded document is deep-equal to the input.
fn round_trip(graph: &Graph, root: Value, tag: Option<Tag>) -> binpack::Document {
    let bytes = encode(graph, root).unwrap();
    assert_eq!(&bytes[..2], &[2, 0], "version header");
    if let Some(tag) = tag {
        assert_eq!(bytes[2], 0, "expected an empty key table");
        assert_eq!(bytes[3], u8::from(tag), "root tag");
    }
    let doc = decode(&bytes).unwrap();
    assert!(
        graph.deep_equal(root, &doc.graph, doc.root),
        "decoded value differs from input"
    );
    doc
}

#[test]
fn scalar_wire_matrix() {
    let g = Graph::new();
    round_trip(&g, Value::from(5u8), Some(Tag::U8));
    round_trip(&g, Value::from(0.5), Some(Tag::F64));
    round_trip(&g, Value::Null, Some(Tag::Null));
    round_trip(&g, Value::Undefined, Some(Tag::Undefined));
    round_trip(&g, Value::Bool(true), Some(Tag::True));
    round_trip(&g, Value::Bool(false), Some(Tag::False));
    round_trip(&g, Value::Number(f64::NAN), Some(Tag::Nan));
    round_trip(&g, Value::Number(256.0), Some(Tag::F64));
    round_trip(&g, Value::Number(-1.0), Some(Tag::F64));
    round_trip(&g, Value::Number(f64::INFINITY), Some(Tag::F64));

    assert_eq!(encode(&g, Value::from(5u8)).unwrap(), vec![2, 0, 0, 0x10, 5]);
    let mut expected = vec![2, 0, 0, 0x19];
    expected.extend_from_slice(&0.5f64.to_be_bytes());
    assert_eq!(encode(&g, Value::from(0.5)).unwrap(), expected);
}

#[test]
fn collection_wire_matrix() {
    let mut g = Graph::new();
    let map = g.map([(Value::from(5u8), Value::from(2u8))]);
    round_trip(&g, map, Some(Tag::Map));
    assert_eq!(
        encode(&g, map).unwrap(),
        vec![2, 0, 0, 0x23, 0x10, 5, 0x10, 2, 0x00]
    );

    let set = g.set([Value::from(5u8)]);
    round_trip(&g, set, Some(Tag::Set));
    assert_eq!(encode(&g, set).unwrap(), vec![2, 0, 0, 0x25, 0x10, 5, 0x00]);

    let view = g.bytes(vec![40u8, 2, 97, 98]);
    let list = g.list([view]);
    round_trip(&g, list, Some(Tag::Array));
}

#[test]
fn string_width_matrix() {
    let mut g = Graph::new();
    let cases = [
        ("abc".to_string(), Tag::String8),
        ("abc".repeat(86), Tag::String16),
        ("abc".repeat(21846), Tag::String32),
        (String::new(), Tag::String8),
        ("héllo wörld ✓".to_string(), Tag::String8),
    ];
    for (s, tag) in cases {
        let v = g.string(s);
        round_trip(&g, v, Some(tag));
    }
}

#[test]
fn byte_buffer_width_matrix() {
    let mut g = Graph::new();
    let views = [
        (5usize, Tag::Uint8Array8),
        (255, Tag::Uint8Array8),
        (256, Tag::Uint8Array16),
        (0xffff + 1, Tag::Uint8Array32),
    ];
    for (len, tag) in views {
        let v = g.bytes(vec![1u8; len]);
        round_trip(&g, v, Some(tag));
    }

    let buffers = [
        (5usize, Tag::ArrayBuffer8),
        (255, Tag::ArrayBuffer8),
        (256, Tag::ArrayBuffer16),
        (0xffff + 1, Tag::ArrayBuffer32),
    ];
    for (len, tag) in buffers {
        let v = g.buffer(vec![0u8; len]);
        let doc = round_trip(&g, v, Some(tag));
        assert!(matches!(
            doc.root_node(),
            Some(Node::Bytes {
                kind: BytesKind::Buffer,
                ..
            })
        ));
    }
}

#[test]
fn record_matrix() {
    let mut g = Graph::new();
    let bytes = g.bytes(vec![1u8; 255]);
    let rec = g.record([("a", bytes)]);
    round_trip(&g, rec, None);

    let first = g.record([("a", Value::from(5u8))]);
    let second = g.record([("a", Value::from(6u8))]);
    let list = g.list([first, second]);
    let encoded = encode(&g, list).unwrap();
    // One key shared by both records.
    assert_eq!(&encoded[..5], &[2, 0, 1, 1, b'a']);
    round_trip(&g, list, None);
}

#[test]
fn extended_key_table_matrix() {
    let mut g = Graph::new();
    let names: Vec<String> = (0..300).map(|i| format!("p{i}")).collect();
    let inner = g.record(names.iter().rev().map(|n| (n.as_str(), Value::from(1u8))));
    let outer = g.record(names.iter().enumerate().map(|(i, n)| {
        let value = if i == 299 { inner } else { Value::Null };
        (n.as_str(), value)
    }));
    let encoded = encode(&g, outer).unwrap();
    assert_eq!(&encoded[2..5], &[0xff, 0x01, 0x2c]);
    let doc = round_trip(&g, outer, None);
    let Some(Node::Record(fields)) = doc.root_node() else {
        panic!("expected a record root");
    };
    assert_eq!(fields.len(), 300);
    assert_eq!(fields.get_index(253).map(|(k, _)| k.as_str()), Some("p253"));

    // Hand-written message using the low-byte-first index of key 253.
    let mut bytes = vec![2, 0, 0xff, 0x00, 0xfe];
    for i in 0..254 {
        let name = format!("k{i}");
        bytes.push(name.len() as u8);
        bytes.extend_from_slice(name.as_bytes());
    }
    bytes.extend_from_slice(&[0x20, 0x01, 0x01, 0x10, 7, 0x03, 0x00, 0x04, 0x00]);
    let doc = decode(&bytes).unwrap();
    let Some(Node::Record(fields)) = doc.root_node() else {
        panic!("expected a record root");
    };
    let keys: Vec<&str> = fields.keys().map(String::as_str).collect();
    assert_eq!(keys, ["k253", "k0"]);
    assert_eq!(fields["k253"], Value::from(7u8));
    assert_eq!(fields["k0"], Value::Null);
}

#[test]
fn shared_and_cyclic_records() {
    let mut g = Graph::new();
    let b_str = g.string("b");
    let a = g.record([("one", Value::from(1u8)), ("b", b_str)]);
    let b = g.record([("a1", a), ("a2", a)]);
    let c = g.record([("b", b), ("d", Value::Null)]);
    let d = g.record([("a", c)]);
    assert!(g.set_property(c.node_id().unwrap(), "d", d));

    round_trip(&g, a, None);

    let doc = round_trip(&g, b, None);
    let Some(Node::Record(fields)) = doc.root_node() else {
        panic!("expected a record root");
    };
    assert_eq!(fields["a1"], fields["a2"], "shared record must decode once");

    let doc = round_trip(&g, c, None);
    let Some(Node::Record(c_fields)) = doc.root_node() else {
        panic!("expected a record root");
    };
    let Some(Node::Record(d_fields)) = doc.graph.resolve(c_fields["d"]) else {
        panic!("expected D");
    };
    assert_eq!(d_fields["a"], doc.root, "cycle must point back at the root");

    round_trip(&g, d, None);
}

#[test]
fn self_containing_collections() {
    let mut g = Graph::new();
    let set = g.set([]);
    let map = g.map([]);
    let sid = set.node_id().unwrap();
    let mid = map.node_id().unwrap();
    assert!(g.set_add(sid, set));
    assert!(g.map_insert(mid, map, set));
    assert!(g.set_add(sid, map));

    let doc = round_trip(&g, set, None);
    let Some(Node::Set(members)) = doc.root_node() else {
        panic!("expected a set root");
    };
    assert_eq!(members[0], doc.root);
    assert_eq!(members.len(), 2);
}

#[test]
fn unrepresentable_values_are_reported() {
    let mut g = Graph::new();
    let list = g.list([Value::from(1u8), Value::Symbol, Value::BigInt(7)]);
    let rec = g.record([("keep", Value::Null), ("drop", Value::Symbol)]);
    let root = g.list([list, rec]);

    let mut diagnostics = Diagnostics::new();
    let bytes = Encoder::new()
        .encode(&g, root, &mut diagnostics)
        .unwrap();
    assert_eq!(
        diagnostics.into_vec(),
        vec![
            Diagnostic::Unrepresentable { kind: "symbol" },
            Diagnostic::Unrepresentable { kind: "bigint" },
            Diagnostic::Unrepresentable { kind: "symbol" },
        ]
    );

    let mut expected = Graph::new();
    let one = expected.list([Value::from(1u8)]);
    let kept = expected.record([("keep", Value::Null)]);
    let expected_root = expected.list([one, kept]);
    let doc = decode(&bytes).unwrap();
    assert!(expected.deep_equal(expected_root, &doc.graph, doc.root));
}
