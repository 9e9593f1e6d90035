use binpack::{decode, encode, Graph, Value};
use proptest::prelude::*;

/// Owned value tree used to generate graphs.
#[derive(Debug, Clone)]
enum Tree {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
    View(Vec<u8>),
    Buffer(Vec<u8>),
    List(Vec<Tree>),
    Set(Vec<Tree>),
    Map(Vec<(Tree, Tree)>),
    Record(Vec<(String, Tree)>),
}

fn tree() -> impl Strategy<Value = Tree> {
    let leaf = prop_oneof![
        Just(Tree::Undefined),
        Just(Tree::Null),
        any::<bool>().prop_map(Tree::Bool),
        any::<u8>().prop_map(|n| Tree::Number(n.into())),
        any::<f64>().prop_map(Tree::Number),
        ".{0,12}".prop_map(Tree::Str),
        proptest::collection::vec(any::<u8>(), 0..40).prop_map(Tree::View),
        proptest::collection::vec(any::<u8>(), 0..40).prop_map(Tree::Buffer),
    ];
    leaf.prop_recursive(5, 64, 6, |inner| {
        prop_oneof![
            proptest::collection::vec(inner.clone(), 0..6).prop_map(Tree::List),
            proptest::collection::vec(inner.clone(), 0..6).prop_map(Tree::Set),
            proptest::collection::vec((inner.clone(), inner.clone()), 0..6).prop_map(Tree::Map),
            proptest::collection::vec(("[a-z]{0,6}", inner), 0..6).prop_map(Tree::Record),
        ]
    })
}

fn build(graph: &mut Graph, tree: &Tree) -> Value {
    match tree {
        Tree::Undefined => Value::Undefined,
        Tree::Null => Value::Null,
        Tree::Bool(b) => Value::Bool(*b),
        Tree::Number(n) => Value::Number(*n),
        Tree::Str(s) => graph.string(s.as_str()),
        Tree::View(data) => graph.bytes(data.as_slice()),
        Tree::Buffer(data) => graph.buffer(data.as_slice()),
        Tree::List(items) => {
            let items: Vec<Value> = items.iter().map(|t| build(graph, t)).collect();
            graph.list(items)
        }
        Tree::Set(members) => {
            let members: Vec<Value> = members.iter().map(|t| build(graph, t)).collect();
            graph.set(members)
        }
        Tree::Map(entries) => {
            let entries: Vec<(Value, Value)> = entries
                .iter()
                .map(|(k, v)| (build(graph, k), build(graph, v)))
                .collect();
            graph.map(entries)
        }
        Tree::Record(fields) => {
            let fields: Vec<(&str, Value)> = fields
                .iter()
                .map(|(k, v)| (k.as_str(), build(graph, v)))
                .collect();
            graph.record(fields)
        }
    }
}

proptest! {
    #[test]
    fn trees_survive_a_round_trip(tree in tree()) {
        let mut graph = Graph::new();
        let root = build(&mut graph, &tree);
        let bytes = encode(&graph, root).unwrap();
        let doc = decode(&bytes).unwrap();
        prop_assert!(graph.deep_equal(root, &doc.graph, doc.root));
    }

    #[test]
    fn shared_subtrees_keep_their_identity(tree in tree(), copies in 1usize..5) {
        let mut graph = Graph::new();
        let shared = build(&mut graph, &tree);
        let root = graph.list(std::iter::repeat(shared).take(copies));
        let bytes = encode(&graph, root).unwrap();
        let doc = decode(&bytes).unwrap();
        prop_assert!(graph.deep_equal(root, &doc.graph, doc.root));
    }

    #[test]
    fn arbitrary_input_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
        let mut msg = vec![2, 0];
        msg.extend_from_slice(&bytes);
        let _ = decode(&msg);
    }
}
