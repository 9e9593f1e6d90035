//! Arena-backed value graph.
//!
//! Strings and composites live in a [`Graph`] arena and are addressed by
//! [`NodeId`]. Identity is the handle: two separately allocated equal
//! strings are distinct nodes, while every [`Value::Ref`] holding the same
//! handle points at one shared node. Containers refer to their children by
//! value, so a node may contain a handle to itself or to an ancestor.
//!
//! Maps and sets are keyed by [`MapKey`], a hashable rendering of
//! same-value-zero equality, so insertion and lookup stay O(1).

use std::collections::HashMap;

use indexmap::IndexMap;

/// Opaque handle of a node in a [`Graph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Position of the node in its arena.
    pub fn index(self) -> usize {
        self.0
    }
}

/// A leaf value or a handle to an arena node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    /// Any number, NaN and infinities included.
    Number(f64),
    /// 64-bit integer read from a U64/I64 tag. Not encodable.
    BigInt(i128),
    /// Opaque symbol read from the unknown-symbol tag. Not encodable.
    Symbol,
    Ref(NodeId),
}

impl Value {
    pub fn node_id(self) -> Option<NodeId> {
        match self {
            Value::Ref(id) => Some(id),
            _ => None,
        }
    }

    /// Key equality used by maps and sets.
    ///
    /// Numbers compare by value with NaN equal to itself and `-0` equal to
    /// `+0`; handles compare by identity. A symbol equals nothing, not even
    /// another symbol.
    pub fn same_value_zero(self, other: Value) -> bool {
        match (self, other) {
            (Value::Symbol, _) | (_, Value::Symbol) => false,
            (Value::Number(a), Value::Number(b)) => (a.is_nan() && b.is_nan()) || a == b,
            (a, b) => a == b,
        }
    }

    pub(crate) fn kind_name(self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::BigInt(_) => "bigint",
            Value::Symbol => "symbol",
            Value::Ref(_) => "reference",
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<u8> for Value {
    fn from(n: u8) -> Self {
        Value::Number(n.into())
    }
}

/// Which raw-buffer family a byte node belongs to on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BytesKind {
    /// A typed view over bytes (`Uint8Array` tags).
    View,
    /// A standalone buffer (`ArrayBuffer` tags).
    Buffer,
}

/// Hashable identity of a map key or set member.
///
/// Every NaN shares one key and `-0` folds into `+0`. Symbols never match
/// one another, so each carries a serial unique within its [`Graph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MapKey {
    Undefined,
    Null,
    Bool(bool),
    /// Canonical IEEE-754 bits.
    Number(u64),
    BigInt(i128),
    Symbol(usize),
    Ref(NodeId),
}

/// Payload of an arena slot.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Str(String),
    Bytes { data: Vec<u8>, kind: BytesKind },
    List(Vec<Value>),
    /// Insertion-ordered `(key, value)` entries.
    Map(IndexMap<MapKey, (Value, Value)>),
    /// Insertion-ordered members.
    Set(IndexMap<MapKey, Value>),
    /// String-keyed record in property order.
    Record(IndexMap<String, Value>),
}

/// Arena owning every string and composite of a value graph.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: Vec<Node>,
    symbols: usize,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Moves `node` into the arena and returns its handle.
    pub fn alloc(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0)
    }

    /// Resolves a handle value; `None` for leaves and dangling handles.
    pub fn resolve(&self, value: Value) -> Option<&Node> {
        value.node_id().and_then(|id| self.get(id))
    }

    pub fn string(&mut self, s: impl Into<String>) -> Value {
        Value::Ref(self.alloc(Node::Str(s.into())))
    }

    pub fn bytes(&mut self, data: impl Into<Vec<u8>>) -> Value {
        let data = data.into();
        Value::Ref(self.alloc(Node::Bytes {
            data,
            kind: BytesKind::View,
        }))
    }

    pub fn buffer(&mut self, data: impl Into<Vec<u8>>) -> Value {
        let data = data.into();
        Value::Ref(self.alloc(Node::Bytes {
            data,
            kind: BytesKind::Buffer,
        }))
    }

    pub fn list(&mut self, items: impl IntoIterator<Item = Value>) -> Value {
        Value::Ref(self.alloc(Node::List(items.into_iter().collect())))
    }

    /// Allocates a map. A repeated key keeps its first position and takes
    /// the last value.
    pub fn map(&mut self, entries: impl IntoIterator<Item = (Value, Value)>) -> Value {
        let mut out = IndexMap::new();
        for (key, value) in entries {
            out.insert(self.map_key(key), (key, value));
        }
        Value::Ref(self.alloc(Node::Map(out)))
    }

    /// Allocates a set. Repeated members are kept once, at first sight.
    pub fn set(&mut self, members: impl IntoIterator<Item = Value>) -> Value {
        let mut out = IndexMap::new();
        for member in members {
            out.entry(self.map_key(member)).or_insert(member);
        }
        Value::Ref(self.alloc(Node::Set(out)))
    }

    /// Same-value-zero key of `value`. Each symbol gets a fresh serial.
    pub fn map_key(&mut self, value: Value) -> MapKey {
        match value {
            Value::Undefined => MapKey::Undefined,
            Value::Null => MapKey::Null,
            Value::Bool(b) => MapKey::Bool(b),
            Value::Number(n) if n.is_nan() => MapKey::Number(f64::NAN.to_bits()),
            Value::Number(n) if n == 0.0 => MapKey::Number(0),
            Value::Number(n) => MapKey::Number(n.to_bits()),
            Value::BigInt(n) => MapKey::BigInt(n),
            Value::Symbol => {
                self.symbols += 1;
                MapKey::Symbol(self.symbols)
            }
            Value::Ref(id) => MapKey::Ref(id),
        }
    }

    pub fn record<K: Into<String>>(&mut self, fields: impl IntoIterator<Item = (K, Value)>) -> Value {
        let fields = fields.into_iter().map(|(k, v)| (k.into(), v)).collect();
        Value::Ref(self.alloc(Node::Record(fields)))
    }

    /// Appends to a list. Returns `false` if `list` is not a list.
    pub fn push(&mut self, list: NodeId, item: Value) -> bool {
        match self.get_mut(list) {
            Some(Node::List(items)) => {
                items.push(item);
                true
            }
            _ => false,
        }
    }

    /// Sets a record property, keeping the original position of an existing
    /// key. Returns `false` if `record` is not a record.
    pub fn set_property(&mut self, record: NodeId, key: impl Into<String>, value: Value) -> bool {
        match self.get_mut(record) {
            Some(Node::Record(fields)) => {
                fields.insert(key.into(), value);
                true
            }
            _ => false,
        }
    }

    /// Inserts or replaces a map entry. Returns `false` if `map` is not a map.
    pub fn map_insert(&mut self, map: NodeId, key: Value, value: Value) -> bool {
        if !matches!(self.get(map), Some(Node::Map(_))) {
            return false;
        }
        let hashed = self.map_key(key);
        match self.get_mut(map) {
            Some(Node::Map(entries)) => {
                entries.insert(hashed, (key, value));
                true
            }
            _ => false,
        }
    }

    /// Adds a set member if absent. Returns `false` if `set` is not a set.
    pub fn set_add(&mut self, set: NodeId, member: Value) -> bool {
        if !matches!(self.get(set), Some(Node::Set(_))) {
            return false;
        }
        let hashed = self.map_key(member);
        match self.get_mut(set) {
            Some(Node::Set(members)) => {
                members.entry(hashed).or_insert(member);
                true
            }
            _ => false,
        }
    }

    /// Structural comparison of `a` in `self` with `b` in `other`.
    ///
    /// Cycles are followed once. Sharing must line up: a node reached twice
    /// on the left has to pair with the same node on the right both times,
    /// and vice versa.
    pub fn deep_equal(&self, a: Value, other: &Graph, b: Value) -> bool {
        let mut left_to_right: HashMap<NodeId, NodeId> = HashMap::new();
        let mut right_to_left: HashMap<NodeId, NodeId> = HashMap::new();
        let mut stack = vec![(a, b)];

        while let Some((a, b)) = stack.pop() {
            let (ia, ib) = match (a, b) {
                (Value::Ref(ia), Value::Ref(ib)) => (ia, ib),
                (Value::Number(x), Value::Number(y)) => {
                    if !((x.is_nan() && y.is_nan()) || x == y) {
                        return false;
                    }
                    continue;
                }
                (x, y) => {
                    if x != y {
                        return false;
                    }
                    continue;
                }
            };

            match (left_to_right.get(&ia), right_to_left.get(&ib)) {
                (Some(&seen), _) if seen == ib => continue,
                (None, None) => {
                    left_to_right.insert(ia, ib);
                    right_to_left.insert(ib, ia);
                }
                _ => return false,
            }

            let (Some(na), Some(nb)) = (self.get(ia), other.get(ib)) else {
                return false;
            };
            match (na, nb) {
                (Node::Str(x), Node::Str(y)) => {
                    if x != y {
                        return false;
                    }
                }
                (Node::Bytes { data: x, kind: kx }, Node::Bytes { data: y, kind: ky }) => {
                    if kx != ky || x != y {
                        return false;
                    }
                }
                (Node::List(x), Node::List(y)) => {
                    if x.len() != y.len() {
                        return false;
                    }
                    stack.extend(x.iter().copied().zip(y.iter().copied()));
                }
                (Node::Set(x), Node::Set(y)) => {
                    if x.len() != y.len() {
                        return false;
                    }
                    stack.extend(x.values().copied().zip(y.values().copied()));
                }
                (Node::Map(x), Node::Map(y)) => {
                    if x.len() != y.len() {
                        return false;
                    }
                    for (&(kx, vx), &(ky, vy)) in x.values().zip(y.values()) {
                        stack.push((kx, ky));
                        stack.push((vx, vy));
                    }
                }
                (Node::Record(x), Node::Record(y)) => {
                    if x.len() != y.len() {
                        return false;
                    }
                    for ((kx, &vx), (ky, &vy)) in x.iter().zip(y.iter()) {
                        if kx != ky {
                            return false;
                        }
                        stack.push((vx, vy));
                    }
                }
                _ => return false,
            }
        }
        true
    }
}

/// A decoded value graph together with its root.
#[derive(Debug, Clone)]
pub struct Document {
    pub graph: Graph,
    pub root: Value,
}

impl Document {
    pub fn new(graph: Graph, root: Value) -> Self {
        Self { graph, root }
    }

    /// Node behind the root, if the root is a handle.
    pub fn root_node(&self) -> Option<&Node> {
        self.graph.resolve(self.root)
    }

    pub fn deep_equal(&self, other: &Document) -> bool {
        self.graph.deep_equal(self.root, &other.graph, other.root)
    }
}
