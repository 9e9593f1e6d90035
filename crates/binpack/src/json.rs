//! Conversion between `serde_json` values and value graphs.
//!
//! JSON has no room for shared or cyclic structure: [`from_json`] allocates a
//! fresh node for every string and container, and [`to_json`] copies shared
//! nodes at each use and rejects cycles. Rendering runs on an explicit stack
//! under [`JsonLimits`], so neither deep handle chains nor heavily shared
//! nodes can exhaust the call stack or memory.

use std::collections::HashSet;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use indexmap::IndexMap;
use serde_json::{Map as JsonMap, Number, Value as Json};
use thiserror::Error;

use crate::value::{Document, Graph, Node, NodeId, Value};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum JsonError {
    #[error("value graph contains a cycle and cannot be represented as JSON")]
    Cycle,
    #[error("dangling node handle {0}")]
    DanglingReference(usize),
    #[error("JSON nesting depth ({0}) exceeded")]
    TooDeep(usize),
    #[error("JSON output exceeds {0} bytes")]
    TooLarge(usize),
}

/// Builds a document mirroring a JSON value.
pub fn from_json(json: &Json) -> Document {
    let mut graph = Graph::new();
    let root = insert_json(&mut graph, json);
    Document::new(graph, root)
}

fn insert_json(graph: &mut Graph, json: &Json) -> Value {
    match json {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => Value::Number(n.as_f64().unwrap_or(0.0)),
        Json::String(s) => graph.string(s.as_str()),
        Json::Array(items) => {
            let items: Vec<Value> = items.iter().map(|item| insert_json(graph, item)).collect();
            graph.list(items)
        }
        Json::Object(fields) => {
            let fields: Vec<(&str, Value)> = fields
                .iter()
                .map(|(k, v)| (k.as_str(), insert_json(graph, v)))
                .collect();
            graph.record(fields)
        }
    }
}

/// Nesting bound used by [`to_json`].
pub const DEFAULT_JSON_DEPTH: usize = 1024;

/// Output bound used by [`to_json`], in bytes of rendered text.
pub const DEFAULT_JSON_LEN: usize = 64 << 20;

const DATA_URI_PREFIX: &str = "data:application/octet-stream;base64,";

/// Bounds applied while rendering a graph as JSON.
///
/// Shared nodes are copied at every use, so a small graph can expand into
/// an enormous tree and handle chains can nest far deeper than the bytes
/// they were decoded from. `None` disables a bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JsonLimits {
    /// Deepest container nesting allowed.
    pub max_depth: Option<usize>,
    /// Approximate upper bound on the rendered text.
    pub max_len: Option<usize>,
}

impl Default for JsonLimits {
    fn default() -> Self {
        Self {
            max_depth: Some(DEFAULT_JSON_DEPTH),
            max_len: Some(DEFAULT_JSON_LEN),
        }
    }
}

/// Renders `value` as JSON under the default [`JsonLimits`].
///
/// - undefined, NaN, infinities and symbols become `null`
/// - byte buffers become base64 `data:` URIs
/// - maps become arrays of `[key, value]` pairs, sets become arrays
pub fn to_json(graph: &Graph, value: Value) -> Result<Json, JsonError> {
    to_json_with_limits(graph, value, JsonLimits::default())
}

pub fn to_json_with_limits(
    graph: &Graph,
    value: Value,
    limits: JsonLimits,
) -> Result<Json, JsonError> {
    Renderer {
        graph,
        limits,
        len: 0,
        ancestors: HashSet::new(),
        out: Vec::new(),
    }
    .run(value)
}

/// Pending work of the renderer. Closing steps gather the children their
/// container left on the output stack.
enum Step<'g> {
    Visit(Value),
    Array { id: NodeId, len: usize },
    Pairs { id: NodeId, len: usize },
    Object { id: NodeId, fields: &'g IndexMap<String, Value> },
}

struct Renderer<'g> {
    graph: &'g Graph,
    limits: JsonLimits,
    len: usize,
    /// Containers currently open; a handle back into this set is a cycle.
    ancestors: HashSet<NodeId>,
    out: Vec<Json>,
}

impl<'g> Renderer<'g> {
    fn run(mut self, root: Value) -> Result<Json, JsonError> {
        let mut steps = vec![Step::Visit(root)];
        while let Some(step) = steps.pop() {
            match step {
                Step::Visit(value) => self.visit(value, &mut steps)?,
                Step::Array { id, len } => {
                    let items = self.close(id, len);
                    self.out.push(Json::Array(items));
                }
                Step::Pairs { id, len } => {
                    let mut flat = self.close(id, len * 2).into_iter();
                    let mut pairs = Vec::with_capacity(len);
                    while let (Some(k), Some(v)) = (flat.next(), flat.next()) {
                        pairs.push(Json::Array(vec![k, v]));
                    }
                    self.out.push(Json::Array(pairs));
                }
                Step::Object { id, fields } => {
                    let values = self.close(id, fields.len());
                    let out: JsonMap<String, Json> = fields.keys().cloned().zip(values).collect();
                    self.out.push(Json::Object(out));
                }
            }
        }
        Ok(self.out.pop().unwrap_or(Json::Null))
    }

    fn visit(&mut self, value: Value, steps: &mut Vec<Step<'g>>) -> Result<(), JsonError> {
        let id = match value {
            Value::Ref(id) => id,
            leaf => {
                self.charge(5)?;
                self.out.push(scalar(leaf));
                return Ok(());
            }
        };
        if self.ancestors.contains(&id) {
            return Err(JsonError::Cycle);
        }
        let graph = self.graph;
        let node = graph
            .get(id)
            .ok_or(JsonError::DanglingReference(id.index()))?;

        match node {
            Node::Str(s) => {
                self.charge(s.len() + 3)?;
                self.out.push(Json::String(s.clone()));
            }
            Node::Bytes { data, .. } => {
                self.charge(DATA_URI_PREFIX.len() + data.len().div_ceil(3) * 4 + 3)?;
                self.out.push(Json::String(format!(
                    "{DATA_URI_PREFIX}{}",
                    STANDARD.encode(data)
                )));
            }
            Node::List(items) => {
                self.open(id, 0)?;
                steps.push(Step::Array { id, len: items.len() });
                steps.extend(items.iter().rev().map(|&item| Step::Visit(item)));
            }
            Node::Set(members) => {
                self.open(id, 0)?;
                steps.push(Step::Array { id, len: members.len() });
                steps.extend(members.values().rev().map(|&member| Step::Visit(member)));
            }
            Node::Map(entries) => {
                self.open(id, entries.len() * 3)?;
                steps.push(Step::Pairs { id, len: entries.len() });
                for &(k, v) in entries.values().rev() {
                    steps.push(Step::Visit(v));
                    steps.push(Step::Visit(k));
                }
            }
            Node::Record(fields) => {
                self.open(id, fields.keys().map(|k| k.len() + 3).sum())?;
                steps.push(Step::Object { id, fields });
                steps.extend(fields.values().rev().map(|&v| Step::Visit(v)));
            }
        }
        Ok(())
    }

    fn open(&mut self, id: NodeId, punctuation: usize) -> Result<(), JsonError> {
        if let Some(max) = self.limits.max_depth {
            if self.ancestors.len() >= max {
                return Err(JsonError::TooDeep(max));
            }
        }
        self.charge(punctuation + 3)?;
        self.ancestors.insert(id);
        Ok(())
    }

    fn close(&mut self, id: NodeId, count: usize) -> Vec<Json> {
        self.ancestors.remove(&id);
        let at = self.out.len().saturating_sub(count);
        self.out.split_off(at)
    }

    fn charge(&mut self, len: usize) -> Result<(), JsonError> {
        self.len = self.len.saturating_add(len);
        match self.limits.max_len {
            Some(max) if self.len > max => Err(JsonError::TooLarge(max)),
            _ => Ok(()),
        }
    }
}

fn scalar(value: Value) -> Json {
    match value {
        Value::Undefined | Value::Null | Value::Symbol | Value::Ref(_) => Json::Null,
        Value::Bool(b) => Json::Bool(b),
        Value::Number(n) => number(n),
        Value::BigInt(n) => {
            if let Ok(i) = i64::try_from(n) {
                Json::Number(i.into())
            } else if let Ok(u) = u64::try_from(n) {
                Json::Number(u.into())
            } else {
                Json::String(n.to_string())
            }
        }
    }
}

fn number(n: f64) -> Json {
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        Json::Number((n as i64).into())
    } else {
        Number::from_f64(n).map(Json::Number).unwrap_or(Json::Null)
    }
}
