//! # Document Model — Schema Nodes
//!
//! A schema document is a tree of ordered string-keyed mappings whose values
//! are scalars, sequences, or further mappings. Every mapping is a
//! [`SchemaNode`]: a shared handle to its entries.
//!
//! ## Identity
//!
//! Cloning a `SchemaNode` clones the *handle*, not the mapping. Two handles
//! refer to "the same node" iff they point at the same allocation, which is
//! what [`SchemaNode::id`] and [`SchemaNode::ptr_eq`] compare. Structurally
//! equal but distinct nodes have distinct identities. Because handles can be
//! shared, a document may form a graph, including cycles (mutually
//! referencing definitions injected by a caller, for example).
//!
//! ## Locking
//!
//! Each node guards its entries with a `parking_lot::RwLock` so handles are
//! `Send + Sync`. Every accessor takes the lock for the duration of a single
//! call and never while touching another node, so self-referencing nodes
//! cannot deadlock. The lock does not make multi-step rewrites atomic:
//! callers that preprocess a tree must still serialize against concurrent
//! readers.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::{RwLock, RwLockReadGuard};
use serde_json::{Map, Number, Value};

use crate::error::SkemaError;

/// Keys that may hold exactly one child schema.
pub const SINGLE_CHILD_KEYS: [&str; 4] = ["additionalItems", "additionalProperties", "items", "not"];

/// Keys that may hold an ordered sequence of child schemas.
pub const SEQUENCE_CHILD_KEYS: [&str; 4] = ["items", "allOf", "anyOf", "oneOf"];

/// Keys that may hold a mapping whose values are child schemas.
pub const MAPPING_CHILD_KEYS: [&str; 4] = ["definitions", "properties", "patternProperties", "dependencies"];

/// Reference to another node, resolved by a validator backend.
pub const REF_KEY: &str = "$ref";

/// Absolute location of a loaded schema, used as base resolution context.
pub const ID_KEY: &str = "id";

/// A value stored under a key of a [`SchemaNode`].
#[derive(Debug, Clone)]
pub enum SchemaValue {
    /// JSON `null`.
    Null,
    /// A boolean.
    Bool(bool),
    /// A number, kept in `serde_json`'s lossless representation.
    Number(Number),
    /// A string.
    String(String),
    /// An ordered sequence.
    Array(Vec<SchemaValue>),
    /// A nested mapping.
    Node(SchemaNode),
}

impl SchemaValue {
    /// Convert a JSON value, turning every object into a fresh node.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => Self::Number(n),
            Value::String(s) => Self::String(s),
            Value::Array(items) => Self::Array(items.into_iter().map(Self::from_json).collect()),
            Value::Object(map) => Self::Node(SchemaNode::from_map(map)),
        }
    }

    /// Convert to a JSON value.
    ///
    /// # Errors
    ///
    /// Returns `MalformedInput` if a nested node graph contains a cycle.
    pub fn to_json(&self) -> Result<Value, SkemaError> {
        self.to_json_guarded(&mut Vec::new())
    }

    fn to_json_guarded(&self, open: &mut Vec<SchemaNode>) -> Result<Value, SkemaError> {
        Ok(match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::Number(n) => Value::Number(n.clone()),
            Self::String(s) => Value::String(s.clone()),
            Self::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| item.to_json_guarded(open))
                    .collect::<Result<_, _>>()?,
            ),
            Self::Node(node) => node.to_json_guarded(open)?,
        })
    }

    /// Returns the nested node, if this value is one.
    pub fn as_node(&self) -> Option<&SchemaNode> {
        match self {
            Self::Node(node) => Some(node),
            _ => None,
        }
    }

    /// Returns the string, if this value is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the sequence, if this value is one.
    pub fn as_array(&self) -> Option<&[SchemaValue]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the value as a non-negative integer, if it is one.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::Number(n) => n.as_u64(),
            _ => None,
        }
    }

    /// Returns the value as a signed integer, if it is one.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    /// Returns the value as a float, if it is a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    fn deep_clone_with(&self, copies: &mut HashMap<NodeId, SchemaNode>) -> Self {
        match self {
            Self::Array(items) => {
                Self::Array(items.iter().map(|item| item.deep_clone_with(copies)).collect())
            }
            Self::Node(node) => Self::Node(node.deep_clone_with(copies)),
            scalar => scalar.clone(),
        }
    }
}

impl From<SchemaNode> for SchemaValue {
    fn from(node: SchemaNode) -> Self {
        Self::Node(node)
    }
}

impl From<bool> for SchemaValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for SchemaValue {
    fn from(n: i64) -> Self {
        Self::Number(n.into())
    }
}

impl From<&str> for SchemaValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for SchemaValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<Vec<SchemaValue>> for SchemaValue {
    fn from(items: Vec<SchemaValue>) -> Self {
        Self::Array(items)
    }
}

/// Identity of a [`SchemaNode`]: the address of its shared allocation.
///
/// Only meaningful while some handle to the node is alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// A shared handle to one mapping of a schema document.
///
/// Handles are strong references. A graph whose edges form a cycle (a node
/// reachable from one of its own children) keeps itself alive after the
/// last outside handle is dropped. Trees built by [`SchemaNode::from_json`]
/// and by preprocessing are acyclic; a caller that links nodes into a cycle
/// must [`remove`](SchemaNode::remove) one back edge to release the graph.
#[derive(Clone, Default)]
pub struct SchemaNode(Arc<RwLock<IndexMap<String, SchemaValue>>>);

impl SchemaNode {
    /// Create an empty node.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a node tree from a JSON value.
    ///
    /// # Errors
    ///
    /// Returns `MalformedInput` if `value` is not a JSON object.
    pub fn from_json(value: Value) -> Result<Self, SkemaError> {
        match value {
            Value::Object(map) => Ok(Self::from_map(map)),
            other => Err(SkemaError::malformed(
                "schema root",
                format!("expected a mapping, got {}", json_kind(&other)),
            )),
        }
    }

    fn from_map(map: Map<String, Value>) -> Self {
        let entries = map
            .into_iter()
            .map(|(k, v)| (k, SchemaValue::from_json(v)))
            .collect();
        Self(Arc::new(RwLock::new(entries)))
    }

    /// Serialize the node graph to JSON.
    ///
    /// Shared (but acyclic) sub-nodes are written out once per occurrence.
    ///
    /// # Errors
    ///
    /// Returns `MalformedInput` if the graph contains a cycle.
    pub fn to_json(&self) -> Result<Value, SkemaError> {
        self.to_json_guarded(&mut Vec::new())
    }

    fn to_json_guarded(&self, open: &mut Vec<SchemaNode>) -> Result<Value, SkemaError> {
        if open.iter().any(|n| n.ptr_eq(self)) {
            return Err(SkemaError::malformed(
                self.describe(),
                "schema graph contains a cycle and cannot be serialized",
            ));
        }
        open.push(self.clone());
        let mut map = Map::new();
        for (key, value) in self.entries() {
            map.insert(key, value.to_json_guarded(open)?);
        }
        open.pop();
        Ok(Value::Object(map))
    }

    /// Identity of this node.
    pub fn id(&self) -> NodeId {
        NodeId(Arc::as_ptr(&self.0) as *const () as usize)
    }

    /// Returns true if both handles refer to the same node.
    pub fn ptr_eq(&self, other: &SchemaNode) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, IndexMap<String, SchemaValue>> {
        self.0.read()
    }

    /// Returns a copy of the value under `key`.
    ///
    /// Nested nodes are returned as shared handles.
    pub fn get(&self, key: &str) -> Option<SchemaValue> {
        self.0.read().get(key).cloned()
    }

    /// Returns the node under `key`, if the value there is a node.
    pub fn get_node(&self, key: &str) -> Option<SchemaNode> {
        match self.0.read().get(key) {
            Some(SchemaValue::Node(node)) => Some(node.clone()),
            _ => None,
        }
    }

    /// Returns the string under `key`, if the value there is a string.
    pub fn get_str(&self, key: &str) -> Option<String> {
        match self.0.read().get(key) {
            Some(SchemaValue::String(s)) => Some(s.clone()),
            _ => None,
        }
    }

    /// Returns true if `key` is present (with any value, including null).
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.read().contains_key(key)
    }

    /// Set `key`, keeping its position if it already exists.
    pub fn insert(&self, key: impl Into<String>, value: impl Into<SchemaValue>) -> Option<SchemaValue> {
        self.0.write().insert(key.into(), value.into())
    }

    /// Remove `key`, preserving the order of the remaining entries.
    pub fn remove(&self, key: &str) -> Option<SchemaValue> {
        self.0.write().shift_remove(key)
    }

    /// Keys in declaration order.
    pub fn keys(&self) -> Vec<String> {
        self.0.read().keys().cloned().collect()
    }

    /// Snapshot of all entries in declaration order.
    pub fn entries(&self) -> Vec<(String, SchemaValue)> {
        self.0
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.read().len()
    }

    /// Returns true if the node has no entries.
    pub fn is_empty(&self) -> bool {
        self.0.read().is_empty()
    }

    /// Returns true if the declared `type` is `name` or a list containing it.
    pub fn type_includes(&self, name: &str) -> bool {
        match self.0.read().get("type") {
            Some(SchemaValue::String(t)) => t == name,
            Some(SchemaValue::Array(types)) => types.iter().any(|t| t.as_str() == Some(name)),
            _ => false,
        }
    }

    /// Copy the node graph into fresh nodes.
    ///
    /// Sharing and cycles are preserved: a node reachable along several
    /// paths is copied once and the copy is shared the same way.
    pub fn deep_clone(&self) -> SchemaNode {
        self.deep_clone_with(&mut HashMap::new())
    }

    fn deep_clone_with(&self, copies: &mut HashMap<NodeId, SchemaNode>) -> SchemaNode {
        if let Some(copy) = copies.get(&self.id()) {
            return copy.clone();
        }
        let copy = SchemaNode::new();
        copies.insert(self.id(), copy.clone());
        for (key, value) in self.entries() {
            let value = value.deep_clone_with(copies);
            copy.insert(key, value);
        }
        copy
    }

    /// Short human-readable locator for error messages: the node's `id` if
    /// it has one, else its property names, else its keys.
    pub fn describe(&self) -> String {
        if let Some(id) = self.get_str(ID_KEY) {
            return id;
        }
        if let Some(properties) = self.get_node("properties") {
            return format!("schema with properties [{}]", properties.keys().join(", "));
        }
        format!("schema with keys [{}]", self.keys().join(", "))
    }
}

impl fmt::Debug for SchemaNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaNode")
            .field("id", &self.id())
            .field("keys", &self.keys())
            .finish()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}
