//! # Example Synthesis
//!
//! Builds a representative example value for a schema.
//!
//! A schema that declares `example` is answered with it, after checking it
//! against the schema. Otherwise partial candidates are derived and merged
//! in a fixed order:
//!
//! 1. the first `oneOf` alternative
//! 2. the first `anyOf` alternative
//! 3. every `allOf` member, in order
//! 4. a mapping built from `properties`
//! 5. a sequence built from `items`: a single item schema is repeated
//!    `max(1, minItems)` times; a list of item schemas gives one element
//!    per position
//!
//! Merging `A` (prior) with `B` (new): `B` if `A` is absent or equal to
//! `B`; the shallow union if both are mappings, `B` winning collisions;
//! anything else is a [`SkemaError::SynthesisConflict`].
//!
//! A schema that yields no candidate falls back to `const`, the first
//! `enum` value, `default`, then a placeholder for its declared `type`.
//! Local `$ref`s are followed against the root schema. The finished example
//! is validated against the root schema when a validator is supplied.
//!
//! Generated sequences and strings are capped at
//! [`ExampleBuilder::max_len`] elements or characters. A `minItems` or
//! `minLength` above the cap is reported instead of being materialized.

use serde_json::{Map, Value};
use skema_core::location::pointer_segments;
use skema_core::{SchemaNode, SchemaValue, SkemaError, ID_KEY, REF_KEY};

use crate::validate::ValidatorBackend;

const EXAMPLE_KEY: &str = "example";
const DEFINITIONS_KEY: &str = "definitions";

/// Default cap on the length of a generated sequence or string.
pub const DEFAULT_MAX_LEN: usize = 1024;

/// Synthesizes example values, optionally validating them.
#[derive(Clone, Copy)]
pub struct ExampleBuilder<'a> {
    validator: Option<&'a dyn ValidatorBackend>,
    max_len: usize,
}

impl Default for ExampleBuilder<'_> {
    fn default() -> Self {
        Self::new(None)
    }
}

impl<'a> ExampleBuilder<'a> {
    /// Create a builder. Without a validator, examples are not checked.
    pub fn new(validator: Option<&'a dyn ValidatorBackend>) -> Self {
        Self {
            validator,
            max_len: DEFAULT_MAX_LEN,
        }
    }

    /// Cap generated sequences and strings at `max_len` elements.
    pub fn with_max_len(mut self, max_len: usize) -> Self {
        self.max_len = max_len;
        self
    }

    /// The current cap on generated sequence and string lengths.
    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Synthesize an example for `schema`.
    ///
    /// The validator sees each declared `example` (against its own level)
    /// and the finished example (against `schema`). Intermediate candidates
    /// are not checked on their own: every one of them ends up inside the
    /// finished example, so a bad part still fails the final check, with
    /// the issue path pointing at it.
    ///
    /// # Errors
    ///
    /// - `SynthesisConflict` if partial candidates are incompatible, the
    ///   schema is infinitely recursive, a `minItems` or `minLength` exceeds
    ///   [`max_len`](Self::max_len), or a declared or synthesized example
    ///   fails validation.
    /// - `MalformedInput` if a local `$ref` does not resolve, a reference is
    ///   not local, or the validator cannot compile the schema.
    pub fn build_example(&self, schema: &SchemaNode) -> Result<Value, SkemaError> {
        let mut open = Vec::new();
        let example = self.synthesize(schema, schema, &mut open)?;
        if declared_example(schema).is_none() {
            self.validate(&example, schema, || {
                format!("synthesized example does not validate against {}", schema.describe())
            })?;
        }
        Ok(example)
    }

    fn synthesize(&self, node: &SchemaNode, root: &SchemaNode, open: &mut Vec<SchemaNode>) -> Result<Value, SkemaError> {
        if let Some(example) = declared_example(node) {
            let example = example.to_json()?;
            self.validate(&example, &scoped(node, root), || {
                format!("declared example of {} does not validate", node.describe())
            })?;
            return Ok(example);
        }

        if open.iter().any(|n| n.ptr_eq(node)) {
            return Err(SkemaError::SynthesisConflict {
                reason: format!("{} contains itself, so no finite example exists", node.describe()),
                example: Value::Null,
                issues: Vec::new(),
            });
        }
        open.push(node.clone());
        let result = self.derive(node, root, open);
        open.pop();
        result
    }

    fn derive(&self, node: &SchemaNode, root: &SchemaNode, open: &mut Vec<SchemaNode>) -> Result<Value, SkemaError> {
        if let Some(reference) = node.get_str(REF_KEY) {
            let target = resolve_local(root, &reference)?;
            return self.synthesize(&target, root, open);
        }

        let mut candidate = None;
        if let Some(first) = child_nodes(node, "oneOf").first() {
            merge(&mut candidate, self.synthesize(first, root, open)?)?;
        }
        if let Some(first) = child_nodes(node, "anyOf").first() {
            merge(&mut candidate, self.synthesize(first, root, open)?)?;
        }
        for member in child_nodes(node, "allOf") {
            merge(&mut candidate, self.synthesize(&member, root, open)?)?;
        }

        if let Some(properties) = node.get_node("properties") {
            let mut mapping = Map::new();
            for (name, value) in properties.entries() {
                if let SchemaValue::Node(property) = value {
                    mapping.insert(name, self.synthesize(&property, root, open)?);
                }
            }
            merge(&mut candidate, Value::Object(mapping))?;
        }

        match node.get("items") {
            Some(SchemaValue::Node(item)) => {
                let count = self.bounded_len(node, "minItems", 1)?.max(1);
                let element = self.synthesize(&item, root, open)?;
                merge(&mut candidate, Value::Array(vec![element; count]))?;
            }
            Some(SchemaValue::Array(items)) => {
                let mut elements = Vec::with_capacity(items.len());
                for item in items.iter().filter_map(SchemaValue::as_node) {
                    elements.push(self.synthesize(item, root, open)?);
                }
                merge(&mut candidate, Value::Array(elements))?;
            }
            _ => {}
        }

        match candidate {
            Some(value) => Ok(value),
            None => self.placeholder(node),
        }
    }

    /// Read a non-negative length keyword, rejecting values above the cap.
    fn bounded_len(&self, node: &SchemaNode, key: &str, absent: usize) -> Result<usize, SkemaError> {
        let Some(requested) = node.get(key).and_then(|v| v.as_u64()) else {
            return Ok(absent);
        };
        match usize::try_from(requested) {
            Ok(len) if len <= self.max_len => Ok(len),
            _ => Err(SkemaError::SynthesisConflict {
                reason: format!(
                    "{key} {requested} of {} exceeds the example length limit of {}",
                    node.describe(),
                    self.max_len
                ),
                example: Value::Null,
                issues: Vec::new(),
            }),
        }
    }

    fn placeholder(&self, node: &SchemaNode) -> Result<Value, SkemaError> {
        if let Some(value) = node.get("const") {
            return value.to_json();
        }
        if let Some(first) = node.get("enum").as_ref().and_then(SchemaValue::as_array).and_then(|items| items.first()) {
            return first.to_json();
        }
        if let Some(value) = node.get("default") {
            return value.to_json();
        }

        let declared = match node.get("type") {
            Some(SchemaValue::String(t)) => Some(t),
            Some(SchemaValue::Array(types)) => types
                .iter()
                .filter_map(SchemaValue::as_str)
                .find(|t| *t != "null")
                .map(str::to_string),
            _ => None,
        };
        Ok(match declared.as_deref() {
            Some("object") => Value::Object(Map::new()),
            Some("array") => Value::Array(Vec::new()),
            Some("string") => Value::String("a".repeat(self.bounded_len(node, "minLength", 1)?)),
            Some("integer") => number_value(numeric(node).ceil()),
            Some("number") => number_value(numeric(node)),
            Some("boolean") => Value::Bool(false),
            _ => Value::Null,
        })
    }

    fn validate<F>(&self, value: &Value, schema: &SchemaNode, reason: F) -> Result<(), SkemaError>
    where
        F: FnOnce() -> String,
    {
        let Some(validator) = self.validator else {
            return Ok(());
        };
        let issues = validator.check(value, schema)?;
        if issues.is_empty() {
            return Ok(());
        }
        Err(SkemaError::SynthesisConflict {
            reason: reason(),
            example: value.clone(),
            issues,
        })
    }
}

fn declared_example(node: &SchemaNode) -> Option<SchemaValue> {
    match node.get(EXAMPLE_KEY) {
        None | Some(SchemaValue::Null) => None,
        Some(example) => Some(example),
    }
}

/// Combine a new partial candidate into the prior one.
fn merge(prior: &mut Option<Value>, next: Value) -> Result<(), SkemaError> {
    let merged = match prior.take() {
        None => next,
        Some(a) if a == next => next,
        Some(Value::Object(mut a)) if next.is_object() => {
            if let Value::Object(b) = next {
                for (key, value) in b {
                    a.insert(key, value);
                }
            }
            Value::Object(a)
        }
        Some(a) => {
            return Err(SkemaError::SynthesisConflict {
                reason: format!("incompatible partial examples {a} and {next}"),
                example: Value::Array(vec![a, next]),
                issues: Vec::new(),
            })
        }
    };
    *prior = Some(merged);
    Ok(())
}

fn child_nodes(node: &SchemaNode, key: &str) -> Vec<SchemaNode> {
    match node.get(key) {
        Some(SchemaValue::Array(items)) => items.iter().filter_map(SchemaValue::as_node).cloned().collect(),
        _ => Vec::new(),
    }
}

/// Resolve a `#/...` reference against the root schema.
fn resolve_local(root: &SchemaNode, reference: &str) -> Result<SchemaNode, SkemaError> {
    let fragment = reference.strip_prefix('#').ok_or_else(|| {
        SkemaError::malformed(reference, "only local references can be followed during example synthesis")
    })?;
    let mut current = SchemaValue::Node(root.clone());
    for segment in pointer_segments(fragment) {
        let next = match &current {
            SchemaValue::Node(node) => node.get(&segment),
            SchemaValue::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i).cloned()),
            _ => None,
        };
        current = next.ok_or_else(|| SkemaError::malformed(reference, "reference does not resolve within the schema"))?;
    }
    match current {
        SchemaValue::Node(node) => Ok(node),
        _ => Err(SkemaError::malformed(reference, "reference does not select a schema")),
    }
}

/// `node` as a standalone schema: a shallow copy that borrows the root's
/// `definitions` and `id` so its references still resolve.
fn scoped(node: &SchemaNode, root: &SchemaNode) -> SchemaNode {
    if node.ptr_eq(root) {
        return root.clone();
    }
    let copy = SchemaNode::new();
    for (key, value) in node.entries() {
        copy.insert(key, value);
    }
    for key in [DEFINITIONS_KEY, ID_KEY] {
        if !copy.contains_key(key) {
            if let Some(value) = root.get(key) {
                copy.insert(key, value);
            }
        }
    }
    copy
}

/// Lowest value allowed by the numeric bounds, or 0, clamped to the maximum.
fn numeric(node: &SchemaNode) -> f64 {
    let bound = |key: &str| node.get(key).and_then(|v| v.as_f64());
    let mut value = match (bound("minimum"), bound("exclusiveMinimum")) {
        (Some(min), _) => min,
        (None, Some(min)) => min + 1.0,
        (None, None) => 0.0,
    };
    if let Some(max) = bound("maximum") {
        value = value.min(max);
    } else if let Some(max) = bound("exclusiveMaximum") {
        if value >= max {
            value = max - 1.0;
        }
    }
    value
}

fn number_value(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < 9.0e15 {
        Value::from(value as i64)
    } else {
        serde_json::Number::from_f64(value).map_or(Value::Null, Value::Number)
    }
}
