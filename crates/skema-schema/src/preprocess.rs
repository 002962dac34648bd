//! # Schema Preprocessing
//!
//! Rewrites schema trees in place according to a [`PreprocessorPolicy`].
//!
//! ## Per-Node Rules
//!
//! Applied to every visited node independently. The `properties` mapping
//! created by rule 3 exists before rules 1 and 2 run.
//!
//! 1. A node with `properties` and an `optional` list (when the policy
//!    allows the optional constraint) gets `required` = property names minus
//!    the optional ones; `optional` is removed. Declaring both `required`
//!    and `optional` on one node is a [`SkemaError::PolicyConflict`].
//! 2. Otherwise an `object` node with `properties` and no `required` gets
//!    every property name as `required` when the policy requires all
//!    properties by default.
//! 3. An `object` node without `additionalProperties` gets
//!    `additionalProperties: false` when the policy disallows additional
//!    properties by default, plus an empty `properties` mapping if it has
//!    none (the restriction has no effect without one).
//! 4. Every key in the policy's removed-key set is deleted.
//!
//! ## Reference Closure
//!
//! Applied once per call, to the root. Global definitions referenced from
//! the tree as `#/definitions/<name>` are copied into the root's own
//! `definitions`, then the definitions they reference, and so on until a
//! pass adds nothing. The candidate pool is finite, so this always
//! converges. `definitions` is only attached if something was inlined.
//!
//! ## Atomicity
//!
//! Every node that would be rewritten is checked for conflicts before
//! anything is mutated, so a rejected tree is left exactly as it was.

use std::collections::{BTreeSet, HashSet};

use indexmap::IndexMap;
use skema_core::{recursive, SchemaNode, SchemaValue, SkemaError, REF_KEY};

const OPTIONAL_KEY: &str = "optional";
const REQUIRED_KEY: &str = "required";
const PROPERTIES_KEY: &str = "properties";
const ADDITIONAL_PROPERTIES_KEY: &str = "additionalProperties";
const DEFINITIONS_KEY: &str = "definitions";
const DEFINITION_REF_PREFIX: &str = "#/definitions/";

/// Immutable normalization policy.
///
/// Built with consuming builder methods and applied with
/// [`apply`](PreprocessorPolicy::apply) or
/// [`apply_recursive`](PreprocessorPolicy::apply_recursive). Applying a
/// policy never mutates the policy itself: global definitions are copied
/// into the target tree.
#[derive(Debug, Clone, Default)]
pub struct PreprocessorPolicy {
    allow_optional_constraint: bool,
    require_all_properties_by_default: bool,
    disallow_additional_properties_by_default: bool,
    removed_keys: BTreeSet<String>,
    global_definitions: IndexMap<String, SchemaNode>,
}

impl PreprocessorPolicy {
    /// A policy that changes nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept the `optional` constraint as the complement of `required`.
    pub fn allow_optional_constraint(mut self, allow: bool) -> Self {
        self.allow_optional_constraint = allow;
        self
    }

    /// Require every declared property of `object` schemas unless the
    /// schema says otherwise.
    pub fn require_all_properties_by_default(mut self, require: bool) -> Self {
        self.require_all_properties_by_default = require;
        self
    }

    /// Disallow undeclared properties of `object` schemas unless the schema
    /// says otherwise.
    pub fn disallow_additional_properties_by_default(mut self, disallow: bool) -> Self {
        self.disallow_additional_properties_by_default = disallow;
        self
    }

    /// Keys removed from every processed node.
    pub fn removed_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.removed_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    /// Definitions inlined into trees that reference them.
    pub fn global_definitions<I, S>(mut self, definitions: I) -> Self
    where
        I: IntoIterator<Item = (S, SchemaNode)>,
        S: Into<String>,
    {
        self.global_definitions = definitions
            .into_iter()
            .map(|(name, node)| (name.into(), node))
            .collect();
        self
    }

    /// Returns true if the `optional` constraint is accepted.
    pub fn allows_optional_constraint(&self) -> bool {
        self.allow_optional_constraint
    }

    /// Returns true if all properties are required by default.
    pub fn requires_all_properties_by_default(&self) -> bool {
        self.require_all_properties_by_default
    }

    /// Returns true if additional properties are disallowed by default.
    pub fn disallows_additional_properties_by_default(&self) -> bool {
        self.disallow_additional_properties_by_default
    }

    /// The removed-key set.
    pub fn removed_key_set(&self) -> &BTreeSet<String> {
        &self.removed_keys
    }

    /// The global definitions, in declaration order.
    pub fn global_definition_map(&self) -> &IndexMap<String, SchemaNode> {
        &self.global_definitions
    }

    /// Inline referenced global definitions and apply the per-node rules to
    /// the root only.
    ///
    /// # Errors
    ///
    /// Returns `PolicyConflict` if the root violates a rule precondition;
    /// the tree is not modified in that case.
    pub fn apply(&self, root: &SchemaNode) -> Result<(), SkemaError> {
        let inlined = self.reference_closure(root);
        self.check_node(root)?;
        attach_definitions(root, inlined);
        self.rewrite_node(root);
        Ok(())
    }

    /// Inline referenced global definitions and apply the per-node rules to
    /// the root and every node reachable from it, inlined definitions
    /// included.
    ///
    /// # Errors
    ///
    /// Returns `PolicyConflict` if any reachable node violates a rule
    /// precondition; the tree is not modified in that case.
    pub fn apply_recursive(&self, root: &SchemaNode) -> Result<(), SkemaError> {
        let inlined = self.reference_closure(root);

        let mut seen = HashSet::new();
        let candidates = std::iter::once(root)
            .chain(inlined.iter().map(|(_, node)| node))
            .flat_map(recursive);
        for node in candidates {
            if seen.insert(node.id()) {
                self.check_node(&node)?;
            }
        }

        attach_definitions(root, inlined);
        for node in recursive(root) {
            self.rewrite_node(&node);
        }
        Ok(())
    }

    /// Compute which global definitions the tree needs, without touching it.
    fn reference_closure(&self, root: &SchemaNode) -> Vec<(String, SchemaNode)> {
        if self.global_definitions.is_empty() {
            return Vec::new();
        }

        let existing: HashSet<String> = root
            .get_node(DEFINITIONS_KEY)
            .map(|definitions| definitions.keys().into_iter().collect())
            .unwrap_or_default();
        let mut refs = referenced(root);
        let mut inlined: Vec<(String, SchemaNode)> = Vec::new();

        loop {
            let before = inlined.len();
            for (name, definition) in &self.global_definitions {
                if existing.contains(name) || inlined.iter().any(|(n, _)| n == name) {
                    continue;
                }
                if refs.contains(&format!("{DEFINITION_REF_PREFIX}{name}")) {
                    let copy = definition.deep_clone();
                    refs.extend(referenced(&copy));
                    inlined.push((name.clone(), copy));
                }
            }
            if inlined.len() == before {
                break;
            }
        }

        inlined
    }

    fn check_node(&self, node: &SchemaNode) -> Result<(), SkemaError> {
        if !self.allow_optional_constraint || !self.has_properties_after_rewrite(node) {
            return Ok(());
        }
        let Some(optional) = node.get(OPTIONAL_KEY) else {
            return Ok(());
        };
        if string_list(&optional).is_none() {
            return Err(SkemaError::PolicyConflict {
                node: node.describe(),
                reason: "the 'optional' constraint must be a list of property names".into(),
            });
        }
        if node.contains_key(REQUIRED_KEY) {
            return Err(SkemaError::PolicyConflict {
                node: node.describe(),
                reason: "at most one of the 'required' and 'optional' constraints can be declared".into(),
            });
        }
        Ok(())
    }

    /// True if the node has a `properties` mapping, or rule 3 will give it one.
    fn has_properties_after_rewrite(&self, node: &SchemaNode) -> bool {
        node.get_node(PROPERTIES_KEY).is_some()
            || (self.restricts_additional_properties(node) && !node.contains_key(PROPERTIES_KEY))
    }

    fn restricts_additional_properties(&self, node: &SchemaNode) -> bool {
        self.disallow_additional_properties_by_default
            && node.type_includes("object")
            && !node.contains_key(ADDITIONAL_PROPERTIES_KEY)
    }

    fn rewrite_node(&self, node: &SchemaNode) {
        // Rule 3 first: rules 1 and 2 must see the mapping it creates.
        if self.restricts_additional_properties(node) {
            node.insert(ADDITIONAL_PROPERTIES_KEY, false);
            if !node.contains_key(PROPERTIES_KEY) {
                node.insert(PROPERTIES_KEY, SchemaNode::new());
            }
        }

        if let Some(properties) = node.get_node(PROPERTIES_KEY) {
            let names = properties.keys();
            let optional = node.get(OPTIONAL_KEY).as_ref().and_then(string_list);
            match optional {
                Some(optional) if self.allow_optional_constraint => {
                    let required: Vec<SchemaValue> = names
                        .into_iter()
                        .filter(|name| !optional.contains(name))
                        .map(SchemaValue::from)
                        .collect();
                    node.insert(REQUIRED_KEY, required);
                    node.remove(OPTIONAL_KEY);
                }
                _ if node.type_includes("object")
                    && self.require_all_properties_by_default
                    && !node.contains_key(REQUIRED_KEY) =>
                {
                    let required: Vec<SchemaValue> = names.into_iter().map(SchemaValue::from).collect();
                    node.insert(REQUIRED_KEY, required);
                }
                _ => {}
            }
        }

        for key in &self.removed_keys {
            node.remove(key);
        }
    }
}

fn attach_definitions(root: &SchemaNode, inlined: Vec<(String, SchemaNode)>) {
    if inlined.is_empty() {
        return;
    }
    let names: Vec<&str> = inlined.iter().map(|(name, _)| name.as_str()).collect();
    tracing::debug!(schema = %root.describe(), inlined = ?names, "inlining global definitions");

    let definitions = match root.get_node(DEFINITIONS_KEY) {
        Some(definitions) => definitions,
        None => {
            let definitions = SchemaNode::new();
            root.insert(DEFINITIONS_KEY, definitions.clone());
            definitions
        }
    };
    for (name, node) in inlined {
        definitions.insert(name, node);
    }
}

/// Every `$ref` string reachable from `node`.
fn referenced(node: &SchemaNode) -> HashSet<String> {
    recursive(node).filter_map(|n| n.get_str(REF_KEY)).collect()
}

fn string_list(value: &SchemaValue) -> Option<HashSet<String>> {
    value
        .as_array()?
        .iter()
        .map(|item| item.as_str().map(str::to_string))
        .collect()
}
