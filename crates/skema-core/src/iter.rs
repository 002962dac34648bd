//! # Traversal Engine
//!
//! Pull-based iterators over the sub-schemas of a [`SchemaNode`]:
//!
//! - [`shallow`] — the direct sub-schema children of one node.
//! - [`recursive`] — every reachable node, pre-order, each distinct node
//!   identity exactly once. Terminates on cyclic graphs.
//! - [`recursive_unguarded`] — the same pre-order walk without the visited
//!   set. Only for inputs the caller knows to be acyclic: on a cyclic graph
//!   the iterator never ends.
//!
//! ## Child Order
//!
//! Children are produced in a fixed order: the single-child keys, then the
//! sequence keys (outer key order, then element order), then the mapping
//! keys (outer key order, then entry order). Values that are not nodes are
//! skipped. `items` appears in both the single and sequence classes and
//! contributes according to which shape it holds.
//!
//! ## Laziness
//!
//! A node's children are read when the iterator first needs them, after the
//! node itself has been returned. Changes a caller makes to a returned node
//! before the next call to `next()` are therefore reflected in the walk. No
//! node lock is held between calls.

use std::collections::HashMap;

use crate::node::{NodeId, SchemaNode, SchemaValue, MAPPING_CHILD_KEYS, SEQUENCE_CHILD_KEYS, SINGLE_CHILD_KEYS};

/// Direct sub-schema children of `node`, in traversal order.
pub fn children(node: &SchemaNode) -> Vec<SchemaNode> {
    let mut out = Vec::new();
    let mut holders = Vec::new();
    {
        let entries = node.read();
        for key in SINGLE_CHILD_KEYS {
            if let Some(SchemaValue::Node(child)) = entries.get(key) {
                out.push(child.clone());
            }
        }
        for key in SEQUENCE_CHILD_KEYS {
            if let Some(SchemaValue::Array(items)) = entries.get(key) {
                out.extend(items.iter().filter_map(SchemaValue::as_node).cloned());
            }
        }
        for key in MAPPING_CHILD_KEYS {
            if let Some(SchemaValue::Node(holder)) = entries.get(key) {
                holders.push(holder.clone());
            }
        }
    }
    // The holder may be `node` itself, so its entries are read only after
    // the guard above is released.
    for holder in holders {
        let entries = holder.read();
        out.extend(entries.values().filter_map(SchemaValue::as_node).cloned());
    }
    out
}

/// Iterate over the direct sub-schema children of `root`.
///
/// Each call returns a fresh iterator, so the walk can be restarted.
pub fn shallow(root: &SchemaNode) -> Shallow {
    Shallow {
        root: root.clone(),
        pending: None,
    }
}

/// Iterate over `root` and every reachable sub-schema, pre-order, emitting
/// each distinct node once.
pub fn recursive(root: &SchemaNode) -> Recursive {
    Recursive::new(root, true)
}

/// Iterate over `root` and every reachable sub-schema, pre-order, without
/// cycle detection.
///
/// A node reachable along several paths is emitted once per path. The caller
/// must guarantee the graph is acyclic: on a cycle this iterator is infinite.
pub fn recursive_unguarded(root: &SchemaNode) -> Recursive {
    Recursive::new(root, false)
}

/// Iterator returned by [`shallow`].
#[derive(Debug)]
pub struct Shallow {
    root: SchemaNode,
    pending: Option<std::vec::IntoIter<SchemaNode>>,
}

impl Iterator for Shallow {
    type Item = SchemaNode;

    fn next(&mut self) -> Option<SchemaNode> {
        let root = &self.root;
        self.pending
            .get_or_insert_with(|| children(root).into_iter())
            .next()
    }
}

/// Iterator returned by [`recursive`] and [`recursive_unguarded`].
#[derive(Debug)]
pub struct Recursive {
    start: Option<SchemaNode>,
    expand: Option<SchemaNode>,
    stack: Vec<std::vec::IntoIter<SchemaNode>>,
    // Holding the handles keeps every visited allocation alive, so an
    // address cannot be reused by a new node during the walk.
    visited: Option<HashMap<NodeId, SchemaNode>>,
}

impl Recursive {
    fn new(root: &SchemaNode, guarded: bool) -> Self {
        Self {
            start: Some(root.clone()),
            expand: None,
            stack: Vec::new(),
            visited: guarded.then(HashMap::new),
        }
    }
}

impl Iterator for Recursive {
    type Item = SchemaNode;

    fn next(&mut self) -> Option<SchemaNode> {
        if let Some(parent) = self.expand.take() {
            self.stack.push(children(&parent).into_iter());
        }
        loop {
            let node = match self.start.take() {
                Some(root) => root,
                None => {
                    let frame = self.stack.last_mut()?;
                    match frame.next() {
                        Some(node) => node,
                        None => {
                            self.stack.pop();
                            continue;
                        }
                    }
                }
            };
            if let Some(visited) = self.visited.as_mut() {
                if visited.contains_key(&node.id()) {
                    continue;
                }
                visited.insert(node.id(), node.clone());
            }
            self.expand = Some(node.clone());
            return Some(node);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn node(value: serde_json::Value) -> SchemaNode {
        SchemaNode::from_json(value).unwrap()
    }

    fn titles(nodes: impl Iterator<Item = SchemaNode>) -> Vec<String> {
        nodes
            .map(|n| n.get_str("title").unwrap_or_else(|| "?".into()))
            .collect()
    }

    #[test]
    fn test_shallow_key_class_order() {
        let root = node(json!({
            "title": "root",
            "properties": {"p1": {"title": "p1"}, "p2": {"title": "p2"}},
            "allOf": [{"title": "all0"}, {"title": "all1"}],
            "not": {"title": "not"},
            "items": [{"title": "item0"}],
            "additionalProperties": {"title": "addl"},
            "definitions": {"d": {"title": "def"}}
        }));
        assert_eq!(
            titles(shallow(&root)),
            vec!["addl", "not", "item0", "all0", "all1", "def", "p1", "p2"]
        );
    }

    #[test]
    fn test_shallow_skips_non_node_values() {
        let root = node(json!({
            "additionalProperties": false,
            "items": {"title": "only"},
            "anyOf": [1, "x", {"title": "any"}],
            "dependencies": {"a": ["b"], "c": {"title": "dep"}}
        }));
        assert_eq!(titles(shallow(&root)), vec!["only", "any", "dep"]);
    }

    #[test]
    fn test_shallow_is_restartable() {
        let root = node(json!({"oneOf": [{"title": "a"}, {"title": "b"}]}));
        let first: Vec<_> = shallow(&root).map(|n| n.id()).collect();
        let second: Vec<_> = shallow(&root).map(|n| n.id()).collect();
        assert_eq!(first.len(), 2);
        assert_eq!(first, second);
    }

    #[test]
    fn test_recursive_is_pre_order() {
        let root = node(json!({
            "title": "root",
            "properties": {
                "a": {"title": "a", "items": {"title": "a.items"}},
                "b": {"title": "b"}
            },
            "not": {"title": "not"}
        }));
        assert_eq!(
            titles(recursive(&root)),
            vec!["root", "not", "a", "a.items", "b"]
        );
        assert_eq!(
            titles(recursive_unguarded(&root)),
            vec!["root", "not", "a", "a.items", "b"]
        );
    }

    #[test]
    fn test_recursive_terminates_on_cycle() {
        let root = node(json!({"title": "root"}));
        let child = node(json!({"title": "child"}));
        let root_props = SchemaNode::new();
        root_props.insert("child", child.clone());
        root.insert("properties", root_props);
        let child_props = SchemaNode::new();
        child_props.insert("back", root.clone());
        child_props.insert("me", child.clone());
        child.insert("properties", child_props);

        assert_eq!(titles(recursive(&root)), vec!["root", "child"]);
    }

    #[test]
    fn test_recursive_emits_shared_node_once() {
        let shared = node(json!({"title": "shared"}));
        let root = node(json!({"title": "root"}));
        root.insert(
            "allOf",
            vec![SchemaValue::from(shared.clone()), SchemaValue::from(shared)],
        );

        assert_eq!(titles(recursive(&root)), vec!["root", "shared"]);
        assert_eq!(
            titles(recursive_unguarded(&root)),
            vec!["root", "shared", "shared"]
        );
    }

    #[test]
    fn test_structurally_equal_nodes_are_both_visited() {
        let root = node(json!({
            "title": "root",
            "anyOf": [{"title": "same"}, {"title": "same"}]
        }));
        assert_eq!(titles(recursive(&root)), vec!["root", "same", "same"]);
    }

    #[test]
    fn test_recursive_sees_mutation_of_yielded_node() {
        let root = node(json!({"title": "root"}));
        let mut walk = recursive(&root);
        let first = walk.next().unwrap();
        first.insert("not", node(json!({"title": "added"})));
        assert_eq!(titles(walk), vec!["added"]);
    }

    #[test]
    fn test_unguarded_on_cycle_keeps_going() {
        let root = node(json!({"title": "root"}));
        root.insert("not", root.clone());
        assert_eq!(recursive_unguarded(&root).take(50).count(), 50);
        assert_eq!(recursive(&root).count(), 1);
    }
}
