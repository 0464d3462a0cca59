//! Hierarchical fact namespace
//!
//! Facts are folded into nested mappings keyed by path segment. A node is
//! either a subtree or a value, never both: the latest write decides.

use std::collections::BTreeMap;
use std::collections::btree_map;

use serde::Serialize;

use crate::fact::{Fact, FactValue};

/// One entry of the namespace
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Node {
    /// Concrete fact value
    Leaf(FactValue),
    /// Grouping of further entries
    Branch(Namespace),
}

impl Node {
    /// Turn this node into a subtree if it is a leaf
    ///
    /// Returns the subtree and the value it replaced, if any.
    fn make_branch(&mut self) -> (&mut Namespace, Option<FactValue>) {
        match self {
            Node::Branch(child) => (child, None),
            Node::Leaf(_) => {
                let previous = std::mem::replace(self, Node::Branch(Namespace::new()));
                let (child, _) = self.make_branch();
                (child, previous.into_leaf())
            }
        }
    }

    fn into_leaf(self) -> Option<FactValue> {
        match self {
            Node::Leaf(value) => Some(value),
            Node::Branch(_) => None,
        }
    }

    #[must_use]
    pub fn as_leaf(&self) -> Option<&FactValue> {
        match self {
            Node::Leaf(value) => Some(value),
            Node::Branch(_) => None,
        }
    }

    #[must_use]
    pub fn as_branch(&self) -> Option<&Namespace> {
        match self {
            Node::Branch(child) => Some(child),
            Node::Leaf(_) => None,
        }
    }
}

/// What an insertion overwrote
#[derive(Debug, Clone, PartialEq)]
pub enum Displaced {
    /// A previous value at the same path
    Value {
        /// Dotted path of the overwritten value
        path: String,
        /// The old value
        previous: FactValue,
    },
    /// A value sitting where a subtree was needed
    Leaf {
        /// Dotted path of the value turned into a subtree
        path: String,
        /// The old value
        previous: FactValue,
    },
    /// A whole subtree replaced by a value
    Subtree {
        /// Dotted path of the subtree
        path: String,
        /// Number of values the subtree held
        leaves: usize,
    },
}

impl Displaced {
    /// Whether the insertion changed the shape of the tree
    #[must_use]
    pub fn is_structural(&self) -> bool {
        !matches!(self, Displaced::Value { .. })
    }

    /// Dotted path where the displacement happened
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Displaced::Value { path, .. }
            | Displaced::Leaf { path, .. }
            | Displaced::Subtree { path, .. } => path,
        }
    }
}

/// Tree of facts, keys sorted
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Namespace {
    entries: BTreeMap<String, Node>,
}

impl Namespace {
    /// Create an empty namespace
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `value` at `path`, last write wins
    ///
    /// Intermediate leaves are replaced by subtrees; whatever lives at the
    /// terminal segment is overwritten. An empty path is ignored.
    pub fn insert(&mut self, path: &[String], value: FactValue) -> Option<Displaced> {
        let (last, parents) = path.split_last()?;

        let mut node = self;
        let mut displaced = None;
        for (depth, segment) in parents.iter().enumerate() {
            let entry = node
                .entries
                .entry(segment.clone())
                .or_insert_with(|| Node::Branch(Namespace::new()));
            let (child, replaced) = entry.make_branch();
            if let Some(previous) = replaced {
                displaced = Some(Displaced::Leaf {
                    path: path[..=depth].join("."),
                    previous,
                });
            }
            node = child;
        }

        match node.entries.insert(last.clone(), Node::Leaf(value)) {
            Some(Node::Leaf(previous)) => Some(Displaced::Value {
                path: path.join("."),
                previous,
            }),
            Some(Node::Branch(subtree)) => Some(Displaced::Subtree {
                path: path.join("."),
                leaves: subtree.leaf_count(),
            }),
            None => displaced,
        }
    }

    /// Move a fact into the namespace
    ///
    /// Sentinels and facts without a value are ignored.
    pub fn insert_fact(&mut self, fact: Fact) -> Option<Displaced> {
        let (path, value) = fact.into_parts();
        self.insert(&path, value?)
    }

    /// Look up the node at `path`
    #[must_use]
    pub fn get<S: AsRef<str>>(&self, path: &[S]) -> Option<&Node> {
        let (first, rest) = path.split_first()?;
        let mut node = self.entries.get(first.as_ref())?;
        for segment in rest {
            node = node.as_branch()?.entries.get(segment.as_ref())?;
        }
        Some(node)
    }

    /// Look up the value at `path`
    #[must_use]
    pub fn value<S: AsRef<str>>(&self, path: &[S]) -> Option<&FactValue> {
        self.get(path).and_then(Node::as_leaf)
    }

    /// Number of direct children
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Direct children in key order
    pub fn iter(&self) -> btree_map::Iter<'_, String, Node> {
        self.entries.iter()
    }

    /// Total number of values in the tree
    #[must_use]
    pub fn leaf_count(&self) -> usize {
        self.entries
            .values()
            .map(|node| match node {
                Node::Leaf(_) => 1,
                Node::Branch(child) => child.leaf_count(),
            })
            .sum()
    }

    /// All values with their dotted paths, in key order
    #[must_use]
    pub fn leaves(&self) -> Vec<(String, &FactValue)> {
        let mut out = Vec::new();
        self.collect_leaves(&mut Vec::new(), &mut out);
        out
    }

    fn collect_leaves<'a>(
        &'a self,
        prefix: &mut Vec<&'a str>,
        out: &mut Vec<(String, &'a FactValue)>,
    ) {
        for (key, node) in &self.entries {
            prefix.push(key);
            match node {
                Node::Leaf(value) => out.push((prefix.join("."), value)),
                Node::Branch(child) => child.collect_leaves(prefix, out),
            }
            prefix.pop();
        }
    }
}

impl<'a> IntoIterator for &'a Namespace {
    type Item = (&'a String, &'a Node);
    type IntoIter = btree_map::Iter<'a, String, Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
