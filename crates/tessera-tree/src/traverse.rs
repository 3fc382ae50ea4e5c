//! Cycle-safe, pre-order, in-place traversal.

use std::collections::HashMap;
use std::fmt;

use crate::node::{Node, NodeId};

/// Position of a value inside its owning container.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key<'a> {
    Index(usize),
    Field(&'a str),
}

impl Key<'_> {
    pub fn as_field(&self) -> Option<&str> {
        match self {
            Key::Field(name) => Some(name),
            Key::Index(_) => None,
        }
    }
}

impl fmt::Display for Key<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Index(i) => write!(f, "[{i}]"),
            Key::Field(name) => write!(f, ".{name}"),
        }
    }
}

/// The container that directly holds the value being visited.
///
/// Each accessor takes the container's lock only for its own duration, so a
/// visitor may read the visited value (which can be the owner itself in a
/// cyclic tree) without deadlocking.
pub struct Owner<'a> {
    node: &'a Node,
}

impl<'a> Owner<'a> {
    /// The owning container node.
    pub fn node(&self) -> &'a Node {
        self.node
    }

    pub fn is_mapping(&self) -> bool {
        matches!(self.node, Node::Mapping(_))
    }

    /// Current value at `key`.
    pub fn get(&self, key: Key<'_>) -> Option<Node> {
        match (self.node, key) {
            (Node::Mapping(m), Key::Field(name)) => m.read().get(name).cloned(),
            (Node::Sequence(s), Key::Index(i)) => s.read().get(i).cloned(),
            _ => None,
        }
    }

    /// Current value of a mapping field.
    pub fn field(&self, name: &str) -> Option<Node> {
        self.get(Key::Field(name))
    }

    /// Replace the value at an existing `key`. Returns `false` if the key is
    /// absent or does not match the container kind.
    pub fn set(&self, key: Key<'_>, value: Node) -> bool {
        match (self.node, key) {
            (Node::Mapping(m), Key::Field(name)) => match m.write().get_mut(name) {
                Some(slot) => {
                    *slot = value;
                    true
                }
                None => false,
            },
            (Node::Sequence(s), Key::Index(i)) => match s.write().get_mut(i) {
                Some(slot) => {
                    *slot = value;
                    true
                }
                None => false,
            },
            _ => false,
        }
    }

    /// Insert or replace a field on a mapping owner. Returns `false` for
    /// sequence owners.
    pub fn set_field(&self, name: &str, value: Node) -> bool {
        self.node.insert(name, value)
    }
}

/// Walk `node`, invoking `visitor(key, value, owner)` for every key/value
/// pair found.
///
/// The visitor sees a value before the walker descends into it. If the
/// visitor replaces `owner[key]`, the walker descends into the replacement.
/// Mapping keys are snapshotted when the walker enters a mapping; fields
/// added by the visitor are not visited, removed ones are skipped.
///
/// Every container is entered at most once, so shared subgraphs are walked
/// once and cycles terminate. A leaf `node` produces no visits.
pub fn traverse<F>(node: &Node, mut visitor: F)
where
    F: FnMut(Key<'_>, &Node, &Owner<'_>),
{
    let mut seen: HashMap<NodeId, Node> = HashMap::new();
    walk(node, &mut visitor, &mut seen);
}

fn walk<F>(node: &Node, visitor: &mut F, seen: &mut HashMap<NodeId, Node>)
where
    F: FnMut(Key<'_>, &Node, &Owner<'_>),
{
    let Some(id) = node.id() else {
        return;
    };
    // The seen map keeps each entered container alive for the whole walk, so
    // an address can never be recycled by a container created mid-walk.
    if seen.insert(id, node.clone()).is_some() {
        return;
    }
    let owner = Owner { node };

    match node {
        Node::Mapping(m) => {
            let keys: Vec<String> = m.read().keys().cloned().collect();
            for name in &keys {
                let key = Key::Field(name);
                let Some(value) = owner.get(key) else {
                    continue;
                };
                visitor(key, &value, &owner);
                if let Some(next) = owner.get(key) {
                    walk(&next, visitor, seen);
                }
            }
        }
        Node::Sequence(s) => {
            let mut index = 0;
            while index < s.read().len() {
                let key = Key::Index(index);
                if let Some(value) = owner.get(key) {
                    visitor(key, &value, &owner);
                    if let Some(next) = owner.get(key) {
                        walk(&next, visitor, seen);
                    }
                }
                index += 1;
            }
        }
        _ => {}
    }
}
