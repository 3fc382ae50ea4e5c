use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Key-ordered mapping contents.
pub type Mapping = BTreeMap<String, Node>;

/// Ordered sequence contents.
pub type Sequence = Vec<Node>;

/// Identity of a container node: the address of its shared allocation.
///
/// Only meaningful while the container is alive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Shared, lockable container handle.
///
/// Cloning a `Shared` clones the handle, not the contents.
pub struct Shared<T>(Arc<RwLock<T>>);

impl<T> Shared<T> {
    pub fn new(value: T) -> Self {
        Self(Arc::new(RwLock::new(value)))
    }

    pub fn read(&self) -> RwLockReadGuard<'_, T> {
        self.0.read().expect("tree lock poisoned")
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, T> {
        self.0.write().expect("tree lock poisoned")
    }

    pub fn id(&self) -> NodeId {
        NodeId(Arc::as_ptr(&self.0) as *const () as usize)
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl<T> Clone for Shared<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

/// A node of a state tree.
///
/// Leaves are owned values. Containers are [`Shared`] handles, so cloning a
/// `Node` that is a container yields another handle to the same container.
#[derive(Clone)]
pub enum Node {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    Sequence(Shared<Sequence>),
    Mapping(Shared<Mapping>),
}

impl Node {
    /// A new mapping node from key/value pairs.
    pub fn mapping<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Node)>,
    {
        Node::Mapping(Shared::new(
            entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        ))
    }

    /// A new sequence node.
    pub fn sequence<I: IntoIterator<Item = Node>>(items: I) -> Self {
        Node::Sequence(Shared::new(items.into_iter().collect()))
    }

    pub fn string(s: impl Into<String>) -> Self {
        Node::String(s.into())
    }

    pub fn is_container(&self) -> bool {
        matches!(self, Node::Sequence(_) | Node::Mapping(_))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Node::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Node::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Node::Number(n) => n.as_u64(),
            _ => None,
        }
    }

    /// Identity of a container node; `None` for leaves.
    pub fn id(&self) -> Option<NodeId> {
        match self {
            Node::Sequence(s) => Some(s.id()),
            Node::Mapping(m) => Some(m.id()),
            _ => None,
        }
    }

    /// Whether two nodes are the same container. Leaves are never identical.
    pub fn ptr_eq(&self, other: &Node) -> bool {
        match (self, other) {
            (Node::Sequence(a), Node::Sequence(b)) => a.ptr_eq(b),
            (Node::Mapping(a), Node::Mapping(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    /// Number of direct children of a container; 0 for leaves.
    pub fn len(&self) -> usize {
        match self {
            Node::Sequence(s) => s.read().len(),
            Node::Mapping(m) => m.read().len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A field of a mapping node (cloned handle or leaf).
    pub fn get(&self, field: &str) -> Option<Node> {
        match self {
            Node::Mapping(m) => m.read().get(field).cloned(),
            _ => None,
        }
    }

    /// An element of a sequence node.
    pub fn at(&self, index: usize) -> Option<Node> {
        match self {
            Node::Sequence(s) => s.read().get(index).cloned(),
            _ => None,
        }
    }

    /// Insert or replace a mapping field. Returns `false` if this node is not
    /// a mapping.
    pub fn insert(&self, field: impl Into<String>, value: Node) -> bool {
        match self {
            Node::Mapping(m) => {
                m.write().insert(field.into(), value);
                true
            }
            _ => false,
        }
    }

    /// Append to a sequence node. Returns `false` if this node is not a
    /// sequence.
    pub fn push(&self, value: Node) -> bool {
        match self {
            Node::Sequence(s) => {
                s.write().push(value);
                true
            }
            _ => false,
        }
    }

    /// Copy the whole tree into fresh containers.
    ///
    /// Sharing and cycles of the source are reproduced in the copy: a
    /// container reachable from two places in `self` is a single container
    /// in the result, reachable from the same two places.
    pub fn deep_copy(&self) -> Node {
        let mut memo = HashMap::new();
        copy_node(self, &mut memo)
    }
}

fn copy_node(node: &Node, memo: &mut HashMap<NodeId, Node>) -> Node {
    match node {
        Node::Mapping(source) => {
            if let Some(copy) = memo.get(&source.id()) {
                return copy.clone();
            }
            let fresh = Shared::new(Mapping::new());
            memo.insert(source.id(), Node::Mapping(fresh.clone()));
            let entries: Vec<(String, Node)> = source
                .read()
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            for (key, value) in entries {
                let copied = copy_node(&value, memo);
                fresh.write().insert(key, copied);
            }
            Node::Mapping(fresh)
        }
        Node::Sequence(source) => {
            if let Some(copy) = memo.get(&source.id()) {
                return copy.clone();
            }
            let fresh = Shared::new(Sequence::new());
            memo.insert(source.id(), Node::Sequence(fresh.clone()));
            let items: Vec<Node> = source.read().clone();
            for item in items {
                let copied = copy_node(&item, memo);
                fresh.write().push(copied);
            }
            Node::Sequence(fresh)
        }
        leaf => leaf.clone(),
    }
}

impl fmt::Debug for Node {
    // Containers print shallowly; a recursive print would not terminate on
    // cyclic trees.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Null => f.write_str("Null"),
            Node::Bool(b) => write!(f, "Bool({b})"),
            Node::Number(n) => write!(f, "Number({n})"),
            Node::String(s) => write!(f, "String({s:?})"),
            Node::Sequence(s) => write!(f, "Sequence(len={})", s.read().len()),
            Node::Mapping(m) => {
                let keys: Vec<String> = m.read().keys().cloned().collect();
                write!(f, "Mapping({keys:?})")
            }
        }
    }
}

impl Default for Node {
    fn default() -> Self {
        Node::Null
    }
}

impl From<&str> for Node {
    fn from(s: &str) -> Self {
        Node::String(s.to_string())
    }
}

impl From<String> for Node {
    fn from(s: String) -> Self {
        Node::String(s)
    }
}

impl From<bool> for Node {
    fn from(b: bool) -> Self {
        Node::Bool(b)
    }
}

impl From<i64> for Node {
    fn from(n: i64) -> Self {
        Node::Number(n.into())
    }
}

impl From<u64> for Node {
    fn from(n: u64) -> Self {
        Node::Number(n.into())
    }
}
