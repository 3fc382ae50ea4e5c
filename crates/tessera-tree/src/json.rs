//! Bridge between state trees and `serde_json` values.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::{TreeError, TreeResult};
use crate::node::{Mapping, Node, NodeId};

impl Node {
    /// Build a tree from a JSON value. Every container is fresh, so the
    /// result has no sharing.
    pub fn from_json(value: &Value) -> Node {
        match value {
            Value::Null => Node::Null,
            Value::Bool(b) => Node::Bool(*b),
            Value::Number(n) => Node::Number(n.clone()),
            Value::String(s) => Node::String(s.clone()),
            Value::Array(items) => Node::sequence(items.iter().map(Node::from_json)),
            Value::Object(fields) => Node::mapping(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), Node::from_json(v)))
                    .collect::<Mapping>(),
            ),
        }
    }

    /// Parse a JSON document into a tree.
    pub fn from_json_str(s: &str) -> TreeResult<Node> {
        let value: Value = serde_json::from_str(s)?;
        Ok(Node::from_json(&value))
    }

    /// Convert the tree to a JSON value.
    ///
    /// Shared subgraphs are written out once per position. Fails with
    /// [`TreeError::Cycle`] if a container is reachable from itself.
    pub fn to_json(&self) -> TreeResult<Value> {
        let mut path = Vec::new();
        to_value(self, &mut path, "$")
    }
}

fn to_value(node: &Node, ancestors: &mut Vec<NodeId>, at: &str) -> TreeResult<Value> {
    if let Some(id) = node.id() {
        if ancestors.contains(&id) {
            return Err(TreeError::Cycle {
                path: at.to_string(),
            });
        }
    }

    let value = match node {
        Node::Null => Value::Null,
        Node::Bool(b) => Value::Bool(*b),
        Node::Number(n) => Value::Number(n.clone()),
        Node::String(s) => Value::String(s.clone()),
        Node::Sequence(s) => {
            ancestors.push(s.id());
            let items: Vec<Node> = s.read().clone();
            let mut out = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                out.push(to_value(item, ancestors, &format!("{at}[{i}]"))?);
            }
            ancestors.pop();
            Value::Array(out)
        }
        Node::Mapping(m) => {
            ancestors.push(m.id());
            let entries: Vec<(String, Node)> = m
                .read()
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            let mut out = serde_json::Map::new();
            for (key, item) in entries {
                let child = to_value(&item, ancestors, &format!("{at}.{key}"))?;
                out.insert(key, child);
            }
            ancestors.pop();
            Value::Object(out)
        }
    };
    Ok(value)
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json()
            .map_err(serde::ser::Error::custom)?
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Node {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(|v| Node::from_json(&v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_roundtrip() {
        let value = json!({
            "name": "launch",
            "count": 3,
            "ratio": 0.5,
            "tags": ["a", "b"],
            "nested": {"deep": [null, true]}
        });
        let tree = Node::from_json(&value);
        assert_eq!(tree.to_json().unwrap(), value);
    }

    #[test]
    fn shared_subgraph_is_duplicated() {
        let shared = Node::from_json(&json!({"x": 1}));
        let tree = Node::mapping([("a", shared.clone()), ("b", shared)]);
        assert_eq!(tree.to_json().unwrap(), json!({"a": {"x": 1}, "b": {"x": 1}}));
    }

    #[test]
    fn cycle_is_reported_with_path() {
        let tree = Node::from_json(&json!({"pages": [{"title": "p1"}]}));
        let page = tree.get("pages").unwrap().at(0).unwrap();
        page.insert("parent", tree.clone());

        let err = tree.to_json().unwrap_err();
        match err {
            TreeError::Cycle { path } => assert_eq!(path, "$.pages[0].parent"),
            other => panic!("unexpected error: {other}"),
        }
        page.insert("parent", Node::Null);
    }

    #[test]
    fn serde_traits() {
        let tree: Node = serde_json::from_str(r#"{"a":[1,"two"]}"#).unwrap();
        let text = serde_json::to_string(&tree).unwrap();
        assert_eq!(text, r#"{"a":[1,"two"]}"#);
    }

    #[test]
    fn serialize_fails_on_cycle() {
        let tree = Node::mapping([("k", Node::Null)]);
        tree.insert("loop", tree.clone());
        assert!(serde_json::to_string(&tree).is_err());
        tree.insert("loop", Node::Null);
    }

    #[test]
    fn from_json_str_reports_parse_errors() {
        assert!(matches!(Node::from_json_str("{not json"), Err(TreeError::Json(_))));
        assert!(Node::from_json_str("[]").unwrap().is_empty());
    }
}
