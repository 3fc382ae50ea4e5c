use std::collections::HashSet;

use crate::node::Node;
use crate::traverse::traverse;

/// Distinct string leaves matching `predicate`, in first-seen order.
///
/// Deduplication is by value, independent of how many positions hold the
/// string.
pub fn collect_strings<P>(node: &Node, mut predicate: P) -> Vec<String>
where
    P: FnMut(&str) -> bool,
{
    let mut seen = HashSet::new();
    let mut found = Vec::new();
    traverse(node, |_key, value, _owner| {
        if let Some(s) = value.as_str() {
            if predicate(s) && seen.insert(s.to_string()) {
                found.push(s.to_string());
            }
        }
    });
    found
}
