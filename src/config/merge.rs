//! Deep merge of configuration layers.
//!
//! Implements key-by-key merging where higher priority values override lower
//! priority values. Lists are replaced entirely, not concatenated. A `null`
//! in a higher layer hides the lower value.

use super::value::Node;
use tracing::debug;

/// One source document with a human-readable origin (file name, tier...).
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub origin: String,
    pub root: Node,
}

impl Layer {
    pub fn new(origin: impl Into<String>, root: Node) -> Self {
        Self {
            origin: origin.into(),
            root,
        }
    }
}

/// Result of merging a stack of layers.
///
/// Besides the merged document it keeps every layer's own tree, lowest
/// priority first, so that resolution can look "below" a given layer.
#[derive(Debug, Clone)]
pub struct MergedTree {
    pub root: Node,
    pub(crate) layers: Vec<Node>,
}

impl MergedTree {
    /// Number of layers that went into this tree.
    pub fn depth(&self) -> usize {
        self.layers.len()
    }

    /// The merge of the lowest `count` layers.
    pub(crate) fn view(&self, count: usize) -> Node {
        deep_merge_all(self.layers[..count].iter().cloned())
    }
}

/// Deep merge two nodes, with `overlay` taking precedence over `base`.
///
/// - Objects are merged recursively: keys in overlay override keys in base
/// - An object meeting an unresolved value (or two unresolved values) becomes
///   a delayed [`Node::Merge`], finished during resolution
/// - Lists, strings, numbers, booleans and nulls are replaced entirely
///
/// # Example
/// ```
/// use layerconf::config::{Node, deep_merge};
///
/// let base = Node::object_from([
///     ("server", Node::object_from([("port", Node::int(8080)), ("host", Node::from("localhost"))])),
///     ("features", Node::list([Node::from("a"), Node::from("b")])),
/// ]);
/// let overlay = Node::object_from([
///     ("server", Node::object_from([("port", Node::int(9000))])),
///     ("features", Node::list([Node::from("c")])),
/// ]);
/// let merged = deep_merge(base, overlay);
/// // { "server": { "port": 9000, "host": "localhost" }, "features": ["c"] }
/// assert_eq!(merged.to_string(), r#"{"server":{"port":9000,"host":"localhost"},"features":["c"]}"#);
/// ```
pub fn deep_merge(base: Node, overlay: Node) -> Node {
    match (base, overlay) {
        // Both are objects: merge recursively
        (Node::Object(mut base_map), Node::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let merged_value = if let Some(base_value) = base_map.get(&key) {
                    deep_merge(base_value.clone(), overlay_value)
                } else {
                    overlay_value
                };
                base_map.insert(key, merged_value);
            }
            Node::Object(base_map)
        }
        // Object and unresolved: defer until the unresolved side is known
        (base, overlay) if mergeable(&base) && mergeable(&overlay) => {
            let mut parts = stack(base);
            parts.extend(stack(overlay));
            Node::Merge(parts)
        }
        // Any other case: overlay replaces base entirely
        (_, overlay) => overlay,
    }
}

fn mergeable(node: &Node) -> bool {
    matches!(node, Node::Object(_)) || node.is_unresolved()
}

fn stack(node: Node) -> Vec<Node> {
    match node {
        Node::Merge(parts) => parts,
        other => vec![other],
    }
}

/// Merge multiple nodes in order, with later nodes taking precedence.
///
/// Equivalent to folding `deep_merge` over the list.
pub fn deep_merge_all(nodes: impl IntoIterator<Item = Node>) -> Node {
    nodes
        .into_iter()
        .reduce(deep_merge)
        .unwrap_or_else(Node::object)
}

/// Merge layers given highest priority first (index 0 wins).
///
/// Every substitution is stamped with the index of the layer it came from,
/// counted from the lowest-priority layer.
pub fn merge_layers(layers: Vec<Layer>) -> MergedTree {
    let count = layers.len();
    let mut stamped = Vec::with_capacity(count);

    for (index, layer) in layers.into_iter().rev().enumerate() {
        debug!(origin = %layer.origin, priority = count - index, "Merging config layer");
        let mut root = layer.root;
        root.for_each_substitution_mut(&mut |subst| subst.layer = index);
        stamped.push(root);
    }

    let root = deep_merge_all(stamped.iter().cloned());
    MergedTree {
        root,
        layers: stamped,
    }
}
