//! The value tree.
//!
//! A [`Node`] is one configuration document: scalars, lists and
//! insertion-ordered objects. Three extra variants only exist before
//! resolution: substitutions, concatenations and delayed merges.

use super::path::Path;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use std::fmt;

/// An integer or decimal number.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Int(n) => n as f64,
            Number::Float(n) => n,
        }
    }

    /// The integer value, if this number has no fractional part and fits.
    pub fn as_i64(self) -> Option<i64> {
        match self {
            Number::Int(n) => Some(n),
            Number::Float(n) if n.fract() == 0.0 && n >= i64::MIN as f64 && n < i64::MAX as f64 => {
                Some(n as i64)
            }
            Number::Float(_) => None,
        }
    }

    /// Parse the textual form used by config files and environment values.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if let Ok(n) = text.parse::<i64>() {
            return Some(Number::Int(n));
        }
        match text.parse::<f64>() {
            Ok(n) if n.is_finite() => Some(Number::Float(n)),
            _ => None,
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(n) => write!(f, "{}", n),
            Number::Float(n) => write!(f, "{:?}", n),
        }
    }
}

/// A reference to another path, written `${path}` or `${?path}`.
#[derive(Debug, Clone, PartialEq)]
pub struct Substitution {
    pub path: Path,
    /// Resolve to absence instead of failing when the target is missing.
    pub optional: bool,
    /// Index of the layer this marker came from, counted from the
    /// lowest-priority layer. Stamped by the merger.
    pub layer: usize,
}

impl fmt::Display for Substitution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.optional {
            write!(f, "${{?{}}}", self.path)
        } else {
            write!(f, "${{{}}}", self.path)
        }
    }
}

/// Insertion-ordered mapping of keys to nodes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Object {
    entries: Vec<(String, Node)>,
}

impl Object {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Node> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Insert or replace. A replaced key keeps its original position.
    pub fn insert(&mut self, key: impl Into<String>, value: Node) -> Option<Node> {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<Node> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Node)> for Object {
    fn from_iter<I: IntoIterator<Item = (K, Node)>>(iter: I) -> Self {
        let mut object = Object::new();
        for (key, value) in iter {
            object.insert(key, value);
        }
        object
    }
}

impl IntoIterator for Object {
    type Item = (String, Node);
    type IntoIter = std::vec::IntoIter<(String, Node)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// A node of the value tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    List(Vec<Node>),
    Object(Object),
    /// Unresolved reference to another path.
    Substitution(Substitution),
    /// Adjacent values joined into one (strings, lists or objects).
    Concat(Vec<Node>),
    /// Delayed merge, lowest priority first.
    Merge(Vec<Node>),
}

/// The kind of a node, used in type errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Null,
    Bool,
    Number,
    String,
    List,
    Object,
    Unresolved,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::Null => "null",
            NodeKind::Bool => "boolean",
            NodeKind::Number => "number",
            NodeKind::String => "string",
            NodeKind::List => "list",
            NodeKind::Object => "object",
            NodeKind::Unresolved => "unresolved substitution",
        };
        f.write_str(name)
    }
}

impl Node {
    pub fn string(s: impl Into<String>) -> Self {
        Node::String(s.into())
    }

    pub fn int(n: i64) -> Self {
        Node::Number(Number::Int(n))
    }

    pub fn float(n: f64) -> Self {
        Node::Number(Number::Float(n))
    }

    pub fn list(items: impl IntoIterator<Item = Node>) -> Self {
        Node::List(items.into_iter().collect())
    }

    pub fn object() -> Self {
        Node::Object(Object::new())
    }

    pub fn object_from<K: Into<String>>(entries: impl IntoIterator<Item = (K, Node)>) -> Self {
        Node::Object(entries.into_iter().collect())
    }

    #[cfg(test)]
    pub(crate) fn subst(path: &str) -> Self {
        Node::substitution(Path::parse(path).unwrap(), false)
    }

    #[cfg(test)]
    pub(crate) fn optional_subst(path: &str) -> Self {
        Node::substitution(Path::parse(path).unwrap(), true)
    }

    pub fn substitution(path: Path, optional: bool) -> Self {
        Node::Substitution(Substitution {
            path,
            optional,
            layer: 0,
        })
    }

    pub fn concat(parts: impl IntoIterator<Item = Node>) -> Self {
        Node::Concat(parts.into_iter().collect())
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Null => NodeKind::Null,
            Node::Bool(_) => NodeKind::Bool,
            Node::Number(_) => NodeKind::Number,
            Node::String(_) => NodeKind::String,
            Node::List(_) => NodeKind::List,
            Node::Object(_) => NodeKind::Object,
            Node::Substitution(_) | Node::Concat(_) | Node::Merge(_) => NodeKind::Unresolved,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Node::Null)
    }

    /// True for substitutions, concatenations and delayed merges.
    pub fn is_unresolved(&self) -> bool {
        self.kind() == NodeKind::Unresolved
    }

    /// True if neither this node nor any descendant is unresolved.
    pub fn is_resolved(&self) -> bool {
        match self {
            Node::List(items) => items.iter().all(Node::is_resolved),
            Node::Object(object) => object.iter().all(|(_, v)| v.is_resolved()),
            other => !other.is_unresolved(),
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Node::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Node::String(s) => Some(s),
            _ => None,
        }
    }

    /// Walk `path` one object key at a time. Absence is returned both for a
    /// missing key and for a non-object intermediate node.
    pub fn get(&self, path: &Path) -> Option<&Node> {
        self.get_segments(path.segments())
    }

    pub(crate) fn get_segments(&self, segments: &[String]) -> Option<&Node> {
        let mut current = self;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    /// Scalar text as used by string reads and string concatenation.
    pub(crate) fn scalar_text(&self) -> Option<String> {
        match self {
            Node::Bool(b) => Some(b.to_string()),
            Node::Number(n) => Some(n.to_string()),
            Node::String(s) => Some(s.clone()),
            _ => None,
        }
    }

    /// Apply `f` to every substitution in the tree.
    pub(crate) fn for_each_substitution_mut(&mut self, f: &mut impl FnMut(&mut Substitution)) {
        match self {
            Node::Substitution(subst) => f(subst),
            Node::List(items) | Node::Concat(items) | Node::Merge(items) => {
                for item in items {
                    item.for_each_substitution_mut(f);
                }
            }
            Node::Object(object) => {
                for (_, value) in object.entries.iter_mut() {
                    value.for_each_substitution_mut(f);
                }
            }
            _ => {}
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Null => f.write_str("null"),
            Node::Bool(b) => write!(f, "{}", b),
            Node::Number(n) => write!(f, "{}", n),
            Node::String(s) => f.write_str(s),
            Node::Substitution(subst) => write!(f, "{}", subst),
            Node::Concat(parts) => {
                for part in parts {
                    write!(f, "{}", part)?;
                }
                Ok(())
            }
            other => match serde_json::to_string(other) {
                Ok(json) => f.write_str(&json),
                Err(_) => Err(fmt::Error),
            },
        }
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
        Node::int(n)
    }
}

impl From<f64> for Node {
    fn from(n: f64) -> Self {
        Node::float(n)
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Node::Null => serializer.serialize_unit(),
            Node::Bool(b) => serializer.serialize_bool(*b),
            Node::Number(Number::Int(n)) => serializer.serialize_i64(*n),
            Node::Number(Number::Float(n)) => serializer.serialize_f64(*n),
            Node::String(s) => serializer.serialize_str(s),
            Node::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Node::Object(object) => {
                let mut map = serializer.serialize_map(Some(object.len()))?;
                for (key, value) in object.iter() {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
            Node::Substitution(subst) => serializer.collect_str(subst),
            Node::Concat(_) => serializer.collect_str(self),
            Node::Merge(parts) => {
                let mut seq = serializer.serialize_seq(Some(parts.len()))?;
                for part in parts {
                    seq.serialize_element(part)?;
                }
                seq.end()
            }
        }
    }
}
