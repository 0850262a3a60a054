//! Typed, fail-fast access to a resolved configuration.

use super::bean::{self, Bean, FromConfig, Shape};
use super::coerce;
use super::enums::ConfigEnum;
use super::merge::{Layer, deep_merge, merge_layers};
use super::path::Path;
use super::resolve::resolve;
use super::value::{Node, Number, Object};
use crate::error::{ConfigError, Result};
use std::sync::Arc;
use std::time::Duration;

/// Anything usable as a lookup path: `&str` expressions are parsed, a
/// [`Path`] is used as-is.
pub trait ToPath {
    fn to_path(&self) -> Result<Path>;
}

impl ToPath for str {
    fn to_path(&self) -> Result<Path> {
        Path::parse(self)
    }
}

impl ToPath for String {
    fn to_path(&self) -> Result<Path> {
        Path::parse(self)
    }
}

impl ToPath for Path {
    fn to_path(&self) -> Result<Path> {
        Ok(self.clone())
    }
}

impl<T: ToPath + ?Sized> ToPath for &T {
    fn to_path(&self) -> Result<Path> {
        (**self).to_path()
    }
}

/// Turn "missing or null" lookups into `None`.
pub trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for Result<T> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(value) => Ok(Some(value)),
            Err(ConfigError::Missing { .. } | ConfigError::NullValue { .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }
}

/// A resolved configuration. Immutable and cheap to clone.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    root: Arc<Object>,
}

impl Default for Config {
    fn default() -> Self {
        Self::empty()
    }
}

impl Config {
    pub fn empty() -> Self {
        Self {
            root: Arc::new(Object::new()),
        }
    }

    /// Merge and resolve layers given highest priority first.
    ///
    /// Resolution is eager: cycles and missing references are reported here,
    /// before any value is served.
    pub fn from_layers(layers: Vec<Layer>) -> Result<Self> {
        for layer in &layers {
            if !matches!(layer.root, Node::Object(_)) {
                return Err(ConfigError::wrong_type(
                    format!("<root of {}>", layer.origin),
                    "object",
                    layer.root.kind(),
                ));
            }
        }
        let merged = merge_layers(layers);
        let resolved = resolve(&merged)?;
        Ok(Self::from_resolved(resolved))
    }

    /// Resolve a single tree.
    pub fn from_node(root: Node) -> Result<Self> {
        Self::from_layers(vec![Layer::new("tree", root)])
    }

    fn from_resolved(root: Node) -> Self {
        match root {
            Node::Object(object) => Self::from_object(object),
            _ => Self::empty(),
        }
    }

    pub(crate) fn from_object(object: Object) -> Self {
        Self {
            root: Arc::new(object),
        }
    }

    /// The resolved root object.
    pub fn root(&self) -> &Object {
        &self.root
    }

    /// The root as a standalone node, e.g. for rendering.
    pub fn to_node(&self) -> Node {
        Node::Object((*self.root).clone())
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Merge with `fallback`, values in `self` winning.
    pub fn with_fallback(&self, fallback: &Config) -> Config {
        Self::from_resolved(deep_merge(fallback.to_node(), self.to_node()))
    }

    fn find(&self, path: &Path) -> Option<&Node> {
        let (first, rest) = path.segments().split_first()?;
        self.root.get(first)?.get_segments(rest)
    }

    /// The raw node at `path`; null included.
    pub fn get_value(&self, path: impl ToPath) -> Result<&Node> {
        let path = path.to_path()?;
        self.find(&path).ok_or_else(|| ConfigError::missing(&path))
    }

    /// True if a non-null value exists at `path`.
    pub fn has_path(&self, path: impl ToPath) -> Result<bool> {
        let path = path.to_path()?;
        Ok(self.find(&path).is_some_and(|node| !node.is_null()))
    }

    /// True if any value, null included, exists at `path`.
    pub fn has_path_or_null(&self, path: impl ToPath) -> Result<bool> {
        let path = path.to_path()?;
        Ok(self.find(&path).is_some())
    }

    fn read<T>(&self, path: impl ToPath, convert: fn(&Node, &str) -> Result<T>) -> Result<T> {
        let path = path.to_path()?;
        let node = self.find(&path).ok_or_else(|| ConfigError::missing(&path))?;
        convert(node, &path.to_string())
    }

    pub fn get_string(&self, path: impl ToPath) -> Result<String> {
        self.read(path, coerce::to_string)
    }

    pub fn get_bool(&self, path: impl ToPath) -> Result<bool> {
        self.read(path, coerce::to_bool)
    }

    pub fn get_number(&self, path: impl ToPath) -> Result<Number> {
        self.read(path, coerce::to_number)
    }

    pub fn get_i64(&self, path: impl ToPath) -> Result<i64> {
        self.read(path, coerce::to_i64)
    }

    pub fn get_i32(&self, path: impl ToPath) -> Result<i32> {
        self.read(path, coerce::to_i32)
    }

    pub fn get_u64(&self, path: impl ToPath) -> Result<u64> {
        self.read(path, coerce::to_u64)
    }

    pub fn get_f64(&self, path: impl ToPath) -> Result<f64> {
        self.read(path, coerce::to_f64)
    }

    /// Durations: integers are milliseconds, strings carry a unit (`"30s"`).
    pub fn get_duration(&self, path: impl ToPath) -> Result<Duration> {
        self.read(path, coerce::to_duration)
    }

    /// Byte sizes: integers are bytes, strings carry a unit (`"512K"`).
    pub fn get_bytes(&self, path: impl ToPath) -> Result<u64> {
        self.read(path, coerce::to_bytes)
    }

    pub fn get_enum<E: ConfigEnum>(&self, path: impl ToPath) -> Result<E> {
        let set = E::enum_set();
        let path = path.to_path()?;
        let node = self.find(&path).ok_or_else(|| ConfigError::missing(&path))?;
        let name = coerce::to_enum_member(node, &path.to_string(), &set)?;
        E::from_name(&name).ok_or_else(|| ConfigError::missing(&path))
    }

    /// `None` when the path is missing or null.
    pub fn get_optional_string(&self, path: impl ToPath) -> Result<Option<String>> {
        self.get_string(path).optional()
    }

    pub fn get_optional_bool(&self, path: impl ToPath) -> Result<Option<bool>> {
        self.get_bool(path).optional()
    }

    pub fn get_optional_i64(&self, path: impl ToPath) -> Result<Option<i64>> {
        self.get_i64(path).optional()
    }

    pub fn get_optional_f64(&self, path: impl ToPath) -> Result<Option<f64>> {
        self.get_f64(path).optional()
    }

    pub fn get_optional_duration(&self, path: impl ToPath) -> Result<Option<Duration>> {
        self.get_duration(path).optional()
    }

    /// The list at `path`, elements unconverted.
    pub fn get_list(&self, path: impl ToPath) -> Result<&[Node]> {
        let path = path.to_path()?;
        match self.find(&path) {
            None => Err(ConfigError::missing(&path)),
            Some(Node::Null) => Err(ConfigError::null_value(&path)),
            Some(Node::List(items)) => Ok(items),
            Some(other) => Err(ConfigError::wrong_type(&path, "list", other.kind())),
        }
    }

    fn read_list<T>(&self, path: impl ToPath, convert: fn(&Node, &str) -> Result<T>) -> Result<Vec<T>> {
        let path = path.to_path()?;
        let items = self.get_list(&path)?;
        items
            .iter()
            .enumerate()
            .map(|(index, item)| convert(item, &format!("{}[{}]", path, index)))
            .collect()
    }

    pub fn get_string_list(&self, path: impl ToPath) -> Result<Vec<String>> {
        self.read_list(path, coerce::to_string)
    }

    pub fn get_bool_list(&self, path: impl ToPath) -> Result<Vec<bool>> {
        self.read_list(path, coerce::to_bool)
    }

    pub fn get_number_list(&self, path: impl ToPath) -> Result<Vec<Number>> {
        self.read_list(path, coerce::to_number)
    }

    pub fn get_i64_list(&self, path: impl ToPath) -> Result<Vec<i64>> {
        self.read_list(path, coerce::to_i64)
    }

    pub fn get_f64_list(&self, path: impl ToPath) -> Result<Vec<f64>> {
        self.read_list(path, coerce::to_f64)
    }

    pub fn get_duration_list(&self, path: impl ToPath) -> Result<Vec<Duration>> {
        self.read_list(path, coerce::to_duration)
    }

    /// Members of `E` by exact name, in list order, duplicates kept.
    pub fn get_enum_list<E: ConfigEnum>(&self, path: impl ToPath) -> Result<Vec<E>> {
        let set = E::enum_set();
        let path = path.to_path()?;
        let items = self.get_list(&path)?;
        let mut members = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let element = format!("{}[{}]", path, index);
            let name = coerce::to_enum_member(item, &element, &set)?;
            members.push(E::from_name(&name).ok_or_else(|| ConfigError::missing(&element))?);
        }
        Ok(members)
    }

    pub fn get_object(&self, path: impl ToPath) -> Result<ConfigObject> {
        let path = path.to_path()?;
        match self.find(&path) {
            None => Err(ConfigError::missing(&path)),
            Some(Node::Null) => Err(ConfigError::null_value(&path)),
            Some(Node::Object(object)) => Ok(ConfigObject {
                object: object.clone(),
            }),
            Some(other) => Err(ConfigError::wrong_type(&path, "object", other.kind())),
        }
    }

    /// The object at `path` as a configuration of its own.
    pub fn get_config(&self, path: impl ToPath) -> Result<Config> {
        self.get_object(path).map(|object| object.to_config())
    }

    /// Bind the object at `path` into a bean of the given shape.
    pub fn bind(&self, path: impl ToPath, shape: &Shape) -> Result<Bean> {
        let config = self.get_config(path)?;
        bean::bind(&config, shape)
    }

    /// Bind the object at `path` into a typed bean.
    pub fn bind_as<T: FromConfig>(&self, path: impl ToPath) -> Result<T> {
        let bean = self.bind(path, &T::shape())?;
        T::from_bean(&bean)
    }

    /// Every leaf (non-object value, lists included) with its full path, in
    /// document order.
    pub fn entry_set(&self) -> Vec<(Path, &Node)> {
        fn walk<'n>(prefix: Option<&Path>, object: &'n Object, out: &mut Vec<(Path, &'n Node)>) {
            for (key, node) in object.iter() {
                let path = match prefix {
                    Some(prefix) => prefix.child(key),
                    None => Path::key(key),
                };
                match node {
                    Node::Object(child) => walk(Some(&path), child, out),
                    leaf => out.push((path, leaf)),
                }
            }
        }
        let mut out = Vec::new();
        walk(None, &self.root, &mut out);
        out
    }
}

/// A resolved object value, convertible back into a [`Config`].
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigObject {
    object: Object,
}

impl ConfigObject {
    pub fn to_config(&self) -> Config {
        Config::from_object(self.object.clone())
    }

    pub fn get(&self, key: &str) -> Option<&Node> {
        self.object.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.object.keys()
    }

    pub fn len(&self) -> usize {
        self.object.len()
    }

    pub fn is_empty(&self) -> bool {
        self.object.is_empty()
    }

    pub fn as_object(&self) -> &Object {
        &self.object
    }
}
