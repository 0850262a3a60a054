//! Binding resolved objects into beans.
//!
//! A [`Shape`] names a bean and lists its fields with their expected types.
//! [`bind`] reads each field from a configuration object with the typed
//! accessors and produces a [`Bean`], an ordered list of field values with
//! structural equality. Types implementing [`FromConfig`] turn a bean into a
//! plain Rust struct.
//!
//! Field keys are matched exactly; when the exact key is absent, the
//! kebab-case spelling of the field name is tried (`branchName` reads
//! `branch-name`).

use super::access::Config;
use super::coerce;
use super::enums::{ConfigEnum, EnumSet};
use super::value::{Node, Number};
use crate::error::{ConfigError, Result};
use heck::ToKebabCase;
use std::time::Duration;

/// Expected type of a bean field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    String,
    Bool,
    Int,
    Float,
    Number,
    Duration,
    Bytes,
    List(Box<FieldType>),
    Enum(EnumSet),
    Object(Shape),
    /// Missing or null becomes [`BeanValue::Absent`].
    Optional(Box<FieldType>),
    /// Any resolved value, unconverted.
    Any,
}

impl FieldType {
    pub fn list(inner: FieldType) -> Self {
        FieldType::List(Box::new(inner))
    }

    pub fn optional(inner: FieldType) -> Self {
        FieldType::Optional(Box::new(inner))
    }

    pub fn enumeration<E: ConfigEnum>() -> Self {
        FieldType::Enum(E::enum_set())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub ty: FieldType,
}

/// Statically declared description of a bean.
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    pub name: String,
    pub fields: Vec<Field>,
}

impl Shape {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, name: impl Into<String>, ty: FieldType) -> Self {
        self.fields.push(Field {
            name: name.into(),
            ty,
        });
        self
    }
}

/// A bound field value.
#[derive(Debug, Clone, PartialEq)]
pub enum BeanValue {
    Absent,
    String(String),
    Bool(bool),
    Int(i64),
    Float(f64),
    Number(Number),
    Duration(Duration),
    Bytes(u64),
    List(Vec<BeanValue>),
    /// Member name of the field's enum set.
    Enum(String),
    Object(Bean),
    Any(Node),
}

/// A populated bean. Two beans are equal iff their shape names and every
/// field are equal.
#[derive(Debug, Clone, PartialEq)]
pub struct Bean {
    shape: String,
    fields: Vec<(String, BeanValue)>,
}

impl Bean {
    pub fn new(shape: impl Into<String>) -> Self {
        Self {
            shape: shape.into(),
            fields: Vec::new(),
        }
    }

    /// Builder-style field insertion, handy for literals in tests.
    pub fn with(mut self, name: impl Into<String>, value: BeanValue) -> Self {
        self.fields.push((name.into(), value));
        self
    }

    pub fn shape(&self) -> &str {
        &self.shape
    }

    pub fn get(&self, name: &str) -> Option<&BeanValue> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &BeanValue)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    fn require(&self, name: &str) -> Result<&BeanValue> {
        self.get(name)
            .ok_or_else(|| ConfigError::missing(name).in_bean(&self.shape, name))
    }

    fn mismatch(&self, name: &str, expected: &str, found: &BeanValue) -> ConfigError {
        ConfigError::wrong_type(name, expected, format!("{:?}", found)).in_bean(&self.shape, name)
    }

    pub fn string(&self, name: &str) -> Result<String> {
        match self.require(name)? {
            BeanValue::String(s) => Ok(s.clone()),
            other => Err(self.mismatch(name, "string", other)),
        }
    }

    pub fn bool(&self, name: &str) -> Result<bool> {
        match self.require(name)? {
            BeanValue::Bool(b) => Ok(*b),
            other => Err(self.mismatch(name, "boolean", other)),
        }
    }

    pub fn int(&self, name: &str) -> Result<i64> {
        match self.require(name)? {
            BeanValue::Int(n) => Ok(*n),
            other => Err(self.mismatch(name, "integer", other)),
        }
    }

    pub fn float(&self, name: &str) -> Result<f64> {
        match self.require(name)? {
            BeanValue::Float(n) => Ok(*n),
            other => Err(self.mismatch(name, "float", other)),
        }
    }

    pub fn duration(&self, name: &str) -> Result<Duration> {
        match self.require(name)? {
            BeanValue::Duration(d) => Ok(*d),
            other => Err(self.mismatch(name, "duration", other)),
        }
    }

    pub fn string_list(&self, name: &str) -> Result<Vec<String>> {
        match self.require(name)? {
            BeanValue::List(items) => items
                .iter()
                .map(|item| match item {
                    BeanValue::String(s) => Ok(s.clone()),
                    other => Err(self.mismatch(name, "list of strings", other)),
                })
                .collect(),
            other => Err(self.mismatch(name, "list", other)),
        }
    }

    pub fn enumeration<E: ConfigEnum>(&self, name: &str) -> Result<E> {
        match self.require(name)? {
            BeanValue::Enum(member) => E::from_name(member)
                .ok_or_else(|| self.mismatch(name, E::NAME, &BeanValue::Enum(member.clone()))),
            other => Err(self.mismatch(name, E::NAME, other)),
        }
    }

    pub fn object(&self, name: &str) -> Result<&Bean> {
        match self.require(name)? {
            BeanValue::Object(bean) => Ok(bean),
            other => Err(self.mismatch(name, "object", other)),
        }
    }

    /// Convert a nested object field into a typed bean.
    pub fn nested<T: FromConfig>(&self, name: &str) -> Result<T> {
        T::from_bean(self.object(name)?)
    }

    /// True when the field was optional and absent.
    pub fn is_absent(&self, name: &str) -> bool {
        matches!(self.get(name), None | Some(BeanValue::Absent))
    }
}

/// Rust types that can be built from a bound bean.
pub trait FromConfig: Sized {
    fn shape() -> Shape;
    fn from_bean(bean: &Bean) -> Result<Self>;
}

/// Bind the root object of `config` into a bean of the given shape.
pub fn bind(config: &Config, shape: &Shape) -> Result<Bean> {
    let mut bean = Bean::new(&shape.name);

    for field in &shape.fields {
        let kebab = field.name.to_kebab_case();
        let (key, node) = match config.root().get(&field.name) {
            Some(node) => (field.name.as_str(), Some(node)),
            None => (kebab.as_str(), config.root().get(&kebab)),
        };
        let value = bind_field(node, key, &field.ty).map_err(|err| err.in_bean(&shape.name, &field.name))?;
        bean.fields.push((field.name.clone(), value));
    }

    Ok(bean)
}

fn bind_field(node: Option<&Node>, path: &str, ty: &FieldType) -> Result<BeanValue> {
    match (node, ty) {
        (None | Some(Node::Null), FieldType::Optional(_)) => Ok(BeanValue::Absent),
        (Some(node), FieldType::Optional(inner)) => bind_node(node, path, inner),
        (None, _) => Err(ConfigError::missing(path)),
        (Some(node), ty) => bind_node(node, path, ty),
    }
}

fn bind_node(node: &Node, path: &str, ty: &FieldType) -> Result<BeanValue> {
    let value = match ty {
        FieldType::String => BeanValue::String(coerce::to_string(node, path)?),
        FieldType::Bool => BeanValue::Bool(coerce::to_bool(node, path)?),
        FieldType::Int => BeanValue::Int(coerce::to_i64(node, path)?),
        FieldType::Float => BeanValue::Float(coerce::to_f64(node, path)?),
        FieldType::Number => BeanValue::Number(coerce::to_number(node, path)?),
        FieldType::Duration => BeanValue::Duration(coerce::to_duration(node, path)?),
        FieldType::Bytes => BeanValue::Bytes(coerce::to_bytes(node, path)?),
        FieldType::Enum(set) => BeanValue::Enum(coerce::to_enum_member(node, path, set)?),
        FieldType::Optional(inner) => {
            if node.is_null() {
                BeanValue::Absent
            } else {
                bind_node(node, path, inner)?
            }
        }
        FieldType::Any => BeanValue::Any(node.clone()),
        FieldType::List(inner) => match node {
            Node::List(items) => BeanValue::List(
                items
                    .iter()
                    .enumerate()
                    .map(|(index, item)| bind_node(item, &format!("{}[{}]", path, index), inner))
                    .collect::<Result<_>>()?,
            ),
            Node::Null => return Err(ConfigError::null_value(path)),
            other => return Err(ConfigError::wrong_type(path, "list", other.kind())),
        },
        FieldType::Object(shape) => match node {
            Node::Object(object) => BeanValue::Object(bind(&Config::from_object(object.clone()), shape)?),
            Node::Null => return Err(ConfigError::null_value(path)),
            other => {
                return Err(ConfigError::wrong_type(
                    path,
                    format!("object ({})", shape.name),
                    other.kind(),
                ));
            }
        },
    };
    Ok(value)
}
