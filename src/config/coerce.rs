//! Conversions from resolved nodes to Rust values.
//!
//! - string: strings, numbers and booleans (display form)
//! - boolean: booleans and `true|false|yes|no|on|off`
//! - integers: integral numbers, or strings holding one
//! - floats: any number, or a numeric string
//! - durations: integers (milliseconds) or `"<number> <unit>"`
//! - byte sizes: integers or `"<number><unit>"`
//!
//! `null` is always a [`ConfigError::NullValue`]; every other mismatch is a
//! [`ConfigError::WrongType`] naming the expected and found kinds.

use super::enums::EnumSet;
use super::units::{parse_bytes, parse_duration};
use super::value::{Node, Number};
use crate::error::{ConfigError, Result};
use std::time::Duration;

fn non_null<'n>(node: &'n Node, path: &str) -> Result<&'n Node> {
    if node.is_null() {
        Err(ConfigError::null_value(path))
    } else {
        Ok(node)
    }
}

pub(crate) fn to_string(node: &Node, path: &str) -> Result<String> {
    let node = non_null(node, path)?;
    node.scalar_text()
        .ok_or_else(|| ConfigError::wrong_type(path, "string", node.kind()))
}

pub(crate) fn to_bool(node: &Node, path: &str) -> Result<bool> {
    match non_null(node, path)? {
        Node::Bool(b) => Ok(*b),
        Node::String(s) => match s.as_str() {
            "true" | "yes" | "on" => Ok(true),
            "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::wrong_type(
                path,
                "boolean",
                format!("string '{}'", s),
            )),
        },
        other => Err(ConfigError::wrong_type(path, "boolean", other.kind())),
    }
}

pub(crate) fn to_number(node: &Node, path: &str) -> Result<Number> {
    match non_null(node, path)? {
        Node::Number(n) => Ok(*n),
        Node::String(s) => Number::parse(s)
            .ok_or_else(|| ConfigError::wrong_type(path, "number", format!("string '{}'", s))),
        other => Err(ConfigError::wrong_type(path, "number", other.kind())),
    }
}

pub(crate) fn to_i64(node: &Node, path: &str) -> Result<i64> {
    let number = to_number(node, path)?;
    number
        .as_i64()
        .ok_or_else(|| ConfigError::wrong_type(path, "integer", format!("number {}", number)))
}

pub(crate) fn to_i32(node: &Node, path: &str) -> Result<i32> {
    let n = to_i64(node, path)?;
    i32::try_from(n).map_err(|_| {
        ConfigError::wrong_type(path, "32-bit integer", format!("out-of-range number {}", n))
    })
}

pub(crate) fn to_u64(node: &Node, path: &str) -> Result<u64> {
    let n = to_i64(node, path)?;
    u64::try_from(n).map_err(|_| {
        ConfigError::wrong_type(path, "unsigned integer", format!("negative number {}", n))
    })
}

pub(crate) fn to_f64(node: &Node, path: &str) -> Result<f64> {
    to_number(node, path).map(Number::as_f64)
}

pub(crate) fn to_duration(node: &Node, path: &str) -> Result<Duration> {
    match non_null(node, path)? {
        Node::Number(Number::Int(ms)) if *ms >= 0 => Ok(Duration::from_millis(*ms as u64)),
        Node::String(s) => parse_duration(s)
            .ok_or_else(|| ConfigError::bad_value(path, format!("could not parse duration '{}'", s))),
        other => Err(ConfigError::wrong_type(path, "duration", other.kind())),
    }
}

pub(crate) fn to_bytes(node: &Node, path: &str) -> Result<u64> {
    match non_null(node, path)? {
        Node::Number(Number::Int(n)) if *n >= 0 => Ok(*n as u64),
        Node::String(s) => parse_bytes(s)
            .ok_or_else(|| ConfigError::bad_value(path, format!("could not parse size in bytes '{}'", s))),
        other => Err(ConfigError::wrong_type(path, "size in bytes", other.kind())),
    }
}

/// Match a string node against the members of `set` by exact name.
pub(crate) fn to_enum_member(node: &Node, path: &str, set: &EnumSet) -> Result<String> {
    let name = match non_null(node, path)? {
        Node::String(s) => s,
        other => {
            return Err(ConfigError::wrong_type(
                path,
                format!("{} member name", set.name),
                other.kind(),
            ));
        }
    };
    if set.contains(name) {
        Ok(name.clone())
    } else {
        Err(ConfigError::BadEnumValue {
            path: path.to_string(),
            name: set.name.clone(),
            value: name.clone(),
            valid: set.members.clone(),
        })
    }
}
