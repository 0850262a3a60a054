//! Structured error types for configuration loading and lookup.

use serde::Serialize;
use std::fmt;

/// Error kinds for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    // Lookup errors
    Missing,
    NullValue,
    WrongType,
    BadEnumValue,
    BadValue,
    BadPath,

    // Resolution errors
    CyclicReference,
    UnresolvedReference,

    // Loader errors
    Io,
    Parse,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Missing => "missing",
            ErrorKind::NullValue => "null value",
            ErrorKind::WrongType => "wrong type",
            ErrorKind::BadEnumValue => "bad enum value",
            ErrorKind::BadValue => "bad value",
            ErrorKind::BadPath => "bad path",
            ErrorKind::CyclicReference => "cyclic reference",
            ErrorKind::UnresolvedReference => "unresolved reference",
            ErrorKind::Io => "io",
            ErrorKind::Parse => "parse",
        };
        f.write_str(name)
    }
}

/// Errors raised while loading, resolving, or reading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("No configuration setting found for key '{path}'")]
    Missing { path: String },

    #[error("Configuration key '{path}' is set to null")]
    NullValue { path: String },

    #[error("'{path}' has type {found} rather than {expected}")]
    WrongType {
        path: String,
        expected: String,
        found: String,
    },

    #[error("Invalid value at '{path}': '{value}' is not one of {name} [{}]", .valid.join(", "))]
    BadEnumValue {
        path: String,
        name: String,
        value: String,
        valid: Vec<String>,
    },

    #[error("Invalid value at '{path}': {reason}")]
    BadValue { path: String, reason: String },

    #[error("Invalid path '{path}': {reason}")]
    BadPath { path: String, reason: String },

    #[error("Cycle in substitutions: {}", .chain.join(" -> "))]
    CyclicReference { chain: Vec<String> },

    #[error("Could not resolve substitution to a value: ${{{path}}} (referenced from '{location}')")]
    UnresolvedReference { path: String, location: String },

    #[error("Failed to bind field '{field}' of {shape}: {source}")]
    Bean {
        shape: String,
        field: String,
        #[source]
        source: Box<ConfigError>,
    },

    #[error("Failed to read {origin}: {source}")]
    Io {
        origin: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {origin}: {message}")]
    Parse { origin: String, message: String },
}

impl ConfigError {
    /// The flat kind of this error. Bean errors report the kind of the field
    /// failure they wrap.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConfigError::Missing { .. } => ErrorKind::Missing,
            ConfigError::NullValue { .. } => ErrorKind::NullValue,
            ConfigError::WrongType { .. } => ErrorKind::WrongType,
            ConfigError::BadEnumValue { .. } => ErrorKind::BadEnumValue,
            ConfigError::BadValue { .. } => ErrorKind::BadValue,
            ConfigError::BadPath { .. } => ErrorKind::BadPath,
            ConfigError::CyclicReference { .. } => ErrorKind::CyclicReference,
            ConfigError::UnresolvedReference { .. } => ErrorKind::UnresolvedReference,
            ConfigError::Bean { source, .. } => source.kind(),
            ConfigError::Io { .. } => ErrorKind::Io,
            ConfigError::Parse { .. } => ErrorKind::Parse,
        }
    }

    // Convenience constructors

    pub fn missing(path: impl fmt::Display) -> Self {
        Self::Missing {
            path: path.to_string(),
        }
    }

    pub fn null_value(path: impl fmt::Display) -> Self {
        Self::NullValue {
            path: path.to_string(),
        }
    }

    pub fn wrong_type(
        path: impl fmt::Display,
        expected: impl Into<String>,
        found: impl fmt::Display,
    ) -> Self {
        Self::WrongType {
            path: path.to_string(),
            expected: expected.into(),
            found: found.to_string(),
        }
    }

    pub fn bad_value(path: impl fmt::Display, reason: impl Into<String>) -> Self {
        Self::BadValue {
            path: path.to_string(),
            reason: reason.into(),
        }
    }

    pub fn bad_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::BadPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn parse(origin: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Parse {
            origin: origin.into(),
            message: message.to_string(),
        }
    }

    /// Wrap a field failure with the bean shape and field it belongs to.
    pub fn in_bean(self, shape: &str, field: &str) -> Self {
        Self::Bean {
            shape: shape.to_string(),
            field: field.to_string(),
            source: Box::new(self),
        }
    }
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bean_error_reports_inner_kind() {
        let err = ConfigError::missing("name").in_bean("Author", "name");
        assert_eq!(err.kind(), ErrorKind::Missing);
        assert_eq!(
            err.to_string(),
            "Failed to bind field 'name' of Author: No configuration setting found for key 'name'"
        );
    }

    #[test]
    fn test_cycle_message_joins_chain() {
        let err = ConfigError::CyclicReference {
            chain: vec!["a".into(), "b".into(), "a".into()],
        };
        assert_eq!(err.to_string(), "Cycle in substitutions: a -> b -> a");
    }

    #[test]
    fn test_unresolved_message_shows_substitution() {
        let err = ConfigError::UnresolvedReference {
            path: "missing.key".into(),
            location: "conf.ref".into(),
        };
        assert_eq!(
            err.to_string(),
            "Could not resolve substitution to a value: ${missing.key} (referenced from 'conf.ref')"
        );
    }

    #[test]
    fn test_kind_serializes_screaming_snake() {
        let json = serde_json::to_string(&ErrorKind::CyclicReference).unwrap();
        assert_eq!(json, "\"CYCLIC_REFERENCE\"");
    }
}
