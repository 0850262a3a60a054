//! Dotted key paths.
//!
//! A path is a non-empty sequence of case-sensitive key segments separated by
//! dots. A segment containing dots (or any other character) can be written
//! between double quotes:
//!
//! ```
//! use layerconf::config::Path;
//!
//! let path = Path::parse(r#"servers."eu.west".host"#).unwrap();
//! assert_eq!(path.segments(), ["servers", "eu.west", "host"]);
//! assert_eq!(path.to_string(), r#"servers."eu.west".host"#);
//! ```

use crate::error::{ConfigError, Result};
use std::fmt;
use std::str::FromStr;

/// A parsed key path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Path {
    segments: Vec<String>,
}

impl Path {
    /// Parse a dotted path expression.
    pub fn parse(expr: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut current = String::new();
        // Whether the segment being built has any content, quoted or not.
        let mut started = false;
        let mut chars = expr.chars();

        while let Some(ch) = chars.next() {
            match ch {
                '.' => {
                    if !started {
                        return Err(ConfigError::bad_path(expr, "empty path segment"));
                    }
                    segments.push(std::mem::take(&mut current));
                    started = false;
                }
                '"' => {
                    let mut closed = false;
                    for quoted in chars.by_ref() {
                        if quoted == '"' {
                            closed = true;
                            break;
                        }
                        current.push(quoted);
                    }
                    if !closed {
                        return Err(ConfigError::bad_path(expr, "unterminated quoted segment"));
                    }
                    started = true;
                }
                _ => {
                    current.push(ch);
                    started = true;
                }
            }
        }

        if !started {
            let reason = if expr.is_empty() {
                "path is empty"
            } else {
                "empty path segment"
            };
            return Err(ConfigError::bad_path(expr, reason));
        }
        segments.push(current);

        Ok(Self { segments })
    }

    /// Build a path from already-split segments. Returns `None` when empty.
    pub fn from_segments<I, S>(segments: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() {
            None
        } else {
            Some(Self { segments })
        }
    }

    /// A single-segment path. The key is taken literally, dots included.
    pub fn key(key: impl Into<String>) -> Self {
        Self {
            segments: vec![key.into()],
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn first(&self) -> &str {
        &self.segments[0]
    }

    pub fn last(&self) -> &str {
        &self.segments[self.segments.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Paths are never empty; provided for clippy's `len_without_is_empty`.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Append a key segment.
    pub fn child(&self, key: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(key.into());
        Self { segments }
    }

    /// The path without its last segment, or `None` for a single segment.
    pub fn parent(&self) -> Option<Self> {
        Self::from_segments(self.segments[..self.segments.len() - 1].iter().cloned())
    }

    /// True if `self` equals `other` or is an ancestor of it.
    pub fn is_prefix_of(&self, other: &[String]) -> bool {
        other.len() >= self.segments.len() && other[..self.segments.len()] == self.segments[..]
    }
}

fn needs_quotes(segment: &str) -> bool {
    segment.is_empty()
        || !segment
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_'))
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            if needs_quotes(segment) {
                write!(f, "\"{}\"", segment)?;
            } else {
                f.write_str(segment)?;
            }
        }
        Ok(())
    }
}

impl FromStr for Path {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Path::parse(s)
    }
}

/// Render a location (a list of segments, possibly empty) for messages.
pub(crate) fn render_location(segments: &[String]) -> String {
    match Path::from_segments(segments.iter().cloned()) {
        Some(path) => path.to_string(),
        None => "<root>".to_string(),
    }
}
