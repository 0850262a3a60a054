//! Get subcommand for layerconf CLI
//!
//! Prints a single value, optionally read through a typed accessor.

use crate::config::Config;
use crate::error::Result;
use clap::Args;

/// Arguments for the get subcommand
#[derive(Args, Debug)]
pub struct GetArgs {
    /// Dotted path, e.g. `conf.persistence.provider`
    #[arg(value_name = "PATH")]
    pub path: String,

    /// Read as: string, bool, int, float, duration, bytes, or list
    #[arg(short = 't', long = "type", value_name = "TYPE")]
    pub value_type: Option<ValueType>,
}

/// Accessor used by `get --type`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    String,
    Bool,
    Int,
    Float,
    Duration,
    Bytes,
    List,
}

impl std::str::FromStr for ValueType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "string" => Ok(ValueType::String),
            "bool" | "boolean" => Ok(ValueType::Bool),
            "int" | "integer" => Ok(ValueType::Int),
            "float" | "double" => Ok(ValueType::Float),
            "duration" => Ok(ValueType::Duration),
            "bytes" => Ok(ValueType::Bytes),
            "list" => Ok(ValueType::List),
            _ => Err(format!(
                "Invalid type '{}'. Valid options: string, bool, int, float, duration, bytes, list",
                s
            )),
        }
    }
}

impl std::fmt::Display for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueType::String => write!(f, "string"),
            ValueType::Bool => write!(f, "bool"),
            ValueType::Int => write!(f, "int"),
            ValueType::Float => write!(f, "float"),
            ValueType::Duration => write!(f, "duration"),
            ValueType::Bytes => write!(f, "bytes"),
            ValueType::List => write!(f, "list"),
        }
    }
}

/// Render the value at `args.path` as one line of text.
///
/// Untyped reads print strings bare and everything else as JSON.
pub fn run(config: &Config, args: &GetArgs) -> Result<String> {
    let path = args.path.as_str();
    let text = match args.value_type {
        None => config.get_value(path)?.to_string(),
        Some(ValueType::String) => config.get_string(path)?,
        Some(ValueType::Bool) => config.get_bool(path)?.to_string(),
        Some(ValueType::Int) => config.get_i64(path)?.to_string(),
        Some(ValueType::Float) => config.get_f64(path)?.to_string(),
        Some(ValueType::Duration) => format!("{:?}", config.get_duration(path)?),
        Some(ValueType::Bytes) => config.get_bytes(path)?.to_string(),
        Some(ValueType::List) => config.get_string_list(path)?.join("\n"),
    };
    Ok(text)
}
