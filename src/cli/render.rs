//! Render subcommand for layerconf CLI
//!
//! Prints the resolved tree (or a subtree) as JSON or YAML.

use crate::config::Config;
use clap::Args;

/// Arguments for the render subcommand
#[derive(Args, Debug)]
pub struct RenderArgs {
    /// Subtree to print (default: the whole tree)
    #[arg(value_name = "PATH")]
    pub path: Option<String>,

    /// Output format: json (default) or yaml
    #[arg(short, long, default_value = "json", value_name = "FORMAT")]
    pub format: RenderFormat,
}

/// Output format for rendered trees
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RenderFormat {
    #[default]
    Json,
    Yaml,
}

impl std::str::FromStr for RenderFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(RenderFormat::Json),
            "yaml" | "yml" => Ok(RenderFormat::Yaml),
            _ => Err(format!("Invalid format '{}'. Valid options: json, yaml", s)),
        }
    }
}

impl std::fmt::Display for RenderFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderFormat::Json => write!(f, "json"),
            RenderFormat::Yaml => write!(f, "yaml"),
        }
    }
}

pub fn run(config: &Config, args: &RenderArgs) -> anyhow::Result<String> {
    let node = match &args.path {
        Some(path) => config.get_value(path.as_str())?.clone(),
        None => config.to_node(),
    };
    let text = match args.format {
        RenderFormat::Json => serde_json::to_string_pretty(&node)?,
        RenderFormat::Yaml => serde_yaml::to_string(&node)?,
    };
    Ok(text)
}
