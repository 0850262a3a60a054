//! CLI command definitions for layerconf
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

pub mod get;
pub mod render;

use crate::config::{ConfigPaths, DEFAULT_ENV_PREFIX};
use clap::{Parser, Subcommand};
use get::GetArgs;
use render::RenderArgs;
use std::path::PathBuf;

/// Layered configuration inspector
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Application config file; repeat for more, later files win
    #[arg(short, long = "config", value_name = "FILE", global = true)]
    pub config: Vec<PathBuf>,

    /// Reference (defaults) file; repeat for more, later files win
    #[arg(long, value_name = "FILE", global = true)]
    pub reference: Vec<PathBuf>,

    /// Prefix of environment overrides ("" disables them)
    #[arg(long, default_value = DEFAULT_ENV_PREFIX, global = true)]
    pub env_prefix: String,

    /// Skip the user config file
    #[arg(long, global = true)]
    pub no_user: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print one value
    Get(GetArgs),

    /// Print the resolved tree, or the subtree at a path
    Render(RenderArgs),

    /// Load and resolve every layer, reporting the first error
    Check,

    /// Reload whenever a layer file changes
    Watch,
}

impl Cli {
    /// Layer sources selected by the flags.
    ///
    /// Without `-c`/`--reference` the default files are discovered in the
    /// working directory.
    pub fn config_paths(&self) -> ConfigPaths {
        let mut paths = if self.config.is_empty() && self.reference.is_empty() {
            let discovered = ConfigPaths::discover();
            ConfigPaths {
                env_prefix: None,
                ..discovered
            }
        } else {
            let discovered_user = ConfigPaths::discover().user_dir;
            let mut paths = ConfigPaths::with_files(self.reference.clone(), self.config.clone());
            paths.user_dir = discovered_user;
            paths
        };

        if self.no_user {
            paths.user_dir = None;
        }
        if !self.env_prefix.is_empty() {
            paths = paths.with_env_prefix(self.env_prefix.clone());
        }
        paths
    }
}
