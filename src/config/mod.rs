//! Hierarchical typed configuration.
//!
//! Configuration is built from layers given highest priority first:
//! 1. **Environment** - `CONFIG_FORCE_*` variables
//! 2. **User** - `<config_dir>/layerconf/application.yaml`
//! 3. **Application** - `./application.{yaml,yml,json}` or `LAYERCONF_CONFIG_PATH`
//! 4. **Reference** - `./reference.{yaml,yml,json}`
//!
//! ## Pipeline
//! - [`merge_layers`] deep-merges the layers key by key
//! - [`resolve`] replaces every `${path}` substitution with its value
//! - [`Config`] serves typed reads from the resolved tree
//! - [`Config::bind`] / [`Config::bind_as`] fill a declared [`Shape`]
//!
//! ```
//! use layerconf::config::{Config, Layer, Node, Path};
//!
//! let version = Node::substitution(Path::parse("version")?, false);
//! let reference = Node::object_from([
//!     ("version", Node::from("1.0-SNAPSHOT")),
//!     ("artifact", Node::concat([Node::from("app-"), version])),
//! ]);
//! let application = Node::object_from([("version", Node::from("2.0"))]);
//!
//! let config = Config::from_layers(vec![
//!     Layer::new("application", application),
//!     Layer::new("reference", reference),
//! ])?;
//! assert_eq!(config.get_string("artifact")?, "app-2.0");
//! # Ok::<(), layerconf::error::ConfigError>(())
//! ```

mod access;
mod bean;
mod coerce;
mod enums;
mod handle;
mod loader;
mod merge;
mod path;
mod resolve;
pub mod units;
mod value;
pub mod watcher;

pub use access::{Config, ConfigObject, OptionalExt, ToPath};
pub use bean::{Bean, BeanValue, Field, FieldType, FromConfig, Shape, bind};
pub use enums::{ConfigEnum, EnumSet};
pub use handle::ConfigHandle;
pub use loader::{
    CONFIG_PATH_ENV, ConfigLoader, ConfigPaths, ConfigTier, DEFAULT_ENV_PREFIX, INHERIT_KEY,
    env_layer, load_file, parse_json, parse_yaml, string_node,
};
pub use merge::{Layer, MergedTree, deep_merge, deep_merge_all, merge_layers};
pub use path::Path;
pub use resolve::{resolve, resolve_tree};
pub use value::{Node, NodeKind, Number, Object, Substitution};
