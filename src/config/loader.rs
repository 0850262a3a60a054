//! Configuration loader with tier-based layering.
//!
//! Reads YAML/JSON files and environment overrides into [`Layer`]s, then
//! hands them to [`Config::from_layers`]. String scalars holding `${path}` or
//! `${?path}` become substitutions; a mapping key `<<` inherits from the
//! objects its substitutions name.

use super::access::Config;
use super::merge::Layer;
use super::path::Path;
use super::value::{Node, Object};
use crate::error::{ConfigError, Result};
use regex_lite::Regex;
use std::path::{Path as FsPath, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, warn};

/// Environment variable naming an explicit application file.
pub const CONFIG_PATH_ENV: &str = "LAYERCONF_CONFIG_PATH";

/// Default prefix of environment overrides (`CONFIG_FORCE_conf_login=root`).
pub const DEFAULT_ENV_PREFIX: &str = "CONFIG_FORCE_";

/// Key inheriting from substituted objects: `<<: ${defaults.server}`.
pub const INHERIT_KEY: &str = "<<";

/// Configuration tier priority (lowest to highest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfigTier {
    /// Library defaults (lowest priority)
    Reference = 0,
    /// Application config in the working directory or given explicitly
    Application = 1,
    /// User-level config (`~/.config/layerconf/`)
    User = 2,
    /// Environment variables (highest priority)
    Environment = 3,
}

impl std::fmt::Display for ConfigTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigTier::Reference => write!(f, "reference"),
            ConfigTier::Application => write!(f, "application"),
            ConfigTier::User => write!(f, "user"),
            ConfigTier::Environment => write!(f, "environment"),
        }
    }
}

/// Where each tier is read from. Within a tier, later files win.
#[derive(Debug, Clone, Default)]
pub struct ConfigPaths {
    pub reference: Vec<PathBuf>,
    pub application: Vec<PathBuf>,
    /// User-level config directory
    pub user_dir: Option<PathBuf>,
    /// Prefix of environment overrides; `None` disables the tier
    pub env_prefix: Option<String>,
}

impl ConfigPaths {
    /// Discover configuration paths from the environment and defaults.
    pub fn discover() -> Self {
        // Application: LAYERCONF_CONFIG_PATH or ./application.{yaml,yml,json}
        let application = match std::env::var(CONFIG_PATH_ENV) {
            Ok(explicit) => vec![PathBuf::from(explicit)],
            Err(_) => ["application.yaml", "application.yml", "application.json"]
                .iter()
                .map(PathBuf::from)
                .collect(),
        };

        let reference = ["reference.yaml", "reference.yml", "reference.json"]
            .iter()
            .map(PathBuf::from)
            .collect();

        // User dir: <config_dir>/layerconf
        let user_dir = dirs::config_dir().map(|d| d.join("layerconf"));

        Self {
            reference,
            application,
            user_dir,
            env_prefix: Some(DEFAULT_ENV_PREFIX.to_string()),
        }
    }

    /// Explicit files only: no user tier, no environment overrides.
    pub fn with_files(reference: Vec<PathBuf>, application: Vec<PathBuf>) -> Self {
        Self {
            reference,
            application,
            user_dir: None,
            env_prefix: None,
        }
    }

    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = Some(prefix.into());
        self
    }

    pub fn with_user_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.user_dir = Some(dir.into());
        self
    }

    fn user_file(&self) -> Option<PathBuf> {
        self.user_dir.as_ref().map(|dir| dir.join("application.yaml"))
    }

    /// Every file that may contribute a layer, lowest priority first.
    pub fn files(&self) -> Vec<(ConfigTier, PathBuf)> {
        let mut files: Vec<(ConfigTier, PathBuf)> = Vec::new();
        files.extend(self.reference.iter().map(|p| (ConfigTier::Reference, p.clone())));
        files.extend(self.application.iter().map(|p| (ConfigTier::Application, p.clone())));
        if let Some(user_file) = self.user_file() {
            files.push((ConfigTier::User, user_file));
        }
        files
    }

    /// Read all tiers into layers, highest priority first.
    pub fn read_layers(&self) -> Result<Vec<Layer>> {
        let mut layers = Vec::new();

        for (tier, path) in self.files() {
            if !path.is_file() {
                debug!(?path, %tier, "No config file found, skipping");
                continue;
            }
            debug!(?path, %tier, "Loading config layer");
            layers.push(load_file(&path)?);
        }

        if let Some(ref prefix) = self.env_prefix {
            if let Some(layer) = env_layer(prefix, std::env::vars()) {
                debug!(prefix = %prefix, "Loading environment overrides");
                layers.push(layer);
            }
        }

        layers.reverse();
        Ok(layers)
    }
}

/// Configuration loader that resolves the tiers into one [`Config`].
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Paths for each tier
    pub paths: ConfigPaths,
    /// Origins of the layers that were found, highest priority first
    origins: Vec<String>,
    /// Loaded configuration
    config: Config,
}

impl ConfigLoader {
    /// Load configuration with explicit paths.
    pub fn load_with_paths(paths: ConfigPaths) -> Result<Self> {
        let layers = paths.read_layers()?;
        if layers.is_empty() {
            warn!("No configuration layers found; using an empty configuration");
        }
        let origins = layers.iter().map(|layer| layer.origin.clone()).collect();
        let config = Config::from_layers(layers)?;
        Ok(Self {
            paths,
            origins,
            config,
        })
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Consume the loader and return the configuration.
    pub fn into_config(self) -> Config {
        self.config
    }

    /// Origins of the loaded layers, highest priority first.
    pub fn origins(&self) -> &[String] {
        &self.origins
    }
}

/// Read one file into a layer named after its path.
pub fn load_file(path: &FsPath) -> Result<Layer> {
    let origin = path.display().to_string();
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        origin: origin.clone(),
        source,
    })?;
    let root = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => parse_json(&content, &origin)?,
        _ => parse_yaml(&content, &origin)?,
    };
    Ok(Layer::new(origin, root))
}

/// Parse YAML text into a value tree. An empty document is an empty object.
pub fn parse_yaml(text: &str, origin: &str) -> Result<Node> {
    let value: serde_yaml::Value =
        serde_yaml::from_str(text).map_err(|e| ConfigError::parse(origin, e))?;
    match value {
        serde_yaml::Value::Null => Ok(Node::object()),
        value => from_yaml(value, origin),
    }
}

/// Parse JSON text into a value tree, keeping key order.
pub fn parse_json(text: &str, origin: &str) -> Result<Node> {
    let value: serde_json::Value =
        serde_json::from_str(text).map_err(|e| ConfigError::parse(origin, e))?;
    from_json(value, origin)
}

fn from_yaml(value: serde_yaml::Value, origin: &str) -> Result<Node> {
    use serde_yaml::Value;

    let node = match value {
        Value::Null => Node::Null,
        Value::Bool(b) => Node::Bool(b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Node::int(i),
            None => Node::float(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => string_node(&s, origin)?,
        Value::Sequence(items) => Node::List(
            items
                .into_iter()
                .map(|item| from_yaml(item, origin))
                .collect::<Result<_>>()?,
        ),
        Value::Mapping(mapping) => {
            let mut entries = Vec::with_capacity(mapping.len());
            for (key, value) in mapping {
                let key = match key {
                    Value::String(s) => s,
                    Value::Number(n) => n.to_string(),
                    Value::Bool(b) => b.to_string(),
                    other => {
                        return Err(ConfigError::parse(
                            origin,
                            format!("unsupported mapping key {:?}", other),
                        ));
                    }
                };
                entries.push((key, from_yaml(value, origin)?));
            }
            object_node(entries, origin)?
        }
        Value::Tagged(tagged) => from_yaml(tagged.value, origin)?,
    };
    Ok(node)
}

fn from_json(value: serde_json::Value, origin: &str) -> Result<Node> {
    use serde_json::Value;

    let node = match value {
        Value::Null => Node::Null,
        Value::Bool(b) => Node::Bool(b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Node::int(i),
            None => Node::float(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => string_node(&s, origin)?,
        Value::Array(items) => Node::List(
            items
                .into_iter()
                .map(|item| from_json(item, origin))
                .collect::<Result<_>>()?,
        ),
        Value::Object(map) => {
            let mut entries = Vec::with_capacity(map.len());
            for (key, value) in map {
                entries.push((key, from_json(value, origin)?));
            }
            object_node(entries, origin)?
        }
    };
    Ok(node)
}

/// Build an object, turning an inheritance key into a concatenation of the
/// inherited substitutions followed by the remaining fields.
fn object_node(entries: Vec<(String, Node)>, origin: &str) -> Result<Node> {
    let mut object = Object::new();
    let mut inherited = Vec::new();

    for (key, value) in entries {
        if key != INHERIT_KEY {
            object.insert(key, value);
            continue;
        }
        let parents = match value {
            Node::List(items) => items,
            single => vec![single],
        };
        for parent in parents {
            if !matches!(parent, Node::Substitution(_)) {
                return Err(ConfigError::parse(
                    origin,
                    format!("'{}' expects substitutions, found {}", INHERIT_KEY, parent.kind()),
                ));
            }
            inherited.push(parent);
        }
    }

    if inherited.is_empty() {
        Ok(Node::Object(object))
    } else {
        inherited.push(Node::Object(object));
        Ok(Node::Concat(inherited))
    }
}

fn substitution_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\$)?\$\{(\?)?([^}]*)\}").expect("substitution pattern is valid"))
}

/// Turn a string scalar into a plain string, a substitution, or a
/// concatenation of literal text and substitutions.
///
/// `$${path}` is the literal text `${path}`.
pub fn string_node(text: &str, origin: &str) -> Result<Node> {
    let re = substitution_regex();
    let mut parts = Vec::new();
    let mut literal = String::new();
    let mut last = 0;

    for caps in re.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        literal.push_str(&text[last..whole.start()]);
        last = whole.end();
        if caps.get(1).is_some() {
            literal.push_str(&whole.as_str()[1..]);
            continue;
        }
        if !literal.is_empty() {
            parts.push(Node::string(std::mem::take(&mut literal)));
        }
        let optional = caps.get(2).is_some();
        let expr = caps.get(3).map_or("", |m| m.as_str()).trim();
        let path = Path::parse(expr).map_err(|e| ConfigError::parse(origin, e))?;
        parts.push(Node::substitution(path, optional));
    }
    literal.push_str(&text[last..]);

    if parts.is_empty() {
        return Ok(Node::string(literal));
    }
    if !literal.is_empty() {
        parts.push(Node::string(literal));
    }
    if parts.len() == 1 {
        return Ok(parts.remove(0));
    }
    Ok(Node::Concat(parts))
}

/// Map an environment variable suffix to a path: `_` is a dot, `__` a dash
/// and `___` an underscore.
fn env_name_to_path(name: &str) -> Option<Path> {
    fn flush(mapped: &mut String, count: &mut usize) {
        mapped.push_str(&"_".repeat(*count / 3));
        match *count % 3 {
            1 => mapped.push('.'),
            2 => mapped.push('-'),
            _ => {}
        }
        *count = 0;
    }

    let mut mapped = String::with_capacity(name.len());
    let mut underscores = 0;

    for ch in name.chars() {
        if ch == '_' {
            underscores += 1;
        } else {
            flush(&mut mapped, &mut underscores);
            mapped.push(ch);
        }
    }
    flush(&mut mapped, &mut underscores);

    let segments: Vec<&str> = mapped.split('.').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return None;
    }
    Path::from_segments(segments)
}

fn insert_at(object: &mut Object, segments: &[String], value: Node) {
    let Some((first, rest)) = segments.split_first() else {
        return;
    };
    if rest.is_empty() {
        object.insert(first.clone(), value);
        return;
    }
    let mut child = match object.remove(first) {
        Some(Node::Object(existing)) => existing,
        _ => Object::new(),
    };
    insert_at(&mut child, rest, value);
    object.insert(first.clone(), Node::Object(child));
}

/// Build a layer from variables starting with `prefix`. Values stay strings;
/// the typed accessors convert them on read.
pub fn env_layer(prefix: &str, vars: impl IntoIterator<Item = (String, String)>) -> Option<Layer> {
    let mut matching: Vec<(String, String)> = vars
        .into_iter()
        .filter(|(name, _)| name.starts_with(prefix) && name.len() > prefix.len())
        .collect();
    if matching.is_empty() {
        return None;
    }
    matching.sort();

    let mut root = Object::new();
    for (name, value) in matching {
        match env_name_to_path(&name[prefix.len()..]) {
            Some(path) => insert_at(&mut root, path.segments(), Node::String(value)),
            None => warn!(variable = %name, "Ignoring environment override with empty path segment"),
        }
    }
    Some(Layer::new(format!("environment ({}*)", prefix), Node::Object(root)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_string_node_plain_and_substitution() {
        assert_eq!(string_node("admin", "t").unwrap(), Node::from("admin"));
        assert_eq!(string_node("${predefined.version}", "t").unwrap(), Node::subst("predefined.version"));
        assert_eq!(string_node("${? HOME }", "t").unwrap(), Node::optional_subst("HOME"));
    }

    #[test]
    fn test_string_node_concatenation() {
        assert_eq!(
            string_node("${home}/bin:${?extra}", "t").unwrap(),
            Node::concat([Node::subst("home"), Node::from("/bin:"), Node::optional_subst("extra")])
        );
    }

    #[test]
    fn test_string_node_escaped_marker_stays_literal() {
        assert_eq!(string_node("$${HOME}", "t").unwrap(), Node::from("${HOME}"));
        assert_eq!(
            string_node("cost $${price} for ${item}", "t").unwrap(),
            Node::concat([Node::from("cost ${price} for "), Node::subst("item")])
        );

        let conf = Config::from_node(parse_yaml("template: \"$${user}@${host}\"\nhost: db\n", "t").unwrap()).unwrap();
        assert_eq!(conf.get_string("template").unwrap(), "${user}@db");
    }

    #[test]
    fn test_string_node_bad_path_is_parse_error() {
        let err = string_node("${a..b}", "app.yaml").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Parse);
        assert!(err.to_string().contains("app.yaml"));
    }

    #[test]
    fn test_parse_yaml_keeps_order_and_types() {
        let node = parse_yaml("b: 1\na: [x, 2.5, true, null]\n", "t").unwrap();
        assert_eq!(
            node,
            Node::object_from([
                ("b", Node::int(1)),
                (
                    "a",
                    Node::list([Node::from("x"), Node::float(2.5), Node::Bool(true), Node::Null])
                ),
            ])
        );
        assert_eq!(parse_yaml("", "t").unwrap(), Node::object());
    }

    #[test]
    fn test_parse_yaml_inherit_key() {
        let node = parse_yaml("east:\n  <<: ${company}\n  branch_name: east\n", "t").unwrap();
        assert_eq!(
            node,
            Node::object_from([(
                "east",
                Node::concat([
                    Node::subst("company"),
                    Node::object_from([("branch_name", Node::from("east"))]),
                ])
            )])
        );
        assert!(parse_yaml("east:\n  <<: plain\n", "t").is_err());
    }

    #[test]
    fn test_parse_json_keeps_order() {
        let node = parse_json(r#"{"z": {"y": "${a}"}, "a": 1}"#, "t").unwrap();
        let keys: Vec<&str> = node.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["z", "a"]);
    }

    #[test]
    fn test_env_name_mapping() {
        assert_eq!(env_name_to_path("conf_login").unwrap().to_string(), "conf.login");
        assert_eq!(env_name_to_path("web__container").unwrap().to_string(), "web-container");
        assert_eq!(env_name_to_path("null___value").unwrap().segments(), ["null_value"]);
        assert!(env_name_to_path("a__").is_some());
        assert!(env_name_to_path("_a").is_none());
    }

    #[test]
    fn test_env_layer_builds_nested_object() {
        let vars = vec![
            ("CONFIG_FORCE_conf_login".to_string(), "root".to_string()),
            ("CONFIG_FORCE_conf_port".to_string(), "9000".to_string()),
            ("PATH".to_string(), "/bin".to_string()),
        ];
        let layer = env_layer("CONFIG_FORCE_", vars).unwrap();
        assert_eq!(
            layer.root,
            Node::object_from([(
                "conf",
                Node::object_from([("login", Node::from("root")), ("port", Node::from("9000"))])
            )])
        );
        assert!(env_layer("NOPE_", Vec::new()).is_none());
    }

    #[test]
    fn test_load_with_paths_later_files_win() {
        let temp = TempDir::new().unwrap();
        let reference = temp.path().join("reference.yaml");
        let application = temp.path().join("application.json");
        std::fs::write(&reference, "conf:\n  login: admin\n  web_container: Tomcat\n").unwrap();
        std::fs::write(&application, r#"{"conf": {"web_container": "GlassFish"}}"#).unwrap();

        let paths = ConfigPaths::with_files(vec![reference], vec![application, temp.path().join("missing.yaml")]);
        let loader = ConfigLoader::load_with_paths(paths).unwrap();
        let config = loader.config();

        assert_eq!(config.get_string("conf.login").unwrap(), "admin");
        assert_eq!(config.get_string("conf.web_container").unwrap(), "GlassFish");
        assert_eq!(loader.origins().len(), 2);
        assert!(loader.origins()[0].ends_with("application.json"));
    }

    #[test]
    fn test_load_with_paths_reports_parse_errors() {
        let temp = TempDir::new().unwrap();
        let broken = temp.path().join("application.yaml");
        std::fs::write(&broken, "conf: [unclosed\n").unwrap();

        let err = ConfigLoader::load_with_paths(ConfigPaths::with_files(vec![], vec![broken])).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Parse);
    }

    #[test]
    fn test_user_tier_overrides_application() {
        let temp = TempDir::new().unwrap();
        let user_dir = temp.path().join("user");
        std::fs::create_dir_all(&user_dir).unwrap();
        let application = temp.path().join("application.yaml");
        std::fs::write(&application, "login: admin\n").unwrap();
        std::fs::write(user_dir.join("application.yaml"), "login: me\n").unwrap();

        let paths = ConfigPaths::with_files(vec![], vec![application]).with_user_dir(&user_dir);
        let loader = ConfigLoader::load_with_paths(paths).unwrap();
        assert_eq!(loader.config().get_string("login").unwrap(), "me");
    }
}
