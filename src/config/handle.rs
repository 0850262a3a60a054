//! Shared, atomically replaceable configuration.
//!
//! Readers take a snapshot with [`ConfigHandle::current`] and keep it for as
//! long as they like; a reload swaps in a whole new [`Config`] or, on failure,
//! leaves the previous one in place.

use super::access::Config;
use super::loader::{ConfigLoader, ConfigPaths};
use super::merge::Layer;
use crate::error::Result;
use arc_swap::ArcSwap;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug)]
pub struct ConfigHandle {
    current: ArcSwap<Config>,
}

impl ConfigHandle {
    pub fn new(config: Config) -> Self {
        Self {
            current: ArcSwap::from_pointee(config),
        }
    }

    /// Snapshot of the configuration in effect right now.
    pub fn current(&self) -> Arc<Config> {
        self.current.load_full()
    }

    /// Replace the configuration outright.
    pub fn store(&self, config: Config) {
        self.current.store(Arc::new(config));
    }

    /// Merge and resolve `layers`, swapping the result in on success.
    ///
    /// On error the previous configuration stays current and the error is
    /// returned to the caller.
    pub fn reload(&self, layers: Vec<Layer>) -> Result<Arc<Config>> {
        match Config::from_layers(layers) {
            Ok(config) => {
                let config = Arc::new(config);
                self.current.store(Arc::clone(&config));
                info!("Configuration reloaded successfully");
                Ok(config)
            }
            Err(e) => {
                warn!(error = %e, "Configuration reload failed; keeping previous configuration");
                Err(e)
            }
        }
    }

    /// Re-read every tier from `paths` and reload from it.
    pub fn reload_from(&self, paths: &ConfigPaths) -> Result<Arc<Config>> {
        let layers = match paths.read_layers() {
            Ok(layers) => layers,
            Err(e) => {
                warn!(error = %e, "Failed to read configuration; keeping previous configuration");
                return Err(e);
            }
        };
        self.reload(layers)
    }
}

impl From<ConfigLoader> for ConfigHandle {
    fn from(loader: ConfigLoader) -> Self {
        Self::new(loader.into_config())
    }
}
