//! File watcher for configuration layers.
//!
//! Watches the directories holding the layer files of a [`ConfigPaths`] and
//! emits change events through a tokio watch channel. Uses debouncing to
//! coalesce rapid file changes (editors often write a file several times).

use super::loader::ConfigPaths;
use notify_debouncer_mini::{DebouncedEventKind, new_debouncer};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Event types emitted when layer files change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigChangeEvent {
    /// One layer file changed, appeared or was removed
    LayerFile(PathBuf),
    /// Several layer files changed in quick succession
    BatchChange(Vec<PathBuf>),
    /// Watcher encountered an error
    Error(String),
}

impl ConfigChangeEvent {
    /// Returns true if this event requires a config reload.
    pub fn requires_reload(&self) -> bool {
        !matches!(self, ConfigChangeEvent::Error(_))
    }
}

#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Debounce duration for coalescing rapid changes.
    pub debounce_duration: Duration,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            debounce_duration: Duration::from_millis(500),
        }
    }
}

/// Layer files of interest and the directories to watch for them.
///
/// Directories are watched rather than files so that a layer file created
/// after startup is still noticed.
#[derive(Debug, Clone, Default)]
pub struct WatchPaths {
    pub files: Vec<PathBuf>,
}

impl WatchPaths {
    pub fn from_config_paths(paths: &ConfigPaths) -> Self {
        Self {
            files: paths.files().into_iter().map(|(_, path)| absolute(&path)).collect(),
        }
    }

    fn directories(&self) -> BTreeSet<PathBuf> {
        self.files
            .iter()
            .filter_map(|file| file.parent().map(Path::to_path_buf))
            .collect()
    }

    fn is_layer_file(&self, path: &Path) -> bool {
        let path = absolute(path);
        self.files.iter().any(|file| *file == path)
    }
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Handle to control the config watcher.
pub struct ConfigWatcherHandle {
    /// Receiver for config change events.
    pub events: watch::Receiver<Option<ConfigChangeEvent>>,
    /// Handle to the watcher task (dropping this will stop the watcher).
    _task_handle: tokio::task::JoinHandle<()>,
}

impl ConfigWatcherHandle {
    /// Wait for the next config change event.
    pub async fn wait_for_change(&mut self) -> Option<ConfigChangeEvent> {
        // Skip the initial None value
        loop {
            if self.events.changed().await.is_err() {
                return None; // Sender dropped
            }
            let event = self.events.borrow().clone();
            if event.is_some() {
                return event;
            }
        }
    }
}

/// Starts watching the layer files.
///
/// # Example
/// ```ignore
/// let paths = ConfigPaths::discover();
/// let mut watcher = start_config_watcher(WatchPaths::from_config_paths(&paths), WatcherConfig::default())?;
///
/// while let Some(event) = watcher.wait_for_change().await {
///     if event.requires_reload() {
///         handle.reload_from(&paths)?;
///     }
/// }
/// ```
pub fn start_config_watcher(
    paths: WatchPaths,
    config: WatcherConfig,
) -> Result<ConfigWatcherHandle, notify::Error> {
    let (event_tx, event_rx) = watch::channel(None);
    let (notify_tx, notify_rx) = mpsc::channel();

    let mut debouncer = new_debouncer(config.debounce_duration, notify_tx)?;
    let watcher = debouncer.watcher();

    for dir in paths.directories() {
        if dir.is_dir() {
            info!("Watching config directory: {}", dir.display());
            watcher.watch(&dir, notify::RecursiveMode::NonRecursive)?;
        } else {
            warn!(
                "Config directory does not exist, skipping watch: {}",
                dir.display()
            );
        }
    }

    let task_handle = tokio::task::spawn_blocking(move || {
        // Keep the debouncer alive
        let _debouncer = debouncer;
        process_notify_events(notify_rx, event_tx, &paths);
    });

    Ok(ConfigWatcherHandle {
        events: event_rx,
        _task_handle: task_handle,
    })
}

fn process_notify_events(
    rx: mpsc::Receiver<Result<Vec<notify_debouncer_mini::DebouncedEvent>, notify::Error>>,
    tx: watch::Sender<Option<ConfigChangeEvent>>,
    paths: &WatchPaths,
) {
    loop {
        match rx.recv() {
            Ok(Ok(events)) => {
                let changed = events
                    .into_iter()
                    .filter(|event| {
                        matches!(
                            event.kind,
                            DebouncedEventKind::Any | DebouncedEventKind::AnyContinuous
                        )
                    })
                    .map(|event| event.path);
                if let Some(event) = classify_paths(changed, paths) {
                    debug!("Config change detected: {:?}", event);
                    if tx.send(Some(event)).is_err() {
                        info!("Config watcher receiver dropped, stopping");
                        return;
                    }
                }
            }
            Ok(Err(e)) => {
                error!("File watcher error: {}", e);
                let _ = tx.send(Some(ConfigChangeEvent::Error(e.to_string())));
            }
            Err(_) => {
                info!("Config watcher channel closed, stopping");
                return;
            }
        }
    }
}

/// Keep only layer files; several become one batch event.
fn classify_paths(
    changed: impl IntoIterator<Item = PathBuf>,
    paths: &WatchPaths,
) -> Option<ConfigChangeEvent> {
    let mut layer_files: Vec<PathBuf> = Vec::new();
    for path in changed {
        if paths.is_layer_file(&path) && !layer_files.contains(&path) {
            layer_files.push(path);
        }
    }

    match layer_files.len() {
        0 => None,
        1 => layer_files.pop().map(ConfigChangeEvent::LayerFile),
        _ => Some(ConfigChangeEvent::BatchChange(layer_files)),
    }
}
