//! layerconf
//!
//! Loads layered configuration, resolves references and prints typed values.

use anyhow::Result;
use clap::Parser;
use layerconf::cli::{Cli, Command, get, render};
use layerconf::config::{
    ConfigHandle, ConfigLoader, ConfigPaths,
    watcher::{WatchPaths, WatcherConfig, start_config_watcher},
};
use std::fs::OpenOptions;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// `RUST_LOG` when set, otherwise `debug` with `-v` and `info` without.
fn env_filter(cli: &Cli) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if cli.verbose { "debug" } else { "info" }))
}

fn init_logging(cli: &Cli) -> Result<()> {
    match cli.log.as_str() {
        "0" | "off" => {
            // No logging
        }
        "1" | "stdout" => {
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(env_filter(cli))
                .with_writer(std::io::stdout)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        "2" | "stderr" => {
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(env_filter(cli))
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        filename => {
            // Log to file (append mode)
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(filename)?;
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(env_filter(cli))
                .with_writer(file)
                .with_ansi(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    let paths = cli.config_paths();
    let loader = ConfigLoader::load_with_paths(paths.clone())?;

    match &cli.command {
        Command::Get(args) => println!("{}", get::run(loader.config(), args)?),
        Command::Render(args) => println!("{}", render::run(loader.config(), args)?),
        Command::Check => {
            for origin in loader.origins() {
                println!("{}", origin);
            }
            println!("OK: {} layer(s) resolved", loader.origins().len());
        }
        Command::Watch => run_watch(ConfigHandle::from(loader), paths).await?,
    }
    Ok(())
}

/// Reload on every layer file change until the watcher stops.
async fn run_watch(handle: ConfigHandle, paths: ConfigPaths) -> Result<()> {
    let watch_paths = WatchPaths::from_config_paths(&paths);
    let mut watcher = start_config_watcher(watch_paths, WatcherConfig::default())?;
    info!("Config file watcher started");

    loop {
        match watcher.wait_for_change().await {
            Some(event) if event.requires_reload() => {
                info!("Config change detected: {:?}", event);
                if let Ok(config) = handle.reload_from(&paths) {
                    info!(keys = config.root().len(), "Swapped in new configuration");
                }
            }
            Some(event) => warn!("Config watcher reported: {:?}", event),
            None => {
                // Sender dropped -- watcher stopped
                info!("Config file watcher stopped");
                return Ok(());
            }
        }
    }
}
