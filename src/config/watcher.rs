//! Config file watcher for hot-reloading the BPM limits

use anyhow::{Context, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::AppConfig;

/// Wait after a file event before reading, so partial writes settle
const RELOAD_DEBOUNCE: Duration = Duration::from_millis(100);

/// Watches the config file and yields each valid, changed config
///
/// Editors often emit several events per save (or replace the file
/// outright), so reloads equal to the last delivered config are swallowed.
pub struct ConfigWatcher {
    _watcher: RecommendedWatcher,
    rx: mpsc::Receiver<AppConfig>,
    current: AppConfig,
}

impl ConfigWatcher {
    /// Load the config file and start watching it
    pub async fn new(config_path: impl Into<PathBuf>) -> Result<(Self, AppConfig)> {
        let config_path = config_path.into();
        let (tx, rx) = mpsc::channel(10);

        let initial_config = AppConfig::load(&config_path)
            .await
            .context("Failed to load initial config")?;

        // notify calls back on its own thread, outside the runtime
        let runtime = tokio::runtime::Handle::current();
        let reload_path = config_path.clone();

        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
            let event = match res {
                Ok(event) => event,
                Err(e) => {
                    error!("Config watch error: {}", e);
                    return;
                }
            };

            if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                return;
            }
            debug!(paths = ?event.paths, "Config file event");

            let path = reload_path.clone();
            let tx = tx.clone();
            runtime.spawn(async move {
                tokio::time::sleep(RELOAD_DEBOUNCE).await;
                reload(&path, &tx).await;
            });
        })?;

        watcher
            .watch(Path::new(&config_path), RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch config file: {}", config_path.display()))?;

        info!(
            bpm = %initial_config.metronome.range(),
            "Watching {} for changes",
            config_path.display()
        );

        let watcher = Self {
            _watcher: watcher,
            rx,
            current: initial_config.clone(),
        };
        Ok((watcher, initial_config))
    }

    /// Last config handed out (initial or reloaded)
    pub fn current(&self) -> &AppConfig {
        &self.current
    }

    /// Wait for the next valid config that differs from the current one
    ///
    /// Returns `None` once the watcher is closed.
    pub async fn next_config(&mut self) -> Option<AppConfig> {
        loop {
            let config = self.rx.recv().await?;
            if config == self.current {
                debug!("Config reloaded without changes");
                continue;
            }

            info!(
                bpm = %config.metronome.range(),
                default_bpm = config.metronome.default_bpm,
                "Configuration reloaded"
            );
            self.current = config.clone();
            return Some(config);
        }
    }
}

/// Load and validate the file; invalid edits keep the previous config
async fn reload(path: &Path, tx: &mpsc::Sender<AppConfig>) {
    match AppConfig::load(path).await {
        Ok(config) => {
            if tx.send(config).await.is_err() {
                debug!("Config watcher dropped, discarding reload");
            }
        }
        Err(e) => warn!("Ignoring invalid config edit (keeping previous limits): {:#}", e),
    }
}
