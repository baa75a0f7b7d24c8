//! Configuration file watcher for hot reload.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::loader::load_config;
use crate::config::schema::DirectCallConfig;
use crate::discovery::StaticDirectory;
use crate::http::DirectServiceClient;

/// Watches one configuration file and emits every valid new version.
///
/// The parent directory is watched rather than the file itself, so editors
/// that save by renaming a temporary file are picked up too. Dropping the
/// watcher stops it.
pub struct ConfigWatcher {
    _watcher: RecommendedWatcher,
    path: PathBuf,
}

impl ConfigWatcher {
    /// Start watching `path`. Invalid versions are logged and skipped.
    pub fn start(
        path: &Path,
    ) -> Result<(Self, mpsc::UnboundedReceiver<DirectCallConfig>), notify::Error> {
        let (tx, rx) = mpsc::unbounded_channel();
        let target = path.to_path_buf();
        let file_name = target.file_name().map(|n| n.to_os_string());

        let handler = {
            let target = target.clone();
            move |res: notify::Result<Event>| {
                let event = match res {
                    Ok(event) => event,
                    Err(e) => {
                        tracing::warn!(error = %e, "Config watch error");
                        return;
                    }
                };
                let relevant = (event.kind.is_modify() || event.kind.is_create())
                    && event
                        .paths
                        .iter()
                        .any(|p| p.file_name().map(|n| n.to_os_string()) == file_name);
                if !relevant {
                    return;
                }
                match load_config(&target) {
                    Ok(config) => {
                        tracing::info!(path = %target.display(), "Config file changed");
                        let _ = tx.send(config);
                    }
                    Err(e) => {
                        tracing::error!(path = %target.display(), error = %e, "Ignoring invalid config");
                    }
                }
            }
        };

        let mut watcher = RecommendedWatcher::new(
            handler,
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;
        let dir = match target.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;
        tracing::info!(path = %target.display(), "Config watcher started");

        Ok((
            Self {
                _watcher: watcher,
                path: target,
            },
            rx,
        ))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Apply every received configuration to `client` and `directory`.
/// The task ends when the sending side is dropped.
pub fn spawn_reload(
    client: Arc<DirectServiceClient>,
    directory: StaticDirectory,
    mut updates: mpsc::UnboundedReceiver<DirectCallConfig>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(config) = updates.recv().await {
            apply(&client, &directory, &config);
        }
        tracing::debug!("Config reload task stopped");
    })
}

fn apply(client: &DirectServiceClient, directory: &StaticDirectory, config: &DirectCallConfig) {
    directory.replace_all(&config.services);
    client.reload(config);
    tracing::info!(services = directory.len(), "Configuration applied");
}
