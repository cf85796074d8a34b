//! Configuration file watcher for hot reload.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_routes;
use crate::config::remote::RemoteConfig;

/// A watcher that monitors the configuration file for changes.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<RemoteConfig>,
}

impl ConfigWatcher {
    /// Create a new ConfigWatcher.
    ///
    /// Returns the watcher and a receiver for validated route updates.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<RemoteConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching the file. Events are handled on notify's own thread.
    ///
    /// Keep the returned watcher alive for as long as reloads are wanted.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.update_tx;
        let path = self.path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        tracing::info!(path = ?path, "Config file change detected, reloading");
                        match load_routes(&path) {
                            Ok((_, routes)) => {
                                let _ = tx.send(routes);
                            }
                            Err(e) => {
                                tracing::error!(
                                    error = %e,
                                    "Failed to reload config, keeping current configuration"
                                );
                            }
                        }
                    }
                }
                Err(e) => tracing::error!(error = ?e, "Watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Config watcher started");
        Ok(watcher)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::OpenOptions;
    use std::io::Write;

    const SINGLE_RULE: &str = "[[ingress]]\nservice = \"http_status:404\"\n";
    const TWO_RULES: &str = "[[ingress]]\nhostname = \"app.example.com\"\nservice = \"http://localhost:8000\"\n\n[[ingress]]\nservice = \"http_status:404\"\n";
    const MISSING_SERVICE: &str = "[[ingress]]\nhostname = \"app.example.com\"\n";

    /// Rewrite in place at a fixed size so a reload never sees a truncated file.
    fn overwrite(path: &Path, content: &str) {
        let padded = format!("{:<512}", content);
        let mut file = OpenOptions::new().write(true).open(path).unwrap();
        file.write_all(padded.as_bytes()).unwrap();
        file.sync_all().unwrap();
    }

    #[tokio::test]
    async fn test_reload_sends_valid_config_and_drops_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("origin-ingress.toml");
        std::fs::write(&path, format!("{:<512}", SINGLE_RULE)).unwrap();

        let (watcher, mut updates) = ConfigWatcher::new(&path);
        let _guard = watcher.run().unwrap();

        overwrite(&path, TWO_RULES);
        let update = tokio::time::timeout(Duration::from_secs(5), updates.recv())
            .await
            .expect("no reload after a valid change")
            .unwrap();
        assert_eq!(update.ingress.len(), 2);
        assert_eq!(update.ingress.rules[0].hostname, "app.example.com");

        // Let duplicate events for the same write settle.
        tokio::time::sleep(Duration::from_millis(300)).await;
        while updates.try_recv().is_ok() {}

        overwrite(&path, MISSING_SERVICE);
        let nothing = tokio::time::timeout(Duration::from_millis(700), updates.recv()).await;
        assert!(nothing.is_err(), "invalid reload was forwarded");
    }
}
