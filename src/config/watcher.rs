//! Configuration file watcher for hot reload.
//!
//! Only validated configurations are sent on; a broken edit keeps the
//! running configuration in place.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::GatewayConfig;
use crate::observability::metrics;

/// Watches the gateway configuration file and emits reloaded configs.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<GatewayConfig>,
}

impl ConfigWatcher {
    /// Returns the watcher and the receiving end for reloaded configs.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<GatewayConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        (
            Self {
                path: path.to_path_buf(),
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching. Dropping the returned handle stops the watch.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let Self { path, update_tx } = self;
        let reload_path = path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if event.kind.is_modify() || event.kind.is_create() => {
                    match load_config(&reload_path) {
                        Ok(config) => match update_tx.send(config) {
                            Ok(()) => {
                                tracing::info!(path = ?reload_path, "Configuration reloaded from disk");
                                metrics::record_config_reload("ok");
                            }
                            Err(_) => {
                                tracing::warn!(path = ?reload_path, "Configuration reloaded but no server is listening for updates");
                                metrics::record_config_reload("dropped");
                            }
                        },
                        Err(e) => {
                            tracing::error!(error = %e, "Rejected configuration change; keeping current configuration");
                            metrics::record_config_reload("rejected");
                        }
                    }
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = ?e, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&path, RecursiveMode::NonRecursive)?;
        tracing::info!(path = ?path, "Config watcher started");
        Ok(watcher)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::OpenOptions;
    use std::io::Write;
    use tokio::time::timeout;

    const FILE_LEN: usize = 128;

    /// Overwrite in place with a fixed-length body so a reader never sees a
    /// truncated (and therefore default-valid) file.
    fn overwrite(path: &Path, content: &str) {
        let mut body = format!("{}\n#", content);
        body.push_str(&" ".repeat(FILE_LEN - body.len()));
        let mut file = OpenOptions::new().write(true).open(path).unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file.sync_all().unwrap();
    }

    fn upstream(config: &GatewayConfig) -> Option<&str> {
        config.upstream.address.as_deref()
    }

    #[tokio::test]
    async fn test_sends_valid_edits_and_rejects_broken_ones() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gateway.toml");
        std::fs::write(&path, "").unwrap();
        overwrite(&path, "[upstream]\naddress = \"127.0.0.1:9000\"");

        let (watcher, mut updates) = ConfigWatcher::new(&path);
        let _watch = watcher.run().unwrap();

        overwrite(&path, "[upstream]\naddress = \"127.0.0.1:9001\"");
        let reloaded = timeout(Duration::from_secs(10), updates.recv())
            .await
            .expect("no reload within timeout")
            .unwrap();
        assert_eq!(upstream(&reloaded), Some("127.0.0.1:9001"));

        // zero cache size fails validation, so this upstream must never appear
        overwrite(
            &path,
            "[upstream]\naddress = \"127.0.0.1:9002\"\n[normalizer]\nmax_cache_size = 0",
        );
        let mut later = Vec::new();
        while let Ok(Some(config)) = timeout(Duration::from_secs(3), updates.recv()).await {
            later.push(config);
        }
        assert!(
            later.iter().all(|c| upstream(c) == Some("127.0.0.1:9001")),
            "rejected edit leaked: {:?}",
            later.iter().map(upstream).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_send_after_receiver_dropped_does_not_panic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gateway.toml");
        std::fs::write(&path, "").unwrap();

        let (watcher, updates) = ConfigWatcher::new(&path);
        drop(updates);
        let _watch = watcher.run().unwrap();
        overwrite(&path, "[upstream]\naddress = \"127.0.0.1:9001\"");
        std::thread::sleep(Duration::from_millis(300));
    }
}
