//! Configuration file watcher for hot reload.
//!
//! The parent directory is watched rather than the file itself, so saves that
//! replace the file (write to a temp file, then rename) keep being seen.
//! A reload is only sent when the file contents actually changed and parse
//! into a valid config.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::parse_config;
use crate::config::schema::IntakeConfig;

/// Watches the config file and publishes each valid new version.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<IntakeConfig>,
}

impl ConfigWatcher {
    /// Returns the watcher and the receiving end of its update channel.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<IntakeConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let watcher = Self {
            path: path.to_path_buf(),
            update_tx,
        };
        (watcher, update_rx)
    }

    /// Start watching. Updates flow for as long as the returned handle lives.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let file_name = self.path.file_name().map(|name| name.to_os_string());

        let mut reloader = Reloader {
            path: self.path.clone(),
            last_contents: fs::read_to_string(&self.path).ok(),
            update_tx: self.update_tx,
        };

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    let touches_file = event
                        .paths
                        .iter()
                        .any(|p| p.file_name() == file_name.as_deref());
                    if touches_file && (event.kind.is_modify() || event.kind.is_create()) {
                        reloader.reload();
                    }
                }
                Err(e) => tracing::error!(error = ?e, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Config watcher started");
        Ok(watcher)
    }
}

/// Reload state owned by the notify callback.
struct Reloader {
    path: PathBuf,
    last_contents: Option<String>,
    update_tx: mpsc::UnboundedSender<IntakeConfig>,
}

impl Reloader {
    fn reload(&mut self) {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) => {
                tracing::debug!(error = %e, "Config file not readable yet");
                return;
            }
        };
        // Mid-write truncation shows up as an empty file.
        if contents.trim().is_empty() || self.last_contents.as_deref() == Some(contents.as_str()) {
            return;
        }

        match parse_config(&contents) {
            Ok(config) => {
                tracing::info!(path = ?self.path, "Config file changed, applying");
                self.last_contents = Some(contents);
                let _ = self.update_tx.send(config);
            }
            Err(e) => {
                tracing::error!(error = %e, "Rejected config change, keeping current configuration");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::ROUTE_SUBSCRIBE;

    fn write_policy(path: &Path, limit: u32) {
        let toml = format!("[rate_limit.routes.subscribe]\nlimit = {limit}\nwindow_secs = 60\n");
        std::fs::write(path, toml).unwrap();
    }

    #[tokio::test]
    async fn test_rewrite_sends_reloaded_config() {
        let path = std::env::temp_dir().join(format!("intake-gate-watch-{}.toml", uuid::Uuid::new_v4()));
        write_policy(&path, 3);

        let (watcher, mut updates) = ConfigWatcher::new(&path);
        let _watcher = watcher.run().unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        write_policy(&path, 7);

        // A rewrite can surface as several events, some seeing a truncated file.
        let reloaded = tokio::time::timeout(Duration::from_secs(10), async {
            loop {
                let config = updates.recv().await.unwrap();
                if config.rate_limit.policy(ROUTE_SUBSCRIBE).limit == 7 {
                    return config;
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(reloaded.rate_limit.policy(ROUTE_SUBSCRIBE).window_secs, 60);
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_invalid_rewrite_is_not_sent() {
        let path = std::env::temp_dir().join(format!("intake-gate-watch-{}.toml", uuid::Uuid::new_v4()));
        write_policy(&path, 3);

        let (watcher, mut updates) = ConfigWatcher::new(&path);
        let _watcher = watcher.run().unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        write_policy(&path, 0);
        tokio::time::sleep(Duration::from_millis(500)).await;

        while let Ok(config) = updates.try_recv() {
            assert_ne!(config.rate_limit.policy(ROUTE_SUBSCRIBE).limit, 0);
        }
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_rename_save_is_picked_up() {
        let dir = std::env::temp_dir().join(format!("intake-gate-watch-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("intake.toml");
        write_policy(&path, 3);

        let (watcher, mut updates) = ConfigWatcher::new(&path);
        let _watcher = watcher.run().unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        let staged = dir.join("intake.toml.tmp");
        write_policy(&staged, 9);
        std::fs::rename(&staged, &path).unwrap();

        let reloaded = tokio::time::timeout(Duration::from_secs(10), updates.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reloaded.rate_limit.policy(ROUTE_SUBSCRIBE).limit, 9);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_unchanged_and_blank_contents_are_skipped() {
        let path = std::env::temp_dir().join(format!("intake-gate-watch-{}.toml", uuid::Uuid::new_v4()));
        write_policy(&path, 3);
        let (update_tx, mut updates) = mpsc::unbounded_channel();
        let mut reloader = Reloader {
            path: path.clone(),
            last_contents: std::fs::read_to_string(&path).ok(),
            update_tx,
        };

        reloader.reload();
        assert!(updates.try_recv().is_err());

        std::fs::write(&path, "").unwrap();
        reloader.reload();
        assert!(updates.try_recv().is_err());

        write_policy(&path, 4);
        reloader.reload();
        assert_eq!(updates.try_recv().unwrap().rate_limit.policy(ROUTE_SUBSCRIBE).limit, 4);
        let _ = std::fs::remove_file(&path);
    }
}
