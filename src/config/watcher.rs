//! Route file watcher for hot reload.
//!
//! The parent directory is watched rather than the file itself, so editors
//! that save by writing a temporary file and renaming it over the route file
//! keep triggering reloads. Each change is loaded and validated, which
//! compiles every route expression, and the outcome is sent to the reload
//! loop whether it succeeded or not.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::{parse_config, ConfigError};
use crate::config::schema::RouterConfig;

/// A validated route file, or the reason it was rejected.
pub type RouteFileUpdate = Result<RouterConfig, ConfigError>;

/// A watcher that monitors the route file for changes.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<RouteFileUpdate>,
}

impl ConfigWatcher {
    /// Returns the watcher and a receiver for route file updates.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<RouteFileUpdate>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        (
            Self {
                path: path.to_path_buf(),
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching in a background thread.
    ///
    /// The returned handle must be kept alive for events to be delivered.
    /// The content present at startup counts as already delivered.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let mut reloader = Reloader::new(self.path.clone(), self.update_tx);

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => reloader.on_event(&event),
                Err(e) => tracing::error!(error = %e, "Route file watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        tracing::info!(path = %self.path.display(), "Route file watcher started");
        Ok(watcher)
    }
}

/// Turns file system events into route file updates.
struct Reloader {
    path: PathBuf,
    last: Option<String>,
    tx: mpsc::UnboundedSender<RouteFileUpdate>,
}

impl Reloader {
    fn new(path: PathBuf, tx: mpsc::UnboundedSender<RouteFileUpdate>) -> Self {
        let last = fs::read_to_string(&path).ok();
        Self { path, last, tx }
    }

    fn concerns(&self, event: &Event) -> bool {
        (event.kind.is_modify() || event.kind.is_create())
            && event
                .paths
                .iter()
                .any(|p| p.file_name() == self.path.file_name())
    }

    fn on_event(&mut self, event: &Event) {
        if !self.concerns(event) {
            return;
        }

        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            // replaced by rename; the create event follows
            Err(e) if e.kind() == io::ErrorKind::NotFound => return,
            Err(e) => {
                self.send(Err(ConfigError::Io(e)));
                return;
            }
        };
        if content.trim().is_empty() {
            tracing::debug!(path = %self.path.display(), "Route file empty, waiting for write");
            return;
        }
        if self.last.as_deref() == Some(content.as_str()) {
            tracing::debug!(path = %self.path.display(), "Route file content unchanged");
            return;
        }

        tracing::info!(path = %self.path.display(), "Route file change detected, reloading");
        let update = parse_config(&content);
        self.last = Some(content);
        self.send(update);
    }

    fn send(&self, update: RouteFileUpdate) {
        if self.tx.send(update).is_err() {
            tracing::warn!(
                path = %self.path.display(),
                "Reload receiver closed, route file update dropped"
            );
        }
    }
}
