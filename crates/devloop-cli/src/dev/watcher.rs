//! File system watcher feeding the build queue.
//!
//! Watches a directory recursively and filters out paths outside the root,
//! hidden files and configured ignore patterns. No debouncing happens here;
//! the throttled queue decides which changes become builds.

use crate::dev::queue::{EnqueueOutcome, QueueTask, ThrottledQueue};
use crate::dev::{ChangeEvent, ChangeKind};
use crate::error::{CliError, Result};
use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::future::Future;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

/// Items produced by the watcher: one per changed path, or a watcher error.
pub type WatchItem = std::result::Result<ChangeEvent, notify::Error>;

/// Recursive, event-driven directory watcher.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    root: PathBuf,
}

impl FileWatcher {
    /// Start watching `root`.
    ///
    /// # Errors
    ///
    /// Returns error if the directory doesn't exist or the OS watcher
    /// cannot be created.
    pub fn new(
        root: PathBuf,
        ignore_patterns: Vec<String>,
    ) -> Result<(Self, mpsc::Receiver<WatchItem>)> {
        if !root.exists() {
            return Err(CliError::FileNotFound(root));
        }

        let (tx, rx) = mpsc::channel(100);
        let root_clone = root.clone();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let event = match res {
                Ok(event) => event,
                Err(e) => {
                    let _ = tx.blocking_send(Err(e));
                    return;
                }
            };

            let Some(kind) = change_kind(&event.kind) else {
                return;
            };

            for path in &event.paths {
                if Self::should_ignore(path, &root_clone, &ignore_patterns) {
                    continue;
                }
                let Ok(rel) = path.strip_prefix(&root_clone) else {
                    continue;
                };
                let file_name = rel.to_string_lossy().replace('\\', "/");
                let _ = tx.blocking_send(Ok(ChangeEvent::new(file_name, kind)));
            }
        })?;

        watcher.watch(&root, RecursiveMode::Recursive)?;

        Ok((
            Self {
                _watcher: watcher,
                root,
            },
            rx,
        ))
    }

    /// Check if a path should be ignored.
    fn should_ignore(path: &Path, root: &Path, ignore_patterns: &[String]) -> bool {
        let rel_path = match path.strip_prefix(root) {
            Ok(p) => p,
            Err(_) => return true,
        };

        let path_str = rel_path.to_string_lossy().replace('\\', "/");
        if path_str.is_empty() {
            return true;
        }

        for pattern in ignore_patterns {
            if let Some(ext) = pattern.strip_prefix('*') {
                if path_str.ends_with(ext) {
                    return true;
                }
            } else if path_str == *pattern
                || path_str.starts_with(&format!("{}/", pattern))
                || path_str.contains(&format!("/{}/", pattern))
                || path_str.ends_with(&format!("/{}", pattern))
            {
                return true;
            }
        }

        rel_path.components().any(|component| {
            component
                .as_os_str()
                .to_str()
                .is_some_and(|name| name.starts_with('.') && name != "." && name != "..")
        })
    }

    /// Get the root directory being watched.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Map a notify event kind onto a change kind. Access and other events are dropped.
fn change_kind(kind: &EventKind) -> Option<ChangeKind> {
    match kind {
        EventKind::Create(_) | EventKind::Remove(_) => Some(ChangeKind::Rename),
        EventKind::Modify(ModifyKind::Name(_)) => Some(ChangeKind::Rename),
        EventKind::Modify(_) => Some(ChangeKind::Change),
        _ => None,
    }
}

/// Consume watcher items forever, enqueueing one task per change.
///
/// Watcher errors are logged and skipped. Returns when the channel closes.
pub async fn run_watch_loop<F, Fut>(
    mut rx: mpsc::Receiver<WatchItem>,
    queue: &ThrottledQueue,
    mut make_task: F,
) where
    F: FnMut(ChangeEvent) -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
{
    while let Some(item) = rx.recv().await {
        match item {
            Ok(event) => {
                tracing::debug!("{} {}", event.file_name, event.kind);
                let task: QueueTask = Box::pin(make_task(event));
                if queue.enqueue(task) == EnqueueOutcome::Closed {
                    break;
                }
            }
            Err(e) => tracing::error!("File watcher error: {}", e),
        }
    }
}
