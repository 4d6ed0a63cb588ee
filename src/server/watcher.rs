//! Watch adapter over OS file change notification
//!
//! Wraps a `notify::RecommendedWatcher` watching individual files. The
//! `notify` callback runs on the backend's own thread and forwards
//! [`WatchEvent`]s through a channel; [`run_watch_loop`] drains that channel
//! on the runtime and calls the registry's narrow "file written" entry point.
//!
//! ```text
//! ┌─────────────┐  WatchEvent  ┌────────────────┐  notify_file_written  ┌──────────┐
//! │   notify    │─────────────>│ run_watch_loop │──────────────────────>│ Registry │
//! │  (thread)   │   (mpsc)     │    (task)      │                       │          │
//! └─────────────┘              └────────────────┘                       └──────────┘
//! ```
//!
//! The backend thread never waits on the runtime: when the channel is full
//! the event is dropped and an overflow flag is raised, and the loop then
//! re-registers and re-announces every tracked file. Re-registration talks
//! to the backend thread, so it always runs on the blocking pool.
//!
//! Delivery is best effort. A burst of writes may arrive as fewer events,
//! and consumers treat each one as "re-fetch", never as a diff.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use notify::event::{EventKind, ModifyKind};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use super::registry::Registry;

/// Capacity of the channel bridging the `notify` thread to the runtime
const CHANNEL_CAPACITY: usize = 256;

/// Pause between attempts to re-register a file that an editor replaced
const REWATCH_DELAY: Duration = Duration::from_millis(50);

/// Attempts before a removed file is given up on
const REWATCH_ATTEMPTS: u32 = 10;

// ============================================================================
// Errors
// ============================================================================

/// Watch adapter errors
#[derive(Error, Debug)]
pub enum WatchError {
    /// The platform watcher could not be created
    #[error("failed to create file watcher: {0}")]
    Init(#[source] notify::Error),

    /// A path could not be registered
    #[error("failed to watch {path}: {source}")]
    Watch {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    /// The watcher has already been closed
    #[error("file watcher is closed")]
    Closed,
}

// ============================================================================
// Seam used by the registry
// ============================================================================

/// File-level watch registration, as seen by the registry
pub trait FileWatch: Send + Sync {
    /// Begin monitoring a single file
    fn add(&self, path: &Path) -> Result<(), WatchError>;

    /// Stop monitoring everything; the event loop ends afterwards
    fn close(&self);
}

// ============================================================================
// Events
// ============================================================================

/// Change reported for a watched path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// File content was written
    Written(PathBuf),

    /// File was removed or renamed away (editors often save this way)
    Removed(PathBuf),
}

/// Map a native event onto the changes the registry cares about
pub fn classify(event: &notify::Event) -> Vec<WatchEvent> {
    let make: fn(PathBuf) -> WatchEvent = match event.kind {
        EventKind::Modify(ModifyKind::Data(_)) | EventKind::Modify(ModifyKind::Any) => {
            WatchEvent::Written
        }
        EventKind::Modify(ModifyKind::Name(_)) | EventKind::Remove(_) => WatchEvent::Removed,
        _ => return Vec::new(),
    };

    event.paths.iter().cloned().map(make).collect()
}

// ============================================================================
// Adapter
// ============================================================================

/// File watcher that reports writes to individually registered files.
///
/// Dropping the inner `RecommendedWatcher` (see [`FileWatch::close`]) stops
/// the backend thread, which drops the channel sender and ends the loop.
pub struct WatchAdapter {
    watcher: Mutex<Option<RecommendedWatcher>>,
    overflowed: Arc<AtomicBool>,
}

impl WatchAdapter {
    /// Create the platform watcher and the receiver its events arrive on
    pub fn new() -> Result<(Self, mpsc::Receiver<WatchEvent>), WatchError> {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let overflowed = Arc::new(AtomicBool::new(false));

        let flag = Arc::clone(&overflowed);
        let watcher = RecommendedWatcher::new(
            move |res: notify::Result<notify::Event>| match res {
                Ok(event) => {
                    for change in classify(&event) {
                        match tx.try_send(change) {
                            Ok(()) => {}
                            Err(TrySendError::Full(_)) => {
                                if !flag.swap(true, Ordering::Relaxed) {
                                    tracing::warn!(
                                        capacity = CHANNEL_CAPACITY,
                                        "watch channel full, coalescing into a refresh"
                                    );
                                }
                            }
                            Err(TrySendError::Closed(_)) => return,
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "file watcher error");
                }
            },
            notify::Config::default(),
        )
        .map_err(WatchError::Init)?;

        Ok((
            Self {
                watcher: Mutex::new(Some(watcher)),
                overflowed,
            },
            rx,
        ))
    }

    /// Re-register `path` after it was replaced. Returns `false` if the file
    /// is not there (yet).
    ///
    /// Blocks on the backend thread; call it from the blocking pool.
    pub fn rewatch(&self, path: &Path) -> Result<bool, WatchError> {
        if !path.exists() {
            return Ok(false);
        }

        let mut guard = self.watcher.lock().unwrap_or_else(|e| e.into_inner());
        let watcher = guard.as_mut().ok_or(WatchError::Closed)?;

        // The old registration may already be gone with the replaced inode
        let _ = watcher.unwatch(path);
        watcher
            .watch(path, RecursiveMode::NonRecursive)
            .map_err(|source| WatchError::Watch {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(true)
    }

    /// Clear the overflow flag, returning whether events were dropped
    pub fn take_overflow(&self) -> bool {
        self.overflowed.swap(false, Ordering::Relaxed)
    }

    /// Whether [`FileWatch::close`] has been called
    pub fn is_closed(&self) -> bool {
        self.watcher
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_none()
    }
}

impl FileWatch for WatchAdapter {
    fn add(&self, path: &Path) -> Result<(), WatchError> {
        let mut guard = self.watcher.lock().unwrap_or_else(|e| e.into_inner());
        let watcher = guard.as_mut().ok_or(WatchError::Closed)?;

        watcher
            .watch(path, RecursiveMode::NonRecursive)
            .map_err(|source| WatchError::Watch {
                path: path.to_path_buf(),
                source,
            })
    }

    fn close(&self) {
        let watcher = self
            .watcher
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        drop(watcher);
    }
}

/// Drain watch events into the registry until the watcher is closed.
///
/// Errors are logged and never end the loop. Re-registration of replaced
/// files happens in separate tasks so the loop keeps draining.
pub async fn run_watch_loop(
    registry: Arc<Registry>,
    adapter: Arc<WatchAdapter>,
    mut events: mpsc::Receiver<WatchEvent>,
) {
    tracing::debug!("watch loop started");

    while let Some(event) = events.recv().await {
        if adapter.take_overflow() {
            let paths = registry.tracked_paths().await;
            tracing::debug!(files = paths.len(), "refreshing after dropped watch events");
            for path in paths {
                tokio::spawn(rewatch_replaced(registry.clone(), adapter.clone(), path));
            }
        }

        match event {
            WatchEvent::Written(path) => {
                registry.notify_file_written(&path).await;
            }
            WatchEvent::Removed(path) => {
                tokio::spawn(rewatch_replaced(registry.clone(), adapter.clone(), path));
            }
        }
    }

    tracing::debug!("watch loop stopped");
}

/// Re-register a file that was removed or renamed away, waiting briefly for
/// an editor to put the new version in place. A successful re-registration
/// counts as a write.
async fn rewatch_replaced(registry: Arc<Registry>, adapter: Arc<WatchAdapter>, path: PathBuf) {
    for attempt in 0..REWATCH_ATTEMPTS {
        if attempt > 0 {
            tokio::time::sleep(REWATCH_DELAY).await;
        }

        let task_adapter = Arc::clone(&adapter);
        let task_path = path.clone();
        match tokio::task::spawn_blocking(move || task_adapter.rewatch(&task_path)).await {
            Ok(Ok(true)) => {
                tracing::debug!(path = %path.display(), "re-watching replaced file");
                registry.notify_file_written(&path).await;
                return;
            }
            Ok(Ok(false)) => {}
            Ok(Err(WatchError::Closed)) => return,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "failed to re-watch file");
                return;
            }
            Err(e) => {
                tracing::warn!(error = %e, "re-watch task failed");
                return;
            }
        }
    }

    tracing::warn!(path = %path.display(), "watched file disappeared");
}

// ============================================================================
// Tests
// ============================================================================
