//! File registry for the viewer session
//!
//! The registry is the single source of truth for groups, tracked files and
//! live-reload subscribers. All of it sits behind one reader/writer lock that
//! is only held for in-memory map work; watcher registration and event
//! delivery to the network happen outside of it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::Stream;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{mpsc, RwLock};

use crate::paths;

use super::events::{non_blocking_send, Delivery, Event, EventSink, SinkId, DEFAULT_SINK_CAPACITY};
use super::watcher::FileWatch;

/// Group used when the caller names none
pub const DEFAULT_GROUP: &str = "default";

/// Identifier of a tracked file, unique for the life of the process
pub type FileId = u64;

// ============================================================================
// File Entry / Group
// ============================================================================

/// One tracked file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Display name (base name of the path)
    pub name: String,

    /// Process-wide identifier
    pub id: FileId,

    /// Absolute path; never sent to clients
    #[serde(skip_serializing, default)]
    pub path: PathBuf,
}

impl FileEntry {
    fn new(id: FileId, path: PathBuf) -> Self {
        Self {
            name: paths::display_name(&path),
            id,
            path,
        }
    }

    /// Directory containing the file; relative links resolve against it
    pub fn base_dir(&self) -> PathBuf {
        self.path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.path.clone())
    }
}

/// Named, ordered collection of tracked files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub name: String,
    pub files: Vec<FileEntry>,
}

// ============================================================================
// Errors
// ============================================================================

/// Registry errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Paths must be resolved to absolute form before registration
    #[error("path is not absolute: {0}")]
    RelativePath(PathBuf),
}

// ============================================================================
// Registry
// ============================================================================

struct RegistryState {
    /// Groups in creation order, names unique
    groups: Vec<Group>,
    next_id: FileId,
    subscribers: HashMap<SinkId, mpsc::Sender<Event>>,
    next_sink_id: SinkId,
    closed: bool,
}

impl RegistryState {
    /// Insert `path` into `group`, returning the entry and whether it is new
    fn insert(&mut self, path: &Path, group: &str) -> (FileEntry, bool) {
        let index = match self.groups.iter().position(|g| g.name == group) {
            Some(index) => index,
            None => {
                self.groups.push(Group {
                    name: group.to_string(),
                    files: Vec::new(),
                });
                self.groups.len() - 1
            }
        };

        if let Some(existing) = self.groups[index].files.iter().find(|f| f.path == path) {
            return (existing.clone(), false);
        }

        let entry = FileEntry::new(self.next_id, path.to_path_buf());
        self.next_id += 1;
        self.groups[index].files.push(entry.clone());
        (entry, true)
    }

    fn entries(&self) -> impl Iterator<Item = (&Group, &FileEntry)> {
        self.groups
            .iter()
            .flat_map(|g| g.files.iter().map(move |f| (g, f)))
    }
}

/// Process-wide registry of groups, files and subscribers
pub struct Registry {
    state: RwLock<RegistryState>,
    watcher: Option<Arc<dyn FileWatch>>,
    sink_capacity: usize,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(DEFAULT_SINK_CAPACITY)
    }
}

impl Registry {
    /// Create an empty registry without file watching
    pub fn new(sink_capacity: usize) -> Self {
        Self {
            state: RwLock::new(RegistryState {
                groups: Vec::new(),
                next_id: 1,
                subscribers: HashMap::new(),
                next_sink_id: 1,
                closed: false,
            }),
            watcher: None,
            sink_capacity,
        }
    }

    /// Attach the watcher new files are registered with
    pub fn with_watcher(mut self, watcher: Arc<dyn FileWatch>) -> Self {
        self.watcher = Some(watcher);
        self
    }

    /// Track `path` in `group`.
    ///
    /// Idempotent per (path, group): a path already in the group returns the
    /// existing entry. An empty group name means [`DEFAULT_GROUP`]. A new
    /// entry is registered with the watcher and announced with an `update`
    /// event.
    pub async fn add_file(&self, path: &Path, group: &str) -> Result<FileEntry, RegistryError> {
        if !path.is_absolute() {
            return Err(RegistryError::RelativePath(path.to_path_buf()));
        }
        let group = if group.is_empty() { DEFAULT_GROUP } else { group };

        let (entry, created) = self.state.write().await.insert(path, group);
        if !created {
            return Ok(entry);
        }

        tracing::debug!(id = entry.id, group, path = %entry.path.display(), "tracking file");

        if let Some(watcher) = &self.watcher {
            // Registration waits on the watcher backend thread
            let watcher = Arc::clone(watcher);
            let path = entry.path.clone();
            match tokio::task::spawn_blocking(move || watcher.add(&path)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::warn!(error = %e, "file will not live-reload"),
                Err(e) => tracing::warn!(error = %e, "watch registration task failed"),
            }
        }

        self.publish(Event::Update).await;
        Ok(entry)
    }

    /// Snapshot of all groups in creation order
    pub async fn groups(&self) -> Vec<Group> {
        self.state.read().await.groups.clone()
    }

    /// Look up a file by id
    pub async fn find_file(&self, id: FileId) -> Option<FileEntry> {
        self.state
            .read()
            .await
            .entries()
            .find(|(_, f)| f.id == id)
            .map(|(_, f)| f.clone())
    }

    /// Name of the group holding file `id`
    pub async fn find_group_for_file(&self, id: FileId) -> Option<String> {
        self.state
            .read()
            .await
            .entries()
            .find(|(_, f)| f.id == id)
            .map(|(g, _)| g.name.clone())
    }

    /// Ids of every entry, across all groups, tracking `path`
    pub async fn ids_for_path(&self, path: &Path) -> Vec<FileId> {
        self.state
            .read()
            .await
            .entries()
            .filter(|(_, f)| f.path == path)
            .map(|(_, f)| f.id)
            .collect()
    }

    /// Every distinct tracked path, in group order
    pub async fn tracked_paths(&self) -> Vec<PathBuf> {
        let state = self.state.read().await;
        let mut paths: Vec<PathBuf> = Vec::new();
        for (_, f) in state.entries() {
            if !paths.contains(&f.path) {
                paths.push(f.path.clone());
            }
        }
        paths
    }

    /// Register a new event sink.
    ///
    /// After [`Registry::close_all_subscribers`] the returned sink is
    /// already closed.
    pub async fn subscribe(&self) -> EventSink {
        let mut state = self.state.write().await;

        let id = state.next_sink_id;
        state.next_sink_id += 1;

        if state.closed {
            return EventSink::closed(id);
        }

        let (sender, sink) = EventSink::channel(id, self.sink_capacity);
        state.subscribers.insert(id, sender);
        sink
    }

    /// Register a sink that unsubscribes itself when dropped
    pub async fn subscription(self: &Arc<Self>) -> Subscription {
        Subscription {
            sink: self.subscribe().await,
            registry: Arc::clone(self),
        }
    }

    /// Remove a sink. Returns `false` if it was already gone.
    pub async fn unsubscribe(&self, id: SinkId) -> bool {
        self.state.write().await.subscribers.remove(&id).is_some()
    }

    /// Number of live sinks
    pub async fn subscriber_count(&self) -> usize {
        self.state.read().await.subscribers.len()
    }

    /// Close every sink and stop the watcher. Used once, at shutdown.
    pub async fn close_all_subscribers(&self) {
        let closed = {
            let mut state = self.state.write().await;
            state.closed = true;
            std::mem::take(&mut state.subscribers).len()
        };

        if let Some(watcher) = &self.watcher {
            watcher.close();
        }

        tracing::debug!(closed, "closed all subscribers");
    }

    /// Announce a write to `path`: one `file-changed` event per entry
    /// tracking it, so a file open in two groups yields two events.
    pub async fn notify_file_written(&self, path: &Path) {
        for id in self.ids_for_path(path).await {
            tracing::debug!(id, path = %path.display(), "file changed");
            self.publish(Event::FileChanged { id }).await;
        }
    }

    /// Offer `event` to every sink without waiting; sinks whose reader is
    /// gone are forgotten.
    pub async fn publish(&self, event: Event) {
        let mut state = self.state.write().await;

        let mut gone = Vec::new();
        for (id, sender) in &state.subscribers {
            match non_blocking_send(sender, event) {
                Delivery::Delivered => {}
                Delivery::Dropped => {
                    tracing::trace!(sink = id, event = event.name(), "sink full, event dropped");
                }
                Delivery::Closed => gone.push(*id),
            }
        }

        for id in gone {
            state.subscribers.remove(&id);
        }
    }
}

// ============================================================================
// Subscription
// ============================================================================

/// Event sink bound to its registry; unsubscribes on drop.
///
/// This is what a live-reload connection holds: when the client goes away
/// the response stream is dropped and the sink is removed.
pub struct Subscription {
    sink: EventSink,
    registry: Arc<Registry>,
}

impl Subscription {
    pub fn id(&self) -> SinkId {
        self.sink.id()
    }
}

impl Stream for Subscription {
    type Item = Event;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.sink).poll_next(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let registry = Arc::clone(&self.registry);
        let id = self.sink.id();
        handle.spawn(async move {
            registry.unsubscribe(id).await;
        });
    }
}

// ============================================================================
// Tests
// ============================================================================
