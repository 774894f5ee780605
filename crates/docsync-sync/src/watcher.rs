//! File watching and debounced change queue
//!
//! Provides a [`FileWatcher`] that wraps the `notify` crate to monitor the
//! sync folder, converting raw OS events into [`ChangeEvent`] values.
//!
//! Only events that can make a new document appear are kept: file creation,
//! content modification, and a file being moved in. Deletions and metadata
//! changes are dropped; removing a document never touches the remote side.
//!
//! The [`DebouncedChangeQueue`] coalesces rapid-fire events so that a file
//! still being written is only picked up once it has been quiet for the
//! settle delay.
//!
//! ## Architecture
//!
//! ```text
//! inotify / kqueue
//!       │
//!       ▼
//!  FileWatcher  ──→  mpsc::channel  ──→  DebouncedChangeQueue  ──→  CandidateScheduler
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use notify::event::{CreateKind, ModifyKind, RenameMode};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Capacity of the watcher → scheduler channel
const EVENT_CHANNEL_CAPACITY: usize = 1024;

// ============================================================================
// ChangeEvent enum
// ============================================================================

/// A filesystem change that may introduce a document to sync
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    /// A new file appeared at the given path (created or moved in)
    Created(PathBuf),
    /// An existing file's content changed
    Modified(PathBuf),
}

impl ChangeEvent {
    /// Returns the path associated with this event
    pub fn path(&self) -> &Path {
        match self {
            ChangeEvent::Created(p) | ChangeEvent::Modified(p) => p,
        }
    }
}

// ============================================================================
// FileWatcher struct
// ============================================================================

/// Watches a directory tree using the OS-native mechanism
///
/// ## Usage
///
/// ```ignore
/// let (mut watcher, rx) = FileWatcher::new()?;
/// watcher.watch(Path::new("/home/user/CVs"))?;
/// // rx.recv().await to get events; dropping the watcher closes the channel
/// ```
pub struct FileWatcher {
    /// The underlying notify watcher instance
    watcher: RecommendedWatcher,
}

impl FileWatcher {
    /// Creates a new `FileWatcher`
    ///
    /// # Returns
    /// A tuple of `(FileWatcher, mpsc::Receiver<ChangeEvent>)`. The channel
    /// closes once the watcher is dropped.
    ///
    /// # Errors
    /// Returns an error if the underlying OS watcher cannot be created
    pub fn new() -> Result<(Self, mpsc::Receiver<ChangeEvent>)> {
        let (tx, event_rx) = mpsc::channel::<ChangeEvent>(EVENT_CHANNEL_CAPACITY);

        info!("Initializing file watcher");

        let watcher = RecommendedWatcher::new(
            move |res: std::result::Result<notify::Event, notify::Error>| match res {
                Ok(event) => {
                    if let Some(change) = map_notify_event(&event) {
                        if let Err(e) = tx.blocking_send(change) {
                            warn!(error = %e, "Failed to send change event (receiver dropped)");
                        }
                    }
                }
                Err(err) => {
                    error!(error = %err, "File watcher error");
                }
            },
            notify::Config::default(),
        )
        .context("Failed to create file watcher")?;

        Ok((Self { watcher }, event_rx))
    }

    /// Starts watching a directory recursively
    ///
    /// # Errors
    /// Returns an error if the path cannot be watched (e.g., does not exist,
    /// insufficient permissions, or inotify watch limit reached)
    pub fn watch(&mut self, path: &Path) -> Result<()> {
        info!(path = %path.display(), "Starting recursive watch");

        self.watcher
            .watch(path, RecursiveMode::Recursive)
            .with_context(|| format!("Failed to watch path: {}", path.display()))
    }
}

// ============================================================================
// Event mapping - notify::Event → ChangeEvent
// ============================================================================

/// Converts a `notify::Event` into a `ChangeEvent`
///
/// - `Create(File | Any | Other)` -> `Created`
/// - `Modify(Name(To))` and `Modify(Name(Both))` -> `Created` at the destination
/// - `Modify(Data(*))` and `Modify(Any)` -> `Modified`
///
/// Returns `None` for folder creation, removals, metadata-only changes,
/// access events and events without paths.
fn map_notify_event(event: &notify::Event) -> Option<ChangeEvent> {
    let paths = &event.paths;

    match &event.kind {
        EventKind::Create(CreateKind::Folder) => None,

        EventKind::Create(_) => {
            let path = paths.first()?;
            debug!(path = %path.display(), "Mapped Create event");
            Some(ChangeEvent::Created(path.clone()))
        }

        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            let path = paths.get(1).or_else(|| paths.first())?;
            debug!(path = %path.display(), "Mapped Rename event to its destination");
            Some(ChangeEvent::Created(path.clone()))
        }

        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
            let path = paths.first()?;
            debug!(path = %path.display(), "Mapped Rename(To) event");
            Some(ChangeEvent::Created(path.clone()))
        }

        EventKind::Modify(ModifyKind::Data(_)) | EventKind::Modify(ModifyKind::Any) => {
            let path = paths.first()?;
            debug!(path = %path.display(), "Mapped Modify event");
            Some(ChangeEvent::Modified(path.clone()))
        }

        _ => {
            debug!(kind = ?event.kind, "Ignoring event kind");
            None
        }
    }
}

// ============================================================================
// DebouncedChangeQueue struct
// ============================================================================

/// Queue that coalesces rapid filesystem changes into settled events
///
/// When multiple events arrive for the same path in quick succession,
/// only the latest one is kept and its timestamp is reset. Events are only
/// released (via [`poll`](DebouncedChangeQueue::poll)) once they have been
/// quiet for longer than the configured delay.
pub struct DebouncedChangeQueue {
    /// Pending changes keyed by path, storing the latest event and its timestamp
    pending: HashMap<PathBuf, (ChangeEvent, Instant)>,
    /// Minimum quiet period before a change is considered settled
    debounce_delay: Duration,
}

impl DebouncedChangeQueue {
    /// Creates a new `DebouncedChangeQueue` with the given debounce delay
    pub fn new(debounce_delay: Duration) -> Self {
        Self {
            pending: HashMap::new(),
            debounce_delay,
        }
    }

    /// Inserts or updates a change event for the given path
    ///
    /// If the path already has a pending event it is replaced and the
    /// timestamp is reset, so a file being written keeps extending its
    /// own window.
    pub fn push(&mut self, event: ChangeEvent) {
        let path = event.path().to_path_buf();
        debug!(path = %path.display(), event = ?event, "Enqueuing change event");
        self.pending.insert(path, (event, Instant::now()));
    }

    /// Removes and returns every change that has been quiet long enough
    pub fn poll(&mut self) -> Vec<ChangeEvent> {
        let now = Instant::now();
        let delay = self.debounce_delay;
        let mut settled = Vec::new();

        self.pending.retain(|_, (event, timestamp)| {
            if now.duration_since(*timestamp) >= delay {
                settled.push(event.clone());
                false
            } else {
                true
            }
        });

        if !settled.is_empty() {
            debug!(count = settled.len(), "Polled settled change events");
        }
        settled
    }

    /// Removes and returns every pending change regardless of age
    pub fn drain(&mut self) -> Vec<ChangeEvent> {
        self.pending.drain().map(|(_, (event, _))| event).collect()
    }

    /// Returns the number of pending (unsettled) events
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Returns true if there are no pending events
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

// ============================================================================
// Unit tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn notify_event(kind: EventKind, paths: &[&str]) -> notify::Event {
        notify::Event {
            kind,
            paths: paths.iter().map(PathBuf::from).collect(),
            attrs: Default::default(),
        }
    }

    // ------------------------------------------------------------------
    // DebouncedChangeQueue
    // ------------------------------------------------------------------

    #[test]
    fn test_push_coalesces_same_path() {
        let mut queue = DebouncedChangeQueue::new(Duration::from_millis(100));
        queue.push(ChangeEvent::Created(PathBuf::from("/a.pdf")));
        queue.push(ChangeEvent::Modified(PathBuf::from("/a.pdf")));
        queue.push(ChangeEvent::Modified(PathBuf::from("/b.pdf")));
        assert_eq!(queue.pending_count(), 2);
    }

    #[test]
    fn test_push_keeps_latest_event() {
        let mut queue = DebouncedChangeQueue::new(Duration::ZERO);
        queue.push(ChangeEvent::Created(PathBuf::from("/a.pdf")));
        queue.push(ChangeEvent::Modified(PathBuf::from("/a.pdf")));

        std::thread::sleep(Duration::from_millis(5));
        let settled = queue.poll();
        assert_eq!(settled, vec![ChangeEvent::Modified(PathBuf::from("/a.pdf"))]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_poll_holds_recent_events() {
        let mut queue = DebouncedChangeQueue::new(Duration::from_secs(60));
        queue.push(ChangeEvent::Created(PathBuf::from("/a.pdf")));

        assert!(queue.poll().is_empty());
        assert_eq!(queue.pending_count(), 1);
    }

    #[test]
    fn test_poll_partial_settlement() {
        let mut queue = DebouncedChangeQueue::new(Duration::from_millis(50));
        queue.push(ChangeEvent::Created(PathBuf::from("/old.pdf")));
        std::thread::sleep(Duration::from_millis(60));
        queue.push(ChangeEvent::Created(PathBuf::from("/new.pdf")));

        let settled = queue.poll();
        assert_eq!(settled, vec![ChangeEvent::Created(PathBuf::from("/old.pdf"))]);
        assert_eq!(queue.pending_count(), 1);
    }

    #[test]
    fn test_coalescing_resets_timestamp() {
        let mut queue = DebouncedChangeQueue::new(Duration::from_millis(50));
        queue.push(ChangeEvent::Created(PathBuf::from("/a.pdf")));
        std::thread::sleep(Duration::from_millis(30));
        queue.push(ChangeEvent::Modified(PathBuf::from("/a.pdf")));

        std::thread::sleep(Duration::from_millis(30));
        assert!(queue.poll().is_empty());

        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(queue.poll().len(), 1);
    }

    #[test]
    fn test_drain_returns_everything() {
        let mut queue = DebouncedChangeQueue::new(Duration::from_secs(60));
        queue.push(ChangeEvent::Created(PathBuf::from("/a.pdf")));
        queue.push(ChangeEvent::Created(PathBuf::from("/b.pdf")));

        assert_eq!(queue.drain().len(), 2);
        assert!(queue.is_empty());
    }

    // ------------------------------------------------------------------
    // Event mapping
    // ------------------------------------------------------------------

    #[test]
    fn test_map_create_file() {
        let event = notify_event(EventKind::Create(CreateKind::File), &["/a.pdf"]);
        assert_eq!(
            map_notify_event(&event),
            Some(ChangeEvent::Created(PathBuf::from("/a.pdf")))
        );
    }

    #[test]
    fn test_map_create_folder_ignored() {
        let event = notify_event(EventKind::Create(CreateKind::Folder), &["/dir"]);
        assert!(map_notify_event(&event).is_none());
    }

    #[test]
    fn test_map_modify_data() {
        let event = notify_event(
            EventKind::Modify(ModifyKind::Data(notify::event::DataChange::Content)),
            &["/a.pdf"],
        );
        assert_eq!(
            map_notify_event(&event),
            Some(ChangeEvent::Modified(PathBuf::from("/a.pdf")))
        );
    }

    #[test]
    fn test_map_rename_uses_destination() {
        let event = notify_event(
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            &["/tmp.partial", "/a.pdf"],
        );
        assert_eq!(
            map_notify_event(&event),
            Some(ChangeEvent::Created(PathBuf::from("/a.pdf")))
        );

        let event = notify_event(
            EventKind::Modify(ModifyKind::Name(RenameMode::To)),
            &["/b.pdf"],
        );
        assert_eq!(
            map_notify_event(&event),
            Some(ChangeEvent::Created(PathBuf::from("/b.pdf")))
        );
    }

    #[test]
    fn test_map_ignored_kinds() {
        let ignored = [
            EventKind::Remove(notify::event::RemoveKind::File),
            EventKind::Access(notify::event::AccessKind::Read),
            EventKind::Modify(ModifyKind::Metadata(
                notify::event::MetadataKind::Permissions,
            )),
            EventKind::Modify(ModifyKind::Name(RenameMode::From)),
        ];
        for kind in ignored {
            let event = notify_event(kind, &["/a.pdf"]);
            assert!(map_notify_event(&event).is_none(), "kind {kind:?} not ignored");
        }
    }

    #[test]
    fn test_map_event_without_paths() {
        let event = notify_event(EventKind::Create(CreateKind::File), &[]);
        assert!(map_notify_event(&event).is_none());
    }

    #[tokio::test]
    async fn test_watcher_reports_new_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let (mut watcher, mut rx) = FileWatcher::new().unwrap();
        watcher.watch(dir.path()).unwrap();

        let path = dir.path().join("cv.pdf");
        std::fs::write(&path, b"content").unwrap();

        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("no event within timeout")
            .expect("channel closed");
        assert_eq!(event.path().file_name(), path.file_name());
    }
}
