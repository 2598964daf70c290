//! Polling backend.
//!
//! Uses the `notify` crate's `PollWatcher`, which works where kernel
//! notifications are unavailable (other platforms, network filesystems).
//! Events are converted to inotify masks and packed into the same record
//! layout the kernel would produce.
//!
//! A scan only sees before/after snapshots, so a rename shows up as
//! `IN_DELETE` of the old name plus `IN_CREATE` of the new one, with no cookie.

use super::{WatchHandle, WatchSession};
use crate::error::{ReadError, WatchError};
use dirwatch_protocol::{ChangeCategory, RawEvent};
use notify::{
    Config, EventKind, PollWatcher, RecursiveMode, Watcher,
    event::{AccessKind, AccessMode, MetadataKind, ModifyKind},
};
use std::collections::VecDeque;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Duration;

/// The single watch a poll session hands out.
const POLL_WATCH: WatchHandle = WatchHandle(1);

/// Convert a notify event kind to an inotify mask.
///
/// `is_root` selects the `*_SELF` variants for events about the watched path
/// itself.
fn notify_to_inotify_mask(kind: &EventKind, is_dir: bool, is_root: bool) -> Option<ChangeCategory> {
    let base_mask = match kind {
        EventKind::Create(_) => ChangeCategory::IN_CREATE,
        // Without content hashing a write is only visible as a newer mtime.
        EventKind::Modify(ModifyKind::Metadata(MetadataKind::WriteTime)) => ChangeCategory::IN_MODIFY,
        EventKind::Modify(ModifyKind::Metadata(_)) => ChangeCategory::IN_ATTRIB,
        EventKind::Modify(ModifyKind::Name(_)) => return None,
        EventKind::Modify(_) => ChangeCategory::IN_MODIFY,
        EventKind::Remove(_) if is_root => ChangeCategory::IN_DELETE_SELF,
        EventKind::Remove(_) => ChangeCategory::IN_DELETE,
        EventKind::Access(access_kind) => match access_kind {
            AccessKind::Open(_) => ChangeCategory::IN_OPEN,
            AccessKind::Close(AccessMode::Write) => ChangeCategory::IN_CLOSE_WRITE,
            AccessKind::Close(_) => ChangeCategory::IN_CLOSE_NOWRITE,
            _ => ChangeCategory::IN_ACCESS,
        },
        EventKind::Other | EventKind::Any => return None,
    };

    let mask = if is_dir {
        base_mask | ChangeCategory::IN_ISDIR
    } else {
        base_mask
    };

    Some(mask)
}

/// The registered path.
#[derive(Debug, Clone)]
struct Root {
    path: PathBuf,
    is_dir: bool,
    /// Set once the path itself has been reported deleted.
    gone: bool,
}

/// Session backed by a `notify::PollWatcher`.
pub struct PollSession {
    /// `None` once closed.
    watcher: Option<PollWatcher>,
    event_rx: Receiver<notify::Result<notify::Event>>,
    poll_interval: Duration,
    /// Watched path, once registered.
    root: Option<Root>,
    /// Encoded records waiting for a read with room for them.
    pending: VecDeque<Vec<u8>>,
}

impl PollSession {
    /// Create the poll watcher. Nothing is watched until `add_watch`.
    pub fn open(poll_interval: Duration) -> Result<Self, WatchError> {
        let (event_tx, event_rx) = mpsc::channel();

        let config = Config::default()
            .with_poll_interval(poll_interval)
            .with_compare_contents(false); // Use mtime, not content hashing

        let watcher = PollWatcher::new(event_tx, config)
            .map_err(|e| WatchError::ChannelInit(notify_to_io(e)))?;

        tracing::debug!(poll_interval_ms = poll_interval.as_millis() as u64, "Created poll watcher");
        Ok(Self {
            watcher: Some(watcher),
            event_rx,
            poll_interval,
            root: None,
            pending: VecDeque::new(),
        })
    }

    /// Encode one notify event into zero or more pending records.
    fn enqueue(&mut self, event: notify::Event) {
        let Some(root) = self.root.clone() else {
            return;
        };

        for path in &event.paths {
            let is_root = path == &root.path;

            // The kernel reports nothing for a watched directory whose mtime
            // moved because an entry changed; the entry event covers it.
            let mtime_only = matches!(event.kind, EventKind::Modify(ModifyKind::Metadata(MetadataKind::WriteTime)));
            if is_root && root.is_dir && mtime_only {
                tracing::trace!(kind = ?event.kind, "Ignoring change to watched directory");
                continue;
            }

            // `*_SELF` events carry no IN_ISDIR.
            let is_dir = !is_root && path.is_dir();
            let Some(mask) = notify_to_inotify_mask(&event.kind, is_dir, is_root) else {
                tracing::trace!(kind = ?event.kind, path = %path.display(), "Ignoring event");
                continue;
            };

            self.push_record(&root.path, path, mask);

            if mask.contains(ChangeCategory::IN_DELETE_SELF) {
                // The watch cannot outlive its target.
                self.push_record(&root.path, &root.path, ChangeCategory::IN_IGNORED);
                if let Some(root) = self.root.as_mut() {
                    root.gone = true;
                }
            }
        }
    }

    fn push_record(&mut self, root: &Path, path: &Path, mask: ChangeCategory) {
        // Entry-level events carry the name relative to the watched directory.
        let name = path
            .strip_prefix(root)
            .ok()
            .filter(|rel| !rel.as_os_str().is_empty())
            .map(|rel| rel.to_string_lossy().into_owned())
            .unwrap_or_default();

        let record = RawEvent::new(POLL_WATCH.0, mask, 0).to_bytes_with_name(name.as_bytes());
        tracing::trace!(path = %path.display(), mask = ?mask, "Queued record");
        self.pending.push_back(record);
    }

    /// Stop scanning a root that no longer exists.
    fn drop_gone_root(&mut self) {
        if !self.root.as_ref().is_some_and(|root| root.gone) {
            return;
        }
        let Some(root) = self.root.take() else {
            return;
        };

        if let Some(watcher) = self.watcher.as_mut() {
            if let Err(e) = watcher.unwatch(&root.path) {
                tracing::debug!(path = %root.path.display(), error = %e, "Unwatch after delete failed");
            }
        }
        tracing::info!(path = %root.path.display(), "Watched path deleted, watch dropped");
    }

    /// Scan errors (an entry vanishing mid-walk, the root disappearing) are
    /// logged; the removal itself arrives as a later event in the same scan.
    fn accept(&mut self, result: notify::Result<notify::Event>) {
        match result {
            Ok(event) => self.enqueue(event),
            Err(e) => tracing::warn!(error = %e, "Scan error"),
        }
    }

    /// Copy as many whole pending records as fit into `buf`.
    fn drain_into(&mut self, buf: &mut [u8]) -> Result<usize, ReadError> {
        let mut written = 0;

        while let Some(record) = self.pending.front() {
            if written + record.len() > buf.len() {
                break;
            }
            buf[written..written + record.len()].copy_from_slice(record);
            written += record.len();
            self.pending.pop_front();
        }

        if written == 0 && !self.pending.is_empty() {
            return Err(ReadError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                "read buffer too small for the next event",
            )));
        }

        Ok(written)
    }
}

impl WatchSession for PollSession {
    fn add_watch(&mut self, path: &Path, _mask: ChangeCategory) -> Result<WatchHandle, WatchError> {
        let registration_error = |source| WatchError::WatchRegistration {
            path: path.to_path_buf(),
            source,
        };

        let watcher = self
            .watcher
            .as_mut()
            .ok_or_else(|| registration_error(io::Error::from(io::ErrorKind::NotConnected)))?;

        // PollWatcher only reports a missing path through the event channel.
        let metadata = std::fs::metadata(path).map_err(registration_error)?;

        // Entry-level granularity, like a single inotify watch.
        watcher
            .watch(path, RecursiveMode::NonRecursive)
            .map_err(|e| registration_error(notify_to_io(e)))?;

        self.root = Some(Root {
            path: path.to_path_buf(),
            is_dir: metadata.is_dir(),
            gone: false,
        });
        tracing::info!(
            path = %path.display(),
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            "Added watch"
        );
        Ok(POLL_WATCH)
    }

    fn read_into(&mut self, buf: &mut [u8]) -> Result<usize, ReadError> {
        if self.pending.is_empty() {
            if self.watcher.is_none() {
                return Err(ReadError::Closed);
            }

            // A channel wait cannot be interrupted by a signal, so hand
            // control back once per poll interval.
            match self.event_rx.recv_timeout(self.poll_interval) {
                Ok(result) => self.accept(result),
                Err(RecvTimeoutError::Timeout) => return Err(ReadError::Interrupted),
                Err(RecvTimeoutError::Disconnected) => return Err(ReadError::Closed),
            }

            // Whatever else one scan produced goes into the same read.
            while let Ok(result) = self.event_rx.try_recv() {
                self.accept(result);
            }
            self.drop_gone_root();

            if self.pending.is_empty() {
                return Err(ReadError::Interrupted);
            }
        }

        self.drain_into(buf)
    }

    fn remove_watch(&mut self, handle: WatchHandle) {
        let Some(Root { path: root, .. }) = self.root.take() else {
            return;
        };
        if handle != POLL_WATCH {
            tracing::warn!(wd = handle.0, "Unknown watch handle");
            return;
        }

        if let Some(watcher) = self.watcher.as_mut() {
            match watcher.unwatch(&root) {
                Ok(()) => tracing::debug!(path = %root.display(), "Removed watch"),
                Err(e) => tracing::warn!(path = %root.display(), error = %e, "Failed to remove watch"),
            }
        }
    }

    fn close(&mut self) {
        if self.watcher.take().is_some() {
            self.pending.clear();
            tracing::debug!("Stopped poll watcher");
        }
    }
}

fn notify_to_io(err: notify::Error) -> io::Error {
    match err.kind {
        notify::ErrorKind::Io(e) => e,
        notify::ErrorKind::PathNotFound => io::Error::new(io::ErrorKind::NotFound, "path not found"),
        other => io::Error::other(format!("{other:?}")),
    }
}
