//! Watch sessions: one notification channel, one watched path.
//!
//! A session fills caller-provided buffers with packed inotify records. The
//! kernel backend reads them straight from an inotify descriptor; the polling
//! backend synthesizes the same byte layout from `notify` events.

#[cfg(target_os = "linux")]
mod inotify;
mod poll;

#[cfg(target_os = "linux")]
pub use inotify::InotifySession;
pub use poll::PollSession;

use crate::config::{Backend, MonitorConfig};
use crate::error::{ReadError, WatchError};
use dirwatch_protocol::ChangeCategory;
use std::path::Path;

/// Identifies one registered watch within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatchHandle(pub i32);

/// A notification channel with a single watch on it.
pub trait WatchSession {
    /// Register `path` with the given category mask.
    fn add_watch(&mut self, path: &Path, mask: ChangeCategory) -> Result<WatchHandle, WatchError>;

    /// Block until at least one complete record is available, then copy as
    /// many whole records as fit into `buf`. Returns the number of bytes
    /// written.
    fn read_into(&mut self, buf: &mut [u8]) -> Result<usize, ReadError>;

    /// Drop the watch. Failures are logged, never returned.
    fn remove_watch(&mut self, handle: WatchHandle);

    /// Release the channel. Safe to call more than once.
    fn close(&mut self);
}

/// Open the session selected by `config`.
pub fn open(config: &MonitorConfig) -> Result<Box<dyn WatchSession>, WatchError> {
    match config.backend {
        #[cfg(target_os = "linux")]
        Backend::Auto | Backend::Inotify => Ok(Box::new(InotifySession::open()?)),
        #[cfg(not(target_os = "linux"))]
        Backend::Auto => Ok(Box::new(PollSession::open(config.effective_poll_interval())?)),
        #[cfg(not(target_os = "linux"))]
        Backend::Inotify => Err(WatchError::ChannelInit(std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "inotify is only available on Linux",
        ))),
        Backend::Poll => Ok(Box::new(PollSession::open(config.effective_poll_interval())?)),
    }
}

/// Open a session and register `path` on it.
///
/// If registration fails the channel is closed before the error is returned.
pub fn open_watch(
    config: &MonitorConfig,
    path: &Path,
) -> Result<(Box<dyn WatchSession>, WatchHandle), WatchError> {
    let mut session = open(config)?;

    match session.add_watch(path, ChangeCategory::WATCH_ALL) {
        Ok(handle) => Ok((session, handle)),
        Err(e) => {
            session.close();
            Err(e)
        }
    }
}
