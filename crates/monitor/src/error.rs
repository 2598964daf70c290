//! Error types for sessions and the run loop.

use dirwatch_protocol::ProtocolError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Fatal conditions that end the monitor.
#[derive(Debug, Error)]
pub enum WatchError {
    /// The notification channel could not be created.
    #[error("failed to create notification channel: {0}")]
    ChannelInit(#[source] io::Error),

    /// The path could not be registered for watching.
    #[error("failed to add '{}' to the watch list: {source}", path.display())]
    WatchRegistration {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Reading the channel failed with something other than an interruption.
    #[error("error reading notification channel: {0}")]
    Io(#[source] io::Error),

    /// The channel delivered bytes that do not form a record stream.
    #[error("malformed event stream: {0}")]
    Protocol(#[from] ProtocolError),
}

/// Outcome of a failed blocking read.
#[derive(Debug, Error)]
pub enum ReadError {
    /// A signal (or a poll tick with nothing to report) cut the wait short.
    /// Always retried.
    #[error("read interrupted")]
    Interrupted,

    /// The channel has been closed and no more events will arrive.
    #[error("notification channel closed")]
    Closed,

    /// Any other I/O failure.
    #[error(transparent)]
    Io(io::Error),
}

impl From<io::Error> for ReadError {
    fn from(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::Interrupted {
            Self::Interrupted
        } else {
            Self::Io(err)
        }
    }
}
