//! The read, segment, decode, report loop.
//!
//! Cancellation is only observed right before a read starts and right after
//! a read comes back interrupted. A read already in progress is not cut short
//! unless the session's read itself is interruptible.

use crate::cancel::CancelFlag;
use crate::error::{ReadError, WatchError};
use crate::reporter::Reporter;
use crate::session::{WatchHandle, WatchSession};
use dirwatch_protocol::{decode, segment};

/// How the loop ended.
#[derive(Debug)]
pub enum Exit {
    /// Cancellation was requested or the channel closed.
    Stopped,
    /// A fatal error ended the loop.
    Failed(WatchError),
}

impl Exit {
    /// Process exit status for this outcome.
    pub fn exit_code(&self) -> i32 {
        match self {
            Exit::Stopped => 0,
            Exit::Failed(_) => 1,
        }
    }
}

/// Result of one iteration.
enum Step {
    Continue,
    Stop,
    Fail(WatchError),
}

/// Drives a session until cancellation, closure, or a fatal error.
pub struct RunLoop<'a, S: ?Sized, R: ?Sized> {
    session: &'a mut S,
    handle: WatchHandle,
    reporter: &'a mut R,
    cancel: CancelFlag,
    buffer: Vec<u8>,
}

impl<'a, S, R> RunLoop<'a, S, R>
where
    S: WatchSession + ?Sized,
    R: Reporter + ?Sized,
{
    pub fn new(
        session: &'a mut S,
        handle: WatchHandle,
        reporter: &'a mut R,
        cancel: CancelFlag,
        buffer_size: usize,
    ) -> Self {
        Self {
            session,
            handle,
            reporter,
            cancel,
            buffer: vec![0u8; buffer_size],
        }
    }

    /// Run to completion. The watch is removed and the session closed on
    /// every exit path.
    pub fn run(mut self) -> Exit {
        tracing::debug!(wd = self.handle.0, buffer_size = self.buffer.len(), "Run loop started");

        let exit = loop {
            if self.cancel.is_requested() {
                tracing::info!("Stop requested");
                break Exit::Stopped;
            }

            match self.step() {
                Step::Continue => {}
                Step::Stop => break Exit::Stopped,
                Step::Fail(e) => break Exit::Failed(e),
            }
        };

        self.session.remove_watch(self.handle);
        self.session.close();
        exit
    }

    fn step(&mut self) -> Step {
        let n = loop {
            match self.session.read_into(&mut self.buffer) {
                Ok(n) => break n,
                Err(ReadError::Interrupted) => {
                    if self.cancel.is_requested() {
                        tracing::info!("Stop requested during read");
                        return Step::Stop;
                    }
                    tracing::trace!("Read interrupted, retrying");
                }
                Err(ReadError::Closed) => {
                    tracing::info!("Notification channel closed");
                    return Step::Stop;
                }
                Err(ReadError::Io(e)) => return Step::Fail(WatchError::Io(e)),
            }
        };

        let mut records = match segment(&self.buffer[..n]) {
            Ok(records) => records,
            Err(e) => return Step::Fail(e.into()),
        };

        if n == 0 {
            tracing::debug!("Empty read");
            return Step::Continue;
        }

        self.reporter.read_completed(n);

        let mut count = 0usize;
        for record in records.by_ref() {
            self.reporter.report(&decode(record));
            count += 1;
        }

        let leftover = records.remainder().len();
        if leftover > 0 {
            tracing::warn!(leftover, "Dropped truncated trailing record");
        }
        tracing::debug!(bytes = n, events = count, "Dispatched read");

        Step::Continue
    }
}
