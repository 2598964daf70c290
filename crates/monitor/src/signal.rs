//! Interrupt handling.
//!
//! SIGINT and SIGTERM set the shared [`CancelFlag`]. The handlers are installed
//! without `SA_RESTART`, so a thread blocked in `read(2)` wakes up with `EINTR`
//! and the run loop gets to look at the flag.

use crate::cancel::CancelFlag;
use std::io;
use std::sync::OnceLock;

/// Flag the handler writes to. Set once, before any handler is installed.
static SIGNAL_FLAG: OnceLock<CancelFlag> = OnceLock::new();

/// Install the interrupt handlers, routing them to `flag`.
///
/// Can only bind one flag per process; later calls keep the first flag and
/// just reinstall the handlers.
#[cfg(unix)]
pub fn install(flag: &CancelFlag) -> io::Result<()> {
    if SIGNAL_FLAG.set(flag.clone()).is_err() {
        tracing::debug!("Signal flag already bound, keeping the existing one");
    }

    for signum in [libc::SIGINT, libc::SIGTERM] {
        // SAFETY: sigaction is plain old data; an all-zero value is a valid
        // starting point that we then fill in.
        let mut action: libc::sigaction = unsafe { std::mem::zeroed() };
        action.sa_sigaction = on_signal as extern "C" fn(libc::c_int) as libc::sighandler_t;
        action.sa_flags = 0;

        // SAFETY: `action` is a valid, exclusively borrowed sigaction and
        // `on_signal` only performs an atomic store.
        let rc = unsafe {
            libc::sigemptyset(&mut action.sa_mask);
            libc::sigaction(signum, &action, std::ptr::null_mut())
        };
        if rc == -1 {
            return Err(io::Error::last_os_error());
        }
    }

    tracing::debug!("Installed SIGINT/SIGTERM handlers");
    Ok(())
}

#[cfg(not(unix))]
pub fn install(flag: &CancelFlag) -> io::Result<()> {
    let _ = SIGNAL_FLAG.set(flag.clone());
    tracing::warn!("Interrupt handling is not supported on this platform");
    Ok(())
}

#[cfg(unix)]
extern "C" fn on_signal(_signum: libc::c_int) {
    if let Some(flag) = SIGNAL_FLAG.get() {
        flag.request();
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_sigint_sets_flag() {
        let flag = CancelFlag::new();
        install(&flag).unwrap();
        let bound = SIGNAL_FLAG.get().unwrap().clone();

        // SAFETY: raising a signal we just installed a handler for.
        let rc = unsafe { libc::raise(libc::SIGINT) };
        assert_eq!(rc, 0);
        assert!(bound.is_requested());
    }
}
