//! Kernel inotify backend.

use super::{WatchHandle, WatchSession};
use crate::error::{ReadError, WatchError};
use dirwatch_protocol::ChangeCategory;
use std::ffi::CString;
use std::io;
use std::os::fd::{AsRawFd, FromRawFd, IntoRawFd, OwnedFd};
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

/// Session backed by an inotify descriptor in blocking mode.
#[derive(Debug)]
pub struct InotifySession {
    /// `None` once closed.
    fd: Option<OwnedFd>,
    /// The active watch, if any.
    watch: Option<WatchHandle>,
}

impl InotifySession {
    /// Create the inotify instance.
    pub fn open() -> Result<Self, WatchError> {
        // SAFETY: inotify_init1 takes no pointers.
        let fd = unsafe { libc::inotify_init1(libc::IN_CLOEXEC) };
        if fd < 0 {
            return Err(WatchError::ChannelInit(io::Error::last_os_error()));
        }

        tracing::debug!(fd, "Created inotify instance");
        // SAFETY: fd was just returned by inotify_init1 and nothing else owns it.
        let fd = unsafe { OwnedFd::from_raw_fd(fd) };
        Ok(Self {
            fd: Some(fd),
            watch: None,
        })
    }

    fn raw_fd(&self) -> io::Result<libc::c_int> {
        self.fd
            .as_ref()
            .map(AsRawFd::as_raw_fd)
            .ok_or_else(|| io::Error::from_raw_os_error(libc::EBADF))
    }
}

impl WatchSession for InotifySession {
    fn add_watch(&mut self, path: &Path, mask: ChangeCategory) -> Result<WatchHandle, WatchError> {
        let registration_error = |source| WatchError::WatchRegistration {
            path: path.to_path_buf(),
            source,
        };

        let fd = self.raw_fd().map_err(registration_error)?;
        let c_path = CString::new(path.as_os_str().as_bytes())
            .map_err(|e| registration_error(io::Error::new(io::ErrorKind::InvalidInput, e)))?;

        // SAFETY: fd is a live inotify descriptor and c_path is NUL-terminated.
        let wd = unsafe { libc::inotify_add_watch(fd, c_path.as_ptr(), mask.bits()) };
        if wd < 0 {
            return Err(registration_error(io::Error::last_os_error()));
        }

        let handle = WatchHandle(wd);
        self.watch = Some(handle);
        tracing::info!(path = %path.display(), wd, mask = ?mask, "Added watch");
        Ok(handle)
    }

    fn read_into(&mut self, buf: &mut [u8]) -> Result<usize, ReadError> {
        let fd = self.raw_fd()?;

        // SAFETY: buf is valid for writes of buf.len() bytes for the whole call.
        let n = unsafe { libc::read(fd, buf.as_mut_ptr().cast(), buf.len()) };
        if n < 0 {
            return Err(io::Error::last_os_error().into());
        }

        Ok(n as usize)
    }

    fn remove_watch(&mut self, handle: WatchHandle) {
        if self.watch != Some(handle) {
            return;
        }
        self.watch = None;

        let Ok(fd) = self.raw_fd() else {
            return;
        };

        // SAFETY: inotify_rm_watch takes no pointers.
        let rc = unsafe { libc::inotify_rm_watch(fd, handle.0) };
        if rc < 0 {
            // EINVAL here usually means the kernel already dropped the watch
            // (IN_IGNORED after the target was deleted).
            tracing::warn!(wd = handle.0, error = %io::Error::last_os_error(), "Failed to remove watch");
        } else {
            tracing::debug!(wd = handle.0, "Removed watch");
        }
    }

    fn close(&mut self) {
        if let Some(fd) = self.fd.take() {
            let raw = fd.into_raw_fd();
            // SAFETY: raw came out of an OwnedFd, so we are its only owner.
            if unsafe { libc::close(raw) } < 0 {
                tracing::warn!(error = %io::Error::last_os_error(), "Failed to close inotify descriptor");
            } else {
                tracing::debug!("Closed inotify instance");
            }
        }
        self.watch = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dirwatch_protocol::{MIN_READ_BUFFER, decode, segment};
    use std::path::PathBuf;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("dirwatch-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_missing_path_is_registration_error() {
        let mut session = InotifySession::open().unwrap();
        let err = session
            .add_watch(Path::new("/definitely/not/here"), ChangeCategory::WATCH_ALL)
            .unwrap_err();
        assert!(matches!(err, WatchError::WatchRegistration { .. }));
        session.close();
    }

    #[test]
    fn test_reads_create_event() {
        let dir = scratch_dir("inotify-create");
        let mut session = InotifySession::open().unwrap();
        let handle = session.add_watch(&dir, ChangeCategory::WATCH_ALL).unwrap();

        std::fs::create_dir(dir.join("child")).unwrap();

        let mut buf = vec![0u8; MIN_READ_BUFFER * 4];
        let n = session.read_into(&mut buf).unwrap();
        let events: Vec<_> = segment(&buf[..n]).unwrap().map(decode).collect();

        let created = events
            .iter()
            .find(|e| e.name.as_deref() == Some("child"))
            .expect("create event for child");
        assert_eq!(created.wd, handle.0);
        assert!(created.mask.contains(ChangeCategory::IN_CREATE));
        assert!(created.is_dir());

        session.remove_watch(handle);
        session.close();
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_cleanup_is_idempotent() {
        let dir = scratch_dir("inotify-cleanup");
        let mut session = InotifySession::open().unwrap();
        let handle = session.add_watch(&dir, ChangeCategory::WATCH_ALL).unwrap();

        session.remove_watch(handle);
        session.remove_watch(handle);
        session.close();
        session.close();

        let mut buf = [0u8; MIN_READ_BUFFER];
        assert!(matches!(session.read_into(&mut buf), Err(ReadError::Io(_))));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
