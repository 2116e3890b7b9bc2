//! Exclusive advisory lock on an open file.
//!
//! The lock is taken with `flock(LOCK_EX | LOCK_NB)` and retried until a
//! deadline. `flock` locks belong to the open file description, so two
//! handles opened separately contend even within one process.

use std::fs::File;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::error::StoreError;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Holds the lock until dropped.
#[derive(Debug)]
pub struct FileLock<'a> {
    file: &'a File,
    path: PathBuf,
}

impl FileLock<'_> {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for FileLock<'_> {
    fn drop(&mut self) {
        let ret = unsafe { libc::flock(self.file.as_raw_fd(), libc::LOCK_UN) };
        if ret != 0 {
            log::warn!(
                "failed to release lock on {}: {}",
                self.path.display(),
                std::io::Error::last_os_error()
            );
        }
    }
}

/// Acquire an exclusive lock on `file`, waiting at most `timeout`.
pub fn lock_exclusive<'a>(
    file: &'a File,
    path: &Path,
    timeout: Duration,
) -> Result<FileLock<'a>, StoreError> {
    let fd = file.as_raw_fd();
    let deadline = Instant::now() + timeout;

    loop {
        let ret = unsafe { libc::flock(fd, libc::LOCK_EX | libc::LOCK_NB) };
        if ret == 0 {
            return Ok(FileLock {
                file,
                path: path.to_path_buf(),
            });
        }

        let err = std::io::Error::last_os_error();
        if err.raw_os_error() != Some(libc::EWOULDBLOCK) && err.kind() != std::io::ErrorKind::Interrupted {
            return Err(StoreError::io(path, err));
        }

        if Instant::now() >= deadline {
            return Err(StoreError::LockTimeout {
                path: path.to_path_buf(),
                timeout_ms: timeout.as_millis() as u64,
            });
        }

        std::thread::sleep(POLL_INTERVAL);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
