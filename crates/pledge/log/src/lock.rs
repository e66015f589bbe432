//! PID-file advisory lock serializing writers within one workspace.
//!
//! The lock file holds the decimal PID of the holder. A lock whose PID is
//! unparsable or no longer alive is stale and gets reclaimed. A live holder,
//! including another thread of this process, fails the caller fast with
//! [`LogError::Locked`]; there is no retry loop.

use std::fs::OpenOptions;
use std::io::{ErrorKind as IoErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::LogError;

/// File name of the lock inside the workspace directory.
pub const LOCK_FILE: &str = ".lock";

#[derive(Clone, Debug)]
pub struct WorkspaceLock {
    path: PathBuf,
}

impl WorkspaceLock {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(LOCK_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Acquire the lock. The returned guard releases it when dropped.
    pub fn acquire(&self) -> Result<LockGuard, LogError> {
        let own_pid = std::process::id();

        if let Some(holder) = self.read_holder()? {
            match holder {
                Some(pid) if process_alive(pid) => {
                    return Err(LogError::Locked { pid });
                }
                Some(pid) => warn!(pid, path = %self.path.display(), "reclaiming stale workspace lock"),
                None => warn!(path = %self.path.display(), "reclaiming unreadable workspace lock"),
            }
            match std::fs::remove_file(&self.path) {
                Ok(()) => {}
                Err(e) if e.kind() == IoErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        let mut file = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
        {
            Ok(file) => file,
            Err(e) if e.kind() == IoErrorKind::AlreadyExists => {
                // Another writer won the race between reclaim and create.
                let pid = self.holder().unwrap_or(0);
                return Err(LogError::Locked { pid });
            }
            Err(e) => return Err(e.into()),
        };
        file.write_all(own_pid.to_string().as_bytes())?;
        file.sync_data()?;

        debug!(pid = own_pid, path = %self.path.display(), "acquired workspace lock");
        Ok(LockGuard {
            path: self.path.clone(),
        })
    }

    /// Run `f` while holding the lock. The lock is released on every exit
    /// path, including errors and panics.
    pub fn with_lock<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: From<LogError>,
    {
        let _guard = self.acquire()?;
        f()
    }

    /// Whether a live process currently holds the lock.
    pub fn is_locked(&self) -> Result<bool, LogError> {
        Ok(match self.read_holder()? {
            Some(Some(pid)) => process_alive(pid),
            _ => false,
        })
    }

    /// PID recorded in the lock file, if the file exists and parses.
    pub fn holder(&self) -> Option<u32> {
        self.read_holder().ok().flatten().flatten()
    }

    /// `None` when no lock file exists, `Some(None)` when it is unparsable.
    fn read_holder(&self) -> Result<Option<Option<u32>>, LogError> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => Ok(Some(content.trim().parse::<u32>().ok())),
            Err(e) if e.kind() == IoErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Held lock; removes the lock file on drop.
#[derive(Debug)]
pub struct LockGuard {
    path: PathBuf,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "released workspace lock"),
            Err(e) if e.kind() == IoErrorKind::NotFound => {}
            Err(e) => warn!(error = %e, path = %self.path.display(), "failed to release workspace lock"),
        }
    }
}

/// Whether `pid` names a running process. A permission error still proves
/// the process exists.
#[cfg(unix)]
pub fn process_alive(pid: u32) -> bool {
    use nix::errno::Errno;
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        return false;
    };
    if raw <= 0 {
        return false;
    }
    match kill(Pid::from_raw(raw), None) {
        Ok(()) => true,
        Err(Errno::EPERM) => true,
        Err(_) => false,
    }
}

/// Without a liveness probe a foreign lock is assumed to be held.
#[cfg(not(unix))]
pub fn process_alive(pid: u32) -> bool {
    pid != 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Barrier};
    use tempfile::tempdir;

    #[test]
    fn acquire_writes_pid_and_drop_releases() {
        let dir = tempdir().unwrap();
        let lock = WorkspaceLock::in_dir(dir.path());
        {
            let _guard = lock.acquire().unwrap();
            assert_eq!(lock.holder(), Some(std::process::id()));
        }
        assert!(!lock.path().exists());
        assert_eq!(lock.holder(), None);
    }

    #[test]
    fn sequential_calls_do_not_block_each_other() {
        let dir = tempdir().unwrap();
        let lock = WorkspaceLock::in_dir(dir.path());
        for i in 0..3 {
            let out: Result<i32, LogError> = lock.with_lock(|| Ok(i));
            assert_eq!(out.unwrap(), i);
        }
        assert!(!lock.path().exists());
    }

    #[test]
    fn held_lock_blocks_other_threads() {
        let dir = tempdir().unwrap();
        let lock = WorkspaceLock::in_dir(dir.path());
        let entered = Arc::new(Barrier::new(2));
        let checked = Arc::new(Barrier::new(2));

        let writer = {
            let lock = lock.clone();
            let entered = Arc::clone(&entered);
            let checked = Arc::clone(&checked);
            std::thread::spawn(move || {
                let out: Result<(), LogError> = lock.with_lock(|| {
                    entered.wait();
                    checked.wait();
                    Ok(())
                });
                out
            })
        };

        entered.wait();
        assert!(lock.is_locked().unwrap());
        let err = lock.acquire().unwrap_err();
        assert_eq!(err.code(), "E_WORKSPACE_LOCKED");
        assert!(matches!(err, LogError::Locked { pid } if pid == std::process::id()));
        assert!(lock.path().exists());
        checked.wait();

        writer.join().unwrap().unwrap();
        assert!(!lock.path().exists());
        let _guard = lock.acquire().unwrap();
    }

    #[test]
    fn garbage_lock_is_reclaimed() {
        let dir = tempdir().unwrap();
        let lock = WorkspaceLock::in_dir(dir.path());
        std::fs::write(lock.path(), "not-a-pid").unwrap();
        assert!(!lock.is_locked().unwrap());
        let _guard = lock.acquire().unwrap();
        assert_eq!(lock.holder(), Some(std::process::id()));
    }

    #[test]
    fn released_on_error() {
        let dir = tempdir().unwrap();
        let lock = WorkspaceLock::in_dir(dir.path());
        let out: Result<(), LogError> =
            lock.with_lock(|| Err(LogError::Serialization("boom".into())));
        assert!(out.is_err());
        assert!(!lock.path().exists());
    }

    #[test]
    fn released_on_panic() {
        let dir = tempdir().unwrap();
        let lock = WorkspaceLock::in_dir(dir.path());
        let result = std::panic::catch_unwind(|| {
            let _: Result<(), LogError> = lock.with_lock(|| panic!("writer crashed"));
        });
        assert!(result.is_err());
        assert!(!lock.path().exists());
    }

    #[cfg(unix)]
    #[test]
    fn dead_pid_is_reclaimed() {
        let mut child = std::process::Command::new("true").spawn().unwrap();
        let pid = child.id();
        child.wait().unwrap();

        let dir = tempdir().unwrap();
        let lock = WorkspaceLock::in_dir(dir.path());
        std::fs::write(lock.path(), pid.to_string()).unwrap();
        assert!(!lock.is_locked().unwrap());
        let _guard = lock.acquire().unwrap();
        assert_eq!(lock.holder(), Some(std::process::id()));
    }

    #[cfg(unix)]
    #[test]
    fn live_foreign_pid_fails_fast() {
        let mut child = std::process::Command::new("sleep").arg("30").spawn().unwrap();
        let pid = child.id();

        let dir = tempdir().unwrap();
        let lock = WorkspaceLock::in_dir(dir.path());
        std::fs::write(lock.path(), pid.to_string()).unwrap();

        assert!(lock.is_locked().unwrap());
        let err = lock.acquire().unwrap_err();
        assert_eq!(err.code(), "E_WORKSPACE_LOCKED");
        assert!(matches!(err, LogError::Locked { pid: p } if p == pid));
        assert!(lock.path().exists());

        child.kill().unwrap();
        child.wait().unwrap();
    }
}
