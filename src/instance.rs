//! # Instance Lock
//!
//! Keeps a second server from starting on the same machine. A second copy
//! would fail to bind the pairing and telemetry ports but keep broadcasting
//! discovery and feeding the driver.
//!
//! The lock is a file created with `create_new` holding the owner's PID.
//! A lock whose PID no longer runs is stale and is replaced. The file is
//! removed when the [`InstanceLock`] is dropped.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use sysinfo::{Pid, PidExt, System, SystemExt};
use tracing::{debug, info, warn};

use crate::error::{BridgeError, Result};

/// Held for the lifetime of the server process.
#[derive(Debug)]
pub struct InstanceLock {
    path: PathBuf,
}

impl InstanceLock {
    /// Take the lock at `path`, replacing it if its owner has exited
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - A live process other than this one holds the lock (`AlreadyRunning`)
    /// - The lock file holds no readable PID; it may be mid-write by another
    ///   starting server, so it is treated as held
    /// - The file cannot be created or written
    pub fn acquire<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::acquire_with(path.as_ref(), process_alive)
    }

    fn acquire_with(path: &Path, alive: impl Fn(u32) -> bool) -> Result<Self> {
        // Second attempt runs only after a stale lock was removed
        for _ in 0..2 {
            match OpenOptions::new().write(true).create_new(true).open(path) {
                Ok(mut file) => {
                    let pid = std::process::id();
                    file.write_all(pid.to_string().as_bytes())?;
                    file.sync_all()?;
                    info!("Instance lock acquired: {} (PID {})", path.display(), pid);
                    return Ok(Self {
                        path: path.to_path_buf(),
                    });
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    let owner = read_pid(path);
                    match owner {
                        Some(pid) if pid != std::process::id() && !alive(pid) => {
                            info!("Removing stale instance lock from PID {}", pid);
                            remove_if_present(path)?;
                        }
                        // Our own PID can only be left over from an earlier boot
                        Some(pid) if pid == std::process::id() => {
                            remove_if_present(path)?;
                        }
                        _ => {
                            return Err(BridgeError::AlreadyRunning {
                                pid: owner,
                                path: path.to_path_buf(),
                            })
                        }
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(BridgeError::AlreadyRunning {
            pid: read_pid(path),
            path: path.to_path_buf(),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => info!("Instance lock released"),
            Err(e) => warn!("Failed to remove instance lock {}: {}", self.path.display(), e),
        }
    }
}

fn read_pid(path: &Path) -> Option<u32> {
    fs::read_to_string(path).ok()?.trim().parse().ok()
}

fn remove_if_present(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

fn process_alive(pid: u32) -> bool {
    let mut system = System::new();
    let alive = system.refresh_process(Pid::from_u32(pid));
    debug!("PID {} alive: {}", pid, alive);
    alive
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn lock_path(dir: &TempDir) -> PathBuf {
        dir.path().join("bridge.lock")
    }

    #[test]
    fn test_acquire_writes_pid_and_release_removes() {
        let dir = TempDir::new().unwrap();
        let path = lock_path(&dir);

        let lock = InstanceLock::acquire(&path).unwrap();
        assert_eq!(lock.path(), path.as_path());
        assert_eq!(read_pid(&path), Some(std::process::id()));

        drop(lock);
        assert!(!path.exists());
    }

    #[test]
    fn test_live_owner_blocks_second_instance() {
        let dir = TempDir::new().unwrap();
        let path = lock_path(&dir);
        fs::write(&path, "4242").unwrap();

        let result = InstanceLock::acquire_with(&path, |_| true);
        assert!(matches!(
            result,
            Err(BridgeError::AlreadyRunning { pid: Some(4242), .. })
        ));
        // The other server's lock is left alone
        assert_eq!(read_pid(&path), Some(4242));
    }

    #[test]
    fn test_stale_lock_is_replaced() {
        let dir = TempDir::new().unwrap();
        let path = lock_path(&dir);
        fs::write(&path, "4242").unwrap();

        let lock = InstanceLock::acquire_with(&path, |_| false).unwrap();
        assert_eq!(read_pid(lock.path()), Some(std::process::id()));
    }

    #[test]
    fn test_unreadable_lock_is_treated_as_held() {
        let dir = TempDir::new().unwrap();
        let path = lock_path(&dir);
        fs::write(&path, "").unwrap();

        let result = InstanceLock::acquire_with(&path, |_| false);
        assert!(matches!(result, Err(BridgeError::AlreadyRunning { pid: None, .. })));
    }

    #[test]
    fn test_leftover_own_pid_is_replaced() {
        let dir = TempDir::new().unwrap();
        let path = lock_path(&dir);
        fs::write(&path, std::process::id().to_string()).unwrap();

        assert!(InstanceLock::acquire_with(&path, |_| true).is_ok());
    }

    #[test]
    fn test_current_process_is_alive() {
        assert!(process_alive(std::process::id()));
    }
}
