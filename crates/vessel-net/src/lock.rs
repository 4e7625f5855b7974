//! Host-wide network lock.
//!
//! Bridge and uplink creation, and address allocation, are probe-then-act
//! sequences. A file lock in the network state directory serializes them
//! across concurrent runtime invocations; the lock is released when the
//! guard drops, including on panic or early return.

use std::fs::File;
use std::path::Path;

use nix::fcntl::{Flock, FlockArg};

use vessel_common::constants::NETWORK_DIR;
use vessel_common::error::{Result, VesselError};

/// Exclusive guard over host-wide network state.
pub struct NetworkLock {
    _lock: Flock<File>,
}

impl std::fmt::Debug for NetworkLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkLock").finish_non_exhaustive()
    }
}

impl NetworkLock {
    /// Acquires the lock under the system network state directory,
    /// blocking until it is free.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock file cannot be created or locked.
    pub fn acquire() -> Result<Self> {
        Self::acquire_at(Path::new(NETWORK_DIR))
    }

    /// Acquires the lock under an explicit directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock file cannot be created or locked.
    pub fn acquire_at(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir).map_err(|e| VesselError::io(dir, e))?;
        let path = dir.join("lock");
        let file = File::options()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|e| VesselError::io(&path, e))?;
        let lock = Flock::lock(file, FlockArg::LockExclusive).map_err(|(_, errno)| {
            VesselError::Link {
                message: format!("can't lock {}: {errno}", path.display()),
            }
        })?;
        tracing::debug!(path = %path.display(), "network lock acquired");
        Ok(Self { _lock: lock })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_creates_the_lock_file() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let _guard = NetworkLock::acquire_at(dir.path()).expect("acquire failed");
        assert!(dir.path().join("lock").exists());
    }

    #[test]
    fn lock_can_be_reacquired_after_release() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        drop(NetworkLock::acquire_at(dir.path()).expect("first acquire failed"));
        let _guard = NetworkLock::acquire_at(dir.path()).expect("second acquire failed");
    }
}
