//! Per-pair check serialization.
//!
//! Two checks for the same (user, device) must not interleave: both could read
//! the same matching pad and then race on the rotation. Each check holds an
//! exclusive `flock` on a lock file named after the pair. `flock` locks belong
//! to the open file description, so the lock excludes other threads of this
//! process as well as other processes.

use super::StorageError;
use nix::fcntl::{Flock, FlockArg};
use std::fs::{File, OpenOptions};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

const LOCK_DOMAIN: &str = "usbpad 2024 pad lock v1";

/// Exclusive lock over one (user, device) pair. Released on drop.
pub struct PadLock {
    _lock: Flock<File>,
    path: PathBuf,
}

impl PadLock {
    /// Blocks until the lock for (`user`, `device`) in `dir` is held.
    pub fn acquire(dir: &Path, user: &str, device: &str) -> Result<Self, StorageError> {
        let path = dir.join(lock_file_name(user, device));
        log::debug!("Acquiring pad lock {}", path.display());

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .mode(0o600)
            .custom_flags(nix::fcntl::OFlag::O_NOFOLLOW.bits())
            .open(&path)?;

        let lock = Flock::lock(file, FlockArg::LockExclusive)
            .map_err(|(_, errno)| StorageError::from(std::io::Error::from(errno)))?;

        Ok(Self { _lock: lock, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Lock file name for a pair: a keyed hash, so arbitrary user and device
/// strings map to a fixed-length, path-safe name.
pub fn lock_file_name(user: &str, device: &str) -> String {
    let mut hasher = blake3::Hasher::new_derive_key(LOCK_DOMAIN);
    hasher.update(&(user.len() as u64).to_le_bytes());
    hasher.update(user.as_bytes());
    hasher.update(device.as_bytes());
    let hash = hasher.finalize();
    format!(".{}.lock", hex::encode(&hash.as_bytes()[..16]))
}
