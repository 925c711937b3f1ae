//! Storage Module.
//!
//! Low-level file handling for pad files:
//! - Raw pad file access (bounded reads, in-place rewrites, durable flush).
//! - Ownership and mode restriction of pad files.
//! - Advisory locks serializing checks per (user, device).

pub mod lock;
pub mod permissions;
pub mod raw_files;

use core::fmt;

/// Errors related to storage operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// File not found.
    NotFound,
    /// Permission denied.
    PermissionDenied,
    /// Filesystem is mounted read-only.
    ReadOnly,
    /// Storage is full.
    DiskFull,
    /// Path component is a file where a directory was expected, or vice versa.
    InvalidPath,
    /// IO error (generic).
    IoError,
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::NotFound => write!(f, "No such file or directory"),
            StorageError::PermissionDenied => write!(f, "Permission denied"),
            StorageError::ReadOnly => write!(f, "Read-only file system"),
            StorageError::DiskFull => write!(f, "No space left on device"),
            StorageError::InvalidPath => write!(f, "Invalid path"),
            StorageError::IoError => write!(f, "I/O error"),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        use nix::errno::Errno;

        match err.kind() {
            std::io::ErrorKind::NotFound => return StorageError::NotFound,
            std::io::ErrorKind::PermissionDenied => return StorageError::PermissionDenied,
            _ => {}
        }
        match err.raw_os_error().map(Errno::from_raw) {
            Some(Errno::EROFS) => StorageError::ReadOnly,
            Some(Errno::ENOSPC) | Some(Errno::EDQUOT) => StorageError::DiskFull,
            Some(Errno::ENOTDIR) | Some(Errno::EISDIR) => StorageError::InvalidPath,
            Some(Errno::EPERM) => StorageError::PermissionDenied,
            _ => StorageError::IoError,
        }
    }
}
