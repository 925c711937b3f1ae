//! Raw Pad File Access.
//!
//! Provides the file operations the pad store is built from.
//!
//! # Security
//! - Files opened for rewriting are created with mode `0600` and never follow a
//!   final symlink, so a planted link on the removable volume cannot redirect
//!   the write.
//! - Opening for rewrite does not truncate; contents are only replaced by
//!   [`rewrite`], after the caller had the chance to harden the file.

use super::StorageError;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

/// Opens an existing pad file read-only.
pub fn open_read<P: AsRef<Path>>(path: P) -> Result<File, StorageError> {
    Ok(File::open(path)?)
}

/// Succeeds if `path` names an existing file. Nothing is opened or created.
pub fn exists<P: AsRef<Path>>(path: P) -> Result<(), StorageError> {
    fs::metadata(path)?;
    Ok(())
}

/// Reads up to `buf.len()` bytes, stopping early at end of file.
///
/// Returns the number of bytes read; the rest of `buf` is left as it was.
pub fn read_up_to(file: &mut File, buf: &mut [u8]) -> Result<usize, StorageError> {
    let mut filled = 0;
    while filled < buf.len() {
        match file.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}

/// Opens (creating if needed) a pad file for rewriting, without truncating it.
pub fn open_for_rewrite<P: AsRef<Path>>(path: P) -> Result<File, StorageError> {
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .mode(0o600)
        .custom_flags(nix::fcntl::OFlag::O_NOFOLLOW.bits())
        .open(path)?;
    Ok(file)
}

/// Replaces the whole contents of `file` with `data`.
pub fn rewrite(file: &mut File, data: &[u8]) -> Result<(), StorageError> {
    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    file.write_all(data)?;
    file.flush()?;
    Ok(())
}

/// Flushes file data and metadata to stable storage.
pub fn sync(file: &File) -> Result<(), StorageError> {
    Ok(file.sync_all()?)
}
