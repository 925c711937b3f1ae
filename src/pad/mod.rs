//! Pad Lifecycle Module.
//!
//! A pad is a fixed-length random secret kept twice: once on the removable
//! volume (device pad) and once on the host (system pad). A check succeeds only
//! if both copies are byte-identical, and every successful check replaces both
//! copies with a fresh pad, so a cloned device carries a value the host has
//! already moved past.
//!
//! # Components
//! - `locator`: Computes where the two pad files live.
//! - `compare`: Constant-time equality of the loaded copies.
//! - `store`: Loads and rewrites both files as a pair.
//! - `verifier`: The compare-then-rotate state machine.
//!
//! # Security
//! - **Fail-closed**: anything missing or unreadable yields a negative verdict.
//! - **Zeroization**: pad buffers are zero-initialized per call and wiped on drop.
//! - **Hardening**: pad files are `0600` and owned by the authenticating user.

pub mod compare;
pub mod locator;
pub mod store;
pub mod verifier;

use crate::entropy::EntropyError;
use crate::storage::permissions::HardenError;
use crate::storage::StorageError;
use core::fmt;

/// Length of every pad, in bytes.
pub const PAD_LEN: usize = 1024;

/// Which copy of a pad an operation concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// The copy on the removable volume.
    Device,
    /// The copy on the host.
    System,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Device => write!(f, "device"),
            Side::System => write!(f, "system"),
        }
    }
}

/// Errors related to pad operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PadError {
    /// No mounted volume for the configured device.
    VolumeUnavailable,
    /// No path could be computed (missing mount point or invalid name).
    NoPath(Side),
    /// Pad file could not be opened.
    Open(Side, StorageError),
    /// Pad file could not be restricted to its user.
    Harden(Side, HardenError),
    /// Pad file could not be read.
    Read(Side, StorageError),
    /// Pad file could not be written.
    Write(Side, StorageError),
    /// Pad file could not be flushed to stable storage.
    Sync(Side, StorageError),
    /// No fresh pad could be generated.
    Entropy(EntropyError),
    /// The per-pair lock could not be taken.
    Lock(StorageError),
}

impl PadError {
    /// The side the error happened on, if it is side-specific.
    pub fn side(&self) -> Option<Side> {
        match *self {
            PadError::NoPath(side)
            | PadError::Open(side, _)
            | PadError::Harden(side, _)
            | PadError::Read(side, _)
            | PadError::Write(side, _)
            | PadError::Sync(side, _) => Some(side),
            PadError::VolumeUnavailable | PadError::Entropy(_) | PadError::Lock(_) => None,
        }
    }
}

impl fmt::Display for PadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PadError::VolumeUnavailable => write!(f, "Device volume unavailable"),
            PadError::NoPath(side) => write!(f, "No {} pad path", side),
            PadError::Open(side, e) => write!(f, "Cannot open {} pad: {}", side, e),
            PadError::Harden(side, e) => write!(f, "Cannot protect {} pad: {}", side, e),
            PadError::Read(side, e) => write!(f, "Cannot read {} pad: {}", side, e),
            PadError::Write(side, e) => write!(f, "Cannot write {} pad: {}", side, e),
            PadError::Sync(side, e) => write!(f, "Cannot synchronize {} pad: {}", side, e),
            PadError::Entropy(e) => write!(f, "Cannot generate pad: {}", e),
            PadError::Lock(e) => write!(f, "Cannot lock pad pair: {}", e),
        }
    }
}

impl std::error::Error for PadError {}

impl From<EntropyError> for PadError {
    fn from(err: EntropyError) -> Self {
        PadError::Entropy(err)
    }
}
