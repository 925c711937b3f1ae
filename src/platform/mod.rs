//! Host platform collaborators.
//!
//! A pad check needs two things from the host it does not own: which volume
//! the configured device is mounted on, and which uid/gid a user name maps to.
//! Both sit behind traits so callers can plug in their own discovery.

pub mod identity;
pub mod volume;

use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformError {
    /// The mount table could not be read.
    MountTableUnreadable,
    /// The configured device node does not exist or cannot be resolved.
    InvalidDevice,
    /// The user database lookup itself failed.
    UserLookupFailed,
}

impl fmt::Display for PlatformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlatformError::MountTableUnreadable => write!(f, "Mount table unreadable"),
            PlatformError::InvalidDevice => write!(f, "Invalid device node"),
            PlatformError::UserLookupFailed => write!(f, "User database lookup failed"),
        }
    }
}

impl std::error::Error for PlatformError {}
