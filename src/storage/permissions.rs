//! Pad file hardening.
//!
//! Hands a pad file to its user and strips every group/other permission bit,
//! working on the open descriptor so the file cannot be swapped underneath.

use crate::platform::identity::IdentityResolver;
use core::fmt;
use std::fs::{File, Permissions};
use std::os::unix::fs::{fchown, PermissionsExt};

/// Mode of every pad file: owner read/write only.
pub const PAD_FILE_MODE: u32 = 0o600;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HardenError {
    /// The user does not exist.
    UnknownUser,
    /// The user database could not be queried.
    Lookup,
    /// Ownership change rejected.
    Chown,
    /// Mode change rejected.
    Chmod,
}

impl fmt::Display for HardenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HardenError::UnknownUser => write!(f, "Unknown user"),
            HardenError::Lookup => write!(f, "User lookup failed"),
            HardenError::Chown => write!(f, "Unable to change owner of the pad"),
            HardenError::Chmod => write!(f, "Unable to change mode of the pad"),
        }
    }
}

impl std::error::Error for HardenError {}

/// Restricts `file` to `user`: owner and group set to the user's identity,
/// mode set to [`PAD_FILE_MODE`].
pub fn restrict<I: IdentityResolver + ?Sized>(
    file: &File,
    user: &str,
    identities: &I,
) -> Result<(), HardenError> {
    log::debug!("Protecting pad file...");
    let owner = identities
        .resolve_user(user)
        .map_err(|_| HardenError::Lookup)?
        .ok_or(HardenError::UnknownUser)?;

    if let Err(e) = fchown(file, Some(owner.uid), Some(owner.gid)) {
        log::error!("Unable to change owner of the pad: {}", e);
        return Err(HardenError::Chown);
    }
    if let Err(e) = file.set_permissions(Permissions::from_mode(PAD_FILE_MODE)) {
        log::error!("Unable to change mode of the pad: {}", e);
        return Err(HardenError::Chmod);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::identity::Owner;
    use crate::platform::PlatformError;
    use nix::unistd::{getgid, getuid};
    use std::os::unix::fs::MetadataExt;

    struct CurrentUser;

    impl IdentityResolver for CurrentUser {
        fn resolve_user(&self, name: &str) -> Result<Option<Owner>, PlatformError> {
            match name {
                "alice" => Ok(Some(Owner {
                    uid: getuid().as_raw(),
                    gid: getgid().as_raw(),
                })),
                "broken" => Err(PlatformError::UserLookupFailed),
                _ => Ok(None),
            }
        }
    }

    #[test]
    fn test_restrict_sets_owner_and_mode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alice.host.pad");
        let file = File::create(&path).unwrap();
        file.set_permissions(Permissions::from_mode(0o666)).unwrap();

        restrict(&file, "alice", &CurrentUser).unwrap();

        let meta = std::fs::metadata(&path).unwrap();
        assert_eq!(meta.mode() & 0o777, 0o600);
        assert_eq!(meta.uid(), getuid().as_raw());
        assert_eq!(meta.gid(), getgid().as_raw());
    }

    #[test]
    fn test_restrict_unknown_user() {
        let dir = tempfile::tempdir().unwrap();
        let file = File::create(dir.path().join("x.pad")).unwrap();

        assert_eq!(restrict(&file, "mallory", &CurrentUser), Err(HardenError::UnknownUser));
        assert_eq!(restrict(&file, "broken", &CurrentUser), Err(HardenError::Lookup));
    }
}
