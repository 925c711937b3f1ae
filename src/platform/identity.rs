//! User identity resolution.

use super::PlatformError;
use nix::unistd::User;

/// The owner a pad file is handed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Owner {
    pub uid: u32,
    pub gid: u32,
}

/// Maps a user name to the identity that should own that user's pads.
pub trait IdentityResolver {
    /// Returns `Ok(None)` if no such user exists.
    fn resolve_user(&self, name: &str) -> Result<Option<Owner>, PlatformError>;
}

/// Looks users up in the host's user database (`getpwnam_r`).
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemUsers;

impl IdentityResolver for SystemUsers {
    fn resolve_user(&self, name: &str) -> Result<Option<Owner>, PlatformError> {
        match User::from_name(name) {
            Ok(Some(user)) => Ok(Some(Owner {
                uid: user.uid.as_raw(),
                gid: user.gid.as_raw(),
            })),
            Ok(None) => Ok(None),
            Err(e) => {
                log::error!("Unable to retrieve information for user \"{}\": {}", name, e);
                Err(PlatformError::UserLookupFailed)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolves_root() {
        let owner = SystemUsers.resolve_user("root").unwrap().unwrap();
        assert_eq!(owner.uid, 0);
    }

    #[test]
    fn test_unknown_user() {
        let owner = SystemUsers.resolve_user("no-such-user-usbpad-test").unwrap();
        assert_eq!(owner, None);
    }
}
