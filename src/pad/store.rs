//! Paired pad file access.
//!
//! Loads and rewrites the device and system pad of one user as a pair.
//!
//! # Rewrite protocol
//! 1. Open the system pad (no truncation) and harden it. Any failure here
//!    aborts before either file is modified; both copies keep the old pad.
//! 2. Open the device pad. If it cannot be opened the failure is recorded and
//!    the rotation continues on the system side alone.
//! 3. Harden the device pad. Under [`HardeningPolicy::Strict`] a failure
//!    aborts before either file is modified.
//! 4. Write the device pad, then the system pad.
//! 5. Flush both to stable storage.
//!
//! Once the files are open and hardened the system copy always receives the
//! fresh pad, so a device pad consumed by a successful check can never match
//! again, even when the device side could not be opened or written.

use super::locator::PadPaths;
use super::{PadError, Side, PAD_LEN};
use crate::config::{HardeningPolicy, PadConfig};
use crate::platform::identity::IdentityResolver;
use crate::platform::volume::MountedVolume;
use crate::storage::{permissions, raw_files};
use std::fs::File;
use zeroize::Zeroizing;

/// The two copies of a pad, as read from disk.
pub struct LoadedPads {
    pub device: Zeroizing<Vec<u8>>,
    pub system: Zeroizing<Vec<u8>>,
}

/// Access to the pad pair of the users of one mounted volume.
pub struct PadStore<'a, I: IdentityResolver + ?Sized> {
    config: &'a PadConfig,
    volume: &'a MountedVolume,
    identities: &'a I,
}

impl<'a, I: IdentityResolver + ?Sized> PadStore<'a, I> {
    pub fn new(config: &'a PadConfig, volume: &'a MountedVolume, identities: &'a I) -> Self {
        Self {
            config,
            volume,
            identities,
        }
    }

    pub fn paths(&self, user: &str) -> Result<PadPaths, PadError> {
        PadPaths::locate(self.config, self.volume, user)
    }

    /// Reads both pads of `user`.
    ///
    /// Each buffer is `PAD_LEN` bytes, zero-filled before reading; a short file
    /// leaves the tail zero. Fails if either file cannot be opened or read.
    pub fn load(&self, user: &str) -> Result<LoadedPads, PadError> {
        let paths = self.paths(user)?;

        let mut f_system = open_side(&paths, Side::System)?;
        let mut f_device = open_side(&paths, Side::Device)?;

        log::debug!("Loading device pad...");
        let device = read_side(&mut f_device, Side::Device)?;
        log::debug!("Loading system pad...");
        let system = read_side(&mut f_system, Side::System)?;

        Ok(LoadedPads { device, system })
    }

    /// Replaces both pads of `user` with `pad`.
    ///
    /// See the module documentation for the ordering and what each failure
    /// leaves behind. Returns the first failure encountered.
    pub fn store(&self, user: &str, pad: &[u8]) -> Result<(), PadError> {
        let paths = self.paths(user)?;

        let mut f_system = open_rewrite_side(&paths, Side::System)?;
        self.harden(&f_system, Side::System, user)?;

        let mut first_error = None;
        let mut f_device = match open_rewrite_side(&paths, Side::Device) {
            Ok(f) => Some(f),
            Err(e) => {
                log::error!("Unable to update device pad: {}", e);
                first_error = Some(e);
                None
            }
        };
        if let Some(f) = f_device.as_ref() {
            self.harden(f, Side::Device, user)?;
        }

        let device_written = match f_device.as_mut() {
            Some(f) => {
                log::debug!("Writing pad to the device...");
                match raw_files::rewrite(f, pad) {
                    Ok(()) => true,
                    Err(e) => {
                        let e = PadError::Write(Side::Device, e);
                        log::error!("{}", e);
                        first_error.get_or_insert(e);
                        false
                    }
                }
            }
            None => false,
        };

        log::debug!("Writing pad to the system...");
        let system_written = match raw_files::rewrite(&mut f_system, pad) {
            Ok(()) => true,
            Err(e) => {
                let e = PadError::Write(Side::System, e);
                log::error!("{}", e);
                first_error.get_or_insert(e);
                false
            }
        };

        log::debug!("Synchronizing filesystems...");
        if let (true, Some(f)) = (device_written, f_device.as_ref()) {
            if let Err(e) = raw_files::sync(f) {
                first_error.get_or_insert(PadError::Sync(Side::Device, e));
            }
        }
        if system_written {
            if let Err(e) = raw_files::sync(&f_system) {
                first_error.get_or_insert(PadError::Sync(Side::System, e));
            }
        }

        match first_error {
            None => {
                log::debug!("One time pads updated.");
                Ok(())
            }
            Some(e) => Err(e),
        }
    }

    /// Checks that both pad files of `user` exist, without opening or
    /// creating anything.
    pub fn provisioned(&self, user: &str) -> Result<PadPaths, PadError> {
        let paths = self.paths(user)?;
        for side in [Side::System, Side::Device] {
            raw_files::exists(paths.get(side)).map_err(|e| {
                log::debug!("No {} pad: {}", side, e);
                PadError::Open(side, e)
            })?;
        }
        Ok(paths)
    }

    fn harden(&self, file: &File, side: Side, user: &str) -> Result<(), PadError> {
        if let Err(e) = permissions::restrict(file, user, self.identities) {
            match self.config.hardening {
                HardeningPolicy::Strict => {
                    log::error!("Refusing to rotate pads: {} pad not protected: {}", side, e);
                    return Err(PadError::Harden(side, e));
                }
                HardeningPolicy::Lenient => {
                    log::warn!("Writing {} pad with unrestricted permissions: {}", side, e)
                }
            }
        }
        Ok(())
    }
}

fn open_rewrite_side(paths: &PadPaths, side: Side) -> Result<File, PadError> {
    raw_files::open_for_rewrite(paths.get(side)).map_err(|e| {
        log::debug!("Cannot open {} file: {}", side, e);
        PadError::Open(side, e)
    })
}

fn open_side(paths: &PadPaths, side: Side) -> Result<File, PadError> {
    raw_files::open_read(paths.get(side)).map_err(|e| {
        log::debug!("Cannot open {} file: {}", side, e);
        PadError::Open(side, e)
    })
}

fn read_side(file: &mut File, side: Side) -> Result<Zeroizing<Vec<u8>>, PadError> {
    let mut buf = Zeroizing::new(vec![0u8; PAD_LEN]);
    let n = raw_files::read_up_to(file, &mut buf).map_err(|e| PadError::Read(side, e))?;
    if n < PAD_LEN {
        log::debug!("Short {} pad: {} of {} bytes", side, n, PAD_LEN);
    }
    Ok(buf)
}
