//! Pad verification state machine.
//!
//! # States
//! - **Start**: nothing resolved yet.
//! - **VolumeResolved**: the device's volume is mounted and leased.
//! - **Loaded**: both pad copies are in memory.
//! - **Match** / **Mismatch**: outcome of the constant-time comparison.
//! - **Rotated**: both copies replaced with a fresh pad.
//! - **VolumeFailed**, **LockFailed**, **LoadFailed**: fail-closed terminals.
//!   A user without both pad files ends in `LoadFailed` before the per-pair
//!   lock is taken, so no lock file is created for them.
//! - **RotationFailed**: matched, but the rewrite did not fully succeed.
//!
//! The verdict is `true` exactly for `Rotated` and `RotationFailed`: once the
//! copies matched, a failed rotation does not revoke the authentication.

use super::compare::ct_eq;
use super::store::PadStore;
use super::{PadError, PAD_LEN};
use crate::config::PadConfig;
use crate::entropy::{self, OsEntropy, PadSource};
use crate::platform::identity::{IdentityResolver, SystemUsers};
use crate::platform::volume::{VolumeLease, VolumeResolver};
use crate::storage::lock::PadLock;

/// Possible states of a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckState {
    Start,
    VolumeResolved,
    Loaded,
    Match,
    Mismatch,
    Rotated,
    VolumeFailed,
    LockFailed,
    LoadFailed,
    RotationFailed,
}

impl CheckState {
    /// Whether a check ending in this state authenticates the user.
    pub fn verdict(self) -> bool {
        matches!(self, CheckState::Rotated | CheckState::RotationFailed)
    }
}

/// Outcome of one check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckReport {
    pub verdict: bool,
    /// Terminal state.
    pub state: CheckState,
    /// Why the check failed, or why the rotation did.
    pub failure: Option<PadError>,
}

/// Runs pad checks for one configured device.
pub struct PadVerifier<'a> {
    config: &'a PadConfig,
    volumes: &'a dyn VolumeResolver,
    identities: &'a dyn IdentityResolver,
    source: Box<dyn PadSource + 'a>,
    state: CheckState,
}

impl<'a> PadVerifier<'a> {
    /// Verifier using the host user database and the OS CSPRNG.
    pub fn new(config: &'a PadConfig, volumes: &'a dyn VolumeResolver) -> Self {
        Self {
            config,
            volumes,
            identities: &SystemUsers,
            source: Box::new(OsEntropy),
            state: CheckState::Start,
        }
    }

    pub fn with_identities(mut self, identities: &'a dyn IdentityResolver) -> Self {
        self.identities = identities;
        self
    }

    pub fn with_source<S: PadSource + 'a>(mut self, source: S) -> Self {
        self.source = Box::new(source);
        self
    }

    /// State reached by the last check.
    pub fn state(&self) -> CheckState {
        self.state
    }

    /// Checks `user`'s pads; `true` iff they matched.
    pub fn check(&mut self, user: &str) -> bool {
        self.run(user).verdict
    }

    /// Checks `user`'s pads and rotates them on a match.
    pub fn run(&mut self, user: &str) -> CheckReport {
        self.state = CheckState::Start;

        let volume = match VolumeLease::acquire(self.volumes, &self.config.device) {
            Some(volume) => volume,
            None => {
                log::error!("Unable to locate device \"{}\"", self.config.device.name);
                return self.finish(CheckState::VolumeFailed, Some(PadError::VolumeUnavailable));
            }
        };
        self.transition(CheckState::VolumeResolved);

        let store = PadStore::new(self.config, &volume, self.identities);
        if let Err(e) = store.provisioned(user) {
            log::error!("Pad checking failed: {}", e);
            return self.finish(CheckState::LoadFailed, Some(e));
        }

        let _lock = match PadLock::acquire(self.config.lock_directory(), user, &volume.device_name) {
            Ok(lock) => lock,
            Err(e) => {
                log::error!("Unable to lock pads of \"{}\": {}", user, e);
                return self.finish(CheckState::LockFailed, Some(PadError::Lock(e)));
            }
        };

        let matched = match store.load(user) {
            Ok(pads) => {
                self.transition(CheckState::Loaded);
                ct_eq(&pads.device, &pads.system)
            }
            Err(e) => {
                log::error!("Pad checking failed: {}", e);
                return self.finish(CheckState::LoadFailed, Some(e));
            }
        };

        if !matched {
            log::error!("Pad checking failed !");
            return self.finish(CheckState::Mismatch, None);
        }
        self.transition(CheckState::Match);

        log::info!("Verification match, updating one time pads...");
        let rotation = entropy::generate(&mut self.source, PAD_LEN)
            .map_err(PadError::from)
            .and_then(|pad| store.store(user, &pad));

        match rotation {
            Ok(()) => self.finish(CheckState::Rotated, None),
            Err(e) => {
                log::error!("Unable to update pads: {}", e);
                self.finish(CheckState::RotationFailed, Some(e))
            }
        }
    }

    fn transition(&mut self, to: CheckState) {
        log::info!("State transition: {:?} -> {:?}", self.state, to);
        self.state = to;
    }

    fn finish(&mut self, state: CheckState, failure: Option<PadError>) -> CheckReport {
        self.transition(state);
        CheckReport {
            verdict: state.verdict(),
            state,
            failure,
        }
    }
}

/// Checks `user`'s pads on the volume `volumes` resolves for `config.device`,
/// rotating them on a match.
pub fn check_pad(config: &PadConfig, volumes: &dyn VolumeResolver, user: &str) -> bool {
    PadVerifier::new(config, volumes).check(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entropy::queued::PadQueue;
    use crate::platform::identity::Owner;
    use crate::platform::volume::{FixedMount, MountedVolume};
    use crate::config::DeviceConfig;
    use crate::pad::Side;
    use crate::platform::PlatformError;
    use crate::storage::StorageError;
    use nix::unistd::{getgid, getuid};
    use std::cell::Cell;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    struct CurrentUser;

    impl IdentityResolver for CurrentUser {
        fn resolve_user(&self, _name: &str) -> Result<Option<Owner>, PlatformError> {
            Ok(Some(Owner {
                uid: getuid().as_raw(),
                gid: getgid().as_raw(),
            }))
        }
    }

    struct Setup {
        mount: TempDir,
        _host: TempDir,
        config: PadConfig,
    }

    impl Setup {
        fn new() -> Self {
            let mount = tempfile::tempdir().unwrap();
            let host = tempfile::tempdir().unwrap();
            fs::create_dir(mount.path().join(".usbpad")).unwrap();
            let config = PadConfig {
                hostname: String::from("host"),
                device: DeviceConfig {
                    name: String::from("stick"),
                    node: None,
                },
                system_pad_directory: host.path().to_path_buf(),
                ..Default::default()
            };
            Self {
                mount,
                _host: host,
                config,
            }
        }

        fn device_pad(&self) -> PathBuf {
            self.mount.path().join(".usbpad/alice.host.pad")
        }

        fn system_pad(&self) -> PathBuf {
            self.config.system_pad_directory.join("alice.stick.pad")
        }

        fn provision(&self, device: &[u8], system: &[u8]) {
            fs::write(self.device_pad(), device).unwrap();
            fs::write(self.system_pad(), system).unwrap();
        }
    }

    struct Absent {
        resolved: Cell<u32>,
    }

    impl VolumeResolver for Absent {
        fn resolve(&self, _device: &DeviceConfig) -> Option<MountedVolume> {
            self.resolved.set(self.resolved.get() + 1);
            None
        }
    }

    #[test]
    fn test_match_rotates_with_injected_source() {
        let setup = Setup::new();
        setup.provision(&[0u8; PAD_LEN], &[0u8; PAD_LEN]);
        let mount = FixedMount::new(setup.mount.path());
        let mut source = PadQueue::new();
        source.push(&[0x42; PAD_LEN]);

        let mut verifier = PadVerifier::new(&setup.config, &mount)
            .with_identities(&CurrentUser)
            .with_source(source);
        let report = verifier.run("alice");

        assert_eq!(report, CheckReport { verdict: true, state: CheckState::Rotated, failure: None });
        assert_eq!(verifier.state(), CheckState::Rotated);
        assert_eq!(fs::read(setup.device_pad()).unwrap(), vec![0x42; PAD_LEN]);
        assert_eq!(fs::read(setup.system_pad()).unwrap(), vec![0x42; PAD_LEN]);
    }

    #[test]
    fn test_mismatch_leaves_pads() {
        let setup = Setup::new();
        let mut system = vec![0u8; PAD_LEN];
        system[PAD_LEN - 1] = 1;
        setup.provision(&[0u8; PAD_LEN], &system);
        let mount = FixedMount::new(setup.mount.path());

        let report = PadVerifier::new(&setup.config, &mount)
            .with_identities(&CurrentUser)
            .run("alice");

        assert!(!report.verdict);
        assert_eq!(report.state, CheckState::Mismatch);
        assert_eq!(fs::read(setup.device_pad()).unwrap(), vec![0u8; PAD_LEN]);
        assert_eq!(fs::read(setup.system_pad()).unwrap(), system);
    }

    #[test]
    fn test_no_volume() {
        let setup = Setup::new();
        let absent = Absent { resolved: Cell::new(0) };

        let report = PadVerifier::new(&setup.config, &absent).run("alice");
        assert_eq!(report.state, CheckState::VolumeFailed);
        assert_eq!(report.failure, Some(PadError::VolumeUnavailable));
        assert!(!report.verdict);
        assert_eq!(absent.resolved.get(), 1);
    }

    #[test]
    fn test_missing_pads_fail_closed() {
        let setup = Setup::new();
        let mount = FixedMount::new(setup.mount.path());

        let report = PadVerifier::new(&setup.config, &mount).run("alice");
        assert_eq!(report.state, CheckState::LoadFailed);
        assert_eq!(report.failure, Some(PadError::Open(Side::System, StorageError::NotFound)));
        assert!(!setup.device_pad().exists());
        assert!(!setup.system_pad().exists());
        assert_eq!(fs::read_dir(&setup.config.system_pad_directory).unwrap().count(), 0);
    }

    #[test]
    fn test_missing_device_pad_takes_no_lock() {
        let setup = Setup::new();
        fs::write(setup.system_pad(), [0u8; PAD_LEN]).unwrap();
        let mount = FixedMount::new(setup.mount.path());

        let report = PadVerifier::new(&setup.config, &mount).run("alice");
        assert_eq!(report.failure, Some(PadError::Open(Side::Device, StorageError::NotFound)));
        assert_eq!(fs::read_dir(&setup.config.system_pad_directory).unwrap().count(), 1);
    }

    #[test]
    fn test_exhausted_source_keeps_verdict() {
        let setup = Setup::new();
        setup.provision(&[5u8; PAD_LEN], &[5u8; PAD_LEN]);
        let mount = FixedMount::new(setup.mount.path());

        let report = PadVerifier::new(&setup.config, &mount)
            .with_identities(&CurrentUser)
            .with_source(PadQueue::new())
            .run("alice");

        assert!(report.verdict);
        assert_eq!(report.state, CheckState::RotationFailed);
        assert_eq!(report.failure, Some(PadError::Entropy(crate::entropy::EntropyError::Exhausted)));
        assert_eq!(fs::read(setup.system_pad()).unwrap(), vec![5u8; PAD_LEN]);
    }

    #[test]
    fn test_missing_lock_directory_fails_closed() {
        let mut setup = Setup::new();
        setup.provision(&[0u8; PAD_LEN], &[0u8; PAD_LEN]);
        setup.config.lock_directory = Some(setup.mount.path().join("no-such-dir"));
        let mount = FixedMount::new(setup.mount.path());

        let report = PadVerifier::new(&setup.config, &mount).run("alice");
        assert_eq!(report.state, CheckState::LockFailed);
        assert!(!report.verdict);
    }

    #[test]
    fn test_check_pad_with_os_entropy() {
        let setup = Setup::new();
        setup.provision(&[0u8; PAD_LEN], &[0u8; PAD_LEN]);
        let mount = FixedMount::new(setup.mount.path());

        let mut verifier = PadVerifier::new(&setup.config, &mount).with_identities(&CurrentUser);
        assert!(verifier.check("alice"));
        let rotated = fs::read(setup.system_pad()).unwrap();
        assert_ne!(rotated, vec![0u8; PAD_LEN]);
        assert_eq!(fs::read(setup.device_pad()).unwrap(), rotated);
        // The rotated pair authenticates the next check.
        assert!(verifier.check("alice"));
    }
}
