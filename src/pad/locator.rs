//! Pad file locations.
//!
//! - Device pad: `<mount_point>/<pad_directory>/<user>.<hostname>.pad`
//! - System pad: `<system_pad_directory>/<user>.<device_name>.pad`
//!
//! Pure path composition, no I/O. Missing or unsafe inputs yield `None`, which
//! callers treat exactly like a missing file.

use super::{PadError, Side};
use crate::config::PadConfig;
use crate::platform::volume::MountedVolume;
use std::path::{Component, Path, PathBuf};

/// Path of the device-side pad.
pub fn device_file_path(
    mount_point: Option<&Path>,
    pad_directory: &str,
    user: &str,
    hostname: &str,
) -> Option<PathBuf> {
    let mount_point = mount_point?;
    if mount_point.as_os_str().is_empty() || !is_relative_subdir(pad_directory) {
        return None;
    }
    let name = pad_file_name(user, hostname)?;
    Some(mount_point.join(pad_directory).join(name))
}

/// Path of the system-side pad.
pub fn system_file_path(system_pad_directory: &Path, user: &str, device_name: &str) -> Option<PathBuf> {
    if system_pad_directory.as_os_str().is_empty() {
        return None;
    }
    let name = pad_file_name(user, device_name)?;
    Some(system_pad_directory.join(name))
}

/// Both pad paths of one user on one volume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PadPaths {
    pub device: PathBuf,
    pub system: PathBuf,
}

impl PadPaths {
    pub fn locate(config: &PadConfig, volume: &MountedVolume, user: &str) -> Result<Self, PadError> {
        let device = device_file_path(
            volume.mount_point.as_deref(),
            &config.device_pad_directory,
            user,
            &config.hostname,
        )
        .ok_or(PadError::NoPath(Side::Device))?;
        let system = system_file_path(&config.system_pad_directory, user, &volume.device_name)
            .ok_or(PadError::NoPath(Side::System))?;
        Ok(Self { device, system })
    }

    pub fn get(&self, side: Side) -> &Path {
        match side {
            Side::Device => &self.device,
            Side::System => &self.system,
        }
    }
}

fn pad_file_name(user: &str, namespace: &str) -> Option<String> {
    if !is_name_component(user) || !is_name_component(namespace) {
        return None;
    }
    Some(format!("{}.{}.pad", user, namespace))
}

fn is_name_component(s: &str) -> bool {
    !s.is_empty() && s != "." && s != ".." && !s.contains('/') && !s.contains('\0')
}

fn is_relative_subdir(dir: &str) -> bool {
    !dir.is_empty()
        && !dir.contains('\0')
        && Path::new(dir)
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_path() {
        let path = device_file_path(Some(Path::new("/media/stick")), ".usbpad", "alice", "workstation");
        assert_eq!(path, Some(PathBuf::from("/media/stick/.usbpad/alice.workstation.pad")));
    }

    #[test]
    fn test_system_path() {
        let path = system_file_path(Path::new("/var/lib/usbpad"), "alice", "sandisk");
        assert_eq!(path, Some(PathBuf::from("/var/lib/usbpad/alice.sandisk.pad")));
    }

    #[test]
    fn test_missing_inputs_give_no_path() {
        assert_eq!(device_file_path(None, ".usbpad", "alice", "host"), None);
        assert_eq!(device_file_path(Some(Path::new("")), ".usbpad", "alice", "host"), None);
        assert_eq!(device_file_path(Some(Path::new("/m")), "", "alice", "host"), None);
        assert_eq!(device_file_path(Some(Path::new("/m")), ".usbpad", "", "host"), None);
        assert_eq!(device_file_path(Some(Path::new("/m")), ".usbpad", "alice", ""), None);
        assert_eq!(system_file_path(Path::new(""), "alice", "dev"), None);
        assert_eq!(system_file_path(Path::new("/p"), "alice", ""), None);
    }

    #[test]
    fn test_traversal_rejected() {
        assert_eq!(device_file_path(Some(Path::new("/m")), "../etc", "alice", "host"), None);
        assert_eq!(device_file_path(Some(Path::new("/m")), "/etc", "alice", "host"), None);
        assert_eq!(system_file_path(Path::new("/p"), "../root", "dev"), None);
        assert_eq!(system_file_path(Path::new("/p"), "alice", ".."), None);
        assert!(device_file_path(Some(Path::new("/m")), "pads/nested", "alice", "host").is_some());
    }

    #[test]
    fn test_locate_reports_side() {
        let config = PadConfig {
            hostname: String::from("host"),
            ..Default::default()
        };
        let mut volume = MountedVolume {
            mount_point: None,
            device_name: String::from("stick"),
        };
        assert_eq!(
            PadPaths::locate(&config, &volume, "alice"),
            Err(PadError::NoPath(Side::Device))
        );

        volume.mount_point = Some(PathBuf::from("/media/stick"));
        volume.device_name = String::new();
        assert_eq!(
            PadPaths::locate(&config, &volume, "alice"),
            Err(PadError::NoPath(Side::System))
        );

        volume.device_name = String::from("stick");
        let paths = PadPaths::locate(&config, &volume, "alice").unwrap();
        assert_eq!(paths.get(Side::Device), Path::new("/media/stick/.usbpad/alice.host.pad"));
        assert_eq!(paths.get(Side::System), Path::new("/var/lib/usbpad/alice.stick.pad"));
    }
}
