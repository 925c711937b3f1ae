//! Configuration for pad checks.
//!
//! Defines the values the pad lifecycle needs. How they are loaded is up to the
//! host application (PAM module, CLI, ...); with the `config-file` feature a
//! TOML document can be parsed directly.

use std::path::PathBuf;

#[cfg(feature = "config-file")]
use serde::Deserialize;

/// Default subdirectory of the removable volume holding device pads.
pub const DEFAULT_DEVICE_PAD_DIRECTORY: &str = ".usbpad";

/// Default host directory holding system pads.
pub const DEFAULT_SYSTEM_PAD_DIRECTORY: &str = "/var/lib/usbpad";

/// What to do when ownership or mode of a pad file cannot be restricted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "config-file", derive(Deserialize))]
#[cfg_attr(feature = "config-file", serde(rename_all = "lowercase"))]
pub enum HardeningPolicy {
    /// Refuse to write a pad into a file that could not be hardened.
    #[default]
    Strict,
    /// Log the failure and write anyway.
    Lenient,
}

/// The removable device a user authenticates with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "config-file", derive(Deserialize))]
#[cfg_attr(feature = "config-file", serde(default))]
pub struct DeviceConfig {
    /// Device name; namespaces the system-side pad file.
    pub name: String,

    /// Device node used to locate the mounted volume
    /// (e.g. "/dev/disk/by-uuid/1234-ABCD").
    pub node: Option<PathBuf>,
}

/// Main configuration structure for pad checks.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config-file", derive(Deserialize))]
#[cfg_attr(feature = "config-file", serde(default))]
pub struct PadConfig {
    /// Host name; namespaces the device-side pad file so one device can
    /// serve several machines.
    pub hostname: String,

    pub device: DeviceConfig,

    /// Directory, relative to the volume's mount point, holding device pads.
    pub device_pad_directory: String,

    /// Host directory holding system pads.
    pub system_pad_directory: PathBuf,

    /// Directory for per-(user, device) lock files.
    /// If None, the system pad directory is used.
    pub lock_directory: Option<PathBuf>,

    pub hardening: HardeningPolicy,
}

impl Default for PadConfig {
    fn default() -> Self {
        Self {
            hostname: String::new(),
            device: DeviceConfig::default(),
            device_pad_directory: String::from(DEFAULT_DEVICE_PAD_DIRECTORY),
            system_pad_directory: PathBuf::from(DEFAULT_SYSTEM_PAD_DIRECTORY),
            lock_directory: None,
            hardening: HardeningPolicy::default(),
        }
    }
}

impl PadConfig {
    /// Configuration for `device`, with the hostname taken from the running host.
    ///
    /// Falls back to an empty hostname if it cannot be read; such a config
    /// never yields a device pad path, so checks fail closed.
    pub fn for_device(name: &str, node: Option<PathBuf>) -> Self {
        let hostname = match nix::unistd::gethostname() {
            Ok(h) => h.to_string_lossy().into_owned(),
            Err(e) => {
                log::error!("Unable to read hostname: {}", e);
                String::new()
            }
        };

        Self {
            hostname,
            device: DeviceConfig {
                name: String::from(name),
                node,
            },
            ..Default::default()
        }
    }

    /// Directory the lock files live in.
    pub fn lock_directory(&self) -> &std::path::Path {
        self.lock_directory
            .as_deref()
            .unwrap_or(&self.system_pad_directory)
    }

    /// Parses a TOML document. Missing keys keep their defaults.
    #[cfg(feature = "config-file")]
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }
}
