//! Volume resolution.
//!
//! Translates the configured device into the place it is currently mounted.
//! Resolved volumes are handed out as a [`VolumeLease`], which gives the volume
//! back to its resolver when dropped, on every exit path of a check.

use super::PlatformError;
use crate::config::DeviceConfig;
use std::fs;
use std::ops::Deref;
use std::path::{Path, PathBuf};

/// Mount table consulted by [`MountTable::new`].
pub const PROC_MOUNTS: &str = "/proc/self/mounts";

/// A mounted removable volume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountedVolume {
    /// Where the volume is mounted. `None` if the volume is known but has no
    /// usable mount point.
    pub mount_point: Option<PathBuf>,
    /// Device name namespacing the system-side pad.
    pub device_name: String,
}

/// Finds the mounted volume for a device.
pub trait VolumeResolver {
    /// Returns `None` if no matching volume is present or mounted.
    fn resolve(&self, device: &DeviceConfig) -> Option<MountedVolume>;

    /// Called once for every volume returned by `resolve`, when the caller is done with it.
    fn release(&self, _volume: &MountedVolume) {}
}

/// A resolved volume, released back to its resolver on drop.
pub struct VolumeLease<'a, R: VolumeResolver + ?Sized> {
    resolver: &'a R,
    volume: MountedVolume,
}

impl<'a, R: VolumeResolver + ?Sized> VolumeLease<'a, R> {
    /// Resolves `device` through `resolver`.
    pub fn acquire(resolver: &'a R, device: &DeviceConfig) -> Option<Self> {
        let volume = resolver.resolve(device)?;
        Some(Self { resolver, volume })
    }
}

impl<R: VolumeResolver + ?Sized> Deref for VolumeLease<'_, R> {
    type Target = MountedVolume;

    fn deref(&self) -> &MountedVolume {
        &self.volume
    }
}

impl<R: VolumeResolver + ?Sized> Drop for VolumeLease<'_, R> {
    fn drop(&mut self) {
        self.resolver.release(&self.volume);
    }
}

/// A volume whose mount point the caller already knows.
///
/// Resolves only while the mount point is an existing directory.
#[derive(Debug, Clone)]
pub struct FixedMount {
    mount_point: PathBuf,
}

impl FixedMount {
    pub fn new<P: Into<PathBuf>>(mount_point: P) -> Self {
        Self {
            mount_point: mount_point.into(),
        }
    }
}

impl VolumeResolver for FixedMount {
    fn resolve(&self, device: &DeviceConfig) -> Option<MountedVolume> {
        if !self.mount_point.is_dir() {
            log::debug!("Mount point {} is not available", self.mount_point.display());
            return None;
        }
        Some(MountedVolume {
            mount_point: Some(self.mount_point.clone()),
            device_name: device.name.clone(),
        })
    }
}

/// One line of a mount table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountEntry {
    pub source: String,
    pub mount_point: PathBuf,
    pub fs_type: String,
}

/// Resolves a device node to its mount point via the kernel mount table.
#[derive(Debug, Clone)]
pub struct MountTable {
    table: PathBuf,
}

impl MountTable {
    /// Uses the running kernel's table ([`PROC_MOUNTS`]).
    pub fn new() -> Self {
        Self::from_path(PROC_MOUNTS)
    }

    /// Uses a table in `/proc/mounts` format at `table`.
    pub fn from_path<P: Into<PathBuf>>(table: P) -> Self {
        Self {
            table: table.into(),
        }
    }

    /// Finds the first mount whose source is `node` (after following symlinks
    /// such as `/dev/disk/by-uuid/...`).
    pub fn find(&self, node: &Path) -> Result<Option<MountEntry>, PlatformError> {
        let node = fs::canonicalize(node).map_err(|_| PlatformError::InvalidDevice)?;
        let contents =
            fs::read_to_string(&self.table).map_err(|_| PlatformError::MountTableUnreadable)?;

        Ok(parse_mount_table(&contents).into_iter().find(|entry| {
            entry.source.starts_with('/')
                && fs::canonicalize(&entry.source)
                    .map(|source| source == node)
                    .unwrap_or(false)
        }))
    }
}

impl Default for MountTable {
    fn default() -> Self {
        Self::new()
    }
}

impl VolumeResolver for MountTable {
    fn resolve(&self, device: &DeviceConfig) -> Option<MountedVolume> {
        let node = match device.node.as_deref() {
            Some(node) => node,
            None => {
                log::error!("No device node configured for \"{}\"", device.name);
                return None;
            }
        };

        match self.find(node) {
            Ok(Some(entry)) => {
                log::debug!("Device {} is mounted on {}", node.display(), entry.mount_point.display());
                Some(MountedVolume {
                    mount_point: Some(entry.mount_point),
                    device_name: device.name.clone(),
                })
            }
            Ok(None) => {
                log::debug!("Device {} is not mounted", node.display());
                None
            }
            Err(e) => {
                log::debug!("Cannot resolve device {}: {}", node.display(), e);
                None
            }
        }
    }
}

/// Parses `/proc/mounts` format. Malformed lines are skipped.
pub fn parse_mount_table(contents: &str) -> Vec<MountEntry> {
    contents
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let source = fields.next()?;
            let mount_point = fields.next()?;
            let fs_type = fields.next()?;
            Some(MountEntry {
                source: unescape_field(source),
                mount_point: PathBuf::from(unescape_field(mount_point)),
                fs_type: String::from(fs_type),
            })
        })
        .collect()
}

/// Decodes the kernel's octal escapes (`\040` for space, `\011` for tab, ...).
fn unescape_field(field: &str) -> String {
    let bytes = field.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 3 < bytes.len() && is_octal_escape(&bytes[i + 1..i + 4]) {
            let value = (bytes[i + 1] - b'0') * 64 + (bytes[i + 2] - b'0') * 8 + (bytes[i + 3] - b'0');
            out.push(value);
            i += 4;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }

    String::from_utf8_lossy(&out).into_owned()
}

fn is_octal_escape(digits: &[u8]) -> bool {
    digits.len() == 3
        && digits[0] <= b'3'
        && digits.iter().all(|d| (b'0'..=b'7').contains(d))
}
