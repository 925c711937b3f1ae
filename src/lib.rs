//! One-time pad freshness check for removable-device authentication.
//!
//! A random pad is stored on the removable volume and on the host. A check
//! passes only if both copies are identical, and each passing check replaces
//! both with a fresh pad. A cloned device therefore stops working as soon as
//! either the original or the clone has been used once.

use std::ffi::{c_char, c_int, CStr};
use std::path::PathBuf;

pub mod config;
pub mod entropy;
pub mod pad;
pub mod platform;
pub mod storage;

pub use config::{DeviceConfig, HardeningPolicy, PadConfig};
pub use pad::verifier::{check_pad, CheckReport, CheckState, PadVerifier};
pub use pad::{PadError, Side, PAD_LEN};

#[no_mangle]
pub extern "C" fn usbpad_version() -> u32 {
    0x000400
}

/// Checks `user`'s pads on a volume mounted at `mount_point`, rotating them on
/// a match. Returns `1` if the pads matched, `0` otherwise (including on any
/// invalid argument).
///
/// # Safety
/// Every pointer must be NULL or point to a NUL-terminated string that stays
/// valid for the duration of the call.
#[no_mangle]
pub unsafe extern "C" fn usbpad_check_mounted(
    system_pad_directory: *const c_char,
    device_pad_directory: *const c_char,
    hostname: *const c_char,
    device_name: *const c_char,
    mount_point: *const c_char,
    user: *const c_char,
) -> c_int {
    let args = (
        c_str(system_pad_directory),
        c_str(device_pad_directory),
        c_str(hostname),
        c_str(device_name),
        c_str(mount_point),
        c_str(user),
    );
    let (Some(system_dir), Some(device_dir), Some(hostname), Some(device_name), Some(mount_point), Some(user)) = args
    else {
        log::error!("usbpad_check_mounted: invalid argument");
        return 0;
    };

    let config = PadConfig {
        hostname: String::from(hostname),
        device: DeviceConfig {
            name: String::from(device_name),
            node: None,
        },
        device_pad_directory: String::from(device_dir),
        system_pad_directory: PathBuf::from(system_dir),
        ..Default::default()
    };
    let volume = platform::volume::FixedMount::new(mount_point);

    c_int::from(check_pad(&config, &volume, user))
}

unsafe fn c_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok()
}
