#[cfg(target_os = "windows")]
pub mod windows;

use std::io;

/// Windows reports a file still held open by its writer as a sharing or
/// lock violation rather than a distinct error kind.
#[cfg(target_os = "windows")]
pub fn is_sharing_violation(err: &io::Error) -> bool {
    windows::is_sharing_violation(err)
}

#[cfg(not(target_os = "windows"))]
pub fn is_sharing_violation(_err: &io::Error) -> bool {
    false
}

/// Whether a failed rename crossed a filesystem boundary.
#[cfg(target_os = "windows")]
pub fn is_cross_device(err: &io::Error) -> bool {
    windows::is_cross_device(err)
}

#[cfg(unix)]
pub fn is_cross_device(err: &io::Error) -> bool {
    // EXDEV is 18 on Linux, macOS and the BSDs.
    const EXDEV: i32 = 18;
    err.raw_os_error() == Some(EXDEV)
}

#[cfg(not(any(unix, target_os = "windows")))]
pub fn is_cross_device(_err: &io::Error) -> bool {
    false
}
