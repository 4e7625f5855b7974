//! Root filesystem entry.

use std::path::Path;

use vessel_common::error::{Result, VesselError};

/// Changes the root of the calling process to `rootfs` and moves into it.
///
/// The working directory is reset to the new `/` so no handle to the old
/// root survives.
///
/// # Errors
///
/// Returns an error if chroot or the directory change fails.
#[cfg(target_os = "linux")]
pub fn enter_rootfs(rootfs: &Path) -> Result<()> {
    nix::unistd::chroot(rootfs).map_err(|e| VesselError::Mount {
        target: rootfs.to_path_buf(),
        message: format!("chroot failed: {e}"),
    })?;
    std::env::set_current_dir("/").map_err(|e| VesselError::io("/", e))?;
    tracing::debug!(rootfs = %rootfs.display(), "entered root filesystem");
    Ok(())
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error — chroot requires Linux.
#[cfg(not(target_os = "linux"))]
pub fn enter_rootfs(rootfs: &Path) -> Result<()> {
    Err(VesselError::Mount {
        target: rootfs.to_path_buf(),
        message: "Linux required for chroot".into(),
    })
}
