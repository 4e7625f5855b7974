//! Bind mounts and pseudo-filesystems inside the container root.

use std::path::Path;

use vessel_common::error::{Result, VesselError};

/// Creates a directory and all missing parents.
///
/// # Errors
///
/// Returns an error if the directory cannot be created.
pub fn ensure_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path).map_err(|e| VesselError::io(path, e))
}

/// Bind-mounts a host directory onto a target inside the container root.
///
/// The target directory is created if missing.
///
/// # Errors
///
/// Returns a `Mount` error if the bind mount fails.
#[cfg(target_os = "linux")]
pub fn bind_mount(source: &Path, target: &Path) -> Result<()> {
    use nix::mount::{MsFlags, mount};

    ensure_dir(target)?;
    mount(
        Some(source),
        target,
        None::<&str>,
        MsFlags::MS_BIND,
        None::<&str>,
    )
    .map_err(|e| VesselError::Mount {
        target: target.to_path_buf(),
        message: format!("bind mount from {} failed: {e}", source.display()),
    })?;
    tracing::debug!(source = %source.display(), target = %target.display(), "bind mounted");
    Ok(())
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error — bind mounts require Linux.
#[cfg(not(target_os = "linux"))]
pub fn bind_mount(source: &Path, target: &Path) -> Result<()> {
    let _ = source;
    Err(VesselError::Mount {
        target: target.to_path_buf(),
        message: "Linux required for bind mounts".into(),
    })
}

/// Mounts procfs at a target directory, creating it if missing.
///
/// Must run after the PID namespace is entered so `/proc` reflects the
/// container's own process tree.
///
/// # Errors
///
/// Returns a `Mount` error if the mount fails.
#[cfg(target_os = "linux")]
pub fn mount_proc(target: &Path) -> Result<()> {
    use nix::mount::{MsFlags, mount};

    ensure_dir(target)?;
    mount(
        Some("proc"),
        target,
        Some("proc"),
        MsFlags::empty(),
        None::<&str>,
    )
    .map_err(|e| VesselError::Mount {
        target: target.to_path_buf(),
        message: format!("proc mount failed: {e}"),
    })
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error — procfs requires Linux.
#[cfg(not(target_os = "linux"))]
pub fn mount_proc(target: &Path) -> Result<()> {
    Err(VesselError::Mount {
        target: target.to_path_buf(),
        message: "Linux required for proc mounts".into(),
    })
}

/// Mounts sysfs at a target directory, creating it if missing.
///
/// # Errors
///
/// Returns a `Mount` error if the mount fails.
#[cfg(target_os = "linux")]
pub fn mount_sys(target: &Path) -> Result<()> {
    use nix::mount::{MsFlags, mount};

    ensure_dir(target)?;
    mount(
        Some("sysfs"),
        target,
        Some("sysfs"),
        MsFlags::empty(),
        None::<&str>,
    )
    .map_err(|e| VesselError::Mount {
        target: target.to_path_buf(),
        message: format!("sysfs mount failed: {e}"),
    })
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error — sysfs requires Linux.
#[cfg(not(target_os = "linux"))]
pub fn mount_sys(target: &Path) -> Result<()> {
    Err(VesselError::Mount {
        target: target.to_path_buf(),
        message: "Linux required for sysfs mounts".into(),
    })
}

/// Unmounts a target, treating "not mounted" and "already gone" as success.
///
/// # Errors
///
/// Returns a `Mount` error for any other unmount failure.
pub fn unmount(target: &Path) -> Result<()> {
    super::overlay::unmount(target)
}
