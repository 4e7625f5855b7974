//! Overlay filesystem composition for layered container root filesystems.
//!
//! Read-only image layers are shared across containers; every write lands
//! in the container's private upper directory (copy-on-write).

use std::path::{Path, PathBuf};

use vessel_common::error::{Result, VesselError};

/// Full specification of one container's overlay mount.
#[derive(Debug, Clone)]
pub struct OverlaySpec {
    /// Read-only lower layers, base layer first.
    pub lower_dirs: Vec<PathBuf>,
    /// Writable upper layer directory.
    pub upper_dir: PathBuf,
    /// Work directory required by the overlay driver.
    pub work_dir: PathBuf,
    /// Merged mount point.
    pub mount_point: PathBuf,
}

impl OverlaySpec {
    /// Builds the overlay spec for a container from its layer set.
    #[must_use]
    pub fn for_container(id: &str, lower_dirs: Vec<PathBuf>) -> Self {
        Self {
            lower_dirs,
            upper_dir: vessel_common::constants::container_upperdir(id),
            work_dir: vessel_common::constants::container_workdir(id),
            mount_point: vessel_common::constants::container_mnt(id),
        }
    }

    /// Renders the option string passed to the mount syscall.
    ///
    /// Lower directories are joined in the order supplied, which is the
    /// order the image manifest lists them (base first).
    #[must_use]
    pub fn mount_options(&self) -> String {
        let lowers = self
            .lower_dirs
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(":");
        format!(
            "lowerdir={},upperdir={},workdir={}",
            lowers,
            self.upper_dir.display(),
            self.work_dir.display()
        )
    }
}

/// Creates the mount point, upper, and work directories, then mounts the
/// overlay.
///
/// # Errors
///
/// Returns a `Mount` error wrapping the OS error if the mount syscall
/// fails; common causes are an unavailable overlay driver and stale
/// directories left by a previous failed teardown.
#[cfg(target_os = "linux")]
pub fn compose_and_mount(spec: &OverlaySpec) -> Result<()> {
    use nix::mount::{MsFlags, mount};

    for dir in [&spec.upper_dir, &spec.work_dir, &spec.mount_point] {
        std::fs::create_dir_all(dir).map_err(|e| VesselError::io(dir, e))?;
    }

    let options = spec.mount_options();
    mount(
        Some("overlay"),
        &spec.mount_point,
        Some("overlay"),
        MsFlags::empty(),
        Some(options.as_str()),
    )
    .map_err(|e| VesselError::Mount {
        target: spec.mount_point.clone(),
        message: e.to_string(),
    })?;

    tracing::info!(mount_point = %spec.mount_point.display(), layers = spec.lower_dirs.len(), "overlay mounted");
    Ok(())
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error — overlay mounting requires Linux.
#[cfg(not(target_os = "linux"))]
pub fn compose_and_mount(spec: &OverlaySpec) -> Result<()> {
    Err(VesselError::Mount {
        target: spec.mount_point.clone(),
        message: "Linux required for overlay mounts".into(),
    })
}

/// Unmounts a container's overlay mount point.
///
/// Idempotent: a target that is not mounted, or whose directory is gone
/// entirely, counts as success, since this runs during best-effort cleanup
/// after a possibly-partial setup.
///
/// # Errors
///
/// Returns a `Mount` error for any other unmount failure.
#[cfg(target_os = "linux")]
pub fn unmount(mount_point: &Path) -> Result<()> {
    use nix::mount::{MntFlags, umount2};

    match umount2(mount_point, MntFlags::empty()) {
        Ok(()) => {
            tracing::info!(mount_point = %mount_point.display(), "overlay unmounted");
            Ok(())
        }
        Err(nix::errno::Errno::EINVAL | nix::errno::Errno::ENOENT) => Ok(()),
        Err(e) => Err(VesselError::Mount {
            target: mount_point.to_path_buf(),
            message: format!("unmount failed: {e}"),
        }),
    }
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error — unmounting requires Linux.
#[cfg(not(target_os = "linux"))]
pub fn unmount(mount_point: &Path) -> Result<()> {
    Err(VesselError::Mount {
        target: mount_point.to_path_buf(),
        message: "Linux required for overlay mounts".into(),
    })
}

/// Recovers a container's layer set from its persisted `fs/layers`
/// directory.
///
/// Entries are 16-character layer ids; anything else is ignored. Entries
/// are returned in lexicographic order, which matches the order they were
/// linked at creation time.
///
/// # Errors
///
/// Returns `InvalidLayers` if the directory is absent or holds no valid
/// entries.
pub fn recover_layers(layers_dir: &Path, container: &str) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(layers_dir).map_err(|_| VesselError::InvalidLayers {
        container: container.to_string(),
    })?;

    let mut names: Vec<String> = entries
        .filter_map(std::result::Result::ok)
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| name.len() == vessel_common::constants::LAYER_ID_LEN)
        .collect();
    names.sort_unstable();

    if names.is_empty() {
        return Err(VesselError::InvalidLayers {
            container: container.to_string(),
        });
    }

    Ok(names.into_iter().map(|name| layers_dir.join(name)).collect())
}

/// Reports whether a path is currently a mount target.
///
/// # Errors
///
/// Returns an error if the mount table cannot be read.
pub fn is_mounted(target: &Path) -> Result<bool> {
    let mounts = std::fs::read_to_string("/proc/self/mounts")
        .map_err(|e| VesselError::io("/proc/self/mounts", e))?;
    let needle = target.display().to_string();
    Ok(mounts
        .lines()
        .filter_map(|line| line.split_whitespace().nth(1))
        .any(|mounted| mounted == needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mount_options_preserve_lower_dir_order() {
        let spec = OverlaySpec {
            lower_dirs: vec![
                PathBuf::from("/layers/a"),
                PathBuf::from("/layers/b"),
                PathBuf::from("/layers/c"),
            ],
            upper_dir: PathBuf::from("/c/fs/upperdir"),
            work_dir: PathBuf::from("/c/fs/workdir"),
            mount_point: PathBuf::from("/c/fs/mnt"),
        };
        assert_eq!(
            spec.mount_options(),
            "lowerdir=/layers/a:/layers/b:/layers/c,upperdir=/c/fs/upperdir,workdir=/c/fs/workdir"
        );
    }

    #[test]
    fn for_container_uses_container_scoped_dirs() {
        let spec = OverlaySpec::for_container("0011223344556677", vec![]);
        assert!(spec.upper_dir.ends_with("0011223344556677/fs/upperdir"));
        assert!(spec.work_dir.ends_with("0011223344556677/fs/workdir"));
        assert!(spec.mount_point.ends_with("0011223344556677/fs/mnt"));
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn unmount_of_never_mounted_path_succeeds() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        unmount(dir.path()).expect("unmount of non-mountpoint should be a no-op");
    }

    #[test]
    fn recover_layers_returns_sixteen_char_entries_in_order() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        std::fs::create_dir(dir.path().join("bbbbbbbbbbbbbbbb")).expect("mkdir");
        std::fs::create_dir(dir.path().join("aaaaaaaaaaaaaaaa")).expect("mkdir");
        std::fs::create_dir(dir.path().join("not-a-layer")).expect("mkdir");

        let layers = recover_layers(dir.path(), "c1").expect("recover failed");
        assert_eq!(
            layers,
            vec![
                dir.path().join("aaaaaaaaaaaaaaaa"),
                dir.path().join("bbbbbbbbbbbbbbbb"),
            ]
        );
    }

    #[test]
    fn recover_layers_rejects_empty_directory() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        assert!(matches!(
            recover_layers(dir.path(), "c1"),
            Err(VesselError::InvalidLayers { .. })
        ));
    }

    #[test]
    fn recover_layers_rejects_missing_directory() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        assert!(recover_layers(&dir.path().join("gone"), "c1").is_err());
    }
}
