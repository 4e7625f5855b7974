//! Container directory layout and enumeration.
//!
//! A container exists exactly as long as its directory tree under
//! `/var/lib/vessel/containers/<id>` does. The `fs/layers` directory
//! holds symlinks to the image layers the container was created from, so
//! a later process (the re-executed child, or an attach) can rebuild the
//! overlay mount without access to the image catalog.

use std::path::{Path, PathBuf};

use vessel_common::constants::{self, CGROUP_CPU_ROOT};
use vessel_common::error::{Result, VesselError};
use vessel_common::types::ContainerId;
use vessel_core::filesystem::overlay::{self, OverlaySpec};
use vessel_image::store::{ImageStore, image_hash_from_mounts};

/// One row of `vessel ps`.
#[derive(Debug, Clone)]
pub struct ContainerRecord {
    /// Container id.
    pub id: String,
    /// PID of the container's workload, if it could be determined.
    pub pid: Option<u32>,
    /// Image reference or hash the container runs.
    pub image: String,
}

/// Creates a container's directory tree and mounts its overlay.
///
/// # Errors
///
/// Returns an error if the directories, layer links, or overlay mount
/// fail.
pub fn create(id: &ContainerId, layers: &[PathBuf]) -> Result<()> {
    let layers_dir = constants::container_layers_dir(id.as_str());
    link_layers(&layers_dir, layers)?;
    overlay::compose_and_mount(&OverlaySpec::for_container(id.as_str(), layers.to_vec()))?;
    tracing::info!(container = %id, "container created");
    Ok(())
}

/// Populates `fs/layers` with symlinks to the image layer directories.
///
/// # Errors
///
/// Returns an error if a directory or symlink cannot be created.
pub fn link_layers(layers_dir: &Path, layers: &[PathBuf]) -> Result<()> {
    std::fs::create_dir_all(layers_dir).map_err(|e| VesselError::io(layers_dir, e))?;
    for layer in layers {
        let Some(name) = layer.file_name() else {
            return Err(VesselError::validation(format!(
                "layer path has no file name: {}",
                layer.display()
            )));
        };
        let link = layers_dir.join(name);
        std::os::unix::fs::symlink(layer, &link).map_err(|e| VesselError::io(&link, e))?;
    }
    Ok(())
}

/// Ensures a container's overlay is mounted, rebuilding the mount from
/// the persisted layer links when it is not.
///
/// # Errors
///
/// Returns `InvalidLayers` if the layer links are gone, or a mount error.
pub fn ensure_mounted(id: &str) -> Result<()> {
    let mnt = constants::container_mnt(id);
    if overlay::is_mounted(&mnt)? {
        return Ok(());
    }
    let layers = overlay::recover_layers(&constants::container_layers_dir(id), id)?;
    overlay::compose_and_mount(&OverlaySpec::for_container(id, layers))
}

/// Removes a container's directory tree. Already-gone trees count as
/// removed, since this runs during best-effort teardown.
///
/// # Errors
///
/// Returns an error if an existing tree cannot be deleted.
pub fn remove(id: &str) -> Result<()> {
    let dir = constants::container_dir(id);
    match std::fs::remove_dir_all(&dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(VesselError::io(dir, e)),
    }
}

/// Finds the workload PID of a running container.
///
/// # Errors
///
/// Returns `NotFound` if the container has no cgroup, meaning it is not
/// running.
pub fn init_pid(id: &str) -> Result<u32> {
    init_pid_in(Path::new(CGROUP_CPU_ROOT), id)
}

/// [`init_pid`] against an explicit cpu controller root.
///
/// The first `cgroup.procs` entry is the re-executed child acting as PID
/// 1; the second, when present, is the workload it spawned.
///
/// # Errors
///
/// Returns `NotFound` if the container has no cgroup or no processes.
pub fn init_pid_in(cpu_root: &Path, id: &str) -> Result<u32> {
    let procs = cpu_root.join(id).join("cgroup.procs");
    let content = std::fs::read_to_string(&procs).map_err(|_| VesselError::NotFound {
        kind: "container",
        id: id.to_string(),
    })?;
    let pids: Vec<u32> = content.lines().filter_map(|l| l.trim().parse().ok()).collect();
    pids.get(1)
        .or_else(|| pids.first())
        .copied()
        .ok_or_else(|| VesselError::NotFound {
            kind: "container",
            id: id.to_string(),
        })
}

/// Enumerates running containers from the cpu controller hierarchy.
///
/// # Errors
///
/// Returns an error if the mount table cannot be read.
pub fn list(store: &ImageStore) -> Result<Vec<ContainerRecord>> {
    let entries = match std::fs::read_dir(CGROUP_CPU_ROOT) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(VesselError::io(CGROUP_CPU_ROOT, e)),
    };
    let mounts = std::fs::read_to_string("/proc/self/mounts")
        .map_err(|e| VesselError::io("/proc/self/mounts", e))?;

    let mut records = Vec::new();
    for entry in entries.filter_map(std::result::Result::ok) {
        if !entry.path().is_dir() {
            continue;
        }
        let Ok(id) = entry.file_name().into_string() else {
            continue;
        };
        let image = image_hash_from_mounts(&mounts, &constants::container_mnt(&id))
            .map(|hash| store.reference_for(&hash).unwrap_or(hash))
            .unwrap_or_else(|| "<unknown>".to_string());
        records.push(ContainerRecord {
            pid: init_pid(&id).ok(),
            id,
            image,
        });
    }
    records.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workload_pid_is_the_second_cgroup_entry() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let cg = dir.path().join("aabbccddeeff0011");
        std::fs::create_dir_all(&cg).expect("mkdir");
        std::fs::write(cg.join("cgroup.procs"), "100\n101\n").expect("write");
        assert_eq!(
            init_pid_in(dir.path(), "aabbccddeeff0011").expect("init_pid failed"),
            101
        );
    }

    #[test]
    fn single_process_container_falls_back_to_the_first_entry() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let cg = dir.path().join("aabbccddeeff0011");
        std::fs::create_dir_all(&cg).expect("mkdir");
        std::fs::write(cg.join("cgroup.procs"), "100\n").expect("write");
        assert_eq!(
            init_pid_in(dir.path(), "aabbccddeeff0011").expect("init_pid failed"),
            100
        );
    }

    #[test]
    fn missing_cgroup_means_the_container_is_not_running() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        assert!(matches!(
            init_pid_in(dir.path(), "aabbccddeeff0011"),
            Err(VesselError::NotFound { kind: "container", .. })
        ));
    }

    #[test]
    fn empty_cgroup_is_also_not_running() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let cg = dir.path().join("aabbccddeeff0011");
        std::fs::create_dir_all(&cg).expect("mkdir");
        std::fs::write(cg.join("cgroup.procs"), "").expect("write");
        assert!(init_pid_in(dir.path(), "aabbccddeeff0011").is_err());
    }

    #[test]
    fn link_layers_mirrors_layer_directory_names() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let image = dir.path().join("image");
        let a = image.join("aaaaaaaaaaaaaaaa");
        let b = image.join("bbbbbbbbbbbbbbbb");
        std::fs::create_dir_all(&a).expect("mkdir");
        std::fs::create_dir_all(&b).expect("mkdir");

        let layers_dir = dir.path().join("layers");
        link_layers(&layers_dir, &[a.clone(), b.clone()]).expect("link failed");

        assert_eq!(
            std::fs::read_link(layers_dir.join("aaaaaaaaaaaaaaaa")).expect("readlink"),
            a
        );
        assert_eq!(
            std::fs::read_link(layers_dir.join("bbbbbbbbbbbbbbbb")).expect("readlink"),
            b
        );
    }

    #[test]
    fn remove_of_missing_container_succeeds() {
        remove("ffffffffffffffff").expect("remove should be a no-op");
    }
}
