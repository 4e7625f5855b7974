//! System-wide constants and on-disk layout helpers.
//!
//! The directory tree under [`DATA_DIR`] is the runtime's only durable
//! state: a container exists exactly as long as its directories do.

use std::path::PathBuf;

/// Base directory for all Vessel state.
pub const DATA_DIR: &str = "/var/lib/vessel";

/// Per-container directories live under this root.
pub const CONTAINER_DIR: &str = "/var/lib/vessel/containers";

/// Unpacked images live under this root, keyed by image hash.
pub const IMAGE_DIR: &str = "/var/lib/vessel/images";

/// Volume mount points and metadata live under this root.
pub const VOLUME_DIR: &str = "/var/lib/vessel/volumes";

/// Network allocation records and the host-wide network lock.
pub const NETWORK_DIR: &str = "/var/lib/vessel/network";

/// Scratch space for downloaded archives.
pub const TMP_DIR: &str = "/var/lib/vessel/tmp";

/// Persisted network namespace reference files.
///
/// iproute2's namespace directory is used so `ip(8)` can address a
/// container's namespace by name.
pub const NETNS_DIR: &str = "/var/run/netns";

/// Runtime configuration file (registry list).
pub const CONFIG_FILE: &str = "/etc/vessel/config.json";

/// cgroup v1 controller hierarchies managed per container.
pub const CGROUP_ROOTS: [&str; 3] = [
    "/sys/fs/cgroup/cpu/vessel",
    "/sys/fs/cgroup/memory/vessel",
    "/sys/fs/cgroup/pids/vessel",
];

/// The cpu controller hierarchy, used to enumerate containers.
pub const CGROUP_CPU_ROOT: &str = "/sys/fs/cgroup/cpu/vessel";

/// Fixed CFS accounting period in microseconds.
pub const CPU_PERIOD_US: u64 = 100_000;

/// Name of the host bridge device.
pub const BRIDGE_NAME: &str = "vessel0";

/// Address of the host bridge, in CIDR notation.
pub const BRIDGE_ADDR: &str = "172.40.0.1/16";

/// Host side of the host-to-bridge uplink veth pair.
pub const UPLINK_HOST_END: &str = "veth-vessel0";

/// Bridge side of the host-to-bridge uplink veth pair.
pub const UPLINK_BRIDGE_END: &str = "veth-vessel1";

/// Address assigned to the host end of the uplink, in CIDR notation.
pub const UPLINK_HOST_ADDR: &str = "172.40.0.100/16";

/// Length of a layer directory name (hex digest prefix).
pub const LAYER_ID_LEN: usize = 16;

/// Length of an image hash (hex digest prefix).
pub const IMAGE_HASH_LEN: usize = 12;

/// Returns the top-level directory of a container.
#[must_use]
pub fn container_dir(id: &str) -> PathBuf {
    PathBuf::from(CONTAINER_DIR).join(id)
}

/// Returns a container's filesystem directory (`fs/`).
#[must_use]
pub fn container_fs_dir(id: &str) -> PathBuf {
    container_dir(id).join("fs")
}

/// Returns a container's overlay mount point (`fs/mnt`).
#[must_use]
pub fn container_mnt(id: &str) -> PathBuf {
    container_fs_dir(id).join("mnt")
}

/// Returns a container's writable overlay layer (`fs/upperdir`).
#[must_use]
pub fn container_upperdir(id: &str) -> PathBuf {
    container_fs_dir(id).join("upperdir")
}

/// Returns a container's overlay work directory (`fs/workdir`).
#[must_use]
pub fn container_workdir(id: &str) -> PathBuf {
    container_fs_dir(id).join("workdir")
}

/// Returns a container's persisted layer directory (`fs/layers`).
#[must_use]
pub fn container_layers_dir(id: &str) -> PathBuf {
    container_fs_dir(id).join("layers")
}

/// Returns the path of a container's network namespace reference file.
#[must_use]
pub fn netns_path(id: &str) -> PathBuf {
    PathBuf::from(NETNS_DIR).join(id)
}

/// Returns the unpacked image directory for an image hash.
#[must_use]
pub fn image_dir(hash: &str) -> PathBuf {
    PathBuf::from(IMAGE_DIR).join(hash)
}

/// Returns the cgroup directories of a container, one per controller.
#[must_use]
pub fn cgroup_dirs(id: &str) -> Vec<PathBuf> {
    CGROUP_ROOTS
        .iter()
        .map(|root| PathBuf::from(root).join(id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn container_paths_nest_under_container_dir() {
        let mnt = container_mnt("abcdef0123456789");
        assert!(mnt.starts_with(CONTAINER_DIR));
        assert!(mnt.ends_with("abcdef0123456789/fs/mnt"));
    }

    #[test]
    fn cgroup_dirs_cover_all_controllers() {
        let dirs = cgroup_dirs("abc");
        assert_eq!(dirs.len(), 3);
        assert!(dirs[0].ends_with("cpu/vessel/abc"));
        assert!(dirs[1].ends_with("memory/vessel/abc"));
        assert!(dirs[2].ends_with("pids/vessel/abc"));
    }

    #[test]
    fn netns_path_is_container_scoped() {
        assert_eq!(
            netns_path("0011223344556677"),
            PathBuf::from("/var/run/netns/0011223344556677")
        );
    }
}
