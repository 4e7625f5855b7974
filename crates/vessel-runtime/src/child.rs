//! The re-executed child: PID 1 of the container.
//!
//! The parent re-executes the binary in `child-mode` with fresh mount,
//! PID, and UTS namespaces already unshared. From inside those namespaces
//! the child finishes what the parent could not do from the outside:
//! cgroup attachment, hostname, joining the pinned network namespace,
//! bind and volume mounts, chroot, and the pseudo-filesystems. Then it
//! runs the workload with inherited stdio and reports its exit status.

use std::path::{Path, PathBuf};

use vessel_common::constants::container_mnt;
use vessel_common::error::{Result, VesselError};
use vessel_common::types::{ContainerId, RunOptions};
use vessel_core::cgroup::Cgroups;
use vessel_core::filesystem::{chroot, mount};
use vessel_core::namespace;
use vessel_net::{netns, veth};

use crate::container;
use crate::volume::VolumeStore;

/// Everything the child needs, decoded from its argument vector.
#[derive(Debug)]
pub struct ChildRequest {
    /// Container being entered.
    pub id: ContainerId,
    /// Limits and mounts to apply.
    pub options: RunOptions,
    /// Workload command and arguments.
    pub command: Vec<String>,
}

/// Resolves a container-internal destination against the mount point.
fn target_in_root(mnt: &Path, dest: &Path) -> PathBuf {
    match dest.strip_prefix("/") {
        Ok(relative) => mnt.join(relative),
        Err(_) => mnt.join(dest),
    }
}

/// Runs the container workload, returning its exit code.
///
/// Setup is strictly ordered; any failure aborts before the workload
/// starts. Cleanup after the workload is best-effort: the parent performs
/// the authoritative teardown once the child exits.
///
/// # Errors
///
/// Returns the first setup error, or a validation error for an empty
/// command.
#[cfg(target_os = "linux")]
pub fn run(request: &ChildRequest) -> Result<i32> {
    use std::os::unix::process::ExitStatusExt;

    let Some((program, args)) = request.command.split_first() else {
        return Err(VesselError::validation("no command to run"));
    };
    let id = request.id.as_str();
    let mnt = container_mnt(id);

    let cgroups = Cgroups::new(&request.id);
    cgroups.create()?;
    cgroups.configure(request.options.cpu_limit, request.options.mem_limit_mb)?;

    container::ensure_mounted(id)?;

    let mut inner_mounts = Vec::new();
    if let Some(bind) = &request.options.bind_mount {
        mount::bind_mount(&bind.source, &target_in_root(&mnt, &bind.dest))?;
        inner_mounts.push(bind.dest.clone());
    }
    if let Some(vol) = &request.options.volume {
        let volume = VolumeStore::open()?.inspect(&vol.name)?;
        mount::bind_mount(&volume.mount_point, &target_in_root(&mnt, &vol.dest))?;
        inner_mounts.push(vol.dest.clone());
    }

    namespace::set_hostname(id)?;
    netns::join(id)?;
    netns::loopback_up()?;

    chroot::enter_rootfs(&mnt)?;
    mount::mount_proc(Path::new("/proc"))?;
    mount::mount_sys(Path::new("/sys"))?;

    tracing::info!(container = id, command = program, "starting workload");
    let status = std::process::Command::new(program)
        .args(args)
        .status()
        .map_err(|e| VesselError::io(program, e))?;
    let code = status
        .code()
        .unwrap_or_else(|| 128 + status.signal().unwrap_or(0));

    cleanup(id, &inner_mounts);
    Ok(code)
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error — containers require Linux.
#[cfg(not(target_os = "linux"))]
pub fn run(_request: &ChildRequest) -> Result<i32> {
    Err(VesselError::Namespace {
        message: "Linux required to run containers".into(),
    })
}

/// Best-effort cleanup inside the container after the workload exits.
///
/// Failures are logged, not returned: the parent unmounts and deletes the
/// authoritative state from the host side. The veth deletion in
/// particular shells out to `ip(8)` from inside the chroot, so it only
/// succeeds when the image ships iproute2; deleting the bridge end from
/// the host during teardown removes the pair either way.
#[cfg(target_os = "linux")]
fn cleanup(id: &str, inner_mounts: &[PathBuf]) {
    let (ns_end, _) = veth::veth_names(id);
    if let Err(e) = veth::delete_link(&ns_end) {
        tracing::warn!(container = id, error = %e, "can't delete container veth end");
    }
    for dest in inner_mounts {
        if let Err(e) = mount::unmount(dest) {
            tracing::warn!(container = id, dest = %dest.display(), error = %e, "can't unmount");
        }
    }
    for pseudo in ["/proc", "/sys"] {
        if let Err(e) = mount::unmount(Path::new(pseudo)) {
            tracing::warn!(container = id, pseudo, error = %e, "can't unmount");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_destinations_land_inside_the_mount_point() {
        assert_eq!(
            target_in_root(Path::new("/c/fs/mnt"), Path::new("/data")),
            PathBuf::from("/c/fs/mnt/data")
        );
    }

    #[test]
    fn relative_destinations_are_joined_as_is() {
        assert_eq!(
            target_in_root(Path::new("/c/fs/mnt"), Path::new("data")),
            PathBuf::from("/c/fs/mnt/data")
        );
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn empty_command_is_rejected_before_any_setup() {
        let request = ChildRequest {
            id: ContainerId::new("0000000000000000"),
            options: RunOptions::default(),
            command: Vec::new(),
        };
        assert!(matches!(
            run(&request),
            Err(VesselError::Validation { .. })
        ));
    }
}
