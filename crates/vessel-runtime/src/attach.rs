//! Attaching a command to a running container.
//!
//! An attach locates the container's workload PID through its cgroup,
//! opens all five of its namespace files, and only then starts switching
//! the calling process over. The command then runs inside the container's
//! root filesystem with inherited stdio.

use vessel_common::constants::container_mnt;
use vessel_common::error::{Result, VesselError};
use vessel_common::types::ContainerId;
use vessel_core::cgroup::Cgroups;
use vessel_core::filesystem::chroot;
use vessel_core::namespace::NamespaceHandles;

use crate::container;

/// Runs a command inside a running container, returning its exit code.
///
/// # Errors
///
/// Returns `NotFound` if the container is not running (checked before any
/// namespace operation), a validation error for an empty command, or a
/// namespace error if the switch fails partway.
#[cfg(target_os = "linux")]
pub fn attach(id: &str, command: &[String]) -> Result<i32> {
    use std::os::unix::process::ExitStatusExt;

    let Some((program, args)) = command.split_first() else {
        return Err(VesselError::validation("no command to run"));
    };

    let pid = container::init_pid(id)?;
    container::ensure_mounted(id)?;
    let handles = NamespaceHandles::open_all(pid)?;

    handles.join_all()?;
    Cgroups::new(&ContainerId::new(id)).create()?;
    chroot::enter_rootfs(&container_mnt(id))?;

    tracing::info!(container = id, pid, command = program, "attached");
    let status = std::process::Command::new(program)
        .args(args)
        .status()
        .map_err(|e| VesselError::io(program, e))?;
    Ok(status
        .code()
        .unwrap_or_else(|| 128 + status.signal().unwrap_or(0)))
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error — attach requires Linux.
#[cfg(not(target_os = "linux"))]
pub fn attach(_id: &str, _command: &[String]) -> Result<i32> {
    Err(VesselError::Namespace {
        message: "Linux required to attach to containers".into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(target_os = "linux")]
    fn attach_to_a_container_that_never_existed_is_not_found() {
        let result = attach("ffffffffffffffff", &["sh".to_string()]);
        assert!(matches!(
            result,
            Err(VesselError::NotFound { kind: "container", .. })
        ));
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn attach_rejects_an_empty_command() {
        assert!(matches!(
            attach("ffffffffffffffff", &[]),
            Err(VesselError::Validation { .. })
        ));
    }
}
