//! Network namespace lifecycle.
//!
//! A container's network namespace is created before the container process
//! exists, so it must be pinned: the creating process unshares into a new
//! namespace, bind-mounts `/proc/self/ns/net` onto a named file under
//! `/var/run/netns`, and switches back to the host namespace. The bind
//! mount keeps the namespace alive with no process inside it, and the
//! iproute2 directory lets `ip(8)` address it by name.

use std::fs::File;
use std::path::Path;

use vessel_common::constants::{NETNS_DIR, netns_path};
use vessel_common::error::{Result, VesselError};

use crate::ip;

/// Opens a handle to the calling process's current network namespace.
///
/// # Errors
///
/// Returns an error if `/proc/self/ns/net` cannot be opened.
pub fn save_current() -> Result<File> {
    File::open("/proc/self/ns/net").map_err(|e| VesselError::Namespace {
        message: format!("can't open /proc/self/ns/net: {e}"),
    })
}

/// Switches the calling process into a previously saved network namespace.
///
/// # Errors
///
/// Returns a `Namespace` error if the switch fails.
#[cfg(target_os = "linux")]
pub fn restore(saved: &File) -> Result<()> {
    nix::sched::setns(saved, nix::sched::CloneFlags::CLONE_NEWNET).map_err(|e| {
        VesselError::Namespace {
            message: format!("can't restore network namespace: {e}"),
        }
    })
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error — setns requires Linux.
#[cfg(not(target_os = "linux"))]
pub fn restore(_saved: &File) -> Result<()> {
    Err(VesselError::Namespace {
        message: "Linux required for network namespaces".into(),
    })
}

/// Creates and pins a named network namespace, leaving the calling
/// process in its original namespace.
///
/// # Errors
///
/// Returns an error if the namespace cannot be created, pinned, or left
/// again. If pinning fails the process is restored to the host namespace
/// before the error is returned.
#[cfg(target_os = "linux")]
pub fn create(name: &str) -> Result<()> {
    use nix::mount::{MsFlags, mount};
    use nix::sched::{CloneFlags, unshare};

    std::fs::create_dir_all(NETNS_DIR).map_err(|e| VesselError::io(NETNS_DIR, e))?;
    let pin = netns_path(name);
    let _ = File::create(&pin).map_err(|e| VesselError::io(&pin, e))?;

    let host = save_current()?;
    unshare(CloneFlags::CLONE_NEWNET).map_err(|e| VesselError::Namespace {
        message: format!("unshare(CLONE_NEWNET) failed: {e}"),
    })?;

    let pinned = mount(
        Some("/proc/self/ns/net"),
        &pin,
        None::<&str>,
        MsFlags::MS_BIND,
        None::<&str>,
    )
    .map_err(|e| VesselError::Mount {
        target: pin.clone(),
        message: format!("can't pin network namespace: {e}"),
    });

    restore(&host)?;
    pinned?;
    tracing::info!(name, "network namespace created");
    Ok(())
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error — network namespaces require Linux.
#[cfg(not(target_os = "linux"))]
pub fn create(_name: &str) -> Result<()> {
    Err(VesselError::Namespace {
        message: "Linux required for network namespaces".into(),
    })
}

/// Moves the calling process into a pinned network namespace.
///
/// # Errors
///
/// Returns a `Namespace` error if the pin file cannot be opened or the
/// switch fails.
#[cfg(target_os = "linux")]
pub fn join(name: &str) -> Result<()> {
    let pin = netns_path(name);
    let file = File::open(&pin).map_err(|e| VesselError::Namespace {
        message: format!("can't open {}: {e}", pin.display()),
    })?;
    nix::sched::setns(&file, nix::sched::CloneFlags::CLONE_NEWNET).map_err(|e| {
        VesselError::Namespace {
            message: format!("can't join network namespace {name}: {e}"),
        }
    })
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error — network namespaces require Linux.
#[cfg(not(target_os = "linux"))]
pub fn join(_name: &str) -> Result<()> {
    Err(VesselError::Namespace {
        message: "Linux required for network namespaces".into(),
    })
}

/// Unpins and removes a named network namespace.
///
/// Idempotent: a pin that is not mounted or already gone counts as
/// removed, since this runs during best-effort teardown.
///
/// # Errors
///
/// Returns an error for any other unmount or removal failure.
#[cfg(target_os = "linux")]
pub fn remove(name: &str) -> Result<()> {
    use nix::mount::{MntFlags, umount2};

    let pin = netns_path(name);
    match umount2(&pin, MntFlags::empty()) {
        Ok(()) | Err(nix::errno::Errno::EINVAL | nix::errno::Errno::ENOENT) => {}
        Err(e) => {
            return Err(VesselError::Mount {
                target: pin,
                message: format!("can't unpin network namespace: {e}"),
            });
        }
    }
    remove_pin_file(&pin)
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error — network namespaces require Linux.
#[cfg(not(target_os = "linux"))]
pub fn remove(_name: &str) -> Result<()> {
    Err(VesselError::Namespace {
        message: "Linux required for network namespaces".into(),
    })
}

fn remove_pin_file(pin: &Path) -> Result<()> {
    match std::fs::remove_file(pin) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(VesselError::io(pin, e)),
    }
}

/// Brings up the loopback interface in the current namespace.
///
/// # Errors
///
/// Returns a `Link` error if the `ip(8)` step fails.
pub fn loopback_up() -> Result<()> {
    ip::run(&["link", "set", "lo", "up"])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(target_os = "linux")]
    fn save_current_opens_the_calling_namespace() {
        let _file = save_current().expect("save_current failed");
    }

    #[test]
    fn removing_a_missing_pin_file_succeeds() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        remove_pin_file(&dir.path().join("gone")).expect("remove should be a no-op");
    }
}
