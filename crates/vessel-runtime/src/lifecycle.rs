//! The parent side of a container run.
//!
//! The parent prepares everything visible from the host: the image, the
//! container's overlay, the network namespace with its veth pair and
//! address. It then re-executes itself as a `setup-veth` helper (which
//! configures the container end of the pair from inside the namespace)
//! and as the `child-mode` process that becomes the container's PID 1.
//! When the child exits, the parent tears down every resource it set up,
//! collecting failures instead of stopping at the first one.

use std::net::Ipv4Addr;
use std::path::Path;

use vessel_common::config::RegistryConfig;
use vessel_common::constants::{CONFIG_FILE, container_mnt};
use vessel_common::error::{Result, VesselError};
use vessel_common::types::{ContainerId, ImageHash, RunOptions};
use vessel_core::cgroup::{Cgroups, cpu};
use vessel_core::filesystem::overlay;
use vessel_image::pull::{ImageReference, Puller};
use vessel_image::store::ImageStore;
use vessel_net::ipam::IpAllocator;
use vessel_net::lock::NetworkLock;
use vessel_net::{bridge, netns, veth};

use crate::container;

/// One container run, as requested on the command line.
#[derive(Debug)]
pub struct RunRequest {
    /// Image reference (`name[:tag]`).
    pub image: String,
    /// Limits and mounts.
    pub options: RunOptions,
    /// Workload command and arguments.
    pub command: Vec<String>,
}

/// Runs a container to completion and returns the workload's exit code.
///
/// # Errors
///
/// Returns a validation error before any resource is acquired if the
/// request can never succeed, a setup error if acquisition fails, or a
/// `Teardown` error if the run completed but cleanup left residue.
#[cfg(target_os = "linux")]
pub fn run(request: &RunRequest) -> Result<i32> {
    request.options.validate(cpu::logical_cpus())?;
    if request.command.is_empty() {
        return Err(VesselError::validation("no command to run"));
    }

    let mut store = ImageStore::open()?;
    let hash = resolve_image(&mut store, &request.image)?;
    let layers = store.layers_for(hash.as_str())?;

    let id = ContainerId::generate();
    tracing::info!(container = %id, image = %request.image, "run starting");
    container::create(&id, &layers)?;

    let addr = match setup_network(&id) {
        Ok(addr) => addr,
        Err(e) => {
            if let Err(cleanup) = teardown(&id) {
                tracing::warn!(container = %id, error = %cleanup, "cleanup after failed setup");
            }
            return Err(e);
        }
    };

    let host = match netns::save_current() {
        Ok(handle) => handle,
        Err(e) => {
            if let Err(cleanup) = teardown(&id) {
                tracing::warn!(container = %id, error = %cleanup, "cleanup after failed setup");
            }
            return Err(e);
        }
    };
    let result = run_helper_and_child(&id, addr, request);
    // Every remaining step acts on the host's view of links, mounts and
    // namespace pins; nothing is safe to touch until the parent is back
    // in the host network namespace.
    netns::restore(&host)?;
    let cleanup = teardown(&id);
    let code = result?;
    cleanup?;
    Ok(code)
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error — containers require Linux.
#[cfg(not(target_os = "linux"))]
pub fn run(_request: &RunRequest) -> Result<i32> {
    Err(VesselError::Namespace {
        message: "Linux required to run containers".into(),
    })
}

/// Resolves an image reference through the catalog, pulling on a miss.
fn resolve_image(store: &mut ImageStore, image: &str) -> Result<ImageHash> {
    let reference = ImageReference::parse(image);
    if let Some(hash) = store.lookup(&reference.name, &reference.tag) {
        return ImageHash::from_hex(hash);
    }
    let config = RegistryConfig::load(Path::new(CONFIG_FILE));
    Puller::new(&config)?.pull(store, image)
}

/// Creates the container's network attachment: shared bridge and uplink,
/// an allocated address, a pinned namespace, and the veth pair with its
/// container end already moved inside.
#[cfg(target_os = "linux")]
fn setup_network(id: &ContainerId) -> Result<Ipv4Addr> {
    let lock = NetworkLock::acquire()?;
    bridge::ensure_bridge(&lock)?;
    bridge::ensure_host_uplink(&lock)?;
    let addr = IpAllocator::open()?.allocate(id.as_str())?;

    netns::create(id.as_str())?;
    let (ns_end, bridge_end) = veth::veth_names(id.as_str());
    veth::create_pair(&ns_end, &bridge_end, &veth::random_mac())?;
    veth::attach_bridge_end(&bridge_end)?;
    veth::move_to_netns(&ns_end, id.as_str())?;
    drop(lock);
    Ok(addr)
}

#[cfg(target_os = "linux")]
fn run_helper_and_child(id: &ContainerId, addr: Ipv4Addr, request: &RunRequest) -> Result<i32> {
    run_setup_veth_helper(id, addr)?;
    spawn_child(id, request)
}

/// Re-executes the binary as the short-lived in-namespace veth helper.
#[cfg(target_os = "linux")]
fn run_setup_veth_helper(id: &ContainerId, addr: Ipv4Addr) -> Result<()> {
    let status = std::process::Command::new("/proc/self/exe")
        .args(["setup-veth", id.as_str(), &addr.to_string()])
        .status()
        .map_err(|e| VesselError::io("/proc/self/exe", e))?;
    if !status.success() {
        return Err(VesselError::Link {
            message: format!("setup-veth helper failed for {id}"),
        });
    }
    Ok(())
}

/// Entry point of the `setup-veth` helper process.
///
/// Runs in a re-executed binary whose only job is to join the container's
/// pinned network namespace and configure the container end of the veth
/// pair; interfaces inside a namespace are unreachable from the host.
///
/// # Errors
///
/// Returns an error if the namespace cannot be joined or the interface
/// cannot be configured.
pub fn setup_veth(id: &str, addr: Ipv4Addr) -> Result<()> {
    netns::join(id)?;
    let (ns_end, _) = veth::veth_names(id);
    veth::configure_in_namespace(&ns_end, addr)
}

/// Assembles the child-mode argument vector.
#[must_use]
pub fn child_args(id: &ContainerId, options: &RunOptions, command: &[String]) -> Vec<String> {
    let mut args = vec!["child-mode".to_string(), "--id".to_string(), id.to_string()];
    args.extend(options.to_child_args());
    args.push("--".to_string());
    args.extend(command.iter().cloned());
    args
}

/// Re-executes the binary as the container's PID 1 and waits for it.
///
/// The namespaces are unshared between fork and exec, so the child is
/// born inside them; PID namespace membership in particular is decided at
/// process creation and could not be changed by the child itself.
#[cfg(target_os = "linux")]
#[allow(unsafe_code)]
fn spawn_child(id: &ContainerId, request: &RunRequest) -> Result<i32> {
    use std::os::unix::process::CommandExt;
    use std::os::unix::process::ExitStatusExt;

    use nix::sched::{CloneFlags, unshare};

    let mut command = std::process::Command::new("/proc/self/exe");
    let _ = command.args(child_args(id, &request.options, &request.command));
    unsafe {
        let _ = command.pre_exec(|| {
            unshare(
                CloneFlags::CLONE_NEWNS | CloneFlags::CLONE_NEWPID | CloneFlags::CLONE_NEWUTS,
            )
            .map_err(std::io::Error::from)
        });
    }

    let status = command
        .status()
        .map_err(|e| VesselError::io("/proc/self/exe", e))?;
    let code = status
        .code()
        .unwrap_or_else(|| 128 + status.signal().unwrap_or(0));
    tracing::info!(container = %id, code, "child exited");
    Ok(code)
}

/// Releases everything a run acquired, in reverse order of acquisition.
///
/// Every step runs regardless of earlier failures; the failures are
/// collected and reported together.
///
/// # Errors
///
/// Returns `Teardown` listing each step that failed.
#[cfg(target_os = "linux")]
pub fn teardown(id: &ContainerId) -> Result<()> {
    let mut failures = Vec::new();
    let mut note = |step: &str, result: Result<()>| {
        if let Err(e) = result {
            failures.push(format!("{step}: {e}"));
        }
    };

    let (_, bridge_end) = veth::veth_names(id.as_str());
    note("delete veth", veth::delete_link(&bridge_end));
    note("remove netns", netns::remove(id.as_str()));
    note(
        "release address",
        IpAllocator::open().and_then(|mut a| a.release(id.as_str())),
    );
    note("unmount overlay", overlay::unmount(&container_mnt(id.as_str())));
    note("remove cgroups", Cgroups::new(id).remove());
    note("remove container dir", container::remove(id.as_str()));

    if failures.is_empty() {
        tracing::info!(container = %id, "teardown complete");
        Ok(())
    } else {
        Err(VesselError::Teardown { failures })
    }
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error — containers require Linux.
#[cfg(not(target_os = "linux"))]
pub fn teardown(_id: &ContainerId) -> Result<()> {
    Err(VesselError::Namespace {
        message: "Linux required to run containers".into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_args_carry_id_options_and_command() {
        let id = ContainerId::new("aabbccddeeff0011");
        let options = RunOptions {
            cpu_limit: 0.5,
            mem_limit_mb: 128,
            ..RunOptions::default()
        };
        let args = child_args(&id, &options, &["sh".to_string(), "-c".to_string()]);
        assert_eq!(
            args,
            vec![
                "child-mode",
                "--id",
                "aabbccddeeff0011",
                "--cpu",
                "0.5",
                "--mem",
                "128",
                "--",
                "sh",
                "-c",
            ]
        );
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn run_rejects_an_empty_command_before_touching_anything() {
        let request = RunRequest {
            image: "alpine".into(),
            options: RunOptions::default(),
            command: Vec::new(),
        };
        assert!(matches!(
            run(&request),
            Err(VesselError::Validation { .. })
        ));
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn run_rejects_an_oversized_cpu_limit_up_front() {
        let request = RunRequest {
            image: "alpine".into(),
            options: RunOptions {
                cpu_limit: 1_000_000.0,
                ..RunOptions::default()
            },
            command: vec!["true".into()],
        };
        assert!(matches!(
            run(&request),
            Err(VesselError::LimitExceeded { .. })
        ));
    }
}
