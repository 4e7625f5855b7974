//! Namespace entry for the attach path.
//!
//! Attaching to a running container means joining five of its namespaces
//! through `/proc/<pid>/ns/*`. All five files are opened before any join
//! happens, so a missing namespace fails the attach without leaving the
//! calling process half-migrated.

use std::fs::File;
use std::path::PathBuf;

use vessel_common::error::{Result, VesselError};

/// The namespace kinds a container owns and an attach joins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamespaceKind {
    /// System V IPC and POSIX message queues.
    Ipc,
    /// Mount table.
    Mount,
    /// Process tree.
    Pid,
    /// Network stack.
    Net,
    /// Hostname and domain name.
    Uts,
}

impl NamespaceKind {
    /// All joinable kinds, in the order an attach enters them.
    ///
    /// Mount comes after ipc so the ipc proc file is still reachable, and
    /// pid before net and uts so children of the attach land in the
    /// container's process tree.
    pub const JOIN_ORDER: [Self; 5] = [Self::Ipc, Self::Mount, Self::Pid, Self::Net, Self::Uts];

    /// File name under `/proc/<pid>/ns/`.
    #[must_use]
    pub fn proc_file(self) -> &'static str {
        match self {
            Self::Ipc => "ipc",
            Self::Mount => "mnt",
            Self::Pid => "pid",
            Self::Net => "net",
            Self::Uts => "uts",
        }
    }

    #[cfg(target_os = "linux")]
    fn clone_flag(self) -> nix::sched::CloneFlags {
        use nix::sched::CloneFlags;
        match self {
            Self::Ipc => CloneFlags::CLONE_NEWIPC,
            Self::Mount => CloneFlags::CLONE_NEWNS,
            Self::Pid => CloneFlags::CLONE_NEWPID,
            Self::Net => CloneFlags::CLONE_NEWNET,
            Self::Uts => CloneFlags::CLONE_NEWUTS,
        }
    }
}

/// Open file handles to every namespace of one process.
#[derive(Debug)]
pub struct NamespaceHandles {
    handles: Vec<(NamespaceKind, File)>,
}

impl NamespaceHandles {
    /// Opens all five namespace files of a process.
    ///
    /// All-or-nothing: if any file fails to open, no handles are returned.
    ///
    /// # Errors
    ///
    /// Returns `NamespaceOpen` naming the first file that could not be
    /// opened; the usual cause is that the process exited.
    pub fn open_all(pid: u32) -> Result<Self> {
        let mut handles = Vec::with_capacity(NamespaceKind::JOIN_ORDER.len());
        for kind in NamespaceKind::JOIN_ORDER {
            let path = PathBuf::from(format!("/proc/{pid}/ns/{}", kind.proc_file()));
            let file = File::open(&path).map_err(|e| VesselError::NamespaceOpen {
                pid,
                file: kind.proc_file(),
                message: e.to_string(),
            })?;
            handles.push((kind, file));
        }
        Ok(Self { handles })
    }

    /// Moves the calling process into every namespace, in join order.
    ///
    /// # Errors
    ///
    /// Returns a `Namespace` error naming the kind whose join failed. The
    /// process may already have joined earlier namespaces at that point.
    #[cfg(target_os = "linux")]
    pub fn join_all(&self) -> Result<()> {
        for (kind, file) in &self.handles {
            nix::sched::setns(file, kind.clone_flag()).map_err(|e| VesselError::Namespace {
                message: format!("setns into {} namespace failed: {e}", kind.proc_file()),
            })?;
        }
        tracing::debug!("joined container namespaces");
        Ok(())
    }

    /// Stub for non-Linux platforms.
    ///
    /// # Errors
    ///
    /// Always returns an error — setns requires Linux.
    #[cfg(not(target_os = "linux"))]
    pub fn join_all(&self) -> Result<()> {
        Err(VesselError::Namespace {
            message: "Linux required for namespace entry".into(),
        })
    }
}

/// Sets the hostname inside the current UTS namespace.
///
/// # Errors
///
/// Returns a `Namespace` error if the hostname cannot be set.
#[cfg(target_os = "linux")]
pub fn set_hostname(name: &str) -> Result<()> {
    nix::unistd::sethostname(name).map_err(|e| VesselError::Namespace {
        message: format!("sethostname failed: {e}"),
    })
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error — sethostname requires Linux.
#[cfg(not(target_os = "linux"))]
pub fn set_hostname(_name: &str) -> Result<()> {
    Err(VesselError::Namespace {
        message: "Linux required for hostname changes".into(),
    })
}
