//! Cgroup v1 resource management.
//!
//! Each container owns one directory per controlled resource kind (cpu,
//! memory, pids) under `/sys/fs/cgroup/<controller>/vessel/<id>`. The
//! directories are the only record of the limits; removing them releases
//! everything.

pub mod cpu;
pub mod memory;

use std::path::PathBuf;

use vessel_common::error::{Result, VesselError};
use vessel_common::types::ContainerId;

/// Handle to the per-controller cgroup directories of one container.
#[derive(Debug)]
pub struct Cgroups {
    dirs: Vec<PathBuf>,
}

impl Cgroups {
    /// Cgroup directories for a container under the system hierarchies.
    #[must_use]
    pub fn new(id: &ContainerId) -> Self {
        Self {
            dirs: vessel_common::constants::cgroup_dirs(id.as_str()),
        }
    }

    /// Cgroup directories under explicit controller roots.
    ///
    /// The lifecycle always uses [`Cgroups::new`]; this constructor exists
    /// so tests can run against scratch directories.
    #[must_use]
    pub fn with_roots(roots: &[PathBuf], id: &str) -> Self {
        Self {
            dirs: roots.iter().map(|root| root.join(id)).collect(),
        }
    }

    /// Creates the controller directories and attaches the calling process
    /// to each of them.
    ///
    /// Attachment targets the *calling* process, so this must run in the
    /// process that will execute the contained workload, after that process
    /// has assumed its namespaces.
    ///
    /// # Errors
    ///
    /// Returns an error if a directory cannot be created or a control file
    /// cannot be written.
    pub fn create(&self) -> Result<()> {
        let pid = std::process::id();
        for dir in &self.dirs {
            std::fs::create_dir_all(dir).map_err(|e| VesselError::io(dir, e))?;
            let notify = dir.join("notify_on_release");
            std::fs::write(&notify, "1").map_err(|e| VesselError::io(notify, e))?;
            let procs = dir.join("cgroup.procs");
            std::fs::write(&procs, pid.to_string()).map_err(|e| VesselError::io(procs, e))?;
        }
        tracing::debug!(pid, "process attached to cgroups");
        Ok(())
    }

    /// Applies the requested CPU and memory limits.
    ///
    /// A zero limit leaves the corresponding controller unconfigured. The
    /// two writes are independent: a cpu failure does not stop the memory
    /// limit from being applied; the first error is surfaced afterwards.
    ///
    /// # Errors
    ///
    /// Returns `LimitExceeded` if the CPU limit exceeds the host's logical
    /// CPU count (nothing is written for the cpu controller in that case),
    /// or an I/O error from a control-file write.
    pub fn configure(&self, cpu_limit: f64, mem_limit_mb: u64) -> Result<()> {
        let mut first_err = None;

        if cpu_limit > 0.0 {
            if let Err(e) = cpu::set_cpu_limit(&self.dirs[0], cpu_limit, cpu::logical_cpus()) {
                first_err = Some(e);
            }
        }
        if mem_limit_mb > 0 {
            if let Err(e) = memory::set_memory_limit(&self.dirs[1], mem_limit_mb) {
                first_err = first_err.or(Some(e));
            }
        }

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Removes all controller directories.
    ///
    /// Idempotent: directories that are already gone count as removed, since
    /// this runs during best-effort teardown.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing directory cannot be deleted.
    pub fn remove(&self) -> Result<()> {
        for dir in &self.dirs {
            match std::fs::remove_dir_all(dir) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(VesselError::io(dir, e)),
            }
        }
        tracing::debug!("cgroups removed");
        Ok(())
    }

    /// Returns the cpu controller directory of this container.
    #[must_use]
    pub fn cpu_dir(&self) -> &PathBuf {
        &self.dirs[0]
    }
}
