//! CPU bandwidth control via the cgroup v1 cpu controller.
//!
//! The accounting period is fixed at 100000µs; the quota is derived from
//! the requested number of logical CPUs.

use std::path::Path;

use vessel_common::constants::CPU_PERIOD_US;
use vessel_common::error::{Result, VesselError};

/// Returns the host's logical CPU count.
#[must_use]
pub fn logical_cpus() -> u64 {
    std::thread::available_parallelism()
        .map(|n| n.get() as u64)
        .unwrap_or(1)
}

/// Computes the CFS quota in microseconds for a CPU limit.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn quota_us(cpu_limit: f64) -> u64 {
    (CPU_PERIOD_US as f64 * cpu_limit) as u64
}

/// Validates a CPU limit against the host's logical CPU count.
///
/// # Errors
///
/// Returns `LimitExceeded` if the limit exceeds the available CPUs.
#[allow(clippy::cast_precision_loss)]
pub fn validate(cpu_limit: f64, logical_cpus: u64) -> Result<()> {
    if cpu_limit > logical_cpus as f64 {
        return Err(VesselError::LimitExceeded {
            requested: cpu_limit,
            available: logical_cpus,
        });
    }
    Ok(())
}

/// Writes the fixed period and derived quota into a cpu controller
/// directory.
///
/// Validation happens before either control file is touched, so an
/// out-of-range limit writes nothing.
///
/// # Errors
///
/// Returns `LimitExceeded` for an out-of-range limit, or an I/O error from
/// a control-file write.
pub fn set_cpu_limit(cpu_dir: &Path, cpu_limit: f64, logical_cpus: u64) -> Result<()> {
    validate(cpu_limit, logical_cpus)?;

    let period_file = cpu_dir.join("cpu.cfs_period_us");
    std::fs::write(&period_file, CPU_PERIOD_US.to_string())
        .map_err(|e| VesselError::io(period_file, e))?;

    let quota_file = cpu_dir.join("cpu.cfs_quota_us");
    std::fs::write(&quota_file, quota_us(cpu_limit).to_string())
        .map_err(|e| VesselError::io(quota_file, e))?;

    tracing::debug!(cpu_limit, quota = quota_us(cpu_limit), "cpu quota set");
    Ok(())
}
