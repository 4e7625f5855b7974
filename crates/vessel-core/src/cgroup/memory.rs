//! Memory ceiling control via the cgroup v1 memory controller.

use std::path::Path;

use vessel_common::error::{Result, VesselError};

/// Writes the memory ceiling, in bytes, into a memory controller directory.
///
/// # Errors
///
/// Returns an error if `memory.limit_in_bytes` cannot be written.
pub fn set_memory_limit(memory_dir: &Path, mem_limit_mb: u64) -> Result<()> {
    let limit_bytes = mem_limit_mb * 1024 * 1024;
    let limit_file = memory_dir.join("memory.limit_in_bytes");
    std::fs::write(&limit_file, limit_bytes.to_string())
        .map_err(|e| VesselError::io(limit_file, e))?;
    tracing::debug!(mem_limit_mb, limit_bytes, "memory ceiling set");
    Ok(())
}
