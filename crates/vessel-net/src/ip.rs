//! Thin wrapper around the `ip(8)` command.

use std::process::Command;

use vessel_common::error::{Result, VesselError};

/// Runs `ip` with the given arguments, failing on a non-zero exit.
pub(crate) fn run(args: &[&str]) -> Result<()> {
    let output = Command::new("ip")
        .args(args)
        .output()
        .map_err(|e| VesselError::Link {
            message: format!("failed to run `ip {}`: {e}", args.join(" ")),
        })?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(VesselError::Link {
            message: format!("`ip {}` failed: {}", args.join(" "), stderr.trim()),
        });
    }
    Ok(())
}

/// Reports whether a link with this name exists in the current namespace.
pub(crate) fn link_exists(name: &str) -> Result<bool> {
    let output = Command::new("ip")
        .args(["link", "show", name])
        .output()
        .map_err(|e| VesselError::Link {
            message: format!("failed to run `ip link show {name}`: {e}"),
        })?;
    Ok(output.status.success())
}
