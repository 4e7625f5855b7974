//! Host bridge and uplink management.
//!
//! One bridge (`vessel0`) is shared by every container on the host, with a
//! dedicated veth pair connecting the host's own stack to it. Both are
//! created lazily by the first `run` and probed for on every later one.
//! Callers pass the held [`NetworkLock`] so the probe-then-create sequence
//! cannot race a concurrent invocation.

use vessel_common::constants::{
    BRIDGE_ADDR, BRIDGE_NAME, UPLINK_BRIDGE_END, UPLINK_HOST_ADDR, UPLINK_HOST_END,
};
use vessel_common::error::Result;

use crate::ip;
use crate::lock::NetworkLock;

/// Creates the host bridge if it does not exist, assigns its gateway
/// address, and brings it up.
///
/// # Errors
///
/// Returns a `Link` error if any `ip(8)` step fails.
pub fn ensure_bridge(_lock: &NetworkLock) -> Result<()> {
    if ip::link_exists(BRIDGE_NAME)? {
        return Ok(());
    }
    ip::run(&["link", "add", "name", BRIDGE_NAME, "type", "bridge"])?;
    ip::run(&["addr", "add", BRIDGE_ADDR, "dev", BRIDGE_NAME])?;
    ip::run(&["link", "set", BRIDGE_NAME, "up"])?;
    tracing::info!(bridge = BRIDGE_NAME, addr = BRIDGE_ADDR, "bridge created");
    Ok(())
}

/// Creates the host-to-bridge uplink veth pair if it does not exist.
///
/// The host end carries an address in the bridge subnet so the host can
/// reach container addresses; the other end is enslaved to the bridge.
///
/// # Errors
///
/// Returns a `Link` error if any `ip(8)` step fails.
pub fn ensure_host_uplink(_lock: &NetworkLock) -> Result<()> {
    if ip::link_exists(UPLINK_HOST_END)? {
        return Ok(());
    }
    ip::run(&[
        "link",
        "add",
        UPLINK_HOST_END,
        "type",
        "veth",
        "peer",
        "name",
        UPLINK_BRIDGE_END,
    ])?;
    ip::run(&["addr", "add", UPLINK_HOST_ADDR, "dev", UPLINK_HOST_END])?;
    ip::run(&["link", "set", UPLINK_BRIDGE_END, "master", BRIDGE_NAME])?;
    ip::run(&["link", "set", UPLINK_HOST_END, "up"])?;
    ip::run(&["link", "set", UPLINK_BRIDGE_END, "up"])?;
    tracing::info!(host_end = UPLINK_HOST_END, "host uplink created");
    Ok(())
}
