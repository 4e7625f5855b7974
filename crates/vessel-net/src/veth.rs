//! Per-container veth pairs.
//!
//! Each container gets one pair: the `-br` end stays on the host and is
//! enslaved to the bridge, the `-ns` end is moved into the container's
//! network namespace and carries the container's address. Names embed the
//! first six characters of the container id, which the allocator keeps
//! unique among live containers.

use std::net::Ipv4Addr;

use rand::RngCore;

use vessel_common::constants::BRIDGE_NAME;
use vessel_common::error::Result;

use crate::{ip, ipam};

/// Returns the `(namespace_end, bridge_end)` interface names for a
/// container.
#[must_use]
pub fn veth_names(container: &str) -> (String, String) {
    let prefix = &container[..container.len().min(6)];
    (format!("veth{prefix}-ns"), format!("veth{prefix}-br"))
}

/// Generates a locally-administered unicast MAC address.
#[must_use]
pub fn random_mac() -> String {
    let mut bytes = [0u8; 4];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!(
        "02:42:{:02x}:{:02x}:{:02x}:{:02x}",
        bytes[0], bytes[1], bytes[2], bytes[3]
    )
}

/// The `ip(8)` invocations that create a pair. The locally-administered
/// MAC goes on the bridge-side peer; the namespace end keeps its
/// kernel-assigned address.
fn pair_commands(ns_end: &str, bridge_end: &str, mac: &str) -> [Vec<String>; 2] {
    [
        ["link", "add", ns_end, "type", "veth", "peer", "name", bridge_end]
            .map(String::from)
            .to_vec(),
        ["link", "set", bridge_end, "address", mac]
            .map(String::from)
            .to_vec(),
    ]
}

/// Creates a container's veth pair and sets the bridge end's MAC.
///
/// # Errors
///
/// Returns a `Link` error if any `ip(8)` step fails.
pub fn create_pair(ns_end: &str, bridge_end: &str, mac: &str) -> Result<()> {
    for args in pair_commands(ns_end, bridge_end, mac) {
        let argv: Vec<&str> = args.iter().map(String::as_str).collect();
        ip::run(&argv)?;
    }
    tracing::debug!(ns_end, bridge_end, mac, "veth pair created");
    Ok(())
}

/// Enslaves the bridge end to the host bridge and brings it up.
///
/// # Errors
///
/// Returns a `Link` error if any `ip(8)` step fails.
pub fn attach_bridge_end(bridge_end: &str) -> Result<()> {
    ip::run(&["link", "set", bridge_end, "master", BRIDGE_NAME])?;
    ip::run(&["link", "set", bridge_end, "up"])
}

/// Moves the namespace end into a named network namespace.
///
/// The namespace must be pinned under `/var/run/netns` so `ip(8)` can
/// address it by name.
///
/// # Errors
///
/// Returns a `Link` error if the move fails.
pub fn move_to_netns(ns_end: &str, netns_name: &str) -> Result<()> {
    ip::run(&["link", "set", ns_end, "netns", netns_name])
}

/// Assigns the container's address to the namespace end and brings it up.
///
/// Must run *inside* the container's network namespace; the interface is
/// invisible from the host once moved.
///
/// # Errors
///
/// Returns a `Link` error if any `ip(8)` step fails.
pub fn configure_in_namespace(ns_end: &str, addr: Ipv4Addr) -> Result<()> {
    ip::run(&["addr", "add", &ipam::cidr(addr), "dev", ns_end])?;
    ip::run(&["link", "set", ns_end, "up"])
}

/// Deletes a link by name. A link that is already gone counts as success,
/// since deletion runs during best-effort teardown and removing one end of
/// a veth pair removes its peer.
///
/// # Errors
///
/// Returns a `Link` error for any other failure.
pub fn delete_link(name: &str) -> Result<()> {
    if !ip::link_exists(name)? {
        return Ok(());
    }
    ip::run(&["link", "del", name])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn veth_names_embed_six_char_id_prefix() {
        let (ns_end, bridge_end) = veth_names("abcdef0123456789");
        assert_eq!(ns_end, "vethabcdef-ns");
        assert_eq!(bridge_end, "vethabcdef-br");
    }

    #[test]
    fn veth_names_fit_the_kernel_interface_name_limit() {
        // IFNAMSIZ is 16 including the terminator.
        let (ns_end, bridge_end) = veth_names("abcdef0123456789");
        assert!(ns_end.len() <= 15);
        assert!(bridge_end.len() <= 15);
    }

    #[test]
    fn pair_mac_is_assigned_to_the_bridge_end() {
        let [add, set] = pair_commands("vethabcdef-ns", "vethabcdef-br", "02:42:aa:bb:cc:dd");
        assert_eq!(add[1], "add");
        assert_eq!(set[..3], ["link", "set", "vethabcdef-br"]);
        assert_eq!(set[3..], ["address", "02:42:aa:bb:cc:dd"]);
    }

    #[test]
    fn random_mac_is_locally_administered_unicast() {
        let mac = random_mac();
        assert_eq!(mac.len(), 17);
        assert!(mac.starts_with("02:42:"));
        assert!(
            mac.chars()
                .all(|c| c == ':' || c.is_ascii_hexdigit())
        );
    }
}
