//! Container address allocation.
//!
//! Addresses come from the bridge subnet (`172.40.0.0/16`). The allocator
//! hands out the lowest free host index and persists the mapping as JSON,
//! so allocations survive restarts and are released at container teardown.
//! Callers must hold the [`crate::lock::NetworkLock`] while mutating.

use std::collections::BTreeMap;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};

use vessel_common::constants::NETWORK_DIR;
use vessel_common::error::{Result, VesselError};

/// First two octets of the bridge subnet.
const SUBNET: [u8; 2] = [172, 40];

/// Host indices that are never handed out: the network address, the
/// bridge (`.0.1`), the host uplink (`.0.100`), and broadcast.
const RESERVED: [u16; 4] = [0, 1, 100, u16::MAX];

/// Persistent allocator of container addresses in the bridge subnet.
#[derive(Debug)]
pub struct IpAllocator {
    path: PathBuf,
    allocations: BTreeMap<String, u16>,
}

impl IpAllocator {
    /// Opens the allocator backed by the system network state directory.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing allocation file cannot be read or
    /// parsed.
    pub fn open() -> Result<Self> {
        Self::open_at(Path::new(NETWORK_DIR))
    }

    /// Opens the allocator backed by an explicit directory.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing allocation file cannot be read or
    /// parsed.
    pub fn open_at(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir).map_err(|e| VesselError::io(dir, e))?;
        let path = dir.join("allocations.json");
        let allocations = match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(VesselError::io(&path, e)),
        };
        Ok(Self { path, allocations })
    }

    /// Allocates an address for a container, or returns its existing one.
    ///
    /// Interface names embed the first six characters of the container id,
    /// so a container whose id prefix collides with a live allocation is
    /// rejected before any link is created.
    ///
    /// # Errors
    ///
    /// Returns `Validation` on a prefix collision or an exhausted subnet,
    /// or an I/O error if the allocation file cannot be written.
    pub fn allocate(&mut self, container: &str) -> Result<Ipv4Addr> {
        if let Some(&index) = self.allocations.get(container) {
            return Ok(Self::address(index));
        }

        let prefix = &container[..container.len().min(6)];
        if self
            .allocations
            .keys()
            .any(|existing| existing.starts_with(prefix))
        {
            return Err(VesselError::validation(format!(
                "container id prefix {prefix} collides with a live allocation"
            )));
        }

        let taken: Vec<u16> = self.allocations.values().copied().collect();
        let index = (2..u16::MAX)
            .find(|i| !RESERVED.contains(i) && !taken.contains(i))
            .ok_or_else(|| VesselError::validation("bridge subnet exhausted"))?;

        let _ = self.allocations.insert(container.to_string(), index);
        self.save()?;
        tracing::debug!(container, address = %Self::address(index), "address allocated");
        Ok(Self::address(index))
    }

    /// Releases a container's address. Unknown containers are a no-op,
    /// since release runs during best-effort teardown.
    ///
    /// # Errors
    ///
    /// Returns an error if the allocation file cannot be written.
    pub fn release(&mut self, container: &str) -> Result<()> {
        if self.allocations.remove(container).is_some() {
            self.save()?;
            tracing::debug!(container, "address released");
        }
        Ok(())
    }

    /// Returns the address currently allocated to a container, if any.
    #[must_use]
    pub fn address_of(&self, container: &str) -> Option<Ipv4Addr> {
        self.allocations.get(container).map(|&i| Self::address(i))
    }

    fn address(index: u16) -> Ipv4Addr {
        let [high, low] = index.to_be_bytes();
        Ipv4Addr::new(SUBNET[0], SUBNET[1], high, low)
    }

    fn save(&self) -> Result<()> {
        let content = serde_json::to_string_pretty(&self.allocations)?;
        std::fs::write(&self.path, content).map_err(|e| VesselError::io(&self.path, e))
    }
}

/// Renders an address in the CIDR notation `ip(8)` expects for this subnet.
#[must_use]
pub fn cidr(addr: Ipv4Addr) -> String {
    format!("{addr}/16")
}
