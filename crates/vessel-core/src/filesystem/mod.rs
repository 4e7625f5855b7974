//! Container filesystem management.
//!
//! Overlay composition of read-only image layers with a per-container
//! writable layer, bind mounts, pseudo-filesystems, and chroot entry.

pub mod chroot;
pub mod mount;
pub mod overlay;
