//! Container networking.
//!
//! Every container gets its own network namespace, connected to a shared
//! host bridge through a veth pair. Link-level plumbing shells out to
//! `ip(8)`; namespace creation and entry use the raw syscalls so the
//! namespace can be pinned with a bind mount before anything joins it.
//!
//! Host-wide resources (the bridge, the uplink, the address pool) are
//! serialized behind a file lock so concurrent `run` invocations cannot
//! race each other.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod bridge;
pub mod ipam;
pub mod lock;
pub mod netns;
pub mod veth;

mod ip;
