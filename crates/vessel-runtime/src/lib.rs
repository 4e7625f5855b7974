//! Container lifecycle orchestration.
//!
//! The runtime is split across three processes. The parent sets up
//! everything that must outlive namespace boundaries (image layers,
//! overlay, network namespace, veth pair, address), then re-executes
//! itself twice: once as a short-lived helper that configures the
//! container end of the veth pair from inside the namespace, and once as
//! the child that becomes PID 1 of the container and runs the workload.
//! The parent waits for the child and tears everything down afterwards.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod attach;
pub mod child;
pub mod container;
pub mod lifecycle;
pub mod volume;
