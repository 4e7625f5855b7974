//! # vessel-core
//!
//! Low-level Linux isolation primitives for the Vessel runtime.
//!
//! This crate provides safe abstractions over:
//! - **Cgroups v1**: per-container cpu, memory, and pids hierarchies.
//! - **Filesystem**: overlay composition, bind mounts, and chroot entry.
//! - **Namespaces**: joining a running process's namespaces via `setns(2)`.
//!
//! All unsafe system calls are encapsulated in safe wrappers with
//! proper error handling.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod cgroup;
pub mod filesystem;
pub mod namespace;
