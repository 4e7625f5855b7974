//! Image distribution and storage.
//!
//! Images are pulled from OCI distribution registries, unpacked layer by
//! layer under `/var/lib/vessel/images/<hash>`, and indexed in a single
//! JSON catalog mapping `name:tag` references to image hashes. Layers
//! stay read-only after extraction; containers overlay-mount them.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod layer;
pub mod manifest;
pub mod pull;
pub mod store;
