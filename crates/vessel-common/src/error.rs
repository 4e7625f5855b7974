//! Unified error types for the Vessel workspace.
//!
//! The variants follow the runtime's failure taxonomy: validation errors are
//! raised before any OS resource is touched, acquisition errors wrap the
//! underlying OS failure, and teardown errors carry every cleanup failure
//! collected during best-effort shutdown.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum VesselError {
    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// An input was rejected before any OS resource was touched.
    #[error("invalid input: {message}")]
    Validation {
        /// Description of the rejected input.
        message: String,
    },

    /// A requested CPU limit exceeds the host's logical CPU count.
    #[error("cpu limit {requested} exceeds host logical CPU count {available}")]
    LimitExceeded {
        /// Requested number of logical CPUs.
        requested: f64,
        /// Logical CPUs available on this host.
        available: u64,
    },

    /// A mount or unmount syscall failed.
    #[error("mount failed at {target}: {message}")]
    Mount {
        /// Mount target path.
        target: PathBuf,
        /// Underlying OS error text.
        message: String,
    },

    /// A container's persisted layer directory is absent or empty.
    #[error("container {container} has no valid layer entries")]
    InvalidLayers {
        /// Container whose layers could not be recovered.
        container: String,
    },

    /// A namespace create, join, or restore operation failed.
    #[error("namespace operation failed: {message}")]
    Namespace {
        /// Description of the failed operation.
        message: String,
    },

    /// One of a running process's namespace files could not be opened.
    ///
    /// The attach path opens all five namespace files before joining any of
    /// them; this error means no namespace switch was attempted.
    #[error("can't open namespace file {file} of pid {pid}: {message}")]
    NamespaceOpen {
        /// Process whose namespace files were being opened.
        pid: u32,
        /// Namespace file name (`mnt`, `ipc`, `pid`, `net`, `uts`).
        file: &'static str,
        /// Underlying OS error text.
        message: String,
    },

    /// A link-level network operation (bridge, veth) failed.
    #[error("link operation failed: {message}")]
    Link {
        /// Description of the failed operation.
        message: String,
    },

    /// A registry request failed.
    #[error("registry error: {message}")]
    Registry {
        /// Description of the failed request.
        message: String,
    },

    /// A required resource was not found.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Type of the missing resource.
        kind: &'static str,
        /// Identifier of the missing resource.
        id: String,
    },

    /// One or more teardown steps failed.
    ///
    /// Teardown never stops at the first failure; every failing step is
    /// recorded and the whole set is reported as one diagnostic.
    #[error("teardown completed with failures: {}", failures.join("; "))]
    Teardown {
        /// Human-readable description of each failed step.
        failures: Vec<String>,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

impl VesselError {
    /// Wraps an I/O error with the path it occurred at.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Builds a validation error from a message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, VesselError>;
