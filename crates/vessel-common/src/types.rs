//! Domain primitive types used across the Vessel workspace.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::{Result, VesselError};

/// Unique identifier for a container instance.
///
/// Eight random bytes, hex encoded. The id keys every on-disk path a
/// container owns, and its first six characters seed the veth device names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContainerId(String);

impl ContainerId {
    /// Creates a container ID from an existing string value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh random container ID.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; 8];
        rand::thread_rng().fill_bytes(&mut bytes);
        let mut hex = String::with_capacity(16);
        for b in bytes {
            hex.push_str(&format!("{b:02x}"));
        }
        Self(hex)
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the 6-character prefix used to seed veth device names.
    ///
    /// Interface names are capped at `IFNAMSIZ`, so only a short prefix of
    /// the id fits alongside the `veth`/`-ns`/`-br` decorations.
    #[must_use]
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(6)]
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Truncated hex digest identifying an unpacked image.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageHash(String);

impl ImageHash {
    /// Creates an image hash from a hex string.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the input is not lowercase hex of the
    /// expected length.
    pub fn from_hex(hex: impl Into<String>) -> Result<Self> {
        let hex = hex.into();
        if hex.len() != crate::constants::IMAGE_HASH_LEN
            || !hex.chars().all(|c| c.is_ascii_hexdigit())
        {
            return Err(VesselError::validation(format!(
                "invalid image hash: {hex}"
            )));
        }
        Ok(Self(hex))
    }

    /// Returns the hex string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A host directory bind mounted into the container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindMount {
    /// Host source directory.
    pub source: PathBuf,
    /// Destination path inside the container.
    pub dest: PathBuf,
}

impl BindMount {
    /// Renders the mount back into its `src=..,dest=..` CLI form.
    #[must_use]
    pub fn to_arg(&self) -> String {
        format!("src={},dest={}", self.source.display(), self.dest.display())
    }
}

impl FromStr for BindMount {
    type Err = VesselError;

    /// Parses a `src=PATH,dest=PATH` mount specification.
    fn from_str(s: &str) -> Result<Self> {
        let mut source = None;
        let mut dest = None;
        for part in s.split(',') {
            match part.split_once('=') {
                Some(("src", value)) => source = Some(PathBuf::from(value)),
                Some(("dest", value)) => dest = Some(PathBuf::from(value)),
                Some(_) => {}
                None => {
                    return Err(VesselError::validation(format!(
                        "malformed mount option: {part}"
                    )));
                }
            }
        }
        match (source, dest) {
            (Some(source), Some(dest)) if !source.as_os_str().is_empty()
                && !dest.as_os_str().is_empty() =>
            {
                Ok(Self { source, dest })
            }
            _ => Err(VesselError::validation(format!(
                "mount spec must name both src and dest: {s}"
            ))),
        }
    }
}

/// A named volume mounted into the container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeMount {
    /// Volume name, resolved through the volume registry.
    pub name: String,
    /// Destination path inside the container.
    pub dest: PathBuf,
}

impl VolumeMount {
    /// Renders the mount back into its `NAME:DEST` CLI form.
    #[must_use]
    pub fn to_arg(&self) -> String {
        format!("{}:{}", self.name, self.dest.display())
    }
}

impl FromStr for VolumeMount {
    type Err = VesselError;

    /// Parses a `NAME:DEST` volume specification.
    fn from_str(s: &str) -> Result<Self> {
        match s.split_once(':') {
            Some((name, dest)) if !name.is_empty() && !dest.is_empty() => Ok(Self {
                name: name.to_string(),
                dest: PathBuf::from(dest),
            }),
            _ => Err(VesselError::validation(format!(
                "volume spec must be NAME:DEST: {s}"
            ))),
        }
    }
}

/// Resource and mount options for one container run.
///
/// Immutable once constructed. The parent and the re-executed child are
/// separate OS processes, so the options travel through the child-mode
/// argument vector rather than shared memory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunOptions {
    /// CPU limit in logical CPUs; 0 leaves the quota unset.
    pub cpu_limit: f64,
    /// Memory limit in MiB; 0 leaves the ceiling unset.
    pub mem_limit_mb: u64,
    /// Optional host directory bind mount.
    pub bind_mount: Option<BindMount>,
    /// Optional named volume mount.
    pub volume: Option<VolumeMount>,
}

impl RunOptions {
    /// Rejects options that can never be applied, before any OS resource
    /// is touched.
    ///
    /// # Errors
    ///
    /// Returns `LimitExceeded` if the CPU limit exceeds the host's logical
    /// CPU count, or a validation error for a negative limit.
    pub fn validate(&self, logical_cpus: u64) -> Result<()> {
        if self.cpu_limit < 0.0 {
            return Err(VesselError::validation(format!(
                "cpu limit must be non-negative, got {}",
                self.cpu_limit
            )));
        }
        #[allow(clippy::cast_precision_loss)]
        if self.cpu_limit > logical_cpus as f64 {
            return Err(VesselError::LimitExceeded {
                requested: self.cpu_limit,
                available: logical_cpus,
            });
        }
        Ok(())
    }

    /// Serializes the options into the child-mode argument vector.
    #[must_use]
    pub fn to_child_args(&self) -> Vec<String> {
        let mut args = vec![
            "--cpu".to_string(),
            self.cpu_limit.to_string(),
            "--mem".to_string(),
            self.mem_limit_mb.to_string(),
        ];
        if let Some(bind) = &self.bind_mount {
            args.push("--mount".to_string());
            args.push(bind.to_arg());
        }
        if let Some(volume) = &self.volume {
            args.push("--volume".to_string());
            args.push(volume.to_arg());
        }
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_id_is_sixteen_hex_chars() {
        let id = ContainerId::generate();
        assert_eq!(id.as_str().len(), 16);
        assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn generated_ids_differ() {
        assert_ne!(
            ContainerId::generate().as_str(),
            ContainerId::generate().as_str()
        );
    }

    #[test]
    fn short_prefix_is_six_chars() {
        let id = ContainerId::new("0123456789abcdef");
        assert_eq!(id.short(), "012345");
    }

    #[test]
    fn bind_mount_parses_src_and_dest() {
        let bind: BindMount = "src=/opt/data,dest=/data".parse().expect("parse failed");
        assert_eq!(bind.source, PathBuf::from("/opt/data"));
        assert_eq!(bind.dest, PathBuf::from("/data"));
    }

    #[test]
    fn bind_mount_rejects_missing_dest() {
        assert!("src=/opt/data".parse::<BindMount>().is_err());
    }

    #[test]
    fn bind_mount_rejects_bare_token() {
        assert!("just-a-path".parse::<BindMount>().is_err());
    }

    #[test]
    fn volume_mount_parses_name_and_dest() {
        let vol: VolumeMount = "cache:/var/cache".parse().expect("parse failed");
        assert_eq!(vol.name, "cache");
        assert_eq!(vol.dest, PathBuf::from("/var/cache"));
    }

    #[test]
    fn volume_mount_rejects_missing_colon() {
        assert!("cache".parse::<VolumeMount>().is_err());
    }

    #[test]
    fn run_options_round_trip_through_child_args() {
        let opts = RunOptions {
            cpu_limit: 1.5,
            mem_limit_mb: 256,
            bind_mount: Some("src=/a,dest=/b".parse().expect("bind parse")),
            volume: Some("logs:/var/log".parse().expect("volume parse")),
        };
        let args = opts.to_child_args();
        assert_eq!(
            args,
            vec![
                "--cpu", "1.5", "--mem", "256", "--mount", "src=/a,dest=/b", "--volume",
                "logs:/var/log",
            ]
        );
    }

    #[test]
    fn validate_accepts_limit_within_host_cpus() {
        let opts = RunOptions {
            cpu_limit: 2.0,
            ..RunOptions::default()
        };
        assert!(opts.validate(4).is_ok());
    }

    #[test]
    fn validate_rejects_limit_above_host_cpus() {
        let opts = RunOptions {
            cpu_limit: 16.0,
            ..RunOptions::default()
        };
        assert!(matches!(
            opts.validate(8),
            Err(VesselError::LimitExceeded { .. })
        ));
    }

    #[test]
    fn image_hash_rejects_wrong_length() {
        assert!(ImageHash::from_hex("abc").is_err());
        assert!(ImageHash::from_hex("0123456789ab").is_ok());
    }
}
