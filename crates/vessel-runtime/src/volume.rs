//! Named volumes.
//!
//! A volume is a host directory under the volume root with a small
//! metadata file beside its data directory. Containers bind-mount the
//! data directory; the volume itself outlives any container using it.

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use vessel_common::constants::VOLUME_DIR;
use vessel_common::error::{Result, VesselError};

/// Metadata of one named volume.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Volume {
    /// Volume name, unique on the host.
    pub name: String,
    /// Creation timestamp (ISO-8601).
    pub created_at: String,
    /// Host directory containers bind-mount.
    pub mount_point: PathBuf,
}

/// Store of named volumes rooted at one directory.
#[derive(Debug)]
pub struct VolumeStore {
    dir: PathBuf,
}

impl VolumeStore {
    /// Opens the store at the system volume directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn open() -> Result<Self> {
        Self::open_at(Path::new(VOLUME_DIR))
    }

    /// Opens the store at an explicit directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn open_at(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir).map_err(|e| VesselError::io(dir, e))?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    /// Creates a volume, or returns the existing one of the same name.
    ///
    /// # Errors
    ///
    /// Returns an error if the volume directories or metadata cannot be
    /// written.
    pub fn create(&self, name: &str) -> Result<Volume> {
        if let Ok(existing) = self.inspect(name) {
            return Ok(existing);
        }
        let volume_dir = self.dir.join(name);
        let mount_point = volume_dir.join("_data");
        std::fs::create_dir_all(&mount_point).map_err(|e| VesselError::io(&mount_point, e))?;

        let volume = Volume {
            name: name.to_string(),
            created_at: Utc::now().to_rfc3339(),
            mount_point,
        };
        let meta = volume_dir.join("metadata.json");
        let content = serde_json::to_string_pretty(&volume)?;
        std::fs::write(&meta, content).map_err(|e| VesselError::io(&meta, e))?;
        tracing::info!(name, "volume created");
        Ok(volume)
    }

    /// Loads a volume's metadata.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no volume of this name exists.
    pub fn inspect(&self, name: &str) -> Result<Volume> {
        let meta = self.dir.join(name).join("metadata.json");
        let content = std::fs::read_to_string(&meta).map_err(|_| VesselError::NotFound {
            kind: "volume",
            id: name.to_string(),
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Lists all volumes, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the volume root cannot be read.
    pub fn list(&self) -> Result<Vec<Volume>> {
        let entries = std::fs::read_dir(&self.dir).map_err(|e| VesselError::io(&self.dir, e))?;
        let mut volumes = Vec::new();
        for entry in entries.filter_map(std::result::Result::ok) {
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if let Ok(volume) = self.inspect(&name) {
                volumes.push(volume);
            }
        }
        volumes.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(volumes)
    }

    /// Removes a volume and its data.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no volume of this name exists, or an error if
    /// its directory cannot be deleted.
    pub fn remove(&self, name: &str) -> Result<()> {
        let _ = self.inspect(name)?;
        let volume_dir = self.dir.join(name);
        std::fs::remove_dir_all(&volume_dir).map_err(|e| VesselError::io(&volume_dir, e))?;
        tracing::info!(name, "volume removed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_lays_out_data_dir_and_metadata() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let store = VolumeStore::open_at(dir.path()).expect("open failed");
        let volume = store.create("cache").expect("create failed");
        assert!(volume.mount_point.is_dir());
        assert!(volume.mount_point.ends_with("cache/_data"));
        assert!(dir.path().join("cache/metadata.json").is_file());
    }

    #[test]
    fn create_is_idempotent() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let store = VolumeStore::open_at(dir.path()).expect("open failed");
        let first = store.create("cache").expect("first create failed");
        let second = store.create("cache").expect("second create failed");
        assert_eq!(first.created_at, second.created_at);
    }

    #[test]
    fn inspect_unknown_volume_is_not_found() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let store = VolumeStore::open_at(dir.path()).expect("open failed");
        assert!(matches!(
            store.inspect("missing"),
            Err(VesselError::NotFound { kind: "volume", .. })
        ));
    }

    #[test]
    fn list_returns_volumes_sorted_by_name() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let store = VolumeStore::open_at(dir.path()).expect("open failed");
        let _ = store.create("logs").expect("create failed");
        let _ = store.create("cache").expect("create failed");
        let names: Vec<String> = store
            .list()
            .expect("list failed")
            .into_iter()
            .map(|v| v.name)
            .collect();
        assert_eq!(names, vec!["cache", "logs"]);
    }

    #[test]
    fn remove_deletes_the_volume_directory() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let store = VolumeStore::open_at(dir.path()).expect("open failed");
        let _ = store.create("cache").expect("create failed");
        store.remove("cache").expect("remove failed");
        assert!(!dir.path().join("cache").exists());
        assert!(store.remove("cache").is_err());
    }
}
