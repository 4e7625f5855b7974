//! Local image catalog.
//!
//! A single `images.json` under the image directory maps image names to
//! their tags, and tags to unpacked image hashes. The catalog is the only
//! index; the image content itself lives in per-hash directories next to
//! it.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use vessel_common::constants::IMAGE_DIR;
use vessel_common::error::{Result, VesselError};
use vessel_common::types::ImageHash;

use crate::manifest::Manifest;

/// One catalog row, as shown by `vessel images`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRecord {
    /// Image name without the tag.
    pub name: String,
    /// Tag within the name.
    pub tag: String,
    /// Hash of the unpacked image.
    pub hash: String,
}

/// Catalog of unpacked images.
#[derive(Debug)]
pub struct ImageStore {
    dir: PathBuf,
    catalog: BTreeMap<String, BTreeMap<String, String>>,
}

impl ImageStore {
    /// Opens the catalog under the system image directory.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing catalog cannot be read or parsed.
    pub fn open() -> Result<Self> {
        Self::open_at(Path::new(IMAGE_DIR))
    }

    /// Opens the catalog under an explicit directory.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing catalog cannot be read or parsed.
    pub fn open_at(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir).map_err(|e| VesselError::io(dir, e))?;
        let path = dir.join("images.json");
        let catalog = match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(VesselError::io(&path, e)),
        };
        Ok(Self {
            dir: dir.to_path_buf(),
            catalog,
        })
    }

    /// Looks up the hash an image reference resolves to.
    #[must_use]
    pub fn lookup(&self, name: &str, tag: &str) -> Option<&str> {
        self.catalog
            .get(name)
            .and_then(|tags| tags.get(tag))
            .map(String::as_str)
    }

    /// Reports whether any reference points at this hash.
    ///
    /// Used for deduplication: a pull whose manifest resolves to an
    /// already-unpacked hash only records the new reference.
    #[must_use]
    pub fn contains_hash(&self, hash: &str) -> bool {
        self.catalog
            .values()
            .any(|tags| tags.values().any(|h| h == hash))
    }

    /// Returns the first `name:tag` reference pointing at a hash.
    #[must_use]
    pub fn reference_for(&self, hash: &str) -> Option<String> {
        for (name, tags) in &self.catalog {
            for (tag, h) in tags {
                if h == hash {
                    return Some(format!("{name}:{tag}"));
                }
            }
        }
        None
    }

    /// Records a reference-to-hash mapping and persists the catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be written.
    pub fn record(&mut self, name: &str, tag: &str, hash: &ImageHash) -> Result<()> {
        let _ = self
            .catalog
            .entry(name.to_string())
            .or_default()
            .insert(tag.to_string(), hash.as_str().to_string());
        self.save()
    }

    fn save(&self) -> Result<()> {
        let path = self.dir.join("images.json");
        let content = serde_json::to_string_pretty(&self.catalog)?;
        std::fs::write(&path, content).map_err(|e| VesselError::io(&path, e))
    }

    /// Returns every catalog row, sorted by name then tag.
    #[must_use]
    pub fn list(&self) -> Vec<ImageRecord> {
        self.catalog
            .iter()
            .flat_map(|(name, tags)| {
                tags.iter().map(|(tag, hash)| ImageRecord {
                    name: name.clone(),
                    tag: tag.clone(),
                    hash: hash.clone(),
                })
            })
            .collect()
    }

    /// Returns the unpacked directory of an image hash.
    #[must_use]
    pub fn image_dir(&self, hash: &str) -> PathBuf {
        self.dir.join(hash)
    }

    /// Resolves an image hash to its ordered layer directories (base
    /// first), per the unpacked manifest.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the image is not unpacked, or an error if its
    /// manifest is unreadable.
    pub fn layers_for(&self, hash: &str) -> Result<Vec<PathBuf>> {
        let image_dir = self.image_dir(hash);
        if !image_dir.is_dir() {
            return Err(VesselError::NotFound {
                kind: "image",
                id: hash.to_string(),
            });
        }
        let manifest = Manifest::load(&image_dir)?;
        let layers_root = image_dir.join("layers");
        Ok(manifest
            .layer_ids()
            .into_iter()
            .map(|id| layers_root.join(id))
            .collect())
    }
}

/// Extracts the image hash from an overlay mount table entry.
///
/// Running containers are traced back to their image by finding the
/// overlay mount at the container's mount point and reading which image
/// directory its first lower layer lives under.
#[must_use]
pub fn image_hash_from_mounts(mounts: &str, mount_point: &Path) -> Option<String> {
    let needle = mount_point.display().to_string();
    for line in mounts.lines() {
        let mut fields = line.split_whitespace();
        let source = fields.next()?;
        let target = fields.next()?;
        let options = fields.nth(1)?;
        if source != "overlay" || target != needle {
            continue;
        }
        let lowerdir = options
            .split(',')
            .find_map(|opt| opt.strip_prefix("lowerdir="))?;
        let first = lowerdir.split(':').next()?;
        let mut components = Path::new(first).components();
        while let Some(component) = components.next() {
            if component.as_os_str() == "images" {
                return components
                    .next()
                    .map(|hash| hash.as_os_str().to_string_lossy().into_owned());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash(hex: &str) -> ImageHash {
        ImageHash::from_hex(hex).expect("valid hash")
    }

    #[test]
    fn recorded_reference_resolves_to_its_hash() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let mut store = ImageStore::open_at(dir.path()).expect("open failed");
        store
            .record("alpine", "latest", &hash("0123456789ab"))
            .expect("record failed");
        assert_eq!(store.lookup("alpine", "latest"), Some("0123456789ab"));
        assert_eq!(store.lookup("alpine", "3.19"), None);
    }

    #[test]
    fn catalog_survives_reopen() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        {
            let mut store = ImageStore::open_at(dir.path()).expect("open failed");
            store
                .record("busybox", "1.36", &hash("feedfacecafe"))
                .expect("record failed");
        }
        let store = ImageStore::open_at(dir.path()).expect("reopen failed");
        assert_eq!(store.lookup("busybox", "1.36"), Some("feedfacecafe"));
    }

    #[test]
    fn contains_hash_matches_any_reference() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let mut store = ImageStore::open_at(dir.path()).expect("open failed");
        store
            .record("alpine", "latest", &hash("0123456789ab"))
            .expect("record failed");
        assert!(store.contains_hash("0123456789ab"));
        assert!(!store.contains_hash("ba9876543210"));
    }

    #[test]
    fn reference_for_renders_name_and_tag() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let mut store = ImageStore::open_at(dir.path()).expect("open failed");
        store
            .record("alpine", "latest", &hash("0123456789ab"))
            .expect("record failed");
        assert_eq!(
            store.reference_for("0123456789ab"),
            Some("alpine:latest".to_string())
        );
    }

    #[test]
    fn layers_for_unknown_image_is_not_found() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let store = ImageStore::open_at(dir.path()).expect("open failed");
        assert!(matches!(
            store.layers_for("0123456789ab"),
            Err(VesselError::NotFound { kind: "image", .. })
        ));
    }

    #[test]
    fn layers_for_follows_manifest_order() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let store = ImageStore::open_at(dir.path()).expect("open failed");
        let image_dir = store.image_dir("0123456789ab");
        std::fs::create_dir_all(&image_dir).expect("mkdir failed");
        Manifest {
            config: "sha256:cc".into(),
            repo_tags: vec!["alpine:latest".into()],
            layers: vec![
                "sha256:bbbbbbbbbbbbbbbb1111".into(),
                "sha256:aaaaaaaaaaaaaaaa2222".into(),
            ],
        }
        .save(&image_dir)
        .expect("save failed");

        let layers = store.layers_for("0123456789ab").expect("layers failed");
        assert_eq!(layers[0], image_dir.join("layers/bbbbbbbbbbbbbbbb"));
        assert_eq!(layers[1], image_dir.join("layers/aaaaaaaaaaaaaaaa"));
    }

    #[test]
    fn image_hash_is_parsed_out_of_the_mount_table() {
        let mounts = "\
proc /proc proc rw 0 0
overlay /var/lib/vessel/containers/aabbccddeeff0011/fs/mnt overlay rw,lowerdir=/var/lib/vessel/images/0123456789ab/layers/aaaaaaaaaaaaaaaa:/var/lib/vessel/images/0123456789ab/layers/bbbbbbbbbbbbbbbb,upperdir=/u,workdir=/w 0 0
";
        let hash = image_hash_from_mounts(
            mounts,
            Path::new("/var/lib/vessel/containers/aabbccddeeff0011/fs/mnt"),
        );
        assert_eq!(hash.as_deref(), Some("0123456789ab"));
    }

    #[test]
    fn no_hash_for_an_unmounted_container() {
        assert_eq!(
            image_hash_from_mounts("proc /proc proc rw 0 0\n", Path::new("/nope")),
            None
        );
    }
}
