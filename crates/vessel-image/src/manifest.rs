//! Local image manifest.
//!
//! Every unpacked image carries a `manifest.json` recording its config
//! digest, the reference it was pulled as, and its layer digests in
//! overlay order (base first). The manifest is the source of truth for a
//! container's lower-layer stack.

use std::path::Path;

use serde::{Deserialize, Serialize};

use vessel_common::constants::LAYER_ID_LEN;
use vessel_common::error::{Result, VesselError};

/// On-disk manifest of one unpacked image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    /// Config blob digest (`sha256:...`).
    #[serde(rename = "Config")]
    pub config: String,
    /// References this image was pulled as (`name:tag`).
    #[serde(rename = "RepoTags")]
    pub repo_tags: Vec<String>,
    /// Layer blob digests, base layer first.
    #[serde(rename = "Layers")]
    pub layers: Vec<String>,
}

impl Manifest {
    /// Loads a manifest from an image directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or malformed.
    pub fn load(image_dir: &Path) -> Result<Self> {
        let path = image_dir.join("manifest.json");
        let content = std::fs::read_to_string(&path).map_err(|e| VesselError::io(&path, e))?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Writes the manifest into an image directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, image_dir: &Path) -> Result<()> {
        let path = image_dir.join("manifest.json");
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, content).map_err(|e| VesselError::io(&path, e))
    }

    /// Returns the layer directory names in overlay order (base first).
    #[must_use]
    pub fn layer_ids(&self) -> Vec<String> {
        self.layers.iter().map(|d| layer_id(d).to_string()).collect()
    }
}

/// Derives a layer directory name from a blob digest.
///
/// The `sha256:` prefix is stripped and the hex truncated to sixteen
/// characters, which is what container layer links are matched against.
#[must_use]
pub fn layer_id(digest: &str) -> &str {
    let hex = digest.strip_prefix("sha256:").unwrap_or(digest);
    &hex[..hex.len().min(LAYER_ID_LEN)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layer_id_strips_prefix_and_truncates() {
        assert_eq!(
            layer_id("sha256:0123456789abcdef0123456789abcdef"),
            "0123456789abcdef"
        );
    }

    #[test]
    fn layer_ids_preserve_manifest_order() {
        let manifest = Manifest {
            config: "sha256:aa".into(),
            repo_tags: vec!["alpine:latest".into()],
            layers: vec![
                "sha256:bbbbbbbbbbbbbbbb1111".into(),
                "sha256:aaaaaaaaaaaaaaaa2222".into(),
            ],
        };
        assert_eq!(
            manifest.layer_ids(),
            vec!["bbbbbbbbbbbbbbbb", "aaaaaaaaaaaaaaaa"]
        );
    }

    #[test]
    fn manifest_round_trips_through_disk() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let manifest = Manifest {
            config: "sha256:cafe".into(),
            repo_tags: vec!["busybox:1.36".into()],
            layers: vec!["sha256:feedfacefeedface0000".into()],
        };
        manifest.save(dir.path()).expect("save failed");
        let loaded = Manifest::load(dir.path()).expect("load failed");
        assert_eq!(loaded.config, "sha256:cafe");
        assert_eq!(loaded.layers, manifest.layers);
    }

    #[test]
    fn load_fails_for_missing_manifest() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        assert!(Manifest::load(dir.path()).is_err());
    }
}
