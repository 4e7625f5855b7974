//! Registry pulls.
//!
//! Implements the client side of the OCI distribution protocol: token
//! auth where the registry requires it, manifest (and manifest list)
//! resolution, and layer blob download with digest verification. All
//! requests are blocking; a pull runs to completion before the container
//! that needs the image starts.

use std::path::Path;

use serde::Deserialize;

use vessel_common::config::RegistryConfig;
use vessel_common::constants::{IMAGE_HASH_LEN, TMP_DIR};
use vessel_common::error::{Result, VesselError};
use vessel_common::types::ImageHash;

use crate::layer;
use crate::manifest::{Manifest, layer_id};
use crate::store::ImageStore;

const MANIFEST_ACCEPT: &str = "application/vnd.docker.distribution.manifest.v2+json, \
     application/vnd.docker.distribution.manifest.list.v2+json, \
     application/vnd.oci.image.manifest.v1+json, \
     application/vnd.oci.image.index.v1+json";

/// A parsed `name[:tag]` image reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    /// Image name, without a tag.
    pub name: String,
    /// Tag, defaulting to `latest`.
    pub tag: String,
}

impl ImageReference {
    /// Parses a reference, applying the `latest` default tag.
    #[must_use]
    pub fn parse(reference: &str) -> Self {
        match reference.split_once(':') {
            Some((name, tag)) if !tag.is_empty() => Self {
                name: name.to_string(),
                tag: tag.to_string(),
            },
            _ => Self {
                name: reference.trim_end_matches(':').to_string(),
                tag: "latest".to_string(),
            },
        }
    }

    /// Returns the repository path used in registry URLs.
    ///
    /// Official images on Docker Hub live under the implicit `library/`
    /// namespace.
    #[must_use]
    pub fn repository(&self) -> String {
        if self.name.contains('/') {
            self.name.clone()
        } else {
            format!("library/{}", self.name)
        }
    }
}

impl std::fmt::Display for ImageReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.name, self.tag)
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: String,
}

#[derive(Debug, Deserialize)]
struct Descriptor {
    digest: String,
}

#[derive(Debug, Deserialize)]
struct ImageManifest {
    config: Descriptor,
    layers: Vec<Descriptor>,
}

#[derive(Debug, Deserialize)]
struct ManifestIndex {
    manifests: Vec<IndexEntry>,
}

#[derive(Debug, Deserialize)]
struct IndexEntry {
    digest: String,
    platform: Option<Platform>,
}

#[derive(Debug, Deserialize)]
struct Platform {
    architecture: String,
    os: String,
}

/// Registry client that downloads and unpacks images.
#[derive(Debug)]
pub struct Puller {
    client: reqwest::blocking::Client,
    registries: Vec<String>,
}

impl Puller {
    /// Builds a puller over the configured registry list.
    ///
    /// # Errors
    ///
    /// Returns a registry error if the HTTP client cannot be constructed.
    pub fn new(config: &RegistryConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .build()
            .map_err(|e| VesselError::Registry {
                message: format!("can't build HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            registries: config.registries.clone(),
        })
    }

    /// Pulls an image reference into the store, returning its hash.
    ///
    /// A reference already in the catalog is not re-downloaded; a manifest
    /// that resolves to an already-unpacked hash only records the new
    /// reference. Registries are tried in configuration order.
    ///
    /// # Errors
    ///
    /// Returns the last registry error if every configured registry fails.
    pub fn pull(&self, store: &mut ImageStore, reference: &str) -> Result<ImageHash> {
        let reference = ImageReference::parse(reference);
        if let Some(hash) = store.lookup(&reference.name, &reference.tag) {
            tracing::info!(%reference, hash, "image already present");
            return ImageHash::from_hex(hash);
        }

        let mut last_err = VesselError::Registry {
            message: "no registries configured".into(),
        };
        for registry in &self.registries {
            match self.pull_from(registry, store, &reference) {
                Ok(hash) => return Ok(hash),
                Err(e) => {
                    tracing::warn!(registry, error = %e, "pull failed, trying next registry");
                    last_err = e;
                }
            }
        }
        Err(last_err)
    }

    fn pull_from(
        &self,
        registry: &str,
        store: &mut ImageStore,
        reference: &ImageReference,
    ) -> Result<ImageHash> {
        let repo = reference.repository();
        let base = registry_base(registry);
        let token = self.auth_token(registry, &repo)?;

        let manifest = self.fetch_manifest(&base, &repo, &reference.tag, token.as_deref())?;
        let config_hex = manifest
            .config
            .digest
            .strip_prefix("sha256:")
            .unwrap_or(&manifest.config.digest);
        let hash = ImageHash::from_hex(&config_hex[..config_hex.len().min(IMAGE_HASH_LEN)])?;

        if store.contains_hash(hash.as_str()) {
            tracing::info!(%reference, %hash, "content already unpacked, recording reference");
            store.record(&reference.name, &reference.tag, &hash)?;
            return Ok(hash);
        }

        let image_dir = store.image_dir(hash.as_str());
        let layers_root = image_dir.join("layers");
        std::fs::create_dir_all(&layers_root).map_err(|e| VesselError::io(&layers_root, e))?;
        std::fs::create_dir_all(TMP_DIR).map_err(|e| VesselError::io(TMP_DIR, e))?;

        for descriptor in &manifest.layers {
            let dest = layers_root.join(layer_id(&descriptor.digest));
            if dest.is_dir() {
                continue;
            }
            let blob = Path::new(TMP_DIR).join(format!("{}.tar", layer_id(&descriptor.digest)));
            self.download_blob(&base, &repo, &descriptor.digest, token.as_deref(), &blob)?;
            layer::verify_digest(&blob, &descriptor.digest)?;
            layer::extract(&blob, &dest)?;
            std::fs::remove_file(&blob).map_err(|e| VesselError::io(&blob, e))?;
        }

        Manifest {
            config: manifest.config.digest.clone(),
            repo_tags: vec![reference.to_string()],
            layers: manifest.layers.iter().map(|d| d.digest.clone()).collect(),
        }
        .save(&image_dir)?;

        store.record(&reference.name, &reference.tag, &hash)?;
        tracing::info!(%reference, %hash, layers = manifest.layers.len(), "image pulled");
        Ok(hash)
    }

    fn auth_token(&self, registry: &str, repo: &str) -> Result<Option<String>> {
        if registry != "docker.io" {
            return Ok(None);
        }
        let url = format!(
            "https://auth.docker.io/token?service=registry.docker.io&scope=repository:{repo}:pull"
        );
        let response: TokenResponse = self
            .client
            .get(&url)
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .and_then(reqwest::blocking::Response::json)
            .map_err(|e| VesselError::Registry {
                message: format!("token request for {repo} failed: {e}"),
            })?;
        Ok(Some(response.token))
    }

    fn fetch_manifest(
        &self,
        base: &str,
        repo: &str,
        tag_or_digest: &str,
        token: Option<&str>,
    ) -> Result<ImageManifest> {
        let url = format!("{base}/v2/{repo}/manifests/{tag_or_digest}");
        let mut request = self.client.get(&url).header("Accept", MANIFEST_ACCEPT);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        let response = request
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .map_err(|e| VesselError::Registry {
                message: format!("manifest request for {repo}:{tag_or_digest} failed: {e}"),
            })?;
        let body = response.text().map_err(|e| VesselError::Registry {
            message: format!("can't read manifest body: {e}"),
        })?;

        // A multi-platform index needs a second fetch for the right entry.
        if let Ok(index) = serde_json::from_str::<ManifestIndex>(&body) {
            if let Some(entry) = index.manifests.iter().find(|m| {
                m.platform
                    .as_ref()
                    .is_some_and(|p| p.os == "linux" && p.architecture == "amd64")
            }) {
                return self.fetch_manifest(base, repo, &entry.digest, token);
            }
        }

        serde_json::from_str::<ImageManifest>(&body).map_err(|e| VesselError::Registry {
            message: format!("unrecognized manifest for {repo}:{tag_or_digest}: {e}"),
        })
    }

    fn download_blob(
        &self,
        base: &str,
        repo: &str,
        digest: &str,
        token: Option<&str>,
        dest: &Path,
    ) -> Result<()> {
        let url = format!("{base}/v2/{repo}/blobs/{digest}");
        let mut request = self.client.get(&url);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        let mut response = request
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .map_err(|e| VesselError::Registry {
                message: format!("blob request for {digest} failed: {e}"),
            })?;
        let mut file = std::fs::File::create(dest).map_err(|e| VesselError::io(dest, e))?;
        let _ = response
            .copy_to(&mut file)
            .map_err(|e| VesselError::Registry {
                message: format!("blob download for {digest} failed: {e}"),
            })?;
        tracing::debug!(digest, dest = %dest.display(), "blob downloaded");
        Ok(())
    }
}

fn registry_base(registry: &str) -> String {
    if registry == "docker.io" {
        "https://registry-1.docker.io".to_string()
    } else {
        format!("https://{registry}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_defaults_to_latest() {
        let reference = ImageReference::parse("alpine");
        assert_eq!(reference.name, "alpine");
        assert_eq!(reference.tag, "latest");
    }

    #[test]
    fn reference_splits_explicit_tag() {
        let reference = ImageReference::parse("busybox:1.36");
        assert_eq!(reference.name, "busybox");
        assert_eq!(reference.tag, "1.36");
    }

    #[test]
    fn official_images_live_under_library() {
        assert_eq!(ImageReference::parse("alpine").repository(), "library/alpine");
        assert_eq!(
            ImageReference::parse("grafana/grafana").repository(),
            "grafana/grafana"
        );
    }

    #[test]
    fn docker_io_maps_to_the_hub_registry_host() {
        assert_eq!(registry_base("docker.io"), "https://registry-1.docker.io");
        assert_eq!(
            registry_base("registry.example.com"),
            "https://registry.example.com"
        );
    }

    #[test]
    fn reference_display_round_trips() {
        assert_eq!(ImageReference::parse("alpine:3.19").to_string(), "alpine:3.19");
    }
}
