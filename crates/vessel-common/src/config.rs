//! Runtime configuration model.
//!
//! The configuration is read once at process start and passed explicitly to
//! whoever needs it; nothing in the workspace reads it as ambient state.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Registry configuration for image pulls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Registries to try, in order, when pulling an image.
    #[serde(rename = "Registries")]
    pub registries: Vec<String>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            registries: vec!["docker.io".to_string()],
        }
    }
}

impl RegistryConfig {
    /// Loads the configuration from a JSON file.
    ///
    /// A missing or malformed file yields the hardcoded default rather than
    /// an error; a broken config must not keep the runtime from starting.
    #[must_use]
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "malformed config, using defaults");
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_file_falls_back_to_default() {
        let config = RegistryConfig::load(Path::new("/nonexistent/config.json"));
        assert_eq!(config, RegistryConfig::default());
        assert_eq!(config.registries, vec!["docker.io"]);
    }

    #[test]
    fn load_malformed_file_falls_back_to_default() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").expect("write failed");
        assert_eq!(RegistryConfig::load(&path), RegistryConfig::default());
    }

    #[test]
    fn load_valid_file_returns_listed_registries() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"Registries": ["registry.example.com", "docker.io"]}"#)
            .expect("write failed");
        let config = RegistryConfig::load(&path);
        assert_eq!(
            config.registries,
            vec!["registry.example.com", "docker.io"]
        );
    }
}
