//! Configuration for Recollect
//!
//! Layered configuration: built-in defaults, an optional `recollect.toml`,
//! and `RECOLLECT_*` environment variables (double underscore separates
//! nesting, e.g. `RECOLLECT_BACKEND__URL`).

use crate::error::Result;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecollectConfig {
    #[serde(default)]
    pub backend: BackendSettings,

    #[serde(default)]
    pub embedding: EmbeddingSettings,

    #[serde(default)]
    pub migration: MigrationSettings,
}

/// Vector backend connection settings
///
/// When `url` is unset the in-memory backend is used.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BackendSettings {
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub namespace: Option<String>,
}

/// Embedding provider settings
#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingSettings {
    /// "remote" for the HTTP embedding API, "hashed" for the local embedder
    #[serde(default = "default_provider")]
    pub provider: String,

    pub model: Option<String>,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            api_key: None,
            base_url: None,
        }
    }
}

/// Migration engine defaults
#[derive(Debug, Clone, Deserialize)]
pub struct MigrationSettings {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for MigrationSettings {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
        }
    }
}

fn default_provider() -> String {
    "hashed".to_string()
}

fn default_batch_size() -> usize {
    50
}

impl RecollectConfig {
    /// Load from `recollect.toml` (if present) and the environment
    pub fn load() -> Result<Self> {
        Self::load_layered(None)
    }

    /// Load from an explicit file plus the environment
    pub fn from_file(path: &Path) -> Result<Self> {
        Self::load_layered(Some(path))
    }

    fn load_layered(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        builder = match path {
            Some(path) => builder.add_source(File::from(path.to_path_buf())),
            None => builder.add_source(File::with_name("recollect").required(false)),
        };

        let config = builder
            .add_source(Environment::with_prefix("RECOLLECT").separator("__"))
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RecollectConfig::default();
        assert_eq!(config.embedding.provider, "hashed");
        assert_eq!(config.migration.batch_size, 50);
        assert!(config.backend.url.is_none());
    }

    #[test]
    fn test_deserialize_partial_toml() {
        let parsed: RecollectConfig = toml_like(
            r#"
            {
                "backend": { "url": "https://idx.example.io", "namespace": "dev" },
                "migration": { "batch_size": 10 }
            }
            "#,
        );
        assert_eq!(parsed.backend.url.as_deref(), Some("https://idx.example.io"));
        assert_eq!(parsed.migration.batch_size, 10);
        // Unspecified section falls back to defaults
        assert_eq!(parsed.embedding.provider, "hashed");
    }

    fn toml_like(json: &str) -> RecollectConfig {
        serde_json::from_str(json).unwrap()
    }
}
