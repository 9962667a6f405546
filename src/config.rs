use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::embedding::openai::DEFAULT_ENDPOINT;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct SqlembedConfig {
    pub server: ServerConfig,
    pub embedding: EmbeddingConfig,
    pub enrichment: EnrichmentConfig,
    pub search: SearchConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub log_level: String,
}

#[derive(Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub endpoint: String,
    pub model: String,
    /// Trusted API key. When set, callers never need to stash one.
    pub api_key: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EnrichmentConfig {
    pub batch_size: usize,
    /// Row template; when unset every column of the table is used.
    pub template: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SearchConfig {
    pub max_results: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.into(),
            model: crate::embedding::EmbeddingModel::default()
                .identifier()
                .into(),
            api_key: None,
        }
    }
}

impl std::fmt::Debug for EmbeddingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingConfig")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            template: None,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { max_results: 20 }
    }
}

/// Returns `~/.sqlembed/`
pub fn default_sqlembed_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".sqlembed"))
}

/// Returns the default config file path: `~/.sqlembed/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    default_sqlembed_dir().map(|dir| dir.join("config.toml"))
}

impl SqlembedConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        match default_config_path() {
            Some(path) => Self::load_from(path),
            None => {
                let mut config = Self::default();
                config.apply_env_overrides();
                Ok(config)
            }
        }
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            SqlembedConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    /// (SQLEMBED_LOG_LEVEL, SQLEMBED_MODEL, SQLEMBED_ENDPOINT, OPENAI_API_KEY).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("SQLEMBED_LOG_LEVEL") {
            self.server.log_level = val;
        }
        if let Ok(val) = std::env::var("SQLEMBED_MODEL") {
            self.embedding.model = val;
        }
        if let Ok(val) = std::env::var("SQLEMBED_ENDPOINT") {
            self.embedding.endpoint = val;
        }
        if let Ok(val) = std::env::var("OPENAI_API_KEY") {
            if !val.is_empty() {
                self.embedding.api_key = Some(val);
            }
        }
    }
}
