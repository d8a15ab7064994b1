//! Configuration for the population atlas.
//!
//! Settings can come from a TOML file:
//!
//! ```toml
//! # exopop.toml
//! [cache]
//! directory = "/data/exopop"
//! ```
//!
//! The `EXOPOP_CACHE_DIR` environment variable overrides the file.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{PopulationError, Result};

/// Environment variable overriding the cache directory.
pub const CACHE_DIR_ENV: &str = "EXOPOP_CACHE_DIR";
/// Cache directory used when nothing else is configured.
pub const DEFAULT_CACHE_DIR: &str = "exopop-data";

/// Root configuration structure for exopop.toml files.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AtlasConfig {
    #[serde(default)]
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheConfig {
    /// Root of the local data cache.
    pub directory: Option<PathBuf>,
}

impl AtlasConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            PopulationError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| PopulationError::Config(e.to_string()))
    }

    pub fn with_cache_dir(mut self, directory: impl Into<PathBuf>) -> Self {
        self.cache.directory = Some(directory.into());
        self
    }

    /// The cache directory: environment, then file, then the default.
    pub fn cache_directory(&self) -> PathBuf {
        self.cache_directory_with(std::env::var_os(CACHE_DIR_ENV).map(PathBuf::from))
    }

    fn cache_directory_with(&self, from_env: Option<PathBuf>) -> PathBuf {
        from_env
            .filter(|p| !p.as_os_str().is_empty())
            .or_else(|| self.cache.directory.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_DIR))
    }
}
