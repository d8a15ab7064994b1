use std::path::{Path, PathBuf};

use crate::config::AtlasConfig;
use crate::error::{PopulationError, Result};

const RAW_DIR: &str = "raw";
const STANDARDIZED_DIR: &str = "standardized";

/// Local data cache.
///
/// ```text
///  <root>/raw/<table>.csv                 archive downloads (fetched externally)
///  <root>/standardized/<source>.parquet   standardized tables
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheDirectory {
    root: PathBuf,
}

impl CacheDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve the configured cache directory and make sure it exists.
    pub fn resolve(config: &AtlasConfig) -> Result<Self> {
        let cache = Self::new(config.cache_directory());
        cache.ensure()?;
        log::debug!("using cache directory {}", cache.root.display());
        Ok(cache)
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn raw_dir(&self) -> PathBuf {
        self.root.join(RAW_DIR)
    }

    pub fn standardized_dir(&self) -> PathBuf {
        self.root.join(STANDARDIZED_DIR)
    }

    pub fn raw_path(&self, table: &str) -> PathBuf {
        self.raw_dir().join(format!("{table}.csv"))
    }

    pub fn standardized_path(&self, source: &str) -> PathBuf {
        self.standardized_dir().join(format!("{source}.parquet"))
    }

    /// Create the directory layout if missing.
    pub fn ensure(&self) -> Result<()> {
        for dir in [self.raw_dir(), self.standardized_dir()] {
            std::fs::create_dir_all(&dir).map_err(|source| PopulationError::Cache {
                path: dir.clone(),
                source,
            })?;
        }
        Ok(())
    }

    /// Remove raw downloads and standardized tables.
    pub fn reset_all(&self) -> Result<()> {
        log::info!("clearing all cached data in {}", self.root.display());
        clear(&self.raw_dir())?;
        clear(&self.standardized_dir())?;
        self.ensure()
    }

    /// Remove standardized tables only; the next load re-standardizes from
    /// the raw downloads.
    pub fn reset_standardized_only(&self) -> Result<()> {
        log::info!(
            "clearing standardized tables in {}",
            self.standardized_dir().display()
        );
        clear(&self.standardized_dir())?;
        self.ensure()
    }
}

fn clear(dir: &Path) -> Result<()> {
    match std::fs::remove_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(PopulationError::Cache {
            path: dir.to_path_buf(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        std::fs::write(path, b"x").unwrap();
    }

    #[test]
    fn test_resolve_creates_layout() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("cache");
        let config = AtlasConfig::default().with_cache_dir(&root);
        // Only meaningful when the environment does not override the directory.
        if std::env::var_os(crate::config::CACHE_DIR_ENV).is_none() {
            let cache = CacheDirectory::resolve(&config).unwrap();
            assert_eq!(cache.path(), root);
            assert!(cache.raw_dir().is_dir());
            assert!(cache.standardized_dir().is_dir());
        }
    }

    #[test]
    fn test_reset_standardized_keeps_raw() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheDirectory::new(dir.path());
        cache.ensure().unwrap();
        touch(&cache.raw_path("pscomppars"));
        touch(&cache.standardized_path("confirmed-exoplanets"));

        cache.reset_standardized_only().unwrap();
        assert!(cache.raw_path("pscomppars").exists());
        assert!(!cache.standardized_path("confirmed-exoplanets").exists());
        assert!(cache.standardized_dir().is_dir());
    }

    #[test]
    fn test_reset_all_clears_everything() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheDirectory::new(dir.path());
        cache.ensure().unwrap();
        touch(&cache.raw_path("pscomppars"));
        touch(&cache.standardized_path("confirmed-exoplanets"));

        cache.reset_all().unwrap();
        assert!(!cache.raw_path("pscomppars").exists());
        assert!(!cache.standardized_path("confirmed-exoplanets").exists());
        assert!(cache.raw_dir().is_dir());
    }

    #[test]
    fn test_reset_on_missing_directory_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheDirectory::new(dir.path().join("never-created"));
        cache.reset_all().unwrap();
        assert!(cache.raw_dir().is_dir());
    }
}
