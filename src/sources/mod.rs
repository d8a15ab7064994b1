//! Named data sources and the registry that loads them.
//!
//! Each [`SourceId`] is served by a [`SourceLoader`]. The [`Atlas`] owns the
//! cache directory and the loader registry, and turns any loader failure
//! into [`PopulationError::SourceUnavailable`].

mod exoplanets;
mod solar_system;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::cache::CacheDirectory;
use crate::config::AtlasConfig;
use crate::data::population::Population;
use crate::error::{PopulationError, Result};

pub use exoplanets::{ConfirmedExoplanets, TransitingExoplanets, RAW_ARCHIVE_TABLE};
pub use solar_system::SolarSystem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SourceId {
    SolarSystem,
    ConfirmedExoplanets,
    TransitingExoplanets,
}

/// Identifier and display label of each source.
const SOURCES: &[(SourceId, &str, &str)] = &[
    (SourceId::SolarSystem, "solar-system", "Solar System"),
    (SourceId::ConfirmedExoplanets, "confirmed-exoplanets", "Confirmed Exoplanets"),
    (SourceId::TransitingExoplanets, "transiting-exoplanets", "Transiting Exoplanets"),
];

impl SourceId {
    pub const ALL: [SourceId; 3] = [
        SourceId::SolarSystem,
        SourceId::ConfirmedExoplanets,
        SourceId::TransitingExoplanets,
    ];

    fn entry(self) -> &'static (SourceId, &'static str, &'static str) {
        // SOURCES lists every variant in declaration order.
        &SOURCES[self as usize]
    }

    pub fn as_str(self) -> &'static str {
        self.entry().1
    }

    pub fn label(self) -> &'static str {
        self.entry().2
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceId {
    type Err = PopulationError;

    fn from_str(s: &str) -> Result<Self> {
        SOURCES
            .iter()
            .find(|(_, id, _)| *id == s)
            .map(|(source, _, _)| *source)
            .ok_or_else(|| PopulationError::UnknownSource(s.to_string()))
    }
}

/// Whether loaders may reuse standardized tables from the cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CachePolicy {
    #[default]
    UseCached,
    /// Re-standardize from the raw download and overwrite the cached table.
    ForceRefresh,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LoadOptions {
    pub policy: CachePolicy,
}

impl LoadOptions {
    pub fn refresh() -> Self {
        LoadOptions {
            policy: CachePolicy::ForceRefresh,
        }
    }
}

/// Produces a population for one source.
pub trait SourceLoader: Send + Sync {
    fn load(&self, cache: &CacheDirectory, options: &LoadOptions) -> anyhow::Result<Population>;
}

/// Loader registry bound to one cache directory.
pub struct Atlas {
    cache: CacheDirectory,
    loaders: HashMap<SourceId, Box<dyn SourceLoader>>,
}

impl Atlas {
    /// Resolve the cache directory from `config` and register the built-in
    /// loaders.
    pub fn new(config: &AtlasConfig) -> Result<Self> {
        Ok(Self::with_cache(CacheDirectory::resolve(config)?))
    }

    pub fn with_cache(cache: CacheDirectory) -> Self {
        let mut loaders: HashMap<SourceId, Box<dyn SourceLoader>> = HashMap::new();
        loaders.insert(SourceId::SolarSystem, Box::new(SolarSystem));
        loaders.insert(SourceId::ConfirmedExoplanets, Box::new(ConfirmedExoplanets));
        loaders.insert(SourceId::TransitingExoplanets, Box::new(TransitingExoplanets));
        Atlas { cache, loaders }
    }

    /// Replace the loader registered for `source`.
    pub fn with_loader(mut self, source: SourceId, loader: impl SourceLoader + 'static) -> Self {
        self.loaders.insert(source, Box::new(loader));
        self
    }

    pub fn cache(&self) -> &CacheDirectory {
        &self.cache
    }

    /// Load a source by its string identifier.
    pub fn from_source(&self, source: &str, options: &LoadOptions) -> Result<Population> {
        self.load(source.parse()?, options)
    }

    /// Load a source. Failures are reported, never retried.
    pub fn load(&self, source: SourceId, options: &LoadOptions) -> Result<Population> {
        let loader = self
            .loaders
            .get(&source)
            .ok_or_else(|| PopulationError::UnknownSource(source.to_string()))?;

        let population = loader
            .load(&self.cache, options)
            .map_err(|e| PopulationError::SourceUnavailable {
                source_id: source.to_string(),
                reason: format!("{e:#}"),
            })?;
        log::info!("loaded {source}: {} rows", population.len());
        Ok(population)
    }

    pub fn reset_all(&self) -> Result<()> {
        self.cache.reset_all()
    }

    pub fn reset_standardized_only(&self) -> Result<()> {
        self.cache.reset_standardized_only()
    }
}
