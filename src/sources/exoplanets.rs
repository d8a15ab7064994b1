use anyhow::{Context, Result, bail};

use crate::cache::CacheDirectory;
use crate::data::filter::Predicate;
use crate::data::loader::{ROW_KEY_FIELD, load_table, write_parquet};
use crate::data::model::Table;
use crate::data::population::Population;
use crate::data::standardize::standardize_file;

use super::{CachePolicy, LoadOptions, SourceId, SourceLoader};

/// Raw archive table (planetary systems composite parameters) both
/// exoplanet sources are standardized from.
pub const RAW_ARCHIVE_TABLE: &str = "pscomppars";

/// Every confirmed exoplanet in the archive download.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfirmedExoplanets;

/// Confirmed exoplanets that have been observed in transit.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransitingExoplanets;

impl SourceLoader for ConfirmedExoplanets {
    fn load(&self, cache: &CacheDirectory, options: &LoadOptions) -> Result<Population> {
        let table = standardized_table(cache, SourceId::ConfirmedExoplanets, options)?;
        Ok(Population::new(SourceId::ConfirmedExoplanets.label(), table))
    }
}

impl SourceLoader for TransitingExoplanets {
    fn load(&self, cache: &CacheDirectory, options: &LoadOptions) -> Result<Population> {
        let confirmed = ConfirmedExoplanets.load(cache, options)?;
        let transiting = confirmed
            .filter(&Predicate::transiting())
            .context("selecting transiting planets")?;
        Ok(transiting.with_label(SourceId::TransitingExoplanets.label()))
    }
}

/// Read the cached standardized table, or build it from the raw download.
fn standardized_table(
    cache: &CacheDirectory,
    source: SourceId,
    options: &LoadOptions,
) -> Result<Table> {
    let standardized = cache.standardized_path(source.as_str());
    if options.policy == CachePolicy::UseCached && standardized.exists() {
        log::info!("reading standardized table {}", standardized.display());
        return load_table(&standardized, ROW_KEY_FIELD);
    }

    let raw = cache.raw_path(RAW_ARCHIVE_TABLE);
    if !raw.exists() {
        bail!(
            "raw archive table {} not found; download it or run generate_sample",
            raw.display()
        );
    }
    log::info!("standardizing {}", raw.display());
    let table = standardize_file(&raw)?;

    cache.ensure()?;
    write_parquet(&table, &standardized)
        .with_context(|| format!("caching standardized table for {source}"))?;
    log::info!("cached {} rows in {}", table.len(), standardized.display());
    Ok(table)
}
