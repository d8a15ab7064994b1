//! # exopop
//!
//! Command-line access to planet populations.
//!
//! ```bash
//! # JSON summary of the Solar System and the transiting planets
//! exopop summary -s solar-system -s transiting-exoplanets
//!
//! # Split confirmed planets by mass significance
//! exopop summary -s confirmed-exoplanets --split mass --sigma 3
//!
//! # Radius against relative insolation, log-scaled
//! exopop scatter -s confirmed-exoplanets relative_insolation radius --log-x --log-y
//!
//! # Manage the local data cache
//! exopop cache reset-standardized
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use arrow::util::pretty::pretty_format_batches;
use clap::{Parser, Subcommand};
use log::info;

use exopop::data::loader::table_to_record_batch;
use exopop::{Atlas, AtlasConfig, Axis, LoadOptions, Population, Scale, Split, summarize};

/// exopop - planet population explorer
#[derive(Parser)]
#[command(name = "exopop")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbosity level (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// TOML configuration file
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Cache directory (overrides the configuration file)
    #[arg(long, value_name = "DIR", global = true)]
    cache_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Which populations to load and how to split them.
#[derive(clap::Args)]
struct Selection {
    /// Source identifier (repeatable)
    #[arg(short, long = "source", value_name = "SOURCE", default_value = "solar-system")]
    sources: Vec<String>,

    /// Split every source in two: mass, radius, kepler, k2, tess, space, transit
    #[arg(long)]
    split: Option<String>,

    /// Significance threshold for the mass and radius splits
    #[arg(long, default_value_t = Split::DEFAULT_SIGMA)]
    sigma: f64,

    /// Re-standardize from the raw download, ignoring cached tables
    #[arg(long)]
    refresh: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a JSON summary of one or more populations
    Summary {
        #[command(flatten)]
        selection: Selection,
    },

    /// Print per-population scatter points as JSON
    Scatter {
        #[command(flatten)]
        selection: Selection,

        /// Column or calculated quantity on the x axis
        #[arg(value_name = "X")]
        x: String,

        /// Column or calculated quantity on the y axis
        #[arg(value_name = "Y")]
        y: String,

        #[arg(long)]
        log_x: bool,

        #[arg(long)]
        log_y: bool,
    },

    /// Print the first rows of a population as a table
    Show {
        #[command(flatten)]
        selection: Selection,

        /// Number of rows per population
        #[arg(short = 'n', long, default_value = "10")]
        rows: isize,
    },

    /// Manage the local data cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Print the resolved cache directory
    Path,
    /// Remove raw downloads and standardized tables
    Reset,
    /// Remove standardized tables, keeping raw downloads
    ResetStandardized,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let mut config = match &cli.config {
        Some(path) => AtlasConfig::from_file(path)?,
        None => AtlasConfig::default(),
    };
    if let Some(dir) = cli.cache_dir {
        config = config.with_cache_dir(dir);
    }
    let atlas = Atlas::new(&config).context("opening the data cache")?;

    match cli.command {
        Commands::Summary { selection } => run_summary(&atlas, &selection),
        Commands::Scatter {
            selection,
            x,
            y,
            log_x,
            log_y,
        } => run_scatter(&atlas, &selection, &x, &y, (scale(log_x), scale(log_y))),
        Commands::Show { selection, rows } => run_show(&atlas, &selection, rows),
        Commands::Cache { action } => run_cache(&atlas, action),
    }
}

fn scale(log: bool) -> Scale {
    if log { Scale::Log } else { Scale::Linear }
}

/// Load every selected source, split into halves when requested.
fn load(atlas: &Atlas, selection: &Selection) -> Result<Vec<Population>> {
    let options = if selection.refresh {
        LoadOptions::refresh()
    } else {
        LoadOptions::default()
    };
    let split = selection
        .split
        .as_deref()
        .map(|name| Split::parse(name, selection.sigma))
        .transpose()?;

    let mut populations = Vec::new();
    for source in &selection.sources {
        let population = atlas.from_source(source, &options)?;
        match split {
            Some(split) => {
                let (positive, negative) = population.split(split)?;
                let (positive_label, negative_label) = split.labels();
                info!(
                    "{}: {} {positive_label}, {} {negative_label}",
                    population.label(),
                    positive.len(),
                    negative.len()
                );
                let label = population.label();
                populations.push(positive.with_label(format!("{label} {positive_label}")));
                populations.push(negative.with_label(format!("{label} {negative_label}")));
            }
            None => populations.push(population),
        }
    }
    Ok(populations)
}

fn run_summary(atlas: &Atlas, selection: &Selection) -> Result<()> {
    let summary = summarize(&load(atlas, selection)?)?;
    println!("{}", summary.to_json()?);
    Ok(())
}

fn run_scatter(
    atlas: &Atlas,
    selection: &Selection,
    x: &str,
    y: &str,
    scales: (Scale, Scale),
) -> Result<()> {
    let summary = summarize(&load(atlas, selection)?)?;
    let series = summary.scatter(&Axis::from_name(x), &Axis::from_name(y), scales)?;
    println!("{}", serde_json::to_string_pretty(&series)?);
    Ok(())
}

fn run_show(atlas: &Atlas, selection: &Selection, rows: isize) -> Result<()> {
    if rows < 0 {
        bail!("row count must not be negative");
    }
    for population in load(atlas, selection)? {
        let head = population.by_slice(None, Some(rows), None)?;
        let batch = table_to_record_batch(&head.to_table()?)?;
        println!("{} ({} rows)", population.label(), population.len());
        println!("{}", pretty_format_batches(&[batch])?);
    }
    Ok(())
}

fn run_cache(atlas: &Atlas, action: CacheAction) -> Result<()> {
    match action {
        CacheAction::Path => println!("{}", atlas.cache().path().display()),
        CacheAction::Reset => {
            atlas.reset_all()?;
            println!("Cleared {}", atlas.cache().path().display());
        }
        CacheAction::ResetStandardized => {
            atlas.reset_standardized_only()?;
            println!("Cleared {}", atlas.cache().standardized_dir().display());
        }
    }
    Ok(())
}
