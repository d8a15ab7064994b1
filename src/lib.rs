//! Planet populations: load, standardize, filter and summarize catalogues
//! of planets for side-by-side comparison.

pub mod cache;
pub mod color;
pub mod config;
pub mod data;
pub mod error;
pub mod sources;
pub mod summary;

pub use cache::CacheDirectory;
pub use config::AtlasConfig;
pub use data::derived::Quantity;
pub use data::filter::{Comparison, Predicate, SpaceMission, Split};
pub use data::population::Population;
pub use error::{PopulationError, Result};
pub use sources::{Atlas, CachePolicy, LoadOptions, SourceId, SourceLoader};
pub use summary::{Axis, Scale, Summary, summarize};
